//! Multi-source event integrator
//!
//! Waits on all input queues at once, takes exactly one event from whichever
//! source is ready, stamps it and republishes it on the integrated queue.
//! Once an event has left its source queue it is never dropped: the forward
//! is a blocking send, so a slow consumer applies backpressure here instead.

use embassy_futures::select::select_array;
use embassy_time::Instant;

use crate::channel::{Queue, QueueReceiver, QueueSender};
use crate::input::{InputEvent, InputSource};

/// An input event tagged with its source and arrival time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegratedEvent {
    pub source: InputSource,
    pub timestamp: Instant,
    pub event: InputEvent,
}

impl IntegratedEvent {
    pub const fn new(event: InputEvent, timestamp: Instant) -> Self {
        Self {
            source: event.source(),
            timestamp,
            event,
        }
    }
}

/// Type alias for the integrated event queue
pub type IntegratedQueue<const SIZE: usize> = Queue<IntegratedEvent, SIZE>;

pub type IntegratedSender<'a, const SIZE: usize> = QueueSender<'a, IntegratedEvent, SIZE>;

pub type IntegratedReceiver<'a, const SIZE: usize> = QueueReceiver<'a, IntegratedEvent, SIZE>;

/// Wait-set over `N` source queues of capacity `SRC`
pub struct EventIntegrator<'a, const N: usize, const SRC: usize, const OUT: usize> {
    sources: [QueueReceiver<'a, InputEvent, SRC>; N],
    sink: IntegratedSender<'a, OUT>,
}

impl<'a, const N: usize, const SRC: usize, const OUT: usize> EventIntegrator<'a, N, SRC, OUT> {
    pub const fn new(
        sources: [QueueReceiver<'a, InputEvent, SRC>; N],
        sink: IntegratedSender<'a, OUT>,
    ) -> Self {
        Self { sources, sink }
    }

    /// Forward one event from the first ready source.
    ///
    /// Within a source FIFO order is kept; across sources events go out in
    /// the order their sources became ready.
    pub async fn forward_one(&self) -> IntegratedEvent {
        let receives = self.sources.each_ref().map(|source| source.receive());
        let (event, _) = select_array(receives).await;
        let integrated = IntegratedEvent::new(event, Instant::now());
        self.sink.send(integrated).await;
        integrated
    }
}

/// Integrator task
pub async fn run_integrator<const N: usize, const SRC: usize, const OUT: usize>(
    integrator: EventIntegrator<'_, N, SRC, OUT>,
) -> ! {
    loop {
        integrator.forward_one().await;
    }
}
