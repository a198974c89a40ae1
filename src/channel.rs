//! Queue and notification primitives shared by all tasks.
//!
//! Everything is built on `embassy-sync` with a [`CriticalSectionRawMutex`],
//! so producers may live in interrupt context and consumers in any executor.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embassy_sync::signal::Signal;

use crate::logging::log;

/// Bounded FIFO queue.
pub type Queue<T, const SIZE: usize> = Channel<CriticalSectionRawMutex, T, SIZE>;

/// Sending half of a [`Queue`].
pub type QueueSender<'a, T, const SIZE: usize> = Sender<'a, CriticalSectionRawMutex, T, SIZE>;

/// Receiving half of a [`Queue`].
pub type QueueReceiver<'a, T, const SIZE: usize> = Receiver<'a, CriticalSectionRawMutex, T, SIZE>;

/// Binary wake-up from an interrupt handler to its owning task.
///
/// Several interrupts before the task runs coalesce into a single wake-up,
/// which is correct because the task re-polls the hardware until it settles.
pub type Notifier = Signal<CriticalSectionRawMutex, ()>;

/// Single-slot conduit where a new value replaces any unconsumed one.
pub type Latest<T> = Signal<CriticalSectionRawMutex, T>;

/// Interrupt handler body: wake the owning task and return.
///
/// The handler never samples hardware or touches the driver state.
#[inline]
pub fn notify_from_isr(notifier: &Notifier) {
    notifier.signal(());
}

/// Best-effort send.
///
/// When the consumer is too slow the value is dropped and the loss is logged.
/// Returns `true` when the value was queued.
pub fn offer<T: core::fmt::Debug, const SIZE: usize>(
    sender: QueueSender<'_, T, SIZE>,
    value: T,
    queue_name: &'static str,
) -> bool {
    match sender.try_send(value) {
        Ok(()) => true,
        Err(TrySendError::Full(dropped)) => {
            log!("[{}] queue full, dropping {:?}", queue_name, dropped);
            false
        }
    }
}
