//! Toggle switch
//!
//! Edges only trigger a re-sample after a fixed settle delay. The position is
//! reported once at boot and afterwards only when the settled level changes.

use embassy_time::{Duration, Timer};
use embedded_hal::digital::InputPin;

use super::{InputEvent, Interruptible};
use crate::channel::{Notifier, QueueSender, offer};
use crate::error::InitError;
use crate::logging::log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEvent {
    pub closed: bool,
    pub channel: u8,
}

#[derive(Debug, Clone)]
pub struct SwitchConfig {
    pub channel: u8,
    /// Closed when the line reads low
    pub active_low: bool,
    pub settle_ms: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            active_low: true,
            settle_ms: 50,
        }
    }
}

/// Pure switch machine: remembers the last reported position
#[derive(Debug, Clone)]
pub struct SwitchMachine {
    channel: u8,
    closed: Option<bool>,
}

impl SwitchMachine {
    pub const fn new(channel: u8) -> Self {
        Self {
            channel,
            closed: None,
        }
    }

    pub const fn is_closed(&self) -> Option<bool> {
        self.closed
    }

    /// Boot-time report, emitted regardless of the previous state
    pub fn boot(&mut self, closed: bool) -> SwitchEvent {
        self.closed = Some(closed);
        SwitchEvent {
            closed,
            channel: self.channel,
        }
    }

    /// Level re-sampled after the settle delay
    pub fn settle(&mut self, closed: bool) -> Option<SwitchEvent> {
        if self.closed == Some(closed) {
            return None;
        }
        Some(self.boot(closed))
    }
}

/// Switch bound to a GPIO line
pub struct SwitchInput<P> {
    pin: P,
    machine: SwitchMachine,
    active_low: bool,
    settle_delay: Duration,
}

impl<P: InputPin + Interruptible> SwitchInput<P> {
    pub fn new(mut pin: P, config: &SwitchConfig) -> Result<Self, InitError> {
        pin.is_high().map_err(|_| InitError::Gpio)?;
        Ok(Self {
            pin,
            machine: SwitchMachine::new(config.channel),
            active_low: config.active_low,
            settle_delay: Duration::from_millis(config.settle_ms),
        })
    }

    /// Read and report the boot position.
    pub fn boot(&mut self) -> Option<SwitchEvent> {
        let closed = self.is_closed()?;
        Some(self.machine.boot(closed))
    }

    /// Re-enable the edge interrupt.
    ///
    /// Returns `true` when the line already differs from the last reported
    /// position, which means an edge was missed while the interrupt was masked.
    pub fn arm(&mut self) -> bool {
        self.pin.set_listening(true);
        self.is_closed()
            .is_some_and(|closed| self.machine.is_closed() != Some(closed))
    }

    /// Re-sample after the settle delay.
    pub fn settle(&mut self) -> Option<SwitchEvent> {
        let Some(closed) = self.is_closed() else {
            log!("[switch {}] gpio read failed", self.machine.channel);
            return None;
        };
        self.machine.settle(closed)
    }

    fn is_closed(&mut self) -> Option<bool> {
        let high = self.pin.is_high().ok()?;
        Some(high != self.active_low)
    }
}

/// Switch runner: reports the boot position, then one event per settled change.
pub async fn run_switch<P, const SIZE: usize>(
    mut switch: SwitchInput<P>,
    notifier: &Notifier,
    events: QueueSender<'_, InputEvent, SIZE>,
) where
    P: InputPin + Interruptible,
{
    if let Some(event) = switch.boot() {
        offer(events, InputEvent::Switch(event), "switch");
    }

    loop {
        notifier.reset();
        if !switch.arm() {
            notifier.wait().await;
        }
        switch.pin.set_listening(false);
        Timer::after(switch.settle_delay).await;

        if let Some(event) = switch.settle() {
            offer(events, InputEvent::Switch(event), "switch");
        }
    }
}
