//! Physical input drivers
//!
//! Every device is an independent state machine with a synchronous core
//! (`*Machine`) that is fed the current time and a raw sample, and an async
//! runner that sleeps on its interrupt [`Notifier`](crate::channel::Notifier),
//! polls the hardware until the machine settles and pushes typed events onto
//! its own bounded queue.

pub mod button;
pub mod encoder;
pub mod switch;
pub mod touch;

pub use button::{ButtonConfig, ButtonEvent, ButtonInput, ButtonMachine, ButtonPhase, ClickKind};
pub use encoder::{EncoderConfig, EncoderEvent, EncoderInput, EncoderMachine, StepMode};
pub use switch::{SwitchConfig, SwitchEvent, SwitchInput, SwitchMachine};
pub use touch::{TouchConfig, TouchEvent, TouchInput, TouchKind, TouchMachine, TouchSensor};

use crate::command::LedCommand;

/// Default interval between polls while a detection is in progress
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Origin of an event in the integrated stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Button,
    Encoder,
    Touch,
    Switch,
    /// Command received from a wireless peer
    Remote,
}

/// Event produced by one input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Button(ButtonEvent),
    Encoder(EncoderEvent),
    Touch(TouchEvent),
    Switch(SwitchEvent),
    Remote(LedCommand),
}

impl InputEvent {
    /// Source the event belongs to
    pub const fn source(&self) -> InputSource {
        match self {
            Self::Button(_) => InputSource::Button,
            Self::Encoder(_) => InputSource::Encoder,
            Self::Touch(_) => InputSource::Touch,
            Self::Switch(_) => InputSource::Switch,
            Self::Remote(_) => InputSource::Remote,
        }
    }
}

/// Edge interrupt control for an input line.
///
/// Runners disable the interrupt while they drain a detection and re-enable it
/// once the machine is idle, so contact bounce cannot cause an interrupt storm.
pub trait Interruptible {
    fn set_listening(&mut self, enabled: bool);
}
