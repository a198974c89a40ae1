//! Debounced push-button with click classification
//!
//! | Gesture         | Condition                                          | Event           |
//! |-----------------|----------------------------------------------------|-----------------|
//! | Click           | Release before `long_click_ms`, no second press    | `Click`         |
//! | Double click    | Two short clicks within `double_click_ms`          | `DoubleClick`   |
//! | Long click      | Release after `long_click_ms`                      | `LongClick`     |
//! | Very long click | Release after `very_long_click_ms`                 | `VeryLongClick` |
//! | Abandoned       | Release after `timeout_ms` (2x very long)          | `None`          |
//! | Stuck           | Still held after 2x `timeout_ms`                   | `Error`         |
//!
//! Both edges must hold their level for the configured debounce time before
//! the machine trusts them, so a single bounce never produces two events.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;

use super::{DEFAULT_POLL_INTERVAL_MS, InputEvent, Interruptible};
use crate::channel::{Notifier, QueueSender, offer};
use crate::error::InitError;
use crate::logging::log;
use crate::math8::elapsed_ms;

/// Classified button gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Held past the timeout and released: no valid gesture
    None,
    Click,
    DoubleClick,
    LongClick,
    VeryLongClick,
    /// Held far beyond any gesture, the contact is probably stuck
    Error,
}

/// Event emitted by a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub kind: ClickKind,
    pub channel: u8,
}

/// Button timing configuration
#[derive(Debug, Clone)]
pub struct ButtonConfig {
    /// Channel number reported in events
    pub channel: u8,
    /// Pressed when the line reads low
    pub active_low: bool,
    pub debounce_press_ms: u64,
    pub debounce_release_ms: u64,
    pub double_click_ms: u64,
    pub long_click_ms: u64,
    pub very_long_click_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            active_low: true,
            debounce_press_ms: 20,
            debounce_release_ms: 30,
            double_click_ms: 300,
            long_click_ms: 1000,
            very_long_click_ms: 3000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ButtonConfig {
    /// Hold time after which the gesture is abandoned
    pub const fn timeout_ms(&self) -> u64 {
        self.very_long_click_ms * 2
    }

    /// Hold time after which the button is reported as stuck
    pub const fn error_ms(&self) -> u64 {
        self.timeout_ms() * 2
    }

    pub fn validate(&self) -> Result<(), InitError> {
        if self.debounce_press_ms == 0 || self.debounce_release_ms == 0 {
            return Err(InitError::InvalidConfig("button debounce must be non-zero"));
        }
        if self.long_click_ms >= self.very_long_click_ms {
            return Err(InitError::InvalidConfig("long click must be shorter than very long click"));
        }
        if self.double_click_ms == 0 || self.poll_interval_ms == 0 {
            return Err(InitError::InvalidConfig("button windows must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonState {
    WaitForPress,
    DebounceStart {
        since: Instant,
    },
    WaitForRelease {
        pressed_at: Instant,
    },
    DebounceRelease {
        pressed_at: Instant,
        released_at: Instant,
    },
    WaitForSecondClick {
        released_at: Instant,
    },
    TimeoutWaitForRelease {
        pressed_at: Instant,
        released_at: Option<Instant>,
    },
    Error {
        released_at: Option<Instant>,
    },
}

/// Observable phase of the button machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    WaitForPress,
    DebounceStart,
    WaitForRelease,
    DebounceRelease,
    WaitForSecondClick,
    TimeoutWaitForRelease,
    Error,
}

/// Pure button state machine
#[derive(Debug, Clone)]
pub struct ButtonMachine {
    config: ButtonConfig,
    state: ButtonState,
    /// Short clicks completed in the current gesture
    clicks: u8,
    last_release: Instant,
}

impl ButtonMachine {
    pub const fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            state: ButtonState::WaitForPress,
            clicks: 0,
            last_release: Instant::from_ticks(0),
        }
    }

    pub const fn config(&self) -> &ButtonConfig {
        &self.config
    }

    pub const fn phase(&self) -> ButtonPhase {
        match self.state {
            ButtonState::WaitForPress => ButtonPhase::WaitForPress,
            ButtonState::DebounceStart { .. } => ButtonPhase::DebounceStart,
            ButtonState::WaitForRelease { .. } => ButtonPhase::WaitForRelease,
            ButtonState::DebounceRelease { .. } => ButtonPhase::DebounceRelease,
            ButtonState::WaitForSecondClick { .. } => ButtonPhase::WaitForSecondClick,
            ButtonState::TimeoutWaitForRelease { .. } => ButtonPhase::TimeoutWaitForRelease,
            ButtonState::Error { .. } => ButtonPhase::Error,
        }
    }

    /// No detection in progress, the runner may go back to sleep
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, ButtonState::WaitForPress)
    }

    /// Advance the machine with the debounced-to-be level sampled at `now`.
    pub fn poll(&mut self, now: Instant, pressed: bool) -> Option<ButtonEvent> {
        let kind = self.step(now, pressed)?;
        Some(ButtonEvent {
            kind,
            channel: self.config.channel,
        })
    }

    fn step(&mut self, now: Instant, pressed: bool) -> Option<ClickKind> {
        match self.state {
            ButtonState::WaitForPress => {
                if pressed {
                    self.state = ButtonState::DebounceStart { since: now };
                }
                None
            }
            ButtonState::DebounceStart { since } => {
                if !pressed {
                    // Bounce, fall back to whatever we were waiting for
                    self.state = self.resting_state();
                } else if elapsed_ms(now, since) >= self.config.debounce_press_ms {
                    self.state = ButtonState::WaitForRelease { pressed_at: since };
                }
                None
            }
            ButtonState::WaitForRelease { pressed_at } => {
                if elapsed_ms(now, pressed_at) > self.config.timeout_ms() {
                    self.clicks = 0;
                    self.state = ButtonState::TimeoutWaitForRelease {
                        pressed_at,
                        released_at: None,
                    };
                } else if !pressed {
                    self.state = ButtonState::DebounceRelease {
                        pressed_at,
                        released_at: now,
                    };
                }
                None
            }
            ButtonState::DebounceRelease {
                pressed_at,
                released_at,
            } => {
                if pressed {
                    self.state = ButtonState::WaitForRelease { pressed_at };
                    None
                } else if elapsed_ms(now, released_at) >= self.config.debounce_release_ms {
                    self.classify(pressed_at, released_at)
                } else {
                    None
                }
            }
            ButtonState::WaitForSecondClick { released_at } => {
                if pressed {
                    self.state = ButtonState::DebounceStart { since: now };
                    None
                } else if elapsed_ms(now, released_at) > self.config.double_click_ms {
                    self.finish(ClickKind::Click)
                } else {
                    None
                }
            }
            ButtonState::TimeoutWaitForRelease {
                pressed_at,
                released_at,
            } => {
                if elapsed_ms(now, pressed_at) > self.config.error_ms() {
                    log!("[button {}] held too long, reporting error", self.config.channel);
                    self.state = ButtonState::Error { released_at: None };
                    return Some(ClickKind::Error);
                }
                match self.settle_release(now, pressed, released_at) {
                    Some(true) => self.finish(ClickKind::None),
                    Some(false) => None,
                    None => {
                        self.state = ButtonState::TimeoutWaitForRelease {
                            pressed_at,
                            released_at: if pressed { None } else { released_at.or(Some(now)) },
                        };
                        None
                    }
                }
            }
            ButtonState::Error { released_at } => {
                match self.settle_release(now, pressed, released_at) {
                    Some(true) => {
                        self.clicks = 0;
                        self.state = ButtonState::WaitForPress;
                    }
                    _ => {
                        self.state = ButtonState::Error {
                            released_at: if pressed { None } else { released_at.or(Some(now)) },
                        };
                    }
                }
                None
            }
        }
    }

    /// Some(true) once a release has held for the release debounce time.
    /// Returns None when the caller has to record a new release candidate.
    fn settle_release(
        &self,
        now: Instant,
        pressed: bool,
        released_at: Option<Instant>,
    ) -> Option<bool> {
        match (pressed, released_at) {
            (false, Some(since)) => {
                Some(elapsed_ms(now, since) >= self.config.debounce_release_ms)
            }
            _ => None,
        }
    }

    fn classify(&mut self, pressed_at: Instant, released_at: Instant) -> Option<ClickKind> {
        let held = elapsed_ms(released_at, pressed_at);
        if held > self.config.very_long_click_ms {
            return self.finish(ClickKind::VeryLongClick);
        }
        if held > self.config.long_click_ms {
            return self.finish(ClickKind::LongClick);
        }

        self.clicks = self.clicks.saturating_add(1);
        if self.clicks >= 2 {
            return self.finish(ClickKind::DoubleClick);
        }
        self.last_release = released_at;
        self.state = ButtonState::WaitForSecondClick { released_at };
        None
    }

    fn finish(&mut self, kind: ClickKind) -> Option<ClickKind> {
        self.clicks = 0;
        self.state = ButtonState::WaitForPress;
        Some(kind)
    }

    const fn resting_state(&self) -> ButtonState {
        if self.clicks > 0 {
            ButtonState::WaitForSecondClick {
                released_at: self.last_release,
            }
        } else {
            ButtonState::WaitForPress
        }
    }
}

/// Button bound to a GPIO line
pub struct ButtonInput<P> {
    pin: P,
    machine: ButtonMachine,
}

impl<P: InputPin + Interruptible> ButtonInput<P> {
    /// Validate the configuration and read the line once.
    pub fn new(mut pin: P, config: ButtonConfig) -> Result<Self, InitError> {
        config.validate()?;
        pin.is_high().map_err(|_| InitError::Gpio)?;
        Ok(Self {
            pin,
            machine: ButtonMachine::new(config),
        })
    }

    pub const fn machine(&self) -> &ButtonMachine {
        &self.machine
    }

    fn is_pressed(&mut self) -> Option<bool> {
        let high = self.pin.is_high().ok()?;
        Some(high != self.machine.config.active_low)
    }

    /// Sample the line and advance the machine.
    pub fn poll(&mut self, now: Instant) -> Option<ButtonEvent> {
        let Some(pressed) = self.is_pressed() else {
            log!("[button {}] gpio read failed", self.machine.config.channel);
            return None;
        };
        self.machine.poll(now, pressed)
    }
}

/// Button runner.
///
/// Sleeps on `notifier` while idle; once woken it disables the edge interrupt
/// and polls every `poll_interval_ms` until the machine is idle again.
pub async fn run_button<P, const SIZE: usize>(
    mut button: ButtonInput<P>,
    notifier: &Notifier,
    events: QueueSender<'_, InputEvent, SIZE>,
) where
    P: InputPin + Interruptible,
{
    let poll_interval = Duration::from_millis(button.machine.config.poll_interval_ms);
    loop {
        button.pin.set_listening(true);
        // An edge that arrived while the interrupt was masked is caught here
        if button.is_pressed() != Some(true) {
            notifier.wait().await;
        }
        button.pin.set_listening(false);

        loop {
            if let Some(event) = button.poll(Instant::now()) {
                offer(events, InputEvent::Button(event), "button");
            }
            if button.machine.is_idle() {
                break;
            }
            Timer::after(poll_interval).await;
        }
        notifier.reset();
    }
}
