//! Capacitive touch pad
//!
//! A pad counts as touched while its raw reading deviates from the baseline
//! by more than `threshold`. The baseline drifts with temperature and
//! humidity, so it is re-measured periodically by averaging a burst of
//! samples. Recalibration is blocked exactly while a gesture is in progress.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};

use super::{DEFAULT_POLL_INTERVAL_MS, InputEvent};
use crate::channel::{Notifier, QueueSender, offer};
use crate::error::InitError;
use crate::logging::log;
use crate::math8::elapsed_ms;

/// Raw capacitive reading source
pub trait TouchSensor {
    type Error;

    fn read(&mut self) -> Result<u16, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    /// Short touch, emitted on release
    Press,
    /// Touch held past the hold time, repeated while held when configured
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub kind: TouchKind,
    pub pad: u8,
}

#[derive(Debug, Clone)]
pub struct TouchConfig {
    pub pad: u8,
    /// Minimum deviation from the baseline that counts as a touch
    pub threshold: u16,
    pub debounce_ms: u64,
    pub hold_time_ms: u64,
    /// Repeat `Hold` at this interval while touched, `None` for a single hold
    pub hold_repeat_interval_ms: Option<u64>,
    pub recalibration_interval_ms: u64,
    pub calibration_samples: u8,
    pub poll_interval_ms: u64,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            pad: 0,
            threshold: 200,
            debounce_ms: 30,
            hold_time_ms: 800,
            hold_repeat_interval_ms: Some(200),
            recalibration_interval_ms: 10_000,
            calibration_samples: 16,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TouchConfig {
    pub fn validate(&self) -> Result<(), InitError> {
        if self.threshold == 0 {
            return Err(InitError::InvalidConfig("touch threshold must be non-zero"));
        }
        if self.calibration_samples == 0 {
            return Err(InitError::InvalidConfig("touch calibration needs samples"));
        }
        if self.poll_interval_ms == 0 || self.hold_repeat_interval_ms == Some(0) {
            return Err(InitError::InvalidConfig("touch intervals must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gesture {
    pressed_at: Instant,
    last_hold: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchState {
    WaitForPress,
    DebouncePress { since: Instant },
    WaitForReleaseOrHold(Gesture),
    DebounceRelease { since: Instant, gesture: Gesture },
}

/// Pure touch state machine with baseline tracking
#[derive(Debug, Clone)]
pub struct TouchMachine {
    config: TouchConfig,
    state: TouchState,
    baseline: u16,
    last_calibration: Instant,
}

impl TouchMachine {
    pub const fn new(config: TouchConfig, baseline: u16, now: Instant) -> Self {
        Self {
            config,
            state: TouchState::WaitForPress,
            baseline,
            last_calibration: now,
        }
    }

    pub const fn baseline(&self) -> u16 {
        self.baseline
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, TouchState::WaitForPress)
    }

    /// A touch has been seen and not yet fully released
    pub const fn is_gesture_in_progress(&self) -> bool {
        !self.is_idle()
    }

    pub const fn is_recalibration_blocked(&self) -> bool {
        self.is_gesture_in_progress()
    }

    pub fn is_recalibration_due(&self, now: Instant) -> bool {
        !self.is_recalibration_blocked()
            && elapsed_ms(now, self.last_calibration) >= self.config.recalibration_interval_ms
    }

    /// Time left until the next recalibration
    pub fn until_recalibration(&self, now: Instant) -> Duration {
        let elapsed = elapsed_ms(now, self.last_calibration);
        Duration::from_millis(self.config.recalibration_interval_ms.saturating_sub(elapsed))
    }

    /// Replace the baseline with the average of `samples`.
    ///
    /// Refused (returns `false`) mid-gesture or when no sample is given.
    pub fn recalibrate(&mut self, now: Instant, samples: impl IntoIterator<Item = u16>) -> bool {
        if self.is_recalibration_blocked() {
            return false;
        }
        let (sum, count) = samples
            .into_iter()
            .fold((0u32, 0u32), |(sum, count), sample| (sum + u32::from(sample), count + 1));
        if count == 0 {
            return false;
        }
        self.baseline = u16::try_from(sum / count).unwrap_or(u16::MAX);
        self.last_calibration = now;
        true
    }

    fn is_touched(&self, raw: u16) -> bool {
        raw.abs_diff(self.baseline) > self.config.threshold
    }

    /// Advance the machine with a raw reading taken at `now`.
    pub fn poll(&mut self, now: Instant, raw: u16) -> Option<TouchEvent> {
        let touched = self.is_touched(raw);
        let kind = match self.state {
            TouchState::WaitForPress => {
                if touched {
                    self.state = TouchState::DebouncePress { since: now };
                }
                None
            }
            TouchState::DebouncePress { since } => {
                if !touched {
                    self.state = TouchState::WaitForPress;
                } else if elapsed_ms(now, since) >= self.config.debounce_ms {
                    self.state = TouchState::WaitForReleaseOrHold(Gesture {
                        pressed_at: since,
                        last_hold: None,
                    });
                }
                None
            }
            TouchState::WaitForReleaseOrHold(mut gesture) => {
                if touched {
                    let hold = self.check_hold(now, &mut gesture);
                    self.state = TouchState::WaitForReleaseOrHold(gesture);
                    hold
                } else {
                    self.state = TouchState::DebounceRelease {
                        since: now,
                        gesture,
                    };
                    None
                }
            }
            TouchState::DebounceRelease { since, gesture } => {
                if touched {
                    self.state = TouchState::WaitForReleaseOrHold(gesture);
                    None
                } else if elapsed_ms(now, since) >= self.config.debounce_ms {
                    self.state = TouchState::WaitForPress;
                    gesture.last_hold.is_none().then_some(TouchKind::Press)
                } else {
                    None
                }
            }
        };
        kind.map(|kind| TouchEvent {
            kind,
            pad: self.config.pad,
        })
    }

    fn check_hold(&self, now: Instant, gesture: &mut Gesture) -> Option<TouchKind> {
        match (gesture.last_hold, self.config.hold_repeat_interval_ms) {
            (None, _) if elapsed_ms(now, gesture.pressed_at) >= self.config.hold_time_ms => {
                gesture.last_hold = Some(now);
                Some(TouchKind::Hold)
            }
            (Some(last), Some(repeat)) if elapsed_ms(now, last) >= repeat => {
                gesture.last_hold = Some(now);
                Some(TouchKind::Hold)
            }
            _ => None,
        }
    }
}

/// Touch pad bound to a sensor channel
pub struct TouchInput<S> {
    sensor: S,
    machine: TouchMachine,
}

impl<S: TouchSensor> TouchInput<S> {
    /// Take the initial baseline and build the machine.
    pub fn new(mut sensor: S, config: TouchConfig, now: Instant) -> Result<Self, InitError> {
        config.validate()?;
        let baseline = average(&mut sensor, config.calibration_samples).ok_or(InitError::Touch)?;
        Ok(Self {
            sensor,
            machine: TouchMachine::new(config, baseline, now),
        })
    }

    pub const fn machine(&self) -> &TouchMachine {
        &self.machine
    }

    pub fn poll(&mut self, now: Instant) -> Option<TouchEvent> {
        let Ok(raw) = self.sensor.read() else {
            log!("[touch {}] sensor read failed", self.machine.config.pad);
            return None;
        };
        self.machine.poll(now, raw)
    }

    /// Handle a runner wake-up.
    ///
    /// The pad is sampled before anything else so a finger that caused the
    /// wake is never folded into the baseline. Only a timer wake that finds
    /// the pad idle may recalibrate.
    pub fn wake(&mut self, now: Instant, timer: bool) -> Option<TouchEvent> {
        let event = self.poll(now);
        if timer && self.machine.is_idle() {
            self.maybe_recalibrate(now);
        }
        event
    }

    /// Recalibrate when idle and due. Returns `true` if the baseline moved.
    pub fn maybe_recalibrate(&mut self, now: Instant) -> bool {
        if !self.machine.is_recalibration_due(now) {
            return false;
        }
        match average(&mut self.sensor, self.machine.config.calibration_samples) {
            Some(baseline) => self.machine.recalibrate(now, [baseline]),
            None => {
                log!("[touch {}] recalibration failed", self.machine.config.pad);
                // Retry after a full interval instead of spinning on a broken sensor
                self.machine.last_calibration = now;
                false
            }
        }
    }
}

fn average<S: TouchSensor>(sensor: &mut S, samples: u8) -> Option<u16> {
    let mut sum = 0u32;
    for _ in 0..samples {
        sum += u32::from(sensor.read().ok()?);
    }
    u16::try_from(sum / u32::from(samples.max(1))).ok()
}

/// Touch runner.
///
/// While idle it sleeps until either the pad interrupt fires or the next
/// recalibration is due.
pub async fn run_touch<S, const SIZE: usize>(
    mut touch: TouchInput<S>,
    notifier: &Notifier,
    events: QueueSender<'_, InputEvent, SIZE>,
) where
    S: TouchSensor,
{
    let poll_interval = Duration::from_millis(touch.machine.config.poll_interval_ms);
    loop {
        let wait = touch.machine.until_recalibration(Instant::now());
        let woken = select(notifier.wait(), Timer::after(wait)).await;
        let timer = matches!(woken, Either::Second(()));
        if let Some(event) = touch.wake(Instant::now(), timer) {
            offer(events, InputEvent::Touch(event), "touch");
        }

        while !touch.machine.is_idle() {
            Timer::after(poll_interval).await;
            if let Some(event) = touch.poll(Instant::now()) {
                offer(events, InputEvent::Touch(event), "touch");
            }
        }
    }
}
