//! Quadrature rotary encoder
//!
//! Decoding uses a transition table indexed by `(state, pin sample)`, where
//! the sample is `(b << 1) | a`. The low three bits of an entry are the next
//! state, the upper bits flag a completed clockwise or counter-clockwise
//! pulse. Invalid or bouncing sequences fall back to the start row without
//! emitting anything.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;

use super::{InputEvent, Interruptible};
use crate::channel::{Notifier, QueueSender, offer};
use crate::error::InitError;
use crate::logging::log;
use crate::math8::{elapsed_ms, map_range};

const DIR_CW: u8 = 0x10;
const DIR_CCW: u8 = 0x20;
const STATE_MASK: u8 = 0x07;

// Full step: one pulse per detent (11 -> 01 -> 00 -> 10 -> 11 clockwise)
const F_START: u8 = 0x0;
const F_CW_FINAL: u8 = 0x1;
const F_CW_BEGIN: u8 = 0x2;
const F_CW_NEXT: u8 = 0x3;
const F_CCW_BEGIN: u8 = 0x4;
const F_CCW_FINAL: u8 = 0x5;
const F_CCW_NEXT: u8 = 0x6;

static FULL_STEP_TABLE: [[u8; 4]; 8] = [
    // F_START
    [F_START, F_CW_BEGIN, F_CCW_BEGIN, F_START],
    // F_CW_FINAL
    [F_CW_NEXT, F_START, F_CW_FINAL, F_START | DIR_CW],
    // F_CW_BEGIN
    [F_CW_NEXT, F_CW_BEGIN, F_START, F_START],
    // F_CW_NEXT
    [F_CW_NEXT, F_CW_BEGIN, F_CW_FINAL, F_START],
    // F_CCW_BEGIN
    [F_CCW_NEXT, F_START, F_CCW_BEGIN, F_START],
    // F_CCW_FINAL
    [F_CCW_NEXT, F_CCW_FINAL, F_START, F_START | DIR_CCW],
    // F_CCW_NEXT
    [F_CCW_NEXT, F_CCW_FINAL, F_CCW_BEGIN, F_START],
    // unused
    [F_START, F_START, F_START, F_START],
];

// Half step: one pulse at 00 and one at 11
const H_START: u8 = 0x0;
const H_CCW_BEGIN: u8 = 0x1;
const H_CW_BEGIN: u8 = 0x2;
const H_START_M: u8 = 0x3;
const H_CW_BEGIN_M: u8 = 0x4;
const H_CCW_BEGIN_M: u8 = 0x5;

static HALF_STEP_TABLE: [[u8; 4]; 8] = [
    // H_START
    [H_START_M, H_CW_BEGIN, H_CCW_BEGIN, H_START],
    // H_CCW_BEGIN
    [H_START_M | DIR_CCW, H_START, H_CCW_BEGIN, H_START],
    // H_CW_BEGIN
    [H_START_M | DIR_CW, H_CW_BEGIN, H_START, H_START],
    // H_START_M
    [H_START_M, H_CCW_BEGIN_M, H_CW_BEGIN_M, H_START],
    // H_CW_BEGIN_M
    [H_START_M, H_START_M, H_CW_BEGIN_M, H_START | DIR_CW],
    // H_CCW_BEGIN_M
    [H_START_M, H_CCW_BEGIN_M, H_START_M, H_START | DIR_CCW],
    // unused
    [H_START, H_START, H_START, H_START],
    [H_START, H_START, H_START, H_START],
];

/// Pulses per detent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Full,
    Half,
}

/// Rotation direction of a completed pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    const fn sign(self) -> i16 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// Event emitted by an encoder: signed steps for one completed pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderEvent {
    pub steps: i16,
    pub channel: u8,
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub channel: u8,
    pub step_mode: StepMode,
    /// Swap rotation direction
    pub invert: bool,
    pub acceleration: bool,
    /// Pulses closer together than this are accelerated
    pub acceleration_gap_ms: u64,
    pub max_multiplier: u8,
    pub poll_interval_ms: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            step_mode: StepMode::Full,
            invert: false,
            acceleration: true,
            acceleration_gap_ms: 50,
            max_multiplier: 5,
            poll_interval_ms: 1,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), InitError> {
        if self.max_multiplier == 0 {
            return Err(InitError::InvalidConfig("encoder multiplier must be non-zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(InitError::InvalidConfig("encoder poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Table-driven quadrature decoder
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    mode: StepMode,
    state: u8,
}

impl QuadratureDecoder {
    pub const fn new(mode: StepMode) -> Self {
        Self { mode, state: 0 }
    }

    fn table(&self) -> &'static [[u8; 4]; 8] {
        match self.mode {
            StepMode::Full => &FULL_STEP_TABLE,
            StepMode::Half => &HALF_STEP_TABLE,
        }
    }

    /// Feed one 2-bit pin sample `(b << 1) | a`
    pub fn update(&mut self, sample: u8) -> Option<Direction> {
        let row = usize::from(self.state & STATE_MASK);
        let entry = self.table()[row][usize::from(sample & 0b11)];
        self.state = entry & STATE_MASK;
        match entry & (DIR_CW | DIR_CCW) {
            DIR_CW => Some(Direction::Clockwise),
            DIR_CCW => Some(Direction::CounterClockwise),
            _ => None,
        }
    }

    /// Decoder sits on a detent
    pub fn is_at_rest(&self) -> bool {
        match self.mode {
            StepMode::Full => self.state == F_START,
            StepMode::Half => self.state == H_START || self.state == H_START_M,
        }
    }
}

/// Speed-dependent step multiplier
#[derive(Debug, Clone)]
pub struct Accelerator {
    enabled: bool,
    gap_ms: u64,
    max_multiplier: u8,
    last_pulse: Option<Instant>,
}

impl Accelerator {
    pub const fn new(enabled: bool, gap_ms: u64, max_multiplier: u8) -> Self {
        Self {
            enabled,
            gap_ms,
            max_multiplier,
            last_pulse: None,
        }
    }

    /// Multiplier for a pulse completed at `now`.
    ///
    /// `gap - interval` is mapped linearly onto `[1, max_multiplier]`; slow
    /// rotation (interval >= gap) and the first pulse always yield 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn multiplier(&mut self, now: Instant) -> u8 {
        let previous = self.last_pulse.replace(now);
        if !self.enabled || self.max_multiplier <= 1 {
            return 1;
        }
        let Some(previous) = previous else {
            return 1;
        };
        let interval = elapsed_ms(now, previous);
        if interval >= self.gap_ms {
            return 1;
        }
        let gap = i32::try_from(self.gap_ms).unwrap_or(i32::MAX);
        let speed = gap - interval as i32;
        map_range(speed, 0, gap, 1, i32::from(self.max_multiplier)) as u8
    }
}

/// Pure encoder machine: decoder plus acceleration
#[derive(Debug, Clone)]
pub struct EncoderMachine {
    decoder: QuadratureDecoder,
    accelerator: Accelerator,
    invert: bool,
    channel: u8,
}

impl EncoderMachine {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            decoder: QuadratureDecoder::new(config.step_mode),
            accelerator: Accelerator::new(
                config.acceleration,
                config.acceleration_gap_ms,
                config.max_multiplier,
            ),
            invert: config.invert,
            channel: config.channel,
        }
    }

    /// Feed the two channel levels sampled at `now`.
    pub fn sample(&mut self, now: Instant, a: bool, b: bool) -> Option<EncoderEvent> {
        let sample = (u8::from(b) << 1) | u8::from(a);
        let direction = self.decoder.update(sample)?;
        let multiplier = i16::from(self.accelerator.multiplier(now));
        let sign = if self.invert {
            -direction.sign()
        } else {
            direction.sign()
        };
        Some(EncoderEvent {
            steps: sign * multiplier,
            channel: self.channel,
        })
    }

    pub fn is_at_rest(&self) -> bool {
        self.decoder.is_at_rest()
    }
}

/// Encoder bound to two GPIO lines
pub struct EncoderInput<A, B> {
    pin_a: A,
    pin_b: B,
    machine: EncoderMachine,
    poll_interval: Duration,
}

impl<A, B> EncoderInput<A, B>
where
    A: InputPin + Interruptible,
    B: InputPin + Interruptible,
{
    pub fn new(mut pin_a: A, mut pin_b: B, config: &EncoderConfig) -> Result<Self, InitError> {
        config.validate()?;
        pin_a.is_high().map_err(|_| InitError::Gpio)?;
        pin_b.is_high().map_err(|_| InitError::Gpio)?;
        Ok(Self {
            pin_a,
            pin_b,
            machine: EncoderMachine::new(config),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// Sample both lines and advance the decoder.
    pub fn poll(&mut self, now: Instant) -> Option<EncoderEvent> {
        let (Ok(a), Ok(b)) = (self.pin_a.is_high(), self.pin_b.is_high()) else {
            log!("[encoder {}] gpio read failed", self.machine.channel);
            return None;
        };
        self.machine.sample(now, a, b)
    }

    /// Re-enable edge interrupts, then sample once.
    ///
    /// Movement that happened while interrupts were masked shows up here
    /// as a decoder that is no longer at rest.
    pub fn arm(&mut self, now: Instant) -> Option<EncoderEvent> {
        self.set_listening(true);
        self.poll(now)
    }

    pub fn is_at_rest(&self) -> bool {
        self.machine.is_at_rest()
    }

    fn set_listening(&mut self, enabled: bool) {
        self.pin_a.set_listening(enabled);
        self.pin_b.set_listening(enabled);
    }
}

/// Encoder runner: wakes on any edge and samples until the decoder rests.
pub async fn run_encoder<A, B, const SIZE: usize>(
    mut encoder: EncoderInput<A, B>,
    notifier: &Notifier,
    events: QueueSender<'_, InputEvent, SIZE>,
) where
    A: InputPin + Interruptible,
    B: InputPin + Interruptible,
{
    loop {
        notifier.reset();
        if let Some(event) = encoder.arm(Instant::now()) {
            offer(events, InputEvent::Encoder(event), "encoder");
        }
        if encoder.is_at_rest() {
            notifier.wait().await;
        }
        encoder.set_listening(false);

        loop {
            if let Some(event) = encoder.poll(Instant::now()) {
                offer(events, InputEvent::Encoder(event), "encoder");
            }
            if encoder.is_at_rest() {
                break;
            }
            Timer::after(encoder.poll_interval).await;
        }
    }
}
