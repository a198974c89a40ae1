//! Feedback blink overlay
//!
//! A feedback is a short sequence of colored blinks. Each repetition is one
//! [`FEEDBACK_CYCLE_MS`] cycle: lit for the first half, dark for the second.
//! While a feedback runs it owns the whole strip.

use embassy_time::Instant;

use crate::color::{Rgb, rgb_from_u32};
use crate::command::LedCommandKind;
use crate::math8::elapsed_ms;

pub const FEEDBACK_CYCLE_MS: u64 = 400;
const FEEDBACK_ON_MS: u64 = FEEDBACK_CYCLE_MS / 2;

const COLOR_GREEN: u32 = 0x00_FF_00;
const COLOR_RED: u32 = 0xFF_00_00;
const COLOR_WHITE: u32 = 0xFF_FF_FF;
const COLOR_BLUE: u32 = 0x00_00_FF;
const COLOR_YELLOW: u32 = 0xFF_C8_00;
const COLOR_MAGENTA: u32 = 0xFF_00_FF;
const COLOR_CYAN: u32 = 0x00_FF_FF;
const COLOR_PURPLE: u32 = 0x80_00_FF;

/// Visual acknowledgement of a user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Confirm,
    Cancel,
    Limit,
    Error,
    EffectColor,
    SetupColor,
    SystemColor,
    Param,
    Sync,
}

impl Feedback {
    pub const fn from_command(kind: LedCommandKind) -> Option<Self> {
        Some(match kind {
            LedCommandKind::FeedbackConfirm => Self::Confirm,
            LedCommandKind::FeedbackCancel => Self::Cancel,
            LedCommandKind::FeedbackLimit => Self::Limit,
            LedCommandKind::FeedbackError => Self::Error,
            LedCommandKind::FeedbackEffectColor => Self::EffectColor,
            LedCommandKind::FeedbackSetupColor => Self::SetupColor,
            LedCommandKind::FeedbackSystemColor => Self::SystemColor,
            LedCommandKind::FeedbackParam => Self::Param,
            LedCommandKind::FeedbackSync => Self::Sync,
            _ => return None,
        })
    }

    pub const fn color(self) -> Rgb {
        rgb_from_u32(match self {
            Self::Confirm => COLOR_GREEN,
            Self::Cancel | Self::Error => COLOR_RED,
            Self::Limit => COLOR_WHITE,
            Self::EffectColor => COLOR_BLUE,
            Self::SetupColor => COLOR_YELLOW,
            Self::SystemColor => COLOR_MAGENTA,
            Self::Param => COLOR_CYAN,
            Self::Sync => COLOR_PURPLE,
        })
    }

    pub const fn repetitions(self) -> u8 {
        match self {
            Self::Error | Self::SystemColor | Self::Sync => 2,
            _ => 1,
        }
    }

    pub const fn duration_ms(self) -> u64 {
        self.repetitions() as u64 * FEEDBACK_CYCLE_MS
    }
}

/// A feedback started at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRun {
    pub feedback: Feedback,
    pub started: Instant,
}

impl FeedbackRun {
    pub const fn new(feedback: Feedback, started: Instant) -> Self {
        Self { feedback, started }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        elapsed_ms(now, self.started) < self.feedback.duration_ms()
    }

    /// Color to show at `now`, `None` in the dark half of a cycle or once
    /// the run is over.
    pub fn color_at(&self, now: Instant) -> Option<Rgb> {
        let elapsed = elapsed_ms(now, self.started);
        if elapsed >= self.feedback.duration_ms() {
            return None;
        }
        (elapsed % FEEDBACK_CYCLE_MS < FEEDBACK_ON_MS).then(|| self.feedback.color())
    }
}
