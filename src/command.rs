//! LED commands
//!
//! One-way messages from the mode machine (or a wireless peer) to the
//! command processor. They are never read back.

use embassy_time::Instant;

use crate::channel::{Queue, QueueReceiver, QueueSender};

const KIND_TURN_ON: u8 = 0;
const KIND_TURN_OFF: u8 = 1;
const KIND_SET_BRIGHTNESS: u8 = 2;
const KIND_ADJUST_BRIGHTNESS: u8 = 3;
const KIND_SET_EFFECT: u8 = 4;
const KIND_STEP_EFFECT: u8 = 5;
const KIND_ENTER_EFFECT_SELECT: u8 = 6;
const KIND_ENTER_EFFECT_SETUP: u8 = 7;
const KIND_ENTER_SYSTEM_SETUP: u8 = 8;
const KIND_SET_EFFECT_PARAM: u8 = 9;
const KIND_ADJUST_EFFECT_PARAM: u8 = 10;
const KIND_ADJUST_CALIBRATION: u8 = 11;
const KIND_NEXT_PARAM: u8 = 12;
const KIND_CANCEL_CONFIG: u8 = 13;
const KIND_SAVE_CONFIG: u8 = 14;
const KIND_SYNC_AND_SAVE: u8 = 15;
const KIND_FACTORY_RESET: u8 = 16;
const KIND_SET_MASKED: u8 = 17;
const KIND_SET_SYNC_ENABLED: u8 = 18;
const KIND_FEEDBACK_CONFIRM: u8 = 32;
const KIND_FEEDBACK_CANCEL: u8 = 33;
const KIND_FEEDBACK_LIMIT: u8 = 34;
const KIND_FEEDBACK_ERROR: u8 = 35;
const KIND_FEEDBACK_EFFECT_COLOR: u8 = 36;
const KIND_FEEDBACK_SETUP_COLOR: u8 = 37;
const KIND_FEEDBACK_SYSTEM_COLOR: u8 = 38;
const KIND_FEEDBACK_PARAM: u8 = 39;
const KIND_FEEDBACK_SYNC: u8 = 40;

/// What a command asks the processor to do.
///
/// The discriminants are the wire values used by
/// [`SyncMessage`](crate::sync::SyncMessage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedCommandKind {
    TurnOn = KIND_TURN_ON,
    TurnOff = KIND_TURN_OFF,
    /// `value` is the absolute brightness
    SetBrightness = KIND_SET_BRIGHTNESS,
    /// `value` is a signed step count
    AdjustBrightness = KIND_ADJUST_BRIGHTNESS,
    /// `value` is the effect index
    SetEffect = KIND_SET_EFFECT,
    /// `value` is a signed step count, wrapping over the effect table
    StepEffect = KIND_STEP_EFFECT,
    EnterEffectSelect = KIND_ENTER_EFFECT_SELECT,
    EnterEffectSetup = KIND_ENTER_EFFECT_SETUP,
    EnterSystemSetup = KIND_ENTER_SYSTEM_SETUP,
    /// `param` selects the parameter, `value` is absolute
    SetEffectParam = KIND_SET_EFFECT_PARAM,
    /// Adjust the selected parameter of the active effect by `value` steps
    AdjustEffectParam = KIND_ADJUST_EFFECT_PARAM,
    /// Adjust the selected calibration parameter by `value` steps
    AdjustCalibration = KIND_ADJUST_CALIBRATION,
    /// Select the next parameter of the open setup mode
    NextParam = KIND_NEXT_PARAM,
    CancelConfig = KIND_CANCEL_CONFIG,
    SaveConfig = KIND_SAVE_CONFIG,
    SyncAndSave = KIND_SYNC_AND_SAVE,
    FactoryReset = KIND_FACTORY_RESET,
    /// `value != 0` restricts rendering to the calibrated window
    SetMasked = KIND_SET_MASKED,
    /// `value != 0` enables outbound wireless sync
    SetSyncEnabled = KIND_SET_SYNC_ENABLED,
    FeedbackConfirm = KIND_FEEDBACK_CONFIRM,
    FeedbackCancel = KIND_FEEDBACK_CANCEL,
    FeedbackLimit = KIND_FEEDBACK_LIMIT,
    FeedbackError = KIND_FEEDBACK_ERROR,
    FeedbackEffectColor = KIND_FEEDBACK_EFFECT_COLOR,
    FeedbackSetupColor = KIND_FEEDBACK_SETUP_COLOR,
    FeedbackSystemColor = KIND_FEEDBACK_SYSTEM_COLOR,
    FeedbackParam = KIND_FEEDBACK_PARAM,
    FeedbackSync = KIND_FEEDBACK_SYNC,
}

impl LedCommandKind {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            KIND_TURN_ON => Self::TurnOn,
            KIND_TURN_OFF => Self::TurnOff,
            KIND_SET_BRIGHTNESS => Self::SetBrightness,
            KIND_ADJUST_BRIGHTNESS => Self::AdjustBrightness,
            KIND_SET_EFFECT => Self::SetEffect,
            KIND_STEP_EFFECT => Self::StepEffect,
            KIND_ENTER_EFFECT_SELECT => Self::EnterEffectSelect,
            KIND_ENTER_EFFECT_SETUP => Self::EnterEffectSetup,
            KIND_ENTER_SYSTEM_SETUP => Self::EnterSystemSetup,
            KIND_SET_EFFECT_PARAM => Self::SetEffectParam,
            KIND_ADJUST_EFFECT_PARAM => Self::AdjustEffectParam,
            KIND_ADJUST_CALIBRATION => Self::AdjustCalibration,
            KIND_NEXT_PARAM => Self::NextParam,
            KIND_CANCEL_CONFIG => Self::CancelConfig,
            KIND_SAVE_CONFIG => Self::SaveConfig,
            KIND_SYNC_AND_SAVE => Self::SyncAndSave,
            KIND_FACTORY_RESET => Self::FactoryReset,
            KIND_SET_MASKED => Self::SetMasked,
            KIND_SET_SYNC_ENABLED => Self::SetSyncEnabled,
            KIND_FEEDBACK_CONFIRM => Self::FeedbackConfirm,
            KIND_FEEDBACK_CANCEL => Self::FeedbackCancel,
            KIND_FEEDBACK_LIMIT => Self::FeedbackLimit,
            KIND_FEEDBACK_ERROR => Self::FeedbackError,
            KIND_FEEDBACK_EFFECT_COLOR => Self::FeedbackEffectColor,
            KIND_FEEDBACK_SETUP_COLOR => Self::FeedbackSetupColor,
            KIND_FEEDBACK_SYSTEM_COLOR => Self::FeedbackSystemColor,
            KIND_FEEDBACK_PARAM => Self::FeedbackParam,
            KIND_FEEDBACK_SYNC => Self::FeedbackSync,
            _ => return None,
        })
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Live adjustments that are dropped while a feedback blink is showing.
    ///
    /// Power, transaction and switch commands always apply so the processor
    /// never falls out of step with the mode machine.
    pub const fn is_suppressible(self) -> bool {
        matches!(
            self,
            Self::SetBrightness
                | Self::AdjustBrightness
                | Self::SetEffect
                | Self::StepEffect
                | Self::SetEffectParam
                | Self::AdjustEffectParam
                | Self::AdjustCalibration
                | Self::NextParam
        )
    }

    /// Commands whose resulting state is mirrored to peers
    pub const fn is_syncable(self) -> bool {
        matches!(
            self,
            Self::TurnOn
                | Self::TurnOff
                | Self::SetBrightness
                | Self::AdjustBrightness
                | Self::SetEffect
                | Self::StepEffect
        )
    }
}

/// A single command with its origin time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCommand {
    pub kind: LedCommandKind,
    pub timestamp: Instant,
    pub value: i16,
    pub param: u8,
}

impl LedCommand {
    pub const fn new(kind: LedCommandKind, timestamp: Instant) -> Self {
        Self {
            kind,
            timestamp,
            value: 0,
            param: 0,
        }
    }

    #[must_use]
    pub const fn with_value(mut self, value: i16) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub const fn with_param(mut self, param: u8) -> Self {
        self.param = param;
        self
    }
}

/// Type alias for the LED command queue
pub type CommandQueue<const SIZE: usize> = Queue<LedCommand, SIZE>;

/// Type alias for the command sender
pub type CommandSender<'a, const SIZE: usize> = QueueSender<'a, LedCommand, SIZE>;

/// Type alias for the command receiver
pub type CommandReceiver<'a, const SIZE: usize> = QueueReceiver<'a, LedCommand, SIZE>;
