//! Persistence seam
//!
//! Two records are kept: the volatile one changes in normal use (power,
//! brightness, active effect), the static one only when a setup mode is
//! committed (calibration and every effect's parameters).

use heapless::Vec;

use crate::calibration::{END_OFFSET, MIN_BRIGHTNESS, START_OFFSET, SystemCalibration};
use crate::effect::{EffectRegistry, MAX_EFFECTS, ParamValues};
use crate::error::StorageError;

pub const DEFAULT_BRIGHTNESS: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolatileState {
    pub is_on: bool,
    pub brightness: u8,
    pub effect_index: u8,
}

impl Default for VolatileState {
    fn default() -> Self {
        Self {
            is_on: false,
            brightness: DEFAULT_BRIGHTNESS,
            effect_index: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticState {
    pub min_brightness: u8,
    pub start_offset: u16,
    pub end_offset: u16,
    /// Parameter values per effect, in registry order
    pub effect_params: Vec<ParamValues, MAX_EFFECTS>,
}

impl StaticState {
    pub fn capture(calibration: &SystemCalibration, registry: &EffectRegistry) -> Self {
        Self {
            min_brightness: calibration.min_brightness(),
            start_offset: calibration.start_offset(),
            end_offset: calibration.end_offset(),
            effect_params: registry.iter().map(|entry| entry.values()).collect(),
        }
    }

    /// Seed live state. Every value goes through the parameter clamp, so a
    /// record from an older build cannot inject out-of-range values.
    pub fn apply(&self, calibration: &mut SystemCalibration, registry: &mut EffectRegistry) {
        calibration.set(MIN_BRIGHTNESS, i16::from(self.min_brightness));
        calibration.set(START_OFFSET, clamp_i16(self.start_offset));
        calibration.set(END_OFFSET, clamp_i16(self.end_offset));
        for (index, values) in self.effect_params.iter().enumerate() {
            let Some(entry) = registry.get_mut(index) else {
                break;
            };
            for (param, value) in entry.params.iter_mut().zip(values.iter()) {
                param.set(*value);
            }
        }
    }
}

fn clamp_i16(value: u16) -> i16 {
    i16::try_from(value).unwrap_or(i16::MAX)
}

/// Non-volatile storage backend (NVS or equivalent)
pub trait Storage {
    fn load_volatile(&mut self) -> Result<VolatileState, StorageError>;

    fn save_volatile(&mut self, state: &VolatileState) -> Result<(), StorageError>;

    fn load_static(&mut self) -> Result<StaticState, StorageError>;

    fn save_static(&mut self, state: &StaticState) -> Result<(), StorageError>;
}

/// RAM-backed storage for boards without flash and for host tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub volatile: Option<VolatileState>,
    pub static_state: Option<StaticState>,
    pub volatile_saves: u32,
    pub static_saves: u32,
}

impl Storage for MemoryStorage {
    fn load_volatile(&mut self) -> Result<VolatileState, StorageError> {
        self.volatile.ok_or(StorageError::NotFound)
    }

    fn save_volatile(&mut self, state: &VolatileState) -> Result<(), StorageError> {
        self.volatile = Some(*state);
        self.volatile_saves += 1;
        Ok(())
    }

    fn load_static(&mut self) -> Result<StaticState, StorageError> {
        self.static_state.clone().ok_or(StorageError::NotFound)
    }

    fn save_static(&mut self, state: &StaticState) -> Result<(), StorageError> {
        self.static_state = Some(state.clone());
        self.static_saves += 1;
        Ok(())
    }
}
