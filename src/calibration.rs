//! System calibration: minimum brightness and strip window offsets

use crate::effect::{Adjustment, ParamSpec, Parameter};

pub const CALIBRATION_PARAM_COUNT: usize = 3;

pub const MIN_BRIGHTNESS: usize = 0;
pub const START_OFFSET: usize = 1;
pub const END_OFFSET: usize = 2;

const SPECS: [ParamSpec; CALIBRATION_PARAM_COUNT] = [
    ParamSpec::new("min_brightness", 0, 128, 1, 1),
    ParamSpec::new("start_offset", 0, 255, 1, 0),
    ParamSpec::new("end_offset", 0, 255, 1, 0),
];

/// Calibration values tuned in system setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCalibration {
    params: [Parameter; CALIBRATION_PARAM_COUNT],
}

impl Default for SystemCalibration {
    fn default() -> Self {
        Self {
            params: SPECS.map(Parameter::new),
        }
    }
}

impl SystemCalibration {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub const fn min_brightness(&self) -> u8 {
        self.params[MIN_BRIGHTNESS].value() as u8
    }

    #[allow(clippy::cast_sign_loss)]
    pub const fn start_offset(&self) -> u16 {
        self.params[START_OFFSET].value() as u16
    }

    #[allow(clippy::cast_sign_loss)]
    pub const fn end_offset(&self) -> u16 {
        self.params[END_OFFSET].value() as u16
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn set(&mut self, index: usize, value: i16) -> Option<Adjustment> {
        Some(self.params.get_mut(index)?.set(value))
    }

    pub fn adjust(&mut self, index: usize, steps: i16) -> Option<Adjustment> {
        Some(self.params.get_mut(index)?.adjust(steps))
    }

    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
    }
}
