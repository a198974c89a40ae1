//! Color-space tagged pixel storage
//!
//! Effects write either RGB or HSV triples into the same buffer and declare
//! which one they used. The hardware driver converts HSV to RGB on output.

use super::{Hsv, Rgb, hsv2rgb};
use crate::math8::scale8_video;

/// Color space of a frame buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Rgb,
    Hsv,
}

/// Three color channels, interpreted according to a [`ColorMode`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel(pub [u8; 3]);

impl Pixel {
    pub const BLACK: Self = Self([0, 0, 0]);

    pub const fn from_rgb(color: Rgb) -> Self {
        Self([color.r, color.g, color.b])
    }

    pub const fn from_hsv(color: Hsv) -> Self {
        Self([color.hue, color.sat, color.val])
    }

    /// Convert to RGB for output
    pub fn to_rgb(self, mode: ColorMode) -> Rgb {
        let [a, b, c] = self.0;
        match mode {
            ColorMode::Rgb => Rgb { r: a, g: b, b: c },
            ColorMode::Hsv => hsv2rgb(Hsv {
                hue: a,
                sat: b,
                val: c,
            }),
        }
    }

    /// Scale intensity in place: every channel for RGB, value only for HSV.
    pub fn scale(&mut self, mode: ColorMode, brightness: u8) {
        match mode {
            ColorMode::Rgb => {
                for channel in &mut self.0 {
                    *channel = scale8_video(*channel, brightness);
                }
            }
            ColorMode::Hsv => {
                self.0[2] = scale8_video(self.0[2], brightness);
            }
        }
    }
}
