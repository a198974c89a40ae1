//! Candle flicker
//!
//! A slow sine wobble plus random dips, blended between a deep ember and a
//! warm flame color. The random source is a small xorshift generator owned
//! by the effect.

use super::{Effect, EffectDescriptor, ParamSpec, RenderContext};
use crate::color::{ColorMode, Pixel, blend_colors, rgb_from_u32};
use crate::math8::scale8;

const PARAMS: [ParamSpec; 2] = [
    ParamSpec::new("flicker", 0, 100, 5, 60),
    ParamSpec::new("speed", 1, 10, 1, 4),
];

const EMBER: u32 = 0xFF_30_00;
const FLAME: u32 = 0xFF_A0_28;
const SEED: u32 = 0x2545_F491;

#[derive(Debug, Clone)]
pub struct CandleEffect {
    rng: u32,
}

impl Default for CandleEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleEffect {
    pub const fn new() -> Self {
        Self { rng: SEED }
    }

    fn next_random(&mut self) -> u8 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        #[allow(clippy::cast_possible_truncation)]
        let byte = (x >> 24) as u8;
        byte
    }
}

impl Effect for CandleEffect {
    const DESCRIPTOR: EffectDescriptor = EffectDescriptor {
        name: "candle",
        color_mode: ColorMode::Rgb,
        dynamic: true,
        params: &PARAMS,
    };

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]) {
        let flicker = ctx.param(0, &PARAMS[0]).clamp(0, 100) as u8;
        let speed = ctx.param(1, &PARAMS[1]).max(1);

        let t = (ctx.now.as_millis() % 60_000) as f32 / 1000.0;
        let wobble = libm::sinf(t * f32::from(speed));
        // 160..=255 from the wobble alone
        let base = (208.0 + wobble * 47.0) as u8;
        // flicker percent onto 0..=255
        let depth = (u16::from(flicker) * 255 / 100) as u8;

        let ember = rgb_from_u32(EMBER);
        let flame = rgb_from_u32(FLAME);
        for led in leds {
            let dip = scale8(self.next_random(), depth) / 2;
            let level = base.saturating_sub(dip);
            *led = Pixel::from_rgb(blend_colors(ember, flame, level));
        }
    }

    fn reset(&mut self) {
        self.rng = SEED;
    }
}
