//! Random twinkling stars
//!
//! Every pixel carries its own brightness level that decays each frame, and
//! new stars light up at random positions. The per-pixel state is rebuilt
//! whenever the window length changes.

use super::{Effect, EffectDescriptor, ParamSpec, RenderContext};
use crate::color::{ColorMode, Hsv, Pixel};

/// Largest window the effect keeps state for; pixels beyond stay dark
pub const MAX_TWINKLE_PIXELS: usize = 512;

const PARAMS: [ParamSpec; 3] = [
    ParamSpec::new("density", 1, 50, 1, 8),
    ParamSpec::new("fade", 1, 32, 1, 8),
    ParamSpec::new("hue", 0, 255, 8, 160).wrapping(),
];

const SEED: u32 = 0x9E37_79B9;

#[derive(Debug, Clone)]
pub struct TwinkleEffect {
    levels: [u8; MAX_TWINKLE_PIXELS],
    pixel_count: usize,
    rng: u32,
}

impl Default for TwinkleEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl TwinkleEffect {
    pub const fn new() -> Self {
        Self {
            levels: [0; MAX_TWINKLE_PIXELS],
            pixel_count: 0,
            rng: SEED,
        }
    }

    /// Number of pixels the current state was built for
    pub const fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn next_random(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }
}

impl Effect for TwinkleEffect {
    const DESCRIPTOR: EffectDescriptor = EffectDescriptor {
        name: "twinkle",
        color_mode: ColorMode::Hsv,
        dynamic: true,
        params: &PARAMS,
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]) {
        let count = leds.len().min(MAX_TWINKLE_PIXELS);
        if count != self.pixel_count {
            self.reset();
            self.pixel_count = count;
        }
        if count == 0 {
            return;
        }

        let density = ctx.param(0, &PARAMS[0]).max(1) as u32;
        let fade = ctx.param(1, &PARAMS[1]).max(1) as u8;
        let hue = ctx.param(2, &PARAMS[2]) as u8;

        for level in &mut self.levels[..count] {
            *level = level.saturating_sub(fade);
        }
        // Roughly `density` new stars per 256 pixels per frame
        let spawns = (count as u32 * density).div_ceil(256);
        for _ in 0..spawns {
            let index = self.next_random() as usize % count;
            self.levels[index] = 255;
        }

        for (led, level) in leds.iter_mut().zip(self.levels[..count].iter()) {
            *led = Pixel::from_hsv(Hsv {
                hue,
                sat: 255,
                val: *level,
            });
        }
        for led in leds.iter_mut().skip(count) {
            *led = Pixel::BLACK;
        }
    }

    fn reset(&mut self) {
        self.levels = [0; MAX_TWINKLE_PIXELS];
        self.pixel_count = 0;
        self.rng = SEED;
    }
}
