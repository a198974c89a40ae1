//! Rainbow cycling effect
//!
//! The hue advances with time and spreads along the strip by `density` hue
//! units per pixel.

use super::{Effect, EffectDescriptor, ParamSpec, RenderContext};
use crate::color::{ColorMode, Hsv, Pixel};

const PARAMS: [ParamSpec; 2] = [
    ParamSpec::new("speed", 1, 20, 1, 5),
    ParamSpec::new("density", 0, 32, 1, 4),
];

/// Hue units per second at speed 1
const HUE_PER_SECOND: u64 = 16;

#[derive(Debug, Clone, Default)]
pub struct RainbowEffect;

impl Effect for RainbowEffect {
    const DESCRIPTOR: EffectDescriptor = EffectDescriptor {
        name: "rainbow",
        color_mode: ColorMode::Hsv,
        dynamic: true,
        params: &PARAMS,
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]) {
        let speed = ctx.param(0, &PARAMS[0]).max(0) as u64;
        let density = ctx.param(1, &PARAMS[1]).max(0) as u8;
        let base_hue = (ctx.now.as_millis() * speed * HUE_PER_SECOND / 1000) as u8;

        let mut hue = base_hue;
        for led in leds {
            *led = Pixel::from_hsv(Hsv {
                hue,
                sat: 255,
                val: 255,
            });
            hue = hue.wrapping_add(density);
        }
    }
}
