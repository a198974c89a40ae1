//! Static color fill effect

use super::{Effect, EffectDescriptor, ParamSpec, RenderContext};
use crate::color::{ColorMode, Hsv, Pixel};

const PARAMS: [ParamSpec; 2] = [
    ParamSpec::new("hue", 0, 255, 4, 24).wrapping(),
    ParamSpec::new("saturation", 0, 255, 8, 200),
];

/// Fills the window with one HSV color
#[derive(Debug, Clone, Default)]
pub struct StaticColorEffect;

impl Effect for StaticColorEffect {
    const DESCRIPTOR: EffectDescriptor = EffectDescriptor {
        name: "static",
        color_mode: ColorMode::Hsv,
        dynamic: false,
        params: &PARAMS,
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]) {
        let color = Pixel::from_hsv(Hsv {
            hue: ctx.param(0, &PARAMS[0]) as u8,
            sat: ctx.param(1, &PARAMS[1]) as u8,
            val: 255,
        });
        leds.fill(color);
    }
}
