//! Effect system with compile-time known effect variants
//!
//! All effects are stored in an enum to avoid heap allocations. Each effect
//! implements the [`Effect`] trait and declares its color space, whether it
//! animates on its own and which parameters it takes.
//!
//! Parameter values live in the [`EffectRegistry`] owned by the command
//! processor. Animation state lives in the [`EffectSlot`] owned by the
//! renderer and is passed the current values on every call.

mod candle;
mod param;
mod rainbow;
mod static_color;
mod twinkle;

use embassy_time::Instant;
use heapless::Vec;

pub use candle::CandleEffect;
pub use param::{Adjustment, ParamSpec, Parameter};
pub use rainbow::RainbowEffect;
pub use static_color::StaticColorEffect;
pub use twinkle::{MAX_TWINKLE_PIXELS, TwinkleEffect};

use crate::color::{ColorMode, Pixel};

/// Maximum number of parameters per effect
pub const MAX_PARAMS: usize = 4;

/// Maximum number of effects in a registry
pub const MAX_EFFECTS: usize = 8;

/// Static properties of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub name: &'static str,
    /// Color space the effect writes in
    pub color_mode: ColorMode,
    /// Animates without external changes and must be rendered every frame
    pub dynamic: bool,
    pub params: &'static [ParamSpec],
}

/// Inputs of a single render call
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Current values, in descriptor order
    pub params: &'a [i16],
    /// Resolved master brightness of this frame
    pub brightness: u8,
    pub now: Instant,
}

impl RenderContext<'_> {
    /// Value of parameter `index`, falling back to the descriptor default
    pub fn param(&self, index: usize, spec: &ParamSpec) -> i16 {
        self.params.get(index).copied().unwrap_or(spec.default)
    }
}

pub trait Effect {
    const DESCRIPTOR: EffectDescriptor;

    /// Render a single frame into `leds`, the active window of the strip.
    fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]);

    /// Reset effect state
    fn reset(&mut self) {}
}

/// Known effect ids that can be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EffectId {
    Static = 0,
    Rainbow = 1,
    Candle = 2,
    Twinkle = 3,
}

impl EffectId {
    /// Built-in effects in their default table order
    pub const ALL: [Self; 4] = [Self::Static, Self::Rainbow, Self::Candle, Self::Twinkle];

    pub const fn descriptor(self) -> &'static EffectDescriptor {
        match self {
            Self::Static => &StaticColorEffect::DESCRIPTOR,
            Self::Rainbow => &RainbowEffect::DESCRIPTOR,
            Self::Candle => &CandleEffect::DESCRIPTOR,
            Self::Twinkle => &TwinkleEffect::DESCRIPTOR,
        }
    }

    pub fn to_slot(self) -> EffectSlot {
        match self {
            Self::Static => EffectSlot::Static(StaticColorEffect),
            Self::Rainbow => EffectSlot::Rainbow(RainbowEffect),
            Self::Candle => EffectSlot::Candle(CandleEffect::new()),
            Self::Twinkle => EffectSlot::Twinkle(TwinkleEffect::new()),
        }
    }
}

/// Effect slot - enum containing all possible effects
#[derive(Debug, Clone)]
pub enum EffectSlot {
    Static(StaticColorEffect),
    Rainbow(RainbowEffect),
    Candle(CandleEffect),
    Twinkle(TwinkleEffect),
}

impl Default for EffectSlot {
    fn default() -> Self {
        Self::Static(StaticColorEffect)
    }
}

impl EffectSlot {
    /// Render the current effect
    pub fn render(&mut self, ctx: &RenderContext<'_>, leds: &mut [Pixel]) {
        match self {
            Self::Static(effect) => effect.render(ctx, leds),
            Self::Rainbow(effect) => effect.render(ctx, leds),
            Self::Candle(effect) => effect.render(ctx, leds),
            Self::Twinkle(effect) => effect.render(ctx, leds),
        }
    }

    pub fn id(&self) -> EffectId {
        match self {
            Self::Static(_) => EffectId::Static,
            Self::Rainbow(_) => EffectId::Rainbow,
            Self::Candle(_) => EffectId::Candle,
            Self::Twinkle(_) => EffectId::Twinkle,
        }
    }

    pub fn descriptor(&self) -> &'static EffectDescriptor {
        self.id().descriptor()
    }
}

/// Current parameter values of one effect
pub type ParamValues = Vec<i16, MAX_PARAMS>;

/// An effect and its live parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectEntry {
    pub id: EffectId,
    pub params: Vec<Parameter, MAX_PARAMS>,
}

impl EffectEntry {
    pub fn new(id: EffectId) -> Self {
        let params = id
            .descriptor()
            .params
            .iter()
            .take(MAX_PARAMS)
            .map(|spec| Parameter::new(*spec))
            .collect();
        Self { id, params }
    }

    pub fn values(&self) -> ParamValues {
        self.params.iter().map(Parameter::value).collect()
    }

    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
    }
}

/// Effect table, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRegistry {
    entries: Vec<EffectEntry, MAX_EFFECTS>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::from_ids(&EffectId::ALL)
    }
}

impl EffectRegistry {
    /// Build a table in the given order. Entries past [`MAX_EFFECTS`] are ignored.
    pub fn from_ids(ids: &[EffectId]) -> Self {
        Self {
            entries: ids.iter().take(MAX_EFFECTS).map(|id| EffectEntry::new(*id)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EffectEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut EffectEntry> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectEntry> {
        self.entries.iter()
    }

    /// Restore every parameter of every effect to its default
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.reset();
        }
    }
}
