use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};

use crate::bounds::{RenderingBounds, bounded};
use crate::channel::Latest;
use crate::color::{ColorMode, Pixel};
use crate::effect::{EffectSlot, RenderContext};
use crate::frame_scheduler::{DEFAULT_FRAME_DURATION, FrameClock};
use crate::math8::map_range;
use crate::processor::Scene;

/// Configuration for the render loop
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Physical strip length, clipped to the frame capacity
    pub strip_len: u16,
    pub frame_period_ms: u64,
    /// Brightness of feedback blinks, independent of the master brightness
    pub feedback_brightness: u8,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            strip_len: 60,
            frame_period_ms: DEFAULT_FRAME_DURATION.as_millis(),
            feedback_brightness: 96,
        }
    }
}

/// One rendered frame as handed to the output driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame<const N: usize> {
    pub pixels: [Pixel; N],
    /// Number of pixels in use
    pub count: u16,
    pub color_mode: ColorMode,
}

impl<const N: usize> Default for RenderFrame<N> {
    fn default() -> Self {
        Self {
            pixels: [Pixel::BLACK; N],
            count: 0,
            color_mode: ColorMode::Rgb,
        }
    }
}

impl<const N: usize> RenderFrame<N> {
    /// Pixels in use
    pub fn active(&self) -> &[Pixel] {
        &self.pixels[..usize::from(self.count).min(N)]
    }
}

/// Render state machine: owns the effect slot, the eased brightness and the
/// frame buffer
pub struct Renderer<const N: usize> {
    config: RendererConfig,
    scene: Scene,
    slot: EffectSlot,
    /// Master brightness as currently shown, eases towards the scene target
    brightness: u8,
    dirty: bool,
    frame: RenderFrame<N>,
}

impl<const N: usize> Renderer<N> {
    pub fn new(config: RendererConfig, scene: Scene) -> Self {
        Self {
            config,
            slot: scene.effect.to_slot(),
            scene,
            brightness: 0,
            dirty: true,
            frame: RenderFrame::default(),
        }
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    pub const fn frame(&self) -> &RenderFrame<N> {
        &self.frame
    }

    fn strip_len(&self) -> u16 {
        self.config
            .strip_len
            .min(u16::try_from(N).unwrap_or(u16::MAX))
    }

    /// Take a new scene from the processor and mark the frame dirty.
    ///
    /// Switching effects starts the new one from a fresh state.
    pub fn apply_scene(&mut self, scene: Scene) {
        if scene.effect != self.slot.id() {
            self.slot = scene.effect.to_slot();
        }
        self.scene = scene;
        self.dirty = true;
    }

    /// Frame-timer tick: ease the brightness one step, then render.
    ///
    /// Easing is paced by frame ticks only, so a burst of scene updates
    /// never speeds up a fade. It pauses while feedback is showing.
    pub fn tick(&mut self, now: Instant) -> Option<&RenderFrame<N>> {
        let feedback_active = self.scene.feedback.is_some_and(|run| run.is_active(now));
        let target = if self.scene.is_on { self.scene.brightness } else { 0 };
        if !feedback_active && self.brightness != target {
            self.brightness = if self.brightness < target {
                self.brightness + 1
            } else {
                self.brightness - 1
            };
            self.dirty = true;
        }
        self.render(now)
    }

    /// Produce the frame for `now`, or `None` when nothing changed.
    ///
    /// A static effect stops rendering once settled, a dynamic one renders
    /// on every call while the light is visible.
    pub fn render(&mut self, now: Instant) -> Option<&RenderFrame<N>> {
        if let Some(run) = self.scene.feedback.filter(|run| run.is_active(now)) {
            let color = run.color_at(now).map_or(Pixel::BLACK, Pixel::from_rgb);
            self.fill_feedback(color);
            // Repaint the effect once the blink is over
            self.dirty = true;
            return Some(&self.frame);
        }

        let descriptor = self.slot.descriptor();
        if !self.dirty && (!descriptor.dynamic || self.brightness == 0) {
            return None;
        }

        let brightness = self.resolved_brightness();
        let strip_len = self.strip_len();
        let bounds = if self.scene.masked {
            RenderingBounds::window(strip_len, self.scene.start_offset, self.scene.end_offset)
        } else {
            RenderingBounds::full(strip_len)
        };

        let count = usize::from(strip_len);
        self.frame.pixels[..count].fill(Pixel::BLACK);
        if brightness > 0 {
            let ctx = RenderContext {
                params: &self.scene.params,
                brightness,
                now,
            };
            self.slot.render(&ctx, bounded(&mut self.frame.pixels[..count], bounds));
            for pixel in &mut self.frame.pixels[..count] {
                pixel.scale(descriptor.color_mode, brightness);
            }
        }
        self.frame.count = strip_len;
        self.frame.color_mode = descriptor.color_mode;
        self.dirty = false;
        Some(&self.frame)
    }

    /// Non-zero brightness mapped onto `[min_brightness, 255]`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn resolved_brightness(&self) -> u8 {
        if self.brightness == 0 {
            return 0;
        }
        let min = i32::from(self.scene.min_brightness.max(1));
        map_range(i32::from(self.brightness), 1, 255, min, 255) as u8
    }

    fn fill_feedback(&mut self, color: Pixel) {
        let strip_len = self.strip_len();
        let count = usize::from(strip_len);
        for pixel in &mut self.frame.pixels[..count] {
            *pixel = color;
            pixel.scale(ColorMode::Rgb, self.config.feedback_brightness);
        }
        self.frame.count = strip_len;
        self.frame.color_mode = ColorMode::Rgb;
    }
}

/// Render task.
///
/// Wakes on every new scene and otherwise once per frame period so dynamic
/// effects keep animating and fades advance. Frames go to `frames` with overwrite-latest
/// semantics.
pub async fn run_renderer<const N: usize>(
    mut renderer: Renderer<N>,
    scenes: &Latest<Scene>,
    frames: &Latest<RenderFrame<N>>,
) {
    let mut clock = FrameClock::new(Duration::from_millis(renderer.config.frame_period_ms));
    loop {
        let frame = match select(scenes.wait(), Timer::at(clock.next_deadline())).await {
            Either::First(scene) => {
                renderer.apply_scene(scene);
                renderer.render(Instant::now())
            }
            Either::Second(()) => {
                clock.advance(Instant::now());
                renderer.tick(Instant::now())
            }
        };
        if let Some(frame) = frame {
            frames.signal(frame.clone());
        }
    }
}
