#![no_std]

pub mod bounds;
pub mod calibration;
pub mod channel;
pub mod color;
pub mod command;
pub mod effect;
pub mod error;
pub mod feedback;
pub mod frame_scheduler;
pub mod input;
pub mod integrator;
mod logging;
pub mod math8;
pub mod mode;
pub mod processor;
pub mod renderer;
pub mod storage;
pub mod sync;

pub use calibration::SystemCalibration;
pub use command::{CommandQueue, CommandReceiver, CommandSender, LedCommand, LedCommandKind};
pub use effect::{EffectId, EffectRegistry, EffectSlot};
pub use error::{DecodeError, InitError, StorageError};
pub use feedback::{Feedback, FeedbackRun};
pub use frame_scheduler::{FrameClock, run_output};
pub use input::{InputEvent, InputSource};
pub use integrator::{EventIntegrator, IntegratedEvent, IntegratedQueue, run_integrator};
pub use mode::{DeviceRole, ModeConfig, ModeMachine, SystemMode, run_mode};
pub use processor::{CommandProcessor, Outcome, ProcessorConfig, Scene, run_processor};
pub use renderer::{RenderFrame, Renderer, RendererConfig, run_renderer};
pub use storage::{MemoryStorage, StaticState, Storage, VolatileState};
pub use sync::{SyncMessage, SyncQueue};

pub use color::{ColorMode, Hsv, Pixel, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms. The driver
/// converts HSV frames to RGB and owns color correction and the transport.
pub trait OutputDriver {
    /// Write one frame to the LED strip
    fn write(&mut self, pixels: &[Pixel], mode: ColorMode);
}
