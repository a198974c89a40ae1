//! Frame pacing and the output hand-off.

use embassy_time::{Duration, Instant};

use crate::OutputDriver;
use crate::channel::Latest;
use crate::math8::elapsed_since;
use crate::renderer::RenderFrame;

/// Default frame period (~30 FPS).
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(33);

/// Drift-correcting frame deadline tracker.
///
/// Deadlines advance by exactly one period per frame. If the caller falls
/// behind by more than two periods the backlog is skipped instead of being
/// caught up in a burst.
#[derive(Debug, Clone)]
pub struct FrameClock {
    next_frame: Instant,
    frame_duration: Duration,
}

impl FrameClock {
    pub fn new(frame_duration: Duration) -> Self {
        Self::starting_at(Instant::now(), frame_duration)
    }

    pub fn starting_at(now: Instant, frame_duration: Duration) -> Self {
        Self {
            next_frame: now + frame_duration,
            frame_duration,
        }
    }

    pub const fn next_deadline(&self) -> Instant {
        self.next_frame
    }

    /// Move to the next deadline after a frame at `now`.
    pub fn advance(&mut self, now: Instant) {
        let max_drift = self.frame_duration * 2;
        if now > self.next_frame && elapsed_since(now, self.next_frame) > max_drift {
            self.next_frame = now;
        }
        self.next_frame += self.frame_duration;
    }
}

/// Output task: pushes only the newest frame to the driver.
pub async fn run_output<O: OutputDriver, const N: usize>(
    mut driver: O,
    frames: &Latest<RenderFrame<N>>,
) {
    loop {
        let frame = frames.wait().await;
        driver.write(frame.active(), frame.color_mode);
    }
}
