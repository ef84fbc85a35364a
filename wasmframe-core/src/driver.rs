//! `requestAnimationFrame`-style frame delivery.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::bootstrap::FrameEvent;
use crate::context::FrameContext;
use crate::error::FrameError;

/// Why [`FrameDriver::run`] returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriverStop {
    /// A tick found no pending frame request.
    Idle,
    /// `max_frames` frames were delivered.
    FrameLimit,
}

/// Delivers one frame per tick while the guest keeps requesting them.
#[derive(Clone, Debug)]
pub struct FrameDriver {
    pub interval: Duration,
    pub max_frames: Option<u64>,
}

impl FrameDriver {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            max_frames: None,
        }
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Drive frames until the guest stops asking, the frame limit is hit, or a frame traps.
    ///
    /// Returns the stop reason and the number of frames delivered.
    pub async fn run(&self, ctx: &mut FrameContext) -> Result<(DriverStop, u64), FrameError> {
        let origin = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        // A slow frame delays the next one instead of causing a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut delivered = 0u64;
        loop {
            if self.max_frames.is_some_and(|max| delivered >= max) {
                return Ok((DriverStop::FrameLimit, delivered));
            }

            let tick = ticker.tick().await;
            let handle = ctx.handle_mut().ok_or(FrameError::NotLoaded)?;
            if !handle.take_frame_request() {
                tracing::debug!(delivered, "no frame requested, animation idle");
                return Ok((DriverStop::Idle, delivered));
            }

            let event = FrameEvent::from_elapsed(tick.saturating_duration_since(origin));
            ctx.forward_frame(event).await?;
            delivered += 1;
            if delivered % 600 == 0 {
                tracing::trace!(delivered, "frames delivered");
            }
        }
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(60)
    }
}
