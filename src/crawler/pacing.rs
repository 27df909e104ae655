//! Human-paced delays and simulated page activity

use crate::config::{PacingConfig, Viewport};
use crate::renderer::Renderer;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Pacing {
    config: PacingConfig,
}

impl Pacing {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Random delay between two steps of one page interaction
    pub fn step_delay(&self) -> Duration {
        jitter(self.config.min_delay_ms, self.config.max_delay_ms)
    }

    /// Random delay between two targets of one task
    pub fn target_delay(&self) -> Duration {
        jitter(
            self.config.between_targets_min_ms,
            self.config.between_targets_max_ms,
        )
    }

    pub async fn pause_step(&self) {
        sleep(self.step_delay()).await;
    }

    pub async fn pause_between_targets(&self) {
        sleep(self.target_delay()).await;
    }

    /// Moves the pointer around the viewport and scrolls down and back
    ///
    /// Renderer failures here never fail the fetch; they are logged and dropped.
    pub async fn simulate_activity<R: Renderer + ?Sized>(&self, session: &mut R, viewport: Viewport) {
        if !self.config.simulate_activity {
            return;
        }

        for _ in 0..fastrand::u32(1..=3) {
            let x = fastrand::u32(0..=viewport.width);
            let y = fastrand::u32(0..=viewport.height);
            if let Err(e) = session.move_pointer(x, y).await {
                tracing::debug!("Pointer move to ({}, {}) failed: {}", x, y, e);
            }
            sleep(jitter(100, 300)).await;
        }

        let distance = fastrand::i32(100..=500);
        if let Err(e) = session.scroll_by(distance).await {
            tracing::debug!("Scroll by {} failed: {}", distance, e);
        }
        sleep(jitter(200, 500)).await;
        if let Err(e) = session.scroll_by(-distance).await {
            tracing::debug!("Scroll back by {} failed: {}", distance, e);
        }
        sleep(jitter(100, 300)).await;
    }
}

fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        Duration::from_millis(min_ms)
    } else {
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
