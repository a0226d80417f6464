//! Progress tracking
//!
//! A background task refreshes the elapsed/total text of the active stream on
//! a fixed cadence. Ticks with no active stream do nothing.

use crate::state::{lock, SharedState};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Format `position / length` as `MM:SS / MM:SS`.
///
/// Both values are frame counts at `sample_rate` and are rounded to the nearest
/// second. Minutes are not bounded.
pub fn format_progress(position: usize, length: usize, sample_rate: u32) -> String {
    format!(
        "{} / {}",
        format_clock(round_seconds(position, sample_rate)),
        format_clock(round_seconds(length, sample_rate))
    )
}

fn round_seconds(frames: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (frames as f64 / f64::from(sample_rate)).round() as u64
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Periodic progress refresher.
///
/// The task is aborted when the tracker is dropped.
pub(crate) struct ProgressTracker {
    handle: JoinHandle<()>,
}

impl ProgressTracker {
    /// Spawn the refresh task on the current tokio runtime
    pub fn spawn(state: SharedState, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                lock(&state).refresh_progress();
            }
        });

        Self { handle }
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_progress(65 * 44100, 125 * 44100, 44100), "01:05 / 02:05");
    }

    #[test]
    fn rounds_to_nearest_second() {
        // 1.6s rounds up, 59.4s rounds down
        assert_eq!(
            format_progress(70560, 2_619_540, 44100),
            "00:02 / 00:59"
        );
    }

    #[test]
    fn minutes_are_unbounded() {
        assert_eq!(format_progress(0, 6000 * 48000, 48000), "00:00 / 100:00");
    }

    #[test]
    fn zero_rate_formats_as_zero() {
        assert_eq!(format_progress(1000, 2000, 0), "00:00 / 00:00");
    }
}
