use crate::facts::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL_MS: u64 = 100;

const TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {elapsed:>4} {msg}";
const TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {pos}/{len} {elapsed:>4} {msg}";

#[derive(Debug)]
struct DelayedProgressState {
    visible_after: Instant,
    visible: AtomicBool,
}

/// A progress bar on stderr that stays hidden until the run outlasts a delay.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<DelayedProgressState>,
    refresh_task: Arc<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// Must be called from within a Tokio runtime. When `use_colors` is false, the bar is
    /// rendered without ANSI styling.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();

        let template = if use_colors { TEMPLATE } else { TEMPLATE_NO_COLOR };
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("=> "));
        }

        let state = Arc::new(DelayedProgressState {
            visible_after: Instant::now() + delay,
            visible: AtomicBool::new(false),
        });

        Self {
            refresh_task: Arc::new(tokio::spawn(refresh_task(bar.clone(), Arc::clone(&state)))),
            bar,
            state,
        }
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
    }

    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn advance(&self, message: &str) {
        self.bar.set_message(message.to_string());
        self.bar.inc(1);
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.state.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("refresh_task", &"<task>")
            .finish()
    }
}

/// Background task that reveals the bar once the delay has passed.
async fn refresh_task(bar: ProgressBar, state: Arc<DelayedProgressState>) {
    let mut interval = tokio::time::interval(Duration::from_millis(REFRESH_INTERVAL_MS));
    loop {
        let _ = interval.tick().await;

        if Instant::now() >= state.visible_after {
            state.visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
            bar.enable_steady_tick(Duration::from_millis(REFRESH_INTERVAL_MS));
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_reporter_tracks_position() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), false);
        reporter.set_phase("Collecting");
        reporter.set_total(3);
        reporter.advance("owner/one");
        reporter.advance("owner/two");

        assert_eq!(reporter.bar.position(), 2);
        assert_eq!(reporter.bar.length(), Some(3));
        assert_eq!(reporter.bar.message(), "owner/two");
        assert!(!reporter.state.visible.load(Ordering::Relaxed));

        reporter.done();
    }
}
