use crate::foundation::error::{KinetypeError, KinetypeResult};

/// Stage of a run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Narration audio is produced or probed.
    Narration,
    /// Screens are packed, placed and scheduled.
    Layout,
    /// The compositor renders the timeline.
    Compose,
    /// Run finished.
    Done,
}

impl Phase {
    /// Overall fraction range covered by this phase.
    pub fn band(self) -> (f64, f64) {
        match self {
            Self::Narration => (0.0, 0.10),
            Self::Layout => (0.10, 0.20),
            Self::Compose => (0.20, 1.0),
            Self::Done => (1.0, 1.0),
        }
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narration => "narration",
            Self::Layout => "layout",
            Self::Compose => "compose",
            Self::Done => "done",
        }
    }
}

/// One progress notification.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    /// Phase the update belongs to.
    pub phase: Phase,
    /// Overall completion in `[0, 1]`.
    pub fraction: f64,
    /// Human-readable status.
    pub message: String,
}

impl ProgressUpdate {
    /// Update at `local` completion (`[0, 1]`) of `phase`, mapped into the phase band.
    pub fn within(phase: Phase, local: f64, message: impl Into<String>) -> Self {
        let (lo, hi) = phase.band();
        Self {
            phase,
            fraction: lo + (hi - lo) * local.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Completion as a whole percentage.
    pub fn percent(&self) -> u32 {
        (self.fraction * 100.0).round() as u32
    }
}

/// Observer notified as a run advances.
///
/// Progress is informational only; nothing the engine computes depends on it.
pub trait ProgressSink {
    /// Receive one update.
    fn on_progress(&mut self, update: ProgressUpdate);

    /// Return `true` to request cooperative cancellation.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(ProgressUpdate)> ProgressSink for F {
    fn on_progress(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&mut self, _update: ProgressUpdate) {}
}

/// Sink that logs each update through `tracing`, skipping repeats of the same percentage.
#[derive(Clone, Debug, Default)]
pub struct LogProgress {
    last: Option<(Phase, u32)>,
}

impl ProgressSink for LogProgress {
    fn on_progress(&mut self, update: ProgressUpdate) {
        let key = (update.phase, update.percent());
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);
        tracing::info!(
            phase = update.phase.as_str(),
            percent = key.1,
            "{}",
            update.message
        );
    }
}

/// Fail with [`KinetypeError::Cancelled`] once the sink asks for it.
pub(crate) fn check_cancelled(progress: &dyn ProgressSink) -> KinetypeResult<()> {
    if progress.is_cancelled() {
        tracing::debug!("cancellation requested");
        return Err(KinetypeError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
