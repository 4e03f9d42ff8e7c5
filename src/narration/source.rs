use std::path::{Path, PathBuf};

use crate::foundation::error::{KinetypeError, KinetypeResult};

/// Result of narrating a cleaned script.
#[derive(Clone, Debug, PartialEq)]
pub struct Narration {
    /// Length of the narration in seconds (> 0).
    pub duration_secs: f64,
    /// Audio file to mux into the output video, if any.
    pub audio: Option<PathBuf>,
}

impl Narration {
    /// Validated narration.
    pub fn new(duration_secs: f64, audio: Option<PathBuf>) -> KinetypeResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(KinetypeError::invalid_duration(format!(
                "narration duration must be > 0 (got {duration_secs})"
            )));
        }
        Ok(Self {
            duration_secs,
            audio,
        })
    }
}

/// Provides the audio length the word cadence is derived from.
///
/// Speech synthesis itself happens elsewhere; a source only reports what was produced for the
/// cleaned text it receives.
pub trait NarrationSource {
    /// Narrate `cleaned_text` (already normalized to a single line).
    fn narrate(&self, cleaned_text: &str) -> KinetypeResult<Narration>;
}

/// Narration with a known duration.
#[derive(Clone, Debug)]
pub struct FixedNarration {
    duration_secs: f64,
    audio: Option<PathBuf>,
}

impl FixedNarration {
    /// Narration lasting `duration_secs`, without audio.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            audio: None,
        }
    }

    /// Attach an audio file to mux into the output.
    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }
}

impl NarrationSource for FixedNarration {
    fn narrate(&self, _cleaned_text: &str) -> KinetypeResult<Narration> {
        Narration::new(self.duration_secs, self.audio.clone())
    }
}

/// Narration read from an existing audio file; the duration is probed with `ffprobe`.
#[derive(Clone, Debug)]
pub struct AudioFileNarration {
    path: PathBuf,
}

impl AudioFileNarration {
    /// Narration backed by the audio file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the audio file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NarrationSource for AudioFileNarration {
    #[tracing::instrument(skip(self, _cleaned_text), fields(path = %self.path.display()))]
    fn narrate(&self, _cleaned_text: &str) -> KinetypeResult<Narration> {
        let duration = probe_audio_duration(&self.path)?;
        tracing::debug!(duration, "probed narration audio");
        Narration::new(duration, Some(self.path.clone()))
    }
}

/// Probe the container duration of `path` in seconds through `ffprobe`.
pub fn probe_audio_duration(path: &Path) -> KinetypeResult<f64> {
    if !path.exists() {
        return Err(KinetypeError::validation(format!(
            "narration audio '{}' does not exist",
            path.display()
        )));
    }

    let out = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| anyhow::anyhow!("failed to run ffprobe: {e}"))?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )
        .into());
    }
    parse_probe_duration(&out.stdout)
}

/// Extract `format.duration` from `ffprobe -show_format` JSON output.
pub(crate) fn parse_probe_duration(json: &[u8]) -> KinetypeResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| KinetypeError::serde(format!("ffprobe json parse failed: {e}")))?;
    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| KinetypeError::invalid_duration("ffprobe reported no duration"))?;
    let secs: f64 = raw.trim().parse().map_err(|_| {
        KinetypeError::invalid_duration(format!("ffprobe duration '{raw}' is not a number"))
    })?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(KinetypeError::invalid_duration(format!(
            "narration duration must be > 0 (got {secs})"
        )));
    }
    Ok(secs)
}

#[cfg(test)]
#[path = "../../tests/unit/narration/source.rs"]
mod tests;
