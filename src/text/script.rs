use crate::foundation::error::{KinetypeError, KinetypeResult};

/// One spoken/displayed word with its highlight start time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordUnit {
    /// Word text (non-empty, no whitespace).
    pub text: String,
    /// Position in the whole script; defines reading order.
    pub index: usize,
    /// Absolute time in seconds at which this word lights up.
    pub start_time: f64,
}

/// How per-word durations are derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pacing {
    /// Spread a narration of `total_seconds` evenly over all words.
    Narrated {
        /// Total narration length in seconds.
        total_seconds: f64,
    },
    /// Fixed reading cadence.
    Fixed {
        /// Seconds each word stays "current".
        seconds_per_word: f64,
    },
}

impl Pacing {
    /// Fixed pacing from a reading rate in words per second.
    pub fn silent(words_per_second: f64) -> Self {
        Self::Fixed {
            seconds_per_word: 1.0 / words_per_second,
        }
    }

    /// Resolve the per-word duration for a script of `word_count` words.
    pub fn seconds_per_word(self, word_count: usize) -> KinetypeResult<f64> {
        match self {
            Self::Narrated { total_seconds } => {
                if !total_seconds.is_finite() || total_seconds <= 0.0 {
                    return Err(KinetypeError::invalid_duration(format!(
                        "narration duration must be finite and > 0, got {total_seconds}"
                    )));
                }
                if word_count == 0 {
                    return Err(KinetypeError::invalid_duration(format!(
                        "narration lasts {total_seconds}s but the script has no words"
                    )));
                }
                Ok(total_seconds / word_count as f64)
            }
            Self::Fixed { seconds_per_word } => {
                if !seconds_per_word.is_finite() || seconds_per_word <= 0.0 {
                    return Err(KinetypeError::invalid_duration(format!(
                        "seconds per word must be finite and > 0, got {seconds_per_word}"
                    )));
                }
                Ok(seconds_per_word)
            }
        }
    }
}

/// Ordered word units of a whole script.
#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    /// Words in reading order.
    pub words: Vec<WordUnit>,
    /// Constant step between consecutive start times.
    pub seconds_per_word: f64,
}

impl Script {
    /// Number of words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Total reading time.
    pub fn total_duration(&self) -> f64 {
        self.words.len() as f64 * self.seconds_per_word
    }
}

/// Replace line breaks with spaces and trim the result.
pub fn normalize_script(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim().to_string()
}

/// Split a script into timed word units.
///
/// Emptiness is checked before pacing so a blank script always reports
/// [`KinetypeError::EmptyScript`].
pub fn build_script(raw: &str, pacing: Pacing) -> KinetypeResult<Script> {
    let clean = normalize_script(raw);
    let texts: Vec<&str> = clean.split_whitespace().collect();
    if texts.is_empty() {
        return Err(KinetypeError::EmptyScript);
    }

    let seconds_per_word = pacing.seconds_per_word(texts.len())?;
    let words = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| WordUnit {
            text: text.to_string(),
            index,
            start_time: index as f64 * seconds_per_word,
        })
        .collect();

    Ok(Script {
        words,
        seconds_per_word,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/text/script.rs"]
mod tests;
