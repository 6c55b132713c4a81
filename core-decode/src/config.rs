//! # Session Configuration
//!
//! Configuration applied to a decode session at construction.

use crate::traits::{StereoMode, EQ_BANDS};
use serde::{Deserialize, Serialize};

/// Initial output-shaping configuration for a decode session.
///
/// Both settings can also be changed on a live session; this struct only
/// fixes their starting values (and gives hosts a serializable place to
/// keep them).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stereo-reduction policy applied to two-channel streams.
    ///
    /// Default: [`StereoMode::Both`] (decode both channels as-is).
    #[serde(default)]
    pub stereo_mode: StereoMode,

    /// Per-band equalizer gains in decibels, one value per band.
    ///
    /// Must hold exactly 32 values when present. `None` means a flat
    /// (unity) response.
    ///
    /// Default: `None`.
    #[serde(default)]
    pub equalizer_db: Option<Vec<f32>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stereo_mode: StereoMode::default(),
            equalizer_db: None,
        }
    }
}

impl SessionConfig {
    /// Set the stereo-reduction policy.
    pub fn with_stereo_mode(mut self, mode: StereoMode) -> Self {
        self.stereo_mode = mode;
        self
    }

    /// Set the per-band equalizer gains in decibels.
    pub fn with_equalizer_db(mut self, db: Vec<f32>) -> Self {
        self.equalizer_db = Some(db);
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(db) = &self.equalizer_db {
            if db.len() != EQ_BANDS {
                return Err(format!(
                    "equalizer_db must hold exactly {EQ_BANDS} bands, got {}",
                    db.len()
                ));
            }
            if db.iter().any(|v| !v.is_finite()) {
                return Err("equalizer_db gains must be finite".to_string());
            }
        }

        Ok(())
    }
}
