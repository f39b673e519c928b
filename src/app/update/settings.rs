//! Settings update handlers
//!
//! Every change goes to the player and is written to disk right away.

use anyhow::{Result, anyhow, bail};

use crate::app::command::Command;
use crate::app::App;
use crate::audio::{EQ_BANDS, EQ_FREQUENCIES, EQ_MAX_DB, EQ_MIN_DB};
use crate::features::EqualizerPreset;

impl App {
    /// Handle settings-related commands
    pub(super) fn handle_settings(&mut self, command: &Command) -> Option<Result<()>> {
        let result = match command {
            Command::Volume(volume) => {
                let volume = volume.clamp(0.0, 100.0);
                self.settings.volume = volume.round() as u8;
                self.player.set_volume(volume);
                Ok(())
            }

            Command::Eq { band, gain_db } => self.set_eq_band(*band, *gain_db),

            Command::Preset(preset) => {
                let playback = &mut self.settings.playback;
                playback.equalizer_preset = *preset;
                self.player.set_eq_gains(playback.effective_eq());
                println!("Equalizer: {}", preset);
                Ok(())
            }

            Command::Normalization(enabled) => {
                self.settings.playback.volume_normalization = *enabled;
                self.player.set_normalization(*enabled);
                Ok(())
            }

            Command::Crossfade { id, enabled } => self.set_track_crossfade(*id, *enabled),

            Command::CrossfadeSecs(secs) => {
                if !secs.is_finite() || *secs <= 0.0 {
                    Err(anyhow!("Crossfade length must be positive"))
                } else {
                    self.settings.playback.crossfade_seconds = *secs as f32;
                    let enabled = self
                        .player
                        .snapshot()
                        .engine
                        .is_some_and(|e| e.crossfade_enabled);
                    self.player.set_crossfade(enabled, *secs);
                    Ok(())
                }
            }

            _ => return None,
        };

        if result.is_ok() {
            self.persist_settings();
        }
        Some(result)
    }

    /// Adjusting one band switches the preset to Custom
    fn set_eq_band(&mut self, band: usize, gain_db: f32) -> Result<()> {
        if band >= EQ_BANDS {
            bail!("Band must be 1 to {}", EQ_BANDS);
        }
        let gain_db = gain_db.clamp(EQ_MIN_DB, EQ_MAX_DB);

        let playback = &mut self.settings.playback;
        let mut values = playback.effective_eq();
        values[band] = gain_db;
        playback.equalizer_values = values;
        playback.equalizer_preset = EqualizerPreset::Custom;

        self.player.set_eq_band(band, gain_db);
        println!("{} Hz: {:+.1} dB", EQ_FREQUENCIES[band], gain_db);
        Ok(())
    }

    fn set_track_crossfade(&mut self, id: u64, enabled: bool) -> Result<()> {
        let track = self
            .library
            .set_crossfade(id, enabled)
            .ok_or_else(|| anyhow!("No track with id {}", id))?;
        self.settings.playback.set_crossfade(&track.path, enabled);
        self.player.set_track_crossfade(id, enabled);
        Ok(())
    }
}
