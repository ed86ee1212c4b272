use std::sync::Arc;

use parking_lot::Mutex;

use crate::platform::{PlatformError, PlatformResult, VolumeControl};

#[derive(Debug)]
struct Levels {
    level: f64,
    previous: Option<f64>,
    enforced: bool,
    focus_held: bool,
}

/// Process wide output level shared between the alarm and the audio player.
///
/// Other writers go through [`MasterVolume::set_level`]; while an enforced
/// alarm level is held those writes are overridden.
#[derive(Debug, Clone)]
pub struct MasterVolume {
    levels: Arc<Mutex<Levels>>,
}

impl Default for MasterVolume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MasterVolume {
    #[must_use]
    pub fn new(level: f64) -> Self {
        Self {
            levels: Arc::new(Mutex::new(Levels {
                level: level.clamp(0., 1.),
                previous: None,
                enforced: false,
                focus_held: false,
            })),
        }
    }

    #[must_use]
    pub fn level(&self) -> f64 {
        self.levels.lock().level
    }

    #[must_use]
    pub fn has_focus(&self) -> bool {
        self.levels.lock().focus_held
    }

    /// A write from anyone other than the alarm. Returns the level in effect afterwards.
    pub fn set_level(&self, level: f64) -> f64 {
        let mut levels = self.levels.lock();
        if levels.enforced {
            log::debug!("volume is enforced at {}, ignoring {level}", levels.level);
        } else {
            levels.level = level.clamp(0., 1.);
        }
        levels.level
    }
}

impl VolumeControl for MasterVolume {
    fn request_audio_focus(&mut self) -> PlatformResult {
        let mut levels = self.levels.lock();
        if levels.focus_held {
            return Err(PlatformError::Other("audio focus already held".to_string()));
        }
        levels.focus_held = true;
        Ok(())
    }

    fn abandon_audio_focus(&mut self) {
        self.levels.lock().focus_held = false;
    }

    fn set_volume(&mut self, volume: f64, enforced: bool, show_system_ui: bool) -> PlatformResult {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlatformError::Other(format!("volume {volume} out of range")));
        }
        let mut levels = self.levels.lock();
        if levels.previous.is_none() {
            levels.previous = Some(levels.level);
        }
        levels.level = volume;
        levels.enforced = enforced;
        if show_system_ui {
            log::info!("volume set to {:.0}%", volume * 100.);
        }
        Ok(())
    }

    fn restore_previous_volume(&mut self, show_system_ui: bool) {
        let mut levels = self.levels.lock();
        levels.enforced = false;
        if let Some(previous) = levels.previous.take() {
            levels.level = previous;
            if show_system_ui {
                log::info!("volume restored to {:.0}%", previous * 100.);
            }
        }
    }
}
