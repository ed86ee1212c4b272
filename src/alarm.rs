use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    communication::{Broadcast, Broadcaster},
    config::ServiceConfig,
    notification::{self, AlarmContent},
    platform::{
        AppLauncher, AudioPlayer, NotificationPresenter, PlatformResult, Vibrator, VolumeControl,
    },
};

/// Off/on millis played while an alarm rings, looping from index 1.
pub const VIBRATION_PATTERN: [u64; 3] = [0, 500, 500];
pub const VIBRATION_REPEAT: usize = 1;

/// Arguments of a start call as they arrive from the application layer.
/// Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmRequest {
    pub id: Option<i32>,
    pub vibrate: Option<bool>,
    pub sound: Option<String>,
    pub volume_enforced: Option<bool>,
    pub volume: Option<f64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub stop_button_text: Option<String>,
    pub stop_service: Option<bool>,
    pub icon: Option<String>,
}

/// A complete start request.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmParams {
    pub id: i32,
    pub vibrate: bool,
    pub sound: PathBuf,
    pub volume_enforced: bool,
    pub volume: f64,
    pub title: String,
    pub body: String,
    pub stop_button_text: String,
    pub stop_service: bool,
    pub icon: Option<String>,
}

impl AlarmRequest {
    /// `None` unless every required field is present.
    #[must_use]
    pub fn validate(self) -> Option<AlarmParams> {
        Some(AlarmParams {
            id: self.id?,
            vibrate: self.vibrate?,
            sound: PathBuf::from(self.sound?),
            volume_enforced: self.volume_enforced?,
            volume: self.volume?,
            title: self.title?,
            body: self.body?,
            stop_button_text: self.stop_button_text?,
            stop_service: self.stop_service.unwrap_or(false),
            icon: self.icon,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Ringing { id: i32 },
}

/// Which side effects of a ringing session are live.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEffects {
    pub notification: bool,
    pub audio_focus: bool,
    pub volume: bool,
    pub audio: bool,
    pub vibration: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSession {
    pub id: i32,
    pub effects: ActiveEffects,
}

/// The collaborators a ringing alarm drives.
pub struct AlarmEffects {
    pub notifier: Box<dyn NotificationPresenter>,
    pub volume: Box<dyn VolumeControl>,
    pub vibrator: Box<dyn Vibrator>,
    pub audio: Box<dyn AudioPlayer>,
    pub launcher: Box<dyn AppLauncher>,
}

/// Idle/Ringing state machine for a single, id addressed alarm.
///
/// Not synchronized, callers serialize access.
pub struct AlarmController {
    config: ServiceConfig,
    effects: AlarmEffects,
    broadcaster: Broadcaster,
    session: Option<AlarmSession>,
}

impl AlarmController {
    #[must_use]
    pub fn new(config: ServiceConfig, effects: AlarmEffects, broadcaster: Broadcaster) -> Self {
        Self {
            config,
            effects,
            broadcaster,
            session: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> AlarmState {
        self.session
            .as_ref()
            .map_or(AlarmState::Idle, |session| AlarmState::Ringing { id: session.id })
    }

    #[must_use]
    pub const fn session(&self) -> Option<&AlarmSession> {
        self.session.as_ref()
    }

    pub fn set_config(&mut self, config: ServiceConfig) {
        self.config = config;
    }

    /// Start ringing. Returns `false` without touching anything when a
    /// required argument is missing, an alarm is already ringing, or one of
    /// the effects fails to start (the others are rolled back).
    pub fn start_alarm(&mut self, request: AlarmRequest) -> bool {
        if request.id.is_none() || self.session.is_some() {
            return false;
        }
        if request.id == Some(0) {
            log::warn!("alarm id 0 is reserved for commands without an alarm");
            return false;
        }
        let Some(params) = request.validate() else {
            log::warn!("alarm start request is missing arguments");
            return false;
        };
        let mut active = ActiveEffects::default();
        match self.activate(&params, &mut active) {
            Ok(()) => {
                log::info!("alarm {} ringing", params.id);
                self.session = Some(AlarmSession {
                    id: params.id,
                    effects: active,
                });
                true
            }
            Err(e) => {
                log::warn!("alarm {} failed to start, rolling back: {e}", params.id);
                self.release(params.id, active);
                false
            }
        }
    }

    fn activate(&mut self, params: &AlarmParams, active: &mut ActiveEffects) -> PlatformResult {
        let launch = self.effects.launcher.launch_target();
        if launch.is_none() {
            log::debug!("no launch target, alarm notification won't open the app");
        }
        let content = AlarmContent {
            title: &params.title,
            body: &params.body,
            stop_button_text: &params.stop_button_text,
            icon: params.icon.as_deref(),
        };
        let alarm_notification = notification::alarm(
            &self.config,
            params.id,
            &content,
            params.stop_service,
            launch,
        );
        self.effects.notifier.notify(&alarm_notification)?;
        active.notification = true;

        self.effects.volume.request_audio_focus()?;
        active.audio_focus = true;
        self.effects
            .volume
            .set_volume(params.volume, params.volume_enforced, true)?;
        active.volume = true;

        self.effects.audio.play(params.id, &params.sound, true)?;
        active.audio = true;

        if params.vibrate {
            self.effects
                .vibrator
                .start(&VIBRATION_PATTERN, Some(VIBRATION_REPEAT))?;
            active.vibration = true;
        }
        Ok(())
    }

    /// Undo whatever `active` says is running.
    fn release(&mut self, id: i32, active: ActiveEffects) {
        if active.notification {
            self.effects.notifier.cancel(id);
        }
        if active.volume {
            self.effects.volume.restore_previous_volume(true);
        }
        if active.audio_focus {
            self.effects.volume.abandon_audio_focus();
        }
        if active.vibration {
            self.effects.vibrator.stop();
        }
        if active.audio {
            self.effects.audio.stop(id);
        }
    }

    /// Stop the alarm ringing under `id` and broadcast that it stopped.
    pub fn stop_alarm(&mut self, id: Option<i32>, stop_service: Option<bool>) -> bool {
        let (Some(id), Some(stop_service)) = (id, stop_service) else {
            return false;
        };
        match &self.session {
            Some(session) if session.id == id => {}
            Some(session) => {
                log::warn!("asked to stop alarm {id} but alarm {} is ringing", session.id);
                return false;
            }
            None => return false,
        }
        let Some(session) = self.session.take() else {
            return false;
        };
        self.release(id, session.effects);
        log::info!("alarm {id} stopped");
        self.broadcaster.publish(&Broadcast::AlarmStopped { id, stop_service });
        true
    }

    /// Release every effect regardless of state, without broadcasting.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("tearing down ringing alarm {}", session.id);
            self.effects.notifier.cancel(session.id);
        }
        self.effects.audio.release_all();
        self.effects.vibrator.stop();
        self.effects.volume.restore_previous_volume(true);
        self.effects.volume.abandon_audio_focus();
    }
}
