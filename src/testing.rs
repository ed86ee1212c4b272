//! Recording doubles for the platform traits.

use std::{path::Path, path::PathBuf, sync::Arc};

use parking_lot::Mutex;

use crate::{
    alarm::AlarmEffects,
    location::{LocationFix, LocationRequestConfig},
    notification::{Notification, TapTarget},
    platform::{
        AppLauncher, AudioPlayer, FixCallback, LocationSource, NotificationPresenter,
        PlatformError, PlatformResult, ServiceHost, Vibrator, VolumeControl,
    },
};

#[derive(Default)]
pub struct SourceState {
    pub requests: Vec<LocationRequestConfig>,
    pub callback: Option<FixCallback>,
    pub deny_permission: bool,
    pub deny_unsubscribe: bool,
    pub last_known: Option<LocationFix>,
    pub unsubscribes: usize,
}

impl SourceState {
    pub fn emit(&self, fix: LocationFix) {
        if let Some(callback) = &self.callback {
            callback(fix);
        }
    }

    pub const fn subscribed(&self) -> bool {
        self.callback.is_some()
    }
}

pub type SourceLog = Arc<Mutex<SourceState>>;

pub struct MockSource(SourceLog);

impl MockSource {
    pub fn new() -> Self {
        Self(Arc::default())
    }

    pub fn log(&self) -> SourceLog {
        self.0.clone()
    }
}

impl LocationSource for MockSource {
    fn subscribe(
        &mut self,
        request: &LocationRequestConfig,
        callback: FixCallback,
    ) -> PlatformResult {
        let mut state = self.0.lock();
        if state.deny_permission {
            return Err(PlatformError::PermissionDenied("location".to_string()));
        }
        state.requests.push(*request);
        state.callback = Some(callback);
        Ok(())
    }

    fn unsubscribe(&mut self) -> PlatformResult {
        let mut state = self.0.lock();
        state.unsubscribes += 1;
        if state.deny_unsubscribe {
            return Err(PlatformError::PermissionDenied("location".to_string()));
        }
        state.callback.take().map(|_| ()).ok_or(PlatformError::NotSubscribed)
    }

    fn last_known(&self) -> PlatformResult<Option<LocationFix>> {
        Ok(self.0.lock().last_known.clone())
    }
}

/// Everything the alarm collaborators have been asked to do.
#[derive(Debug, Default)]
pub struct EffectState {
    /// currently posted
    pub notifications: Vec<Notification>,
    pub cancelled: Vec<i32>,
    pub focus_held: bool,
    pub volume: Option<(f64, bool)>,
    pub restores: usize,
    pub playing: Vec<(i32, PathBuf)>,
    pub vibrating: Option<(Vec<u64>, Option<usize>)>,
    pub fail_audio: bool,
    pub fail_vibration: bool,
}

impl EffectState {
    /// No alarm effect is live.
    pub fn is_quiet(&self) -> bool {
        self.notifications.is_empty()
            && !self.focus_held
            && self.volume.is_none()
            && self.playing.is_empty()
            && self.vibrating.is_none()
    }
}

pub type EffectLog = Arc<Mutex<EffectState>>;

#[derive(Clone)]
pub struct Recorder(pub EffectLog);

impl NotificationPresenter for Recorder {
    fn notify(&mut self, notification: &Notification) -> PlatformResult {
        let mut state = self.0.lock();
        state.notifications.retain(|n| n.id != notification.id);
        state.notifications.push(notification.clone());
        Ok(())
    }

    fn cancel(&mut self, id: i32) {
        let mut state = self.0.lock();
        state.notifications.retain(|n| n.id != id);
        state.cancelled.push(id);
    }
}

impl VolumeControl for Recorder {
    fn request_audio_focus(&mut self) -> PlatformResult {
        self.0.lock().focus_held = true;
        Ok(())
    }

    fn abandon_audio_focus(&mut self) {
        self.0.lock().focus_held = false;
    }

    fn set_volume(&mut self, volume: f64, enforced: bool, _show_system_ui: bool) -> PlatformResult {
        self.0.lock().volume = Some((volume, enforced));
        Ok(())
    }

    fn restore_previous_volume(&mut self, _show_system_ui: bool) {
        let mut state = self.0.lock();
        state.volume = None;
        state.restores += 1;
    }
}

impl Vibrator for Recorder {
    fn start(&mut self, pattern: &[u64], repeat: Option<usize>) -> PlatformResult {
        let mut state = self.0.lock();
        if state.fail_vibration {
            return Err(PlatformError::Unavailable("vibrator".to_string()));
        }
        state.vibrating = Some((pattern.to_vec(), repeat));
        Ok(())
    }

    fn stop(&mut self) {
        self.0.lock().vibrating = None;
    }
}

impl AudioPlayer for Recorder {
    fn play(&mut self, id: i32, sound: &Path, _looping: bool) -> PlatformResult {
        let mut state = self.0.lock();
        if state.fail_audio {
            return Err(PlatformError::Other(format!("can't decode {}", sound.display())));
        }
        state.playing.push((id, sound.to_path_buf()));
        Ok(())
    }

    fn stop(&mut self, id: i32) {
        self.0.lock().playing.retain(|(playing, _)| *playing != id);
    }

    fn release_all(&mut self) {
        self.0.lock().playing.clear();
    }
}

#[derive(Clone)]
pub struct FixedLauncher(pub Option<TapTarget>);

impl AppLauncher for FixedLauncher {
    fn launch_target(&self) -> Option<TapTarget> {
        self.0.clone()
    }
}

pub fn effects() -> (AlarmEffects, EffectLog) {
    let log = EffectLog::default();
    let recorder = Recorder(log.clone());
    (
        AlarmEffects {
            notifier: Box::new(recorder.clone()),
            volume: Box::new(recorder.clone()),
            vibrator: Box::new(recorder.clone()),
            audio: Box::new(recorder),
            launcher: Box::new(FixedLauncher(Some(TapTarget::new("app.MainActivity")))),
        },
        log,
    )
}

#[derive(Debug, Default)]
pub struct HostState {
    pub foreground: Option<Notification>,
    pub foreground_starts: usize,
    pub stopped_foreground: bool,
    pub stopped_self: bool,
}

pub type HostLog = Arc<Mutex<HostState>>;

pub struct MockHost(pub HostLog);

impl ServiceHost for MockHost {
    fn start_foreground(&mut self, notification: &Notification) -> PlatformResult {
        let mut state = self.0.lock();
        state.foreground = Some(notification.clone());
        state.foreground_starts += 1;
        Ok(())
    }

    fn stop_foreground(&mut self, remove_notification: bool) {
        let mut state = self.0.lock();
        state.stopped_foreground = true;
        if remove_notification {
            state.foreground = None;
        }
    }

    fn stop_self(&mut self) {
        self.0.lock().stopped_self = true;
    }
}
