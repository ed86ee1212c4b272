//! Traits for everything the service asks of the host platform.
//!
//! The service never talks to a notification manager, a speaker or a GPS
//! receiver directly, it goes through these. Desktop implementations live in
//! [`crate::console`], [`crate::volume`], [`crate::audio`], [`crate::replay`]
//! and [`crate::store`].

use std::path::Path;

use crate::{
    location::{LocationFix, LocationRequestConfig},
    notification::{Notification, TapTarget},
};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not subscribed")]
    NotSubscribed,

    #[error("{0} is unavailable")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type PlatformResult<T = ()> = Result<T, PlatformError>;

/// Callback a location source invokes for every new fix.
pub type FixCallback = Box<dyn Fn(LocationFix) + Send + Sync>;

/// A provider of location fixes.
///
/// Two implementations are chosen between once per service: the primary
/// (fused) provider and the fallback (raw GPS) provider.
pub trait LocationSource: Send {
    /// Begin delivering fixes to `callback`.
    ///
    /// # Errors
    /// [`PlatformError::PermissionDenied`] when location access is not granted.
    fn subscribe(&mut self, request: &LocationRequestConfig, callback: FixCallback)
        -> PlatformResult;

    /// Stop delivering fixes.
    ///
    /// # Errors
    /// [`PlatformError::NotSubscribed`] if there is nothing to stop, callers
    /// are expected to tolerate it.
    fn unsubscribe(&mut self) -> PlatformResult;

    /// Last fix the provider knows about, if any.
    ///
    /// # Errors
    /// [`PlatformError::PermissionDenied`] when location access is not granted.
    fn last_known(&self) -> PlatformResult<Option<LocationFix>>;
}

pub trait NotificationPresenter: Send {
    /// Post or replace the notification with `notification.id`.
    ///
    /// # Errors
    /// Whatever the platform reports when the notification can't be shown.
    fn notify(&mut self, notification: &Notification) -> PlatformResult;

    fn cancel(&mut self, id: i32);
}

/// Device volume and audio focus. Both are global resources, other writers exist.
pub trait VolumeControl: Send {
    /// # Errors
    /// When focus is refused.
    fn request_audio_focus(&mut self) -> PlatformResult;

    fn abandon_audio_focus(&mut self);

    /// Snapshot the current volume then set it to `volume` (0.0..=1.0).
    /// With `enforced` the level is reasserted over external changes until
    /// [`VolumeControl::restore_previous_volume`].
    ///
    /// # Errors
    /// When the level can't be written.
    fn set_volume(&mut self, volume: f64, enforced: bool, show_system_ui: bool) -> PlatformResult;

    fn restore_previous_volume(&mut self, show_system_ui: bool);
}

pub trait Vibrator: Send {
    /// Play `pattern` (alternating off/on millis starting with a delay).
    /// `repeat` is the index to loop back to, `None` plays it once.
    ///
    /// # Errors
    /// When the device has no vibrator.
    fn start(&mut self, pattern: &[u64], repeat: Option<usize>) -> PlatformResult;

    fn stop(&mut self);
}

pub trait AudioPlayer: Send {
    /// Start playing `sound` for alarm `id`, looping forever when `looping`.
    ///
    /// # Errors
    /// When the file can't be opened or decoded, or no output device exists.
    fn play(&mut self, id: i32, sound: &Path, looping: bool) -> PlatformResult;

    /// Stop and release the player for `id`.
    fn stop(&mut self, id: i32);

    /// Release every player.
    fn release_all(&mut self);
}

/// Simple persistent key-value storage.
pub trait Preferences: Send {
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// # Errors
    /// When the backing store can't be written.
    fn set_bool(&mut self, key: &str, value: bool) -> PlatformResult;
}

/// Looks up what tapping a notification should open.
pub trait AppLauncher: Send {
    /// `None` if the embedding application has no launch target.
    fn launch_target(&self) -> Option<TapTarget>;
}

/// The process hosting the service.
pub trait ServiceHost: Send {
    /// Promote the process to a visible foreground service.
    ///
    /// # Errors
    /// When the platform refuses the promotion.
    fn start_foreground(&mut self, notification: &Notification) -> PlatformResult;

    fn stop_foreground(&mut self, remove_notification: bool);

    /// Ask the host to terminate the service.
    fn stop_self(&mut self);
}
