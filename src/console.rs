//! Terminal stand-ins for the notification shade, the vibrator, the app
//! launcher and the process host.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    notification::{Notification, TapTarget},
    platform::{AppLauncher, NotificationPresenter, PlatformResult, ServiceHost, Vibrator},
};

/// Logs notifications and keeps the posted ones around.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier {
    posted: Arc<Mutex<BTreeMap<i32, Notification>>>,
}

impl LoggingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn posted(&self) -> Vec<Notification> {
        self.posted.lock().values().cloned().collect()
    }
}

impl NotificationPresenter for LoggingNotifier {
    fn notify(&mut self, notification: &Notification) -> PlatformResult {
        log::info!(
            "[notification {} on {}] {}: {}",
            notification.id,
            notification.channel.name,
            notification.title,
            notification.body
        );
        for action in &notification.actions {
            log::info!("[notification {}] action `{}`", notification.id, action.label);
        }
        self.posted
            .lock()
            .insert(notification.id, notification.clone());
        Ok(())
    }

    fn cancel(&mut self, id: i32) {
        if self.posted.lock().remove(&id).is_some() {
            log::info!("[notification {id}] cancelled");
        }
    }
}

/// A vibrator that only logs its pattern.
#[derive(Debug, Default)]
pub struct LoggingVibrator {
    vibrating: bool,
}

impl LoggingVibrator {
    #[must_use]
    pub const fn is_vibrating(&self) -> bool {
        self.vibrating
    }
}

impl Vibrator for LoggingVibrator {
    fn start(&mut self, pattern: &[u64], repeat: Option<usize>) -> PlatformResult {
        log::info!("vibrating {pattern:?} (repeat from {repeat:?})");
        self.vibrating = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.vibrating {
            log::info!("vibration stopped");
        }
        self.vibrating = false;
    }
}

/// Always answers with the same launch target.
#[derive(Debug, Clone, Default)]
pub struct StaticLauncher(pub Option<TapTarget>);

impl AppLauncher for StaticLauncher {
    fn launch_target(&self) -> Option<TapTarget> {
        self.0.clone()
    }
}

/// Foreground state of a process that runs the service from a terminal.
#[derive(Debug, Clone, Default)]
pub struct ConsoleHost {
    state: Arc<Mutex<(bool, bool)>>,
}

impl ConsoleHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_foreground(&self) -> bool {
        self.state.lock().0
    }

    /// Whether the service asked to be stopped.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.lock().1
    }
}

impl ServiceHost for ConsoleHost {
    fn start_foreground(&mut self, notification: &Notification) -> PlatformResult {
        log::info!("running in foreground: {}", notification.title);
        self.state.lock().0 = true;
        Ok(())
    }

    fn stop_foreground(&mut self, remove_notification: bool) {
        log::info!("leaving foreground (remove notification: {remove_notification})");
        self.state.lock().0 = false;
    }

    fn stop_self(&mut self) {
        log::info!("service asked to stop");
        self.state.lock().1 = true;
    }
}
