use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::{
    alarm::{AlarmController, AlarmEffects, AlarmRequest, AlarmState},
    communication::{Broadcast, Broadcaster, StartCommand, StartMode, ACTION_STOP_SERVICE},
    config::{BindOptions, ServiceConfig},
    location::{LocationController, LocationFix, LocationRequestConfig, ProviderKind},
    notification::{self, FOREGROUND_NOTIFICATION_ID},
    platform::{AppLauncher, LocationSource, NotificationPresenter, Preferences, ServiceHost},
};

/// Everything the service needs from the platform.
pub struct Platform {
    /// result of the one-off check for the primary location provider
    pub primary_available: bool,
    pub primary: Box<dyn LocationSource>,
    pub fallback: Box<dyn LocationSource>,
    pub preferences: Box<dyn Preferences>,
    pub host: Box<dyn ServiceHost>,
    /// posts the foreground status notification
    pub notifier: Box<dyn NotificationPresenter>,
    pub launcher: Box<dyn AppLauncher>,
    pub alarm: AlarmEffects,
}

struct Foreground {
    config: ServiceConfig,
    host: Box<dyn ServiceHost>,
    notifier: Box<dyn NotificationPresenter>,
    launcher: Box<dyn AppLauncher>,
    is_started: bool,
    listening_for_stop: bool,
}

impl Foreground {
    fn update_notification(&mut self) {
        let status = notification::foreground(&self.config, self.launcher.launch_target());
        if self.is_started {
            if let Err(e) = self.notifier.notify(&status) {
                log::warn!("couldn't refresh foreground notification: {e}");
            }
            return;
        }
        match self.host.start_foreground(&status) {
            Ok(()) => self.is_started = true,
            Err(e) => log::warn!("couldn't start foreground service: {e}"),
        }
    }
}

/// Background location and alarm service.
///
/// All entry points take `&self`, the service can be shared behind an `Arc`
/// between the host's command handler and provider callbacks.
pub struct LocationUpdatesService {
    broadcaster: Broadcaster,
    location: Mutex<LocationController>,
    alarms: Mutex<AlarmController>,
    foreground: Mutex<Foreground>,
}

impl LocationUpdatesService {
    /// Set up the service and promote it to the foreground.
    #[must_use]
    pub fn create(config: ServiceConfig, platform: Platform) -> Self {
        let broadcaster = Broadcaster::new();
        let location = LocationController::new(
            platform.primary_available,
            platform.primary,
            platform.fallback,
            platform.preferences,
            broadcaster.clone(),
        );
        let alarms = AlarmController::new(config.clone(), platform.alarm, broadcaster.clone());
        let mut foreground = Foreground {
            config,
            host: platform.host,
            notifier: platform.notifier,
            launcher: platform.launcher,
            is_started: false,
            listening_for_stop: true,
        };
        foreground.update_notification();
        Self {
            broadcaster,
            location: Mutex::new(location),
            alarms: Mutex::new(alarms),
            foreground: Mutex::new(foreground),
        }
    }

    /// Apply the bind options: distance filter and provider choice.
    pub fn bind(&self, options: BindOptions) {
        self.location
            .lock()
            .configure(options.distance_filter, options.force_location_manager);
    }

    #[must_use]
    pub fn subscribe(&self) -> Receiver<Broadcast> {
        self.broadcaster.subscribe()
    }

    pub fn request_location_updates(&self) {
        self.location.lock().start_updates();
    }

    /// Stop updates, leave the foreground and ask the host to stop the service.
    pub fn remove_location_updates(&self) {
        self.location.lock().stop_updates();
        let mut foreground = self.foreground.lock();
        foreground.host.stop_foreground(true);
        foreground.is_started = false;
        foreground.host.stop_self();
    }

    pub fn on_fix_received(&self, fix: LocationFix) {
        self.location.lock().on_fix_received(fix);
    }

    #[must_use]
    pub fn latest_location(&self) -> Option<LocationFix> {
        self.location.lock().latest()
    }

    #[must_use]
    pub fn location_request(&self) -> Option<LocationRequestConfig> {
        self.location.lock().request().copied()
    }

    #[must_use]
    pub fn location_provider(&self) -> Option<ProviderKind> {
        self.location.lock().provider()
    }

    #[must_use]
    pub fn is_requesting_location_updates(&self) -> bool {
        self.location.lock().is_requesting()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.foreground.lock().is_started
    }

    /// Promote to foreground the first time, refresh the notification after that.
    pub fn update_notification(&self) {
        self.foreground.lock().update_notification();
    }

    /// Change the foreground notification text; `None` keeps the current value.
    pub fn set_notification(
        &self,
        title: Option<String>,
        message: Option<String>,
        icon: Option<String>,
    ) {
        let config = {
            let mut foreground = self.foreground.lock();
            let settings = &mut foreground.config.notification;
            if let Some(title) = title {
                settings.title = title;
            }
            if let Some(message) = message {
                settings.message = message;
            }
            if let Some(icon) = icon {
                settings.icon = icon;
            }
            if foreground.is_started {
                foreground.update_notification();
            }
            foreground.config.clone()
        };
        self.alarms.lock().set_config(config);
    }

    pub fn start_alarm(&self, request: AlarmRequest) -> bool {
        self.alarms.lock().start_alarm(request)
    }

    pub fn stop_alarm(&self, id: Option<i32>, stop_service: Option<bool>) -> bool {
        self.alarms.lock().stop_alarm(id, stop_service)
    }

    #[must_use]
    pub fn alarm_state(&self) -> AlarmState {
        self.alarms.lock().state()
    }

    /// A start command from the host. `None` means the host restarted us
    /// without one.
    pub fn handle_command(&self, command: Option<StartCommand>) -> StartMode {
        let Some(command) = command else {
            log::info!("started without a command, stopping");
            self.foreground.lock().host.stop_self();
            return StartMode::NotSticky;
        };
        if command.is_stop_alarm() {
            self.stop_alarm(Some(command.id), Some(command.stop_service));
            return StartMode::NotSticky;
        }
        StartMode::Sticky
    }

    /// An inbound broadcast.
    pub fn on_broadcast(&self, action: &str) {
        let listening = self.foreground.lock().listening_for_stop;
        if listening && action == ACTION_STOP_SERVICE {
            self.remove_location_updates();
        }
    }

    /// Release everything, the host is destroying the service.
    pub fn shutdown(&self) {
        self.alarms.lock().teardown();
        {
            let mut foreground = self.foreground.lock();
            foreground.is_started = false;
            foreground.listening_for_stop = false;
        }
        self.location.lock().stop_updates();
        self.foreground
            .lock()
            .notifier
            .cancel(FOREGROUND_NOTIFICATION_ID);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        store::MemoryPreferences,
        testing::{
            self, EffectLog, FixedLauncher, HostLog, MockHost, MockSource, Recorder, SourceLog,
        },
    };

    struct Harness {
        service: LocationUpdatesService,
        primary: SourceLog,
        fallback: SourceLog,
        host: HostLog,
        status: EffectLog,
        effects: EffectLog,
    }

    fn harness(primary_available: bool) -> Harness {
        let primary = MockSource::new();
        let fallback = MockSource::new();
        let host = HostLog::default();
        let status = EffectLog::default();
        let (alarm, effects) = testing::effects();
        let harness_logs = (primary.log(), fallback.log());
        let service = LocationUpdatesService::create(
            ServiceConfig::default(),
            Platform {
                primary_available,
                primary: Box::new(primary),
                fallback: Box::new(fallback),
                preferences: Box::new(MemoryPreferences::default()),
                host: Box::new(MockHost(host.clone())),
                notifier: Box::new(Recorder(status.clone())),
                launcher: Box::new(FixedLauncher(None)),
                alarm,
            },
        );
        Harness {
            service,
            primary: harness_logs.0,
            fallback: harness_logs.1,
            host,
            status,
            effects,
        }
    }

    fn alarm_request(id: i32) -> AlarmRequest {
        AlarmRequest {
            id: Some(id),
            vibrate: Some(true),
            sound: Some("s.mp3".to_string()),
            volume_enforced: Some(true),
            volume: Some(0.5),
            title: Some("T".to_string()),
            body: Some("B".to_string()),
            stop_button_text: Some("Stop".to_string()),
            stop_service: Some(false),
            icon: None,
        }
    }

    #[test]
    fn create_promotes_once_then_refreshes() {
        let h = harness(true);
        assert!(h.service.is_started());
        assert_eq!(h.host.lock().foreground_starts, 1);
        h.service.update_notification();
        h.service.update_notification();
        assert_eq!(h.host.lock().foreground_starts, 1);
        assert_eq!(h.status.lock().notifications.len(), 1);
        assert_eq!(
            h.status.lock().notifications[0].id,
            FOREGROUND_NOTIFICATION_ID
        );
    }

    #[test]
    fn notification_text_can_change() {
        let h = harness(true);
        h.service
            .set_notification(Some("Tracking".to_string()), None, None);
        let status = h.status.lock();
        assert_eq!(status.notifications[0].title, "Tracking");
        assert_eq!(
            status.notifications[0].body,
            ServiceConfig::default().notification.message
        );
    }

    #[test]
    fn bind_without_primary_uses_fallback() {
        let h = harness(false);
        h.service.bind(BindOptions {
            distance_filter: Some(5.0),
            force_location_manager: false,
        });
        assert_eq!(h.service.location_provider(), Some(ProviderKind::Fallback));
        assert_eq!(h.service.location_request().unwrap().min_displacement, 5.0);
        h.service.request_location_updates();
        assert!(h.primary.lock().requests.is_empty());
        assert_eq!(
            h.fallback.lock().requests,
            vec![LocationRequestConfig::unfiltered()]
        );
        assert!(h.service.is_requesting_location_updates());
    }

    #[test]
    fn fixes_reach_subscribers() {
        let h = harness(true);
        let rx = h.service.subscribe();
        h.service.bind(BindOptions::default());
        h.service.request_location_updates();
        let fix = LocationFix::new(1., 2., Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        h.primary.lock().emit(fix.clone());
        assert_eq!(rx.try_recv().unwrap(), Broadcast::Location(fix.clone()));
        assert_eq!(h.service.latest_location(), Some(fix));
    }

    #[test]
    fn stop_service_broadcast_tears_down_updates() {
        let h = harness(true);
        h.service.bind(BindOptions::default());
        h.service.request_location_updates();
        h.service.on_broadcast("something_else");
        assert!(h.service.is_requesting_location_updates());
        h.service.on_broadcast(ACTION_STOP_SERVICE);
        assert!(!h.service.is_requesting_location_updates());
        assert!(!h.primary.lock().subscribed());
        let host = h.host.lock();
        assert!(host.stopped_foreground && host.stopped_self);
        assert!(host.foreground.is_none());
    }

    #[test]
    fn stop_alarm_command_routes_to_state_machine() {
        let h = harness(true);
        let rx = h.service.subscribe();
        assert!(h.service.start_alarm(alarm_request(7)));
        assert!(!h.service.start_alarm(alarm_request(7)));
        // the stop action on the alarm notification carries the command
        let command = h.effects.lock().notifications[0].actions[0].command.clone();
        assert_eq!(h.service.handle_command(Some(command)), StartMode::NotSticky);
        assert_eq!(h.service.alarm_state(), AlarmState::Idle);
        assert_eq!(
            rx.try_recv().unwrap(),
            Broadcast::AlarmStopped {
                id: 7,
                stop_service: false
            }
        );
    }

    #[test]
    fn commands_without_alarm_are_sticky() {
        let h = harness(true);
        assert_eq!(
            h.service.handle_command(Some(StartCommand::default())),
            StartMode::Sticky
        );
        assert_eq!(
            h.service.handle_command(Some(StartCommand::stop_alarm(0, true))),
            StartMode::Sticky
        );
        assert!(!h.host.lock().stopped_self);
    }

    #[test]
    fn reserved_alarm_id_never_rings() {
        let h = harness(true);
        assert!(!h.service.start_alarm(alarm_request(0)));
        assert_eq!(h.service.alarm_state(), AlarmState::Idle);
        assert!(h.effects.lock().is_quiet());
    }

    #[test]
    fn missing_command_stops_the_service() {
        let h = harness(true);
        assert_eq!(h.service.handle_command(None), StartMode::NotSticky);
        assert!(h.host.lock().stopped_self);
    }

    #[test]
    fn stop_while_idle_emits_nothing() {
        let h = harness(true);
        let rx = h.service.subscribe();
        assert!(!h.service.stop_alarm(Some(99), Some(true)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn shutdown_releases_everything() {
        let h = harness(true);
        let rx = h.service.subscribe();
        h.service.bind(BindOptions::default());
        h.service.request_location_updates();
        assert!(h.service.start_alarm(alarm_request(3)));
        h.service.shutdown();
        assert!(h.effects.lock().is_quiet());
        assert!(!h.service.is_started());
        assert!(!h.service.is_requesting_location_updates());
        assert!(h.status.lock().cancelled.contains(&FOREGROUND_NOTIFICATION_ID));
        assert!(rx.try_recv().is_err());
        // the stop receiver is gone
        h.service.on_broadcast(ACTION_STOP_SERVICE);
        assert!(!h.host.lock().stopped_self);
    }

    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LocationUpdatesService>();
    }
}
