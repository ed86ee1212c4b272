//! Notification descriptions handed to a [`NotificationPresenter`].
//!
//! [`NotificationPresenter`]: crate::platform::NotificationPresenter

use serde::{Deserialize, Serialize};

use crate::{
    communication::{StartCommand, EXTRA_STARTED_FROM_NOTIFICATION},
    config::{Channel, ServiceConfig},
};

/// Id of the foreground status notification.
pub const FOREGROUND_NOTIFICATION_ID: i32 = 12_345_678;

/// Action the tap intent on the foreground notification carries.
pub const ACTION_LOCALISATION: &str = "Localisation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Service,
    Alarm,
}

/// What opening a notification launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapTarget {
    /// component of the embedding application to open
    pub component: String,
    pub action: Option<String>,
    pub extras: Vec<(String, bool)>,
}

impl TapTarget {
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            action: None,
            extras: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    /// delivered back to the service when the action is pressed
    pub command: StartCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i32,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub priority: Priority,
    pub category: Category,
    pub ongoing: bool,
    pub auto_cancel: bool,
    pub silent: bool,
    /// visible on the lock screen
    pub public: bool,
    pub tap: Option<TapTarget>,
    pub full_screen: Option<TapTarget>,
    pub actions: Vec<NotificationAction>,
}

/// The status notification shown while the service runs in the foreground.
#[must_use]
pub fn foreground(config: &ServiceConfig, launch: Option<TapTarget>) -> Notification {
    let tap = launch.map(|mut target| {
        target.action = Some(ACTION_LOCALISATION.to_string());
        target
            .extras
            .push((EXTRA_STARTED_FROM_NOTIFICATION.to_string(), true));
        target
    });
    Notification {
        id: FOREGROUND_NOTIFICATION_ID,
        channel: config.location_channel.clone(),
        title: config.notification.title.clone(),
        body: config.notification.message.clone(),
        icon: config.notification.icon.clone(),
        priority: Priority::High,
        category: Category::Service,
        ongoing: true,
        auto_cancel: false,
        silent: true,
        public: false,
        tap,
        full_screen: None,
        actions: Vec::new(),
    }
}

/// Text shown on an alarm notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmContent<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub stop_button_text: &'a str,
    pub icon: Option<&'a str>,
}

/// A full screen alarm notification with a stop action.
///
/// The stop action routes a [`StartCommand::stop_alarm`] back to the service.
#[must_use]
pub fn alarm(
    config: &ServiceConfig,
    id: i32,
    content: &AlarmContent<'_>,
    stop_service: bool,
    launch: Option<TapTarget>,
) -> Notification {
    Notification {
        id,
        channel: config.alarm_channel.clone(),
        title: content.title.to_string(),
        body: content.body.to_string(),
        icon: content.icon.unwrap_or(&config.alarm_icon).to_string(),
        priority: Priority::Max,
        category: Category::Alarm,
        ongoing: true,
        auto_cancel: true,
        silent: true,
        public: true,
        full_screen: launch.clone(),
        tap: launch,
        actions: vec![NotificationAction {
            label: content.stop_button_text.to_string(),
            command: StartCommand::stop_alarm(id, stop_service),
        }],
    }
}
