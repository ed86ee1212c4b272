use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::location::LocationFix;

/// Channel every outbound [`Broadcast`] is published on.
pub const ACTION_BROADCAST: &str = "background_location.broadcast";
pub const EXTRA_LOCATION: &str = "background_location.location";
pub const EXTRA_STOP_ALARM: &str = "background_location.stop_alarm_from_service";
pub const EXTRA_STOP_SERVICE_ON_ALARM: &str = "background_location.stop_service_on_alarm";
pub const EXTRA_STARTED_FROM_NOTIFICATION: &str = "background_location.started_from_notification";

/// Command action that cancels a ringing alarm.
pub const ACTION_STOP_ALARM: &str = "STOP_ALARM";
/// Inbound broadcast action that tears down location updates.
pub const ACTION_STOP_SERVICE: &str = "stop_service";

/// Events published to the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Broadcast {
    Location(LocationFix),
    AlarmStopped { id: i32, stop_service: bool },
}

impl Broadcast {
    /// Name of the extra the payload would travel under.
    #[must_use]
    pub const fn extra(&self) -> &'static str {
        match self {
            Self::Location(_) => EXTRA_LOCATION,
            Self::AlarmStopped { .. } => EXTRA_STOP_ALARM,
        }
    }
}

/// A start command delivered to the service, e.g. from a notification action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCommand {
    /// Alarm id, 0 means "no alarm".
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub stop_service: bool,
    #[serde(default)]
    pub action: Option<String>,
}

impl StartCommand {
    #[must_use]
    pub fn stop_alarm(id: i32, stop_service: bool) -> Self {
        Self {
            id,
            stop_service,
            action: Some(ACTION_STOP_ALARM.to_string()),
        }
    }

    #[must_use]
    pub fn is_stop_alarm(&self) -> bool {
        self.action.as_deref() == Some(ACTION_STOP_ALARM) && self.id != 0
    }
}

/// What the host should do if it kills the service after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Recreate the service later.
    Sticky,
    /// Leave it dead.
    NotSticky,
}

/// Fan-out of [`Broadcast`]s to every subscribed receiver.
///
/// Receivers that were dropped are pruned on the next publish.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<Mutex<Vec<Sender<Broadcast>>>>,
}

impl Broadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> Receiver<Broadcast> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, message: &Broadcast) {
        log::debug!("publishing {} on {ACTION_BROADCAST}", message.extra());
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(message.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
