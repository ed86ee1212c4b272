use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    communication::{Broadcast, Broadcaster},
    platform::{FixCallback, LocationSource, PlatformError, Preferences},
    store::KEY_REQUESTING_LOCATION_UPDATES,
};

pub const UPDATE_INTERVAL_IN_MILLISECONDS: u64 = 1000;
pub const FASTEST_UPDATE_INTERVAL_IN_MILLISECONDS: u64 = UPDATE_INTERVAL_IN_MILLISECONDS / 2;

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A single reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// horizontal accuracy in meters
    pub accuracy: f32,
    pub altitude: Option<f64>,
    /// meters per second
    pub speed: Option<f32>,
    /// degrees east of true north
    pub bearing: Option<f32>,
    pub time: DateTime<Utc>,
}

impl LocationFix {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: 0.0,
            altitude: None,
            speed: None,
            bearing: None,
            time,
        }
    }

    /// Great circle distance in meters (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.).sin().powi(2);
        2. * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    HighAccuracy,
}

/// Polling parameters handed to a [`LocationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRequestConfig {
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub priority: Priority,
    /// smallest displacement in meters between two reported fixes
    pub min_displacement: f32,
}

impl LocationRequestConfig {
    /// The request used for the primary provider.
    ///
    /// Negative, NaN and infinite filters become 0, huge ones saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_distance_filter(distance_filter: f64) -> Self {
        let min_displacement = if distance_filter.is_finite() && distance_filter >= 0. {
            distance_filter.min(f64::from(f32::MAX)) as f32
        } else {
            log::warn!("ignoring invalid distance filter {distance_filter}, using 0");
            0.
        };
        Self {
            interval_ms: UPDATE_INTERVAL_IN_MILLISECONDS,
            fastest_interval_ms: FASTEST_UPDATE_INTERVAL_IN_MILLISECONDS,
            priority: Priority::HighAccuracy,
            min_displacement,
        }
    }

    /// The request used for the fallback provider, which gets every fix.
    #[must_use]
    pub const fn unfiltered() -> Self {
        Self {
            interval_ms: 0,
            fastest_interval_ms: 0,
            priority: Priority::HighAccuracy,
            min_displacement: 0.,
        }
    }
}

impl Default for LocationRequestConfig {
    fn default() -> Self {
        Self::with_distance_filter(0.)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// fused provider, used when available
    Primary,
    /// raw GPS provider
    Fallback,
}

/// Where fixes end up: the latest-fix slot and the broadcast channel.
#[derive(Debug, Clone)]
struct FixSink {
    latest: Arc<Mutex<Option<LocationFix>>>,
    broadcaster: Broadcaster,
}

impl FixSink {
    fn on_fix_received(&self, fix: LocationFix) {
        *self.latest.lock() = Some(fix.clone());
        self.broadcaster.publish(&Broadcast::Location(fix));
    }
}

/// Requests fixes from one of two providers and rebroadcasts them.
pub struct LocationController {
    primary_available: bool,
    primary: Box<dyn LocationSource>,
    fallback: Box<dyn LocationSource>,
    selected: Option<ProviderKind>,
    request: Option<LocationRequestConfig>,
    sink: FixSink,
    preferences: Box<dyn Preferences>,
}

impl LocationController {
    /// `primary_available` is the capability check done once at creation.
    ///
    /// The provider that capability check points at is asked for its last
    /// known fix right away.
    #[must_use]
    pub fn new(
        primary_available: bool,
        primary: Box<dyn LocationSource>,
        fallback: Box<dyn LocationSource>,
        preferences: Box<dyn Preferences>,
        broadcaster: Broadcaster,
    ) -> Self {
        let mut controller = Self {
            primary_available,
            primary,
            fallback,
            selected: None,
            request: None,
            sink: FixSink {
                latest: Arc::new(Mutex::new(None)),
                broadcaster,
            },
            preferences,
        };
        controller.seed_last_known();
        controller
    }

    fn seed_last_known(&mut self) {
        let source = if self.primary_available {
            &self.primary
        } else {
            &self.fallback
        };
        match source.last_known() {
            Ok(Some(fix)) => *self.sink.latest.lock() = Some(fix),
            Ok(None) => {}
            Err(e) => log::warn!("couldn't get last known location: {e}"),
        }
    }

    /// Build the request and pick the provider.
    ///
    /// The provider is chosen on the first call and kept afterwards.
    pub fn configure(&mut self, distance_filter: Option<f64>, force_fallback: bool) {
        self.request = Some(LocationRequestConfig::with_distance_filter(
            distance_filter.unwrap_or(0.),
        ));
        let wanted = if self.primary_available && !force_fallback {
            ProviderKind::Primary
        } else {
            ProviderKind::Fallback
        };
        match self.selected {
            None => {
                log::info!("using {wanted:?} location provider");
                self.selected = Some(wanted);
            }
            Some(selected) if selected != wanted => {
                log::warn!("location provider already set to {selected:?}, ignoring {wanted:?}");
            }
            Some(_) => {}
        }
    }

    #[must_use]
    pub const fn request(&self) -> Option<&LocationRequestConfig> {
        self.request.as_ref()
    }

    #[must_use]
    pub const fn provider(&self) -> Option<ProviderKind> {
        self.selected
    }

    #[must_use]
    pub fn latest(&self) -> Option<LocationFix> {
        self.sink.latest.lock().clone()
    }

    #[must_use]
    pub fn is_requesting(&self) -> bool {
        self.preferences
            .get_bool(KEY_REQUESTING_LOCATION_UPDATES)
            .unwrap_or(false)
    }

    fn set_requesting(&mut self, requesting: bool) {
        if let Err(e) = self
            .preferences
            .set_bool(KEY_REQUESTING_LOCATION_UPDATES, requesting)
        {
            log::warn!("couldn't persist {KEY_REQUESTING_LOCATION_UPDATES}={requesting}: {e}");
        }
    }

    /// Subscribe to the selected provider. Failures only reset the persisted flag.
    pub fn start_updates(&mut self) {
        if self.selected.is_none() {
            self.configure(None, false);
        }
        self.set_requesting(true);
        let sink = self.sink.clone();
        let callback: FixCallback = Box::new(move |fix| sink.on_fix_received(fix));
        let result = match self.selected {
            Some(ProviderKind::Primary) => {
                let request = self.request.unwrap_or_default();
                self.primary.subscribe(&request, callback)
            }
            _ => self
                .fallback
                .subscribe(&LocationRequestConfig::unfiltered(), callback),
        };
        if let Err(e) = result {
            log::warn!("couldn't request location updates: {e}");
            self.set_requesting(false);
        }
    }

    /// Entry point for fixes the host receives outside a subscription callback.
    pub fn on_fix_received(&self, fix: LocationFix) {
        self.sink.on_fix_received(fix);
    }

    /// Unsubscribe from whichever provider is active.
    pub fn stop_updates(&mut self) {
        let source = match self.selected {
            Some(ProviderKind::Primary) => &mut self.primary,
            Some(ProviderKind::Fallback) => &mut self.fallback,
            None => {
                self.set_requesting(false);
                return;
            }
        };
        match source.unsubscribe() {
            Ok(()) | Err(PlatformError::NotSubscribed) => self.set_requesting(false),
            Err(e @ PlatformError::PermissionDenied(_)) => {
                log::warn!("couldn't remove location updates: {e}");
                self.set_requesting(true);
            }
            Err(e) => {
                log::warn!("couldn't remove location updates: {e}");
                self.set_requesting(false);
            }
        }
    }
}
