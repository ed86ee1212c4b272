#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Background location updates and alarm ringing for an embedding application.
//!
//! [`LocationUpdatesService`] owns two independent pieces: a
//! [`LocationController`] that forwards fixes from one of two providers to a
//! broadcast channel, and an [`AlarmController`] that rings a single
//! id-addressed alarm (notification, looping sound, vibration, forced volume).

pub mod alarm;
pub mod communication;
pub mod config;
pub mod location;
pub mod notification;
pub mod platform;
pub mod service;
pub mod store;

/// rodio playback of alarm sounds
pub mod audio;
/// terminal stand-ins for the platform
pub mod console;
pub mod replay;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

pub use alarm::{AlarmController, AlarmRequest, AlarmState};
pub use communication::{Broadcast, StartCommand, StartMode};
pub use config::{BindOptions, ServiceConfig};
pub use location::{LocationController, LocationFix, LocationRequestConfig};
pub use service::{LocationUpdatesService, Platform};
