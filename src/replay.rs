use std::{
    path::Path,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, Utc};
use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    location::{LocationFix, LocationRequestConfig},
    platform::{FixCallback, LocationSource, PlatformError, PlatformResult},
};

const DEFAULT_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f32,
    pub altitude: Option<f64>,
    pub speed: Option<f32>,
    pub bearing: Option<f32>,
    #[serde(with = "toml_datetime_compat")]
    pub time: DateTime<Utc>,
    /// wall clock wait before this point is reported
    pub delay_ms: Option<u64>,
}

impl From<&TrackPoint> for LocationFix {
    fn from(point: &TrackPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            accuracy: point.accuracy,
            altitude: point.altitude,
            speed: point.speed,
            bearing: point.bearing,
            time: point.time,
        }
    }
}

/// A recorded track, `[[fix]]` tables in toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "fix", default)]
    pub points: Vec<TrackPoint>,
}

impl Track {
    /// # Errors
    /// If the file can't be read or isn't a track.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let track = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&track)?)
    }
}

/// Whether `next` passes the request's interval and displacement filters
/// given the last reported fix.
#[must_use]
pub fn passes_filter(
    request: &LocationRequestConfig,
    last: Option<&LocationFix>,
    next: &LocationFix,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    let elapsed_ms = (next.time - last.time).num_milliseconds();
    if elapsed_ms < i64::try_from(request.fastest_interval_ms).unwrap_or(i64::MAX) {
        return false;
    }
    last.distance_to(next) >= f64::from(request.min_displacement)
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Location source that plays back a [`Track`] from a worker thread.
pub struct ReplaySource {
    name: &'static str,
    track: Arc<Track>,
    last: Arc<Mutex<Option<LocationFix>>>,
    worker: Option<Worker>,
}

impl ReplaySource {
    #[must_use]
    pub fn new(name: &'static str, track: Track) -> Self {
        Self {
            name,
            track: Arc::new(track),
            last: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }
}

impl LocationSource for ReplaySource {
    fn subscribe(
        &mut self,
        request: &LocationRequestConfig,
        callback: FixCallback,
    ) -> PlatformResult {
        if self.worker.is_some() {
            self.unsubscribe()?;
        }
        let (stop, stopped) = crossbeam_channel::bounded(1);
        let (track, last, request) = (self.track.clone(), self.last.clone(), *request);
        let name = self.name;
        let handle = thread::Builder::new()
            .name(format!("{name}-replay"))
            .spawn(move || {
                for point in &track.points {
                    let delay = Duration::from_millis(point.delay_ms.unwrap_or(DEFAULT_DELAY_MS));
                    match stopped.recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                    let fix = LocationFix::from(point);
                    let mut reported = last.lock();
                    if passes_filter(&request, reported.as_ref(), &fix) {
                        *reported = Some(fix.clone());
                        drop(reported);
                        callback(fix);
                    } else {
                        log::trace!("{name}: filtered fix at {}", fix.time);
                    }
                }
                log::info!("{name}: end of track");
            })?;
        log::info!("{}: replaying {} fixes", self.name, self.track.points.len());
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    fn unsubscribe(&mut self) -> PlatformResult {
        let worker = self.worker.take().ok_or(PlatformError::NotSubscribed)?;
        // the worker may already be done with the track
        let _ = worker.stop.send(());
        worker
            .handle
            .join()
            .map_err(|_| PlatformError::Other(format!("{} replay thread panicked", self.name)))
    }

    fn last_known(&self) -> PlatformResult<Option<LocationFix>> {
        Ok(self.last.lock().clone())
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.unsubscribe();
        }
    }
}
