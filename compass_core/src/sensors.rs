//! Device orientation and geolocation adapters.
//!
//! The platform capabilities sit behind [`OrientationSource`] and
//! [`PositionSource`]; samples are delivered into unbounded channels so the
//! session loop can consume them alongside stream events.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Channel end a sensor delivers its samples into.
pub type SampleSink<T> = UnboundedSender<T>;

#[derive(Error, Debug, Clone)]
pub enum SensorError {
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    #[error("no active watch {0:?}")]
    UnknownWatch(WatchHandle),
}

/// Raw device orientation in the device's native convention.
///
/// Any angle is `None` until the sensor reports it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    /// Compass heading, degrees
    pub alpha: Option<f64>,
    /// Front-back tilt, degrees
    pub beta: Option<f64>,
    /// Left-right tilt, degrees
    pub gamma: Option<f64>,
}

impl OrientationSample {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }
}

/// One geolocation fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoSample {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
}

impl GeoSample {
    /// Build a sample from a platform fix, defaulting a missing elevation to 0 m.
    pub fn from_fix(latitude_deg: f64, longitude_deg: f64, elevation_m: Option<f64>) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m: elevation_m.unwrap_or(0.0),
        }
    }
}

/// Identifies one position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(u64);

#[async_trait]
pub trait OrientationSource: Send + Sync {
    /// Run the platform consent flow. Denial is `false`, never an error.
    async fn request_permission(&self) -> bool;

    /// Begin delivering samples into `sink`, replacing any previous sink.
    fn start(&self, sink: SampleSink<OrientationSample>) -> Result<(), SensorError>;

    /// Stop delivering samples. Stopping an idle source is a no-op.
    fn stop(&self) -> Result<(), SensorError>;
}

pub trait PositionSource: Send + Sync {
    /// Deliver a sample into `sink` every time the platform reports a new fix.
    fn watch(&self, sink: SampleSink<GeoSample>) -> Result<WatchHandle, SensorError>;

    fn clear(&self, handle: WatchHandle) -> Result<(), SensorError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type SharedSink<T> = Arc<Mutex<Option<SampleSink<T>>>>;

/// Orientation source fed by platform glue through an [`OrientationFeed`].
pub struct ChannelOrientationSource {
    consent: bool,
    sink: SharedSink<OrientationSample>,
}

/// Producer side of a [`ChannelOrientationSource`].
#[derive(Clone)]
pub struct OrientationFeed {
    sink: SharedSink<OrientationSample>,
}

impl ChannelOrientationSource {
    /// `consent` is what the permission prompt will answer.
    pub fn new(consent: bool) -> (Self, OrientationFeed) {
        let sink: SharedSink<OrientationSample> = Arc::new(Mutex::new(None));
        (
            Self {
                consent,
                sink: sink.clone(),
            },
            OrientationFeed { sink },
        )
    }
}

#[async_trait]
impl OrientationSource for ChannelOrientationSource {
    async fn request_permission(&self) -> bool {
        self.consent
    }

    fn start(&self, sink: SampleSink<OrientationSample>) -> Result<(), SensorError> {
        *lock(&self.sink) = Some(sink);
        debug!("orientation sampling started");
        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        if lock(&self.sink).take().is_some() {
            debug!("orientation sampling stopped");
        }
        Ok(())
    }
}

impl OrientationFeed {
    /// Push one raw reading. Returns whether anyone was sampling.
    pub fn push(&self, sample: OrientationSample) -> bool {
        let mut guard = lock(&self.sink);
        let delivered = match guard.as_ref() {
            Some(sink) => sink.send(sample).is_ok(),
            None => return false,
        };
        if !delivered {
            *guard = None;
        }
        delivered
    }

    pub fn is_active(&self) -> bool {
        lock(&self.sink).is_some()
    }
}

#[derive(Default)]
struct Watchers {
    next_id: u64,
    sinks: HashMap<WatchHandle, SampleSink<GeoSample>>,
}

/// Position source fed by platform glue through a [`PositionFeed`].
pub struct ChannelPositionSource {
    watchers: Arc<Mutex<Watchers>>,
}

/// Producer side of a [`ChannelPositionSource`].
#[derive(Clone)]
pub struct PositionFeed {
    watchers: Arc<Mutex<Watchers>>,
}

impl ChannelPositionSource {
    pub fn new() -> (Self, PositionFeed) {
        let watchers = Arc::new(Mutex::new(Watchers::default()));
        (
            Self {
                watchers: watchers.clone(),
            },
            PositionFeed { watchers },
        )
    }
}

impl PositionSource for ChannelPositionSource {
    fn watch(&self, sink: SampleSink<GeoSample>) -> Result<WatchHandle, SensorError> {
        let mut watchers = lock(&self.watchers);
        watchers.next_id += 1;
        let handle = WatchHandle(watchers.next_id);
        watchers.sinks.insert(handle, sink);
        Ok(handle)
    }

    fn clear(&self, handle: WatchHandle) -> Result<(), SensorError> {
        lock(&self.watchers)
            .sinks
            .remove(&handle)
            .map(|_| ())
            .ok_or(SensorError::UnknownWatch(handle))
    }
}

impl PositionFeed {
    /// Report a new fix to every active watch.
    pub fn push(&self, sample: GeoSample) {
        lock(&self.watchers)
            .sinks
            .retain(|_, sink| sink.send(sample).is_ok());
    }

    pub fn push_fix(&self, latitude_deg: f64, longitude_deg: f64, elevation_m: Option<f64>) {
        self.push(GeoSample::from_fix(latitude_deg, longitude_deg, elevation_m));
    }

    /// Report a platform error. Watchers keep their previous fix.
    pub fn report_error(&self, message: &str) {
        warn!(error = message, "geolocation error");
    }
}

/// Position source for a fixed, configured site.
///
/// Every watch receives the site exactly once.
pub struct FixedPositionSource {
    site: GeoSample,
    next_id: AtomicU64,
}

impl FixedPositionSource {
    pub fn new(site: GeoSample) -> Self {
        Self {
            site,
            next_id: AtomicU64::new(1),
        }
    }
}

impl PositionSource for FixedPositionSource {
    fn watch(&self, sink: SampleSink<GeoSample>) -> Result<WatchHandle, SensorError> {
        let handle = WatchHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        if sink.send(self.site).is_err() {
            debug!(?handle, "fixed site watcher already gone");
        }
        Ok(handle)
    }

    fn clear(&self, _handle: WatchHandle) -> Result<(), SensorError> {
        Ok(())
    }
}

/// Position source for platforms without geolocation.
pub struct UnavailablePositionSource;

impl PositionSource for UnavailablePositionSource {
    fn watch(&self, _sink: SampleSink<GeoSample>) -> Result<WatchHandle, SensorError> {
        Err(SensorError::Unsupported("geolocation"))
    }

    fn clear(&self, handle: WatchHandle) -> Result<(), SensorError> {
        Err(SensorError::UnknownWatch(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_missing_elevation_defaults_to_sea_level() {
        let sample = GeoSample::from_fix(45.0, -73.0, None);
        assert_eq!(sample.elevation_m, 0.0);
        assert_eq!(GeoSample::from_fix(45.0, -73.0, Some(88.0)).elevation_m, 88.0);
    }

    #[tokio::test]
    async fn test_orientation_permission_follows_consent() {
        let (granted, _) = ChannelOrientationSource::new(true);
        let (denied, _) = ChannelOrientationSource::new(false);
        assert!(granted.request_permission().await);
        assert!(!denied.request_permission().await);
    }

    #[test]
    fn test_orientation_is_only_delivered_while_started() {
        let (source, feed) = ChannelOrientationSource::new(true);
        let (tx, mut rx) = unbounded_channel();

        assert!(!feed.push(OrientationSample::new(1.0, 2.0, 3.0)));
        source.start(tx).unwrap();
        assert!(feed.is_active());
        assert!(feed.push(OrientationSample::new(4.0, 5.0, 6.0)));
        source.stop().unwrap();
        assert!(!feed.push(OrientationSample::new(7.0, 8.0, 9.0)));

        assert_eq!(rx.try_recv().unwrap(), OrientationSample::new(4.0, 5.0, 6.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stopping_an_idle_orientation_source_is_fine() {
        let (source, _) = ChannelOrientationSource::new(true);
        assert!(source.stop().is_ok());
        assert!(source.stop().is_ok());
    }

    #[test]
    fn test_position_fixes_reach_every_watch_until_cleared() {
        let (source, feed) = ChannelPositionSource::new();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let a = source.watch(tx_a).unwrap();
        let _b = source.watch(tx_b).unwrap();

        feed.push_fix(10.0, 20.0, Some(30.0));
        source.clear(a).unwrap();
        feed.push_fix(11.0, 21.0, None);

        assert_eq!(rx_a.try_recv().unwrap(), GeoSample::from_fix(10.0, 20.0, Some(30.0)));
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap().latitude_deg, 10.0);
        assert_eq!(rx_b.try_recv().unwrap(), GeoSample::from_fix(11.0, 21.0, None));
        assert!(source.clear(a).is_err());
    }

    #[test]
    fn test_position_errors_deliver_nothing() {
        let (source, feed) = ChannelPositionSource::new();
        let (tx, mut rx) = unbounded_channel();
        source.watch(tx).unwrap();
        feed.report_error("timeout");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fixed_site_is_delivered_once_per_watch() {
        let site = GeoSample::from_fix(45.503575, -73.58709, Some(100.0));
        let source = FixedPositionSource::new(site);
        let (tx, mut rx) = unbounded_channel();
        let first = source.watch(tx.clone()).unwrap();
        let second = source.watch(tx).unwrap();
        assert_ne!(first, second);
        assert_eq!(rx.try_recv().unwrap(), site);
        assert_eq!(rx.try_recv().unwrap(), site);
        assert!(rx.try_recv().is_err());
        assert!(source.clear(first).is_ok());
    }

    #[test]
    fn test_unavailable_geolocation_refuses_to_watch() {
        let (tx, _rx) = unbounded_channel();
        assert!(matches!(
            UnavailablePositionSource.watch(tx),
            Err(SensorError::Unsupported("geolocation"))
        ));
    }
}
