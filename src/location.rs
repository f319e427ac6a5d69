//! Where is the user?
//!
//! A [`LocationSource`] produces a single coordinate fix, possibly slowly.
//! [`GeolocationProvider`] wraps a source with a timeout and a cache-first
//! policy, and always answers with a tagged [`LocationError`] instead of
//! panicking: the common case on a fresh install is that the user said no.

use crate::config::LocationConfig;
use crate::error::LocationError;
use crate::geo::GeoPoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipgeolocate::{Locator, Service};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// A coordinate together with how much to trust it and when it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub point: GeoPoint,
    /// Radius of uncertainty in meters, if the source reports one.
    pub accuracy_m: Option<f64>,
    pub taken_at: DateTime<Utc>,
}

impl Fix {
    pub fn now(point: GeoPoint, accuracy_m: Option<f64>) -> Self {
        Self {
            point,
            accuracy_m,
            taken_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn locate(&self) -> Result<Fix, LocationError>;
}

/// IP geolocation through ip-api.com. City-level accuracy at best.
pub struct IpApiSource {
    ip: String,
}

impl IpApiSource {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

// ip-api is only good to a few tens of kilometers.
const IP_ACCURACY_M: f64 = 25_000.0;

#[async_trait]
impl LocationSource for IpApiSource {
    async fn locate(&self) -> Result<Fix, LocationError> {
        let loc = Locator::get(&self.ip, Service::IpApi).await.map_err(|e| {
            debug!("IP geolocation failed: {}", e);
            LocationError::Unavailable
        })?;

        let lat = loc.latitude.parse::<f64>();
        let lon = loc.longitude.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => {
                let point = GeoPoint::new(lat, lon).map_err(|_| LocationError::Unavailable)?;
                info!("Geolocation successful - ({}, {})", lat, lon);
                Ok(Fix::now(point, Some(IP_ACCURACY_M)))
            }
            _ => {
                debug!(
                    "Unparseable coordinates from ip-api: ({}, {})",
                    loc.latitude, loc.longitude
                );
                Err(LocationError::Unavailable)
            }
        }
    }
}

/// A coordinate the user typed into `config.toml`.
pub struct FixedSource(pub GeoPoint);

#[async_trait]
impl LocationSource for FixedSource {
    async fn locate(&self) -> Result<Fix, LocationError> {
        Ok(Fix::now(self.0, Some(0.0)))
    }
}

/// The user opted out of location lookups.
pub struct DeclinedSource;

#[async_trait]
impl LocationSource for DeclinedSource {
    async fn locate(&self) -> Result<Fix, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

pub struct GeolocationProvider {
    source: Arc<dyn LocationSource>,
    timeout: Duration,
    max_age: Duration,
    cache: Mutex<Option<Fix>>,
}

impl GeolocationProvider {
    pub fn new(source: Arc<dyn LocationSource>, timeout: Duration, max_age: Duration) -> Self {
        Self {
            source,
            timeout,
            max_age,
            cache: Mutex::new(None),
        }
    }

    /// Picks the source from config: opted out, manual coordinate, or IP lookup.
    pub fn from_config(config: &LocationConfig) -> Self {
        let source: Arc<dyn LocationSource> = if !config.auto_locate {
            Arc::new(DeclinedSource)
        } else if let Some(point) = config.manual_point() {
            Arc::new(FixedSource(point))
        } else {
            Arc::new(IpApiSource::new(config.lookup_ip.clone()))
        };
        Self::new(
            source,
            Duration::from_secs(config.timeout_seconds),
            Duration::from_secs(config.max_age_seconds),
        )
    }

    /// Returns a cached fix younger than the max age, otherwise asks the
    /// source and gives up after the timeout.
    pub async fn request_location(&self) -> Result<Fix, LocationError> {
        if let Some(fix) = self.cached() {
            debug!("Reusing cached fix from {}", fix.taken_at);
            return Ok(fix);
        }

        let outcome = match tokio::time::timeout(self.timeout, self.source.locate()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(LocationError::Timeout),
        };

        if let Ok(fix) = &outcome {
            if let Ok(mut cache) = self.cache.lock() {
                *cache = Some(fix.clone());
            }
        }
        outcome
    }

    fn cached(&self) -> Option<Fix> {
        let cache = self.cache.lock().ok()?;
        let fix = cache.as_ref()?;
        let age = Utc::now().signed_duration_since(fix.taken_at).to_std().ok()?;
        (age <= self.max_age).then(|| fix.clone())
    }
}

/// What the UI may observe about the lookup in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationState {
    pub loading: bool,
    pub fix: Option<Fix>,
    pub error: Option<LocationError>,
}
