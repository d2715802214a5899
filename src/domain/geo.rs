//! Geolocation fixes and plausibility checks.
//!
//! Field evidence (attendance sessions, shipment checkpoints) carries a
//! device-reported coordinate. Hard errors reject impossible fixes; softer
//! signals (poor accuracy, suspiciously perfect accuracy, implausible
//! travel speed) are returned as warnings so the caller can log them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LogisticsError;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Accuracy below this many meters is more precise than consumer GPS
/// hardware delivers.
const SUSPICIOUS_ACCURACY_METERS: f64 = 1.0;

/// A latitude/longitude pair. Both halves are always present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Degrees north, `-90..=90`.
    pub latitude: f64,
    /// Degrees east, `-180..=180`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point from optional halves.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if exactly one half is
    /// present.
    pub fn from_pair(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, LogisticsError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Some(Self {
                latitude,
                longitude,
            })),
            (None, None) => Ok(None),
            _ => Err(LogisticsError::InvalidRequest(
                "latitude and longitude must be supplied together".to_string(),
            )),
        }
    }

    /// Great-circle distance in meters (haversine).
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = (other.latitude - self.latitude).to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }
}

/// A device fix: coordinate plus optional reported accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoFix {
    /// The coordinate.
    #[serde(flatten)]
    pub point: GeoPoint,
    /// Reported accuracy radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

impl GeoFix {
    /// Creates a fix without accuracy information.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            point: GeoPoint {
                latitude,
                longitude,
            },
            accuracy_m: None,
        }
    }

    /// Attaches a reported accuracy radius.
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// Coarse risk level attached to a fix or a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Nothing unusual.
    Low,
    /// Worth a look.
    Medium,
    /// Very likely spoofed or mistyped.
    High,
}

/// Outcome of a plausibility check that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FixAssessment {
    /// Human-readable warnings, empty when the fix is clean.
    pub warnings: Vec<String>,
    /// Highest risk level seen.
    pub risk: RiskLevel,
}

impl Default for FixAssessment {
    fn default() -> Self {
        Self {
            warnings: Vec::new(),
            risk: RiskLevel::Low,
        }
    }
}

impl FixAssessment {
    fn warn(&mut self, risk: RiskLevel, message: String) {
        self.warnings.push(message);
        self.risk = self.risk.max(risk);
    }

    /// Folds another assessment into this one.
    pub fn merge(&mut self, other: Self) {
        self.warnings.extend(other.warnings);
        self.risk = self.risk.max(other.risk);
    }

    /// Returns `true` if no warning was raised.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Thresholds applied to incoming fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPolicy {
    /// Fixes reporting a worse accuracy than this are rejected.
    pub max_accuracy_m: f64,
    /// Fixes reporting a worse accuracy than this raise a warning.
    pub warn_accuracy_m: f64,
    /// Implied travel speed above this raises a high-risk warning.
    pub max_speed_kmh: f64,
}

impl Default for GpsPolicy {
    fn default() -> Self {
        Self {
            max_accuracy_m: 200.0,
            warn_accuracy_m: 50.0,
            max_speed_kmh: 200.0,
        }
    }
}

impl GpsPolicy {
    /// Checks a coordinate for hard errors.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] for out-of-range or
    /// non-finite coordinates and for `(0, 0)`.
    pub fn check_point(&self, point: &GeoPoint) -> Result<(), LogisticsError> {
        let GeoPoint {
            latitude,
            longitude,
        } = *point;
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LogisticsError::InvalidRequest(format!(
                "invalid latitude {latitude}: must be between -90 and 90"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LogisticsError::InvalidRequest(format!(
                "invalid longitude {longitude}: must be between -180 and 180"
            )));
        }
        if latitude == 0.0 && longitude == 0.0 {
            return Err(LogisticsError::InvalidRequest(
                "invalid coordinates (0, 0)".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates a device fix.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] when the coordinate is
    /// impossible or the reported accuracy exceeds
    /// [`GpsPolicy::max_accuracy_m`].
    pub fn assess_fix(&self, fix: &GeoFix) -> Result<FixAssessment, LogisticsError> {
        self.check_point(&fix.point)?;
        let mut assessment = FixAssessment::default();

        if let Some(accuracy) = fix.accuracy_m {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(LogisticsError::InvalidRequest(format!(
                    "invalid accuracy {accuracy}"
                )));
            }
            if accuracy > self.max_accuracy_m {
                return Err(LogisticsError::InvalidRequest(format!(
                    "GPS accuracy too poor: {accuracy}m (maximum {}m)",
                    self.max_accuracy_m
                )));
            }
            if accuracy > self.warn_accuracy_m {
                assessment.warn(
                    RiskLevel::Medium,
                    format!("GPS accuracy is poor: {accuracy}m"),
                );
            } else if accuracy < SUSPICIOUS_ACCURACY_METERS {
                assessment.warn(
                    RiskLevel::Medium,
                    format!("suspiciously precise GPS accuracy: {accuracy}m"),
                );
            }
        }
        Ok(assessment)
    }

    /// Assesses the implied travel speed between two timed points.
    #[must_use]
    pub fn assess_movement(
        &self,
        from: (&GeoPoint, DateTime<Utc>),
        to: (&GeoPoint, DateTime<Utc>),
    ) -> FixAssessment {
        let mut assessment = FixAssessment::default();
        let meters = from.0.distance_meters(to.0);
        #[allow(clippy::cast_precision_loss)]
        let elapsed_hours = (to.1 - from.1).num_milliseconds().abs() as f64 / 3_600_000.0;

        if elapsed_hours == 0.0 {
            if meters > 0.0 {
                assessment.warn(
                    RiskLevel::High,
                    format!("moved {meters:.0}m with no elapsed time"),
                );
            }
            return assessment;
        }

        let speed_kmh = meters / 1000.0 / elapsed_hours;
        if speed_kmh > self.max_speed_kmh {
            assessment.warn(
                RiskLevel::High,
                format!(
                    "implausible movement speed: {speed_kmh:.0}km/h (maximum {}km/h)",
                    self.max_speed_kmh
                ),
            );
        }
        assessment
    }
}
