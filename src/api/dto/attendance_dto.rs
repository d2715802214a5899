//! Attendance request DTOs.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{GeoFix, GeoPoint, UserId, WorkReport};
use crate::error::LogisticsError;
use crate::service::SessionEvidence;

/// Request body for `POST /attendance/check-in`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Working date; defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Device latitude. Required.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Device longitude. Required.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Reported fix accuracy in meters.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Location label.
    #[serde(default)]
    pub location: Option<String>,
    /// Object path of a photo already placed in the object store.
    #[serde(default)]
    pub photo_path: Option<String>,
}

impl CheckInRequest {
    /// Converts the body into session evidence.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if the fix is missing or
    /// only half present.
    pub fn into_evidence(self) -> Result<SessionEvidence, LogisticsError> {
        Ok(SessionEvidence {
            date: self.date,
            fix: required_fix(self.latitude, self.longitude, self.accuracy_m)?,
            location: self.location,
            photo_path: self.photo_path,
        })
    }
}

/// Request body for `POST /attendance/check-out`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    /// Working date of the session to close; defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Device latitude. Required.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Device longitude. Required.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Reported fix accuracy in meters.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Location label.
    #[serde(default)]
    pub location: Option<String>,
    /// Object path of a photo already placed in the object store.
    #[serde(default)]
    pub photo_path: Option<String>,
    /// Summary of the day's work.
    #[serde(default)]
    pub work_description: Option<String>,
    /// Tasks completed.
    #[serde(default)]
    pub task_count: Option<u32>,
    /// Deliveries completed.
    #[serde(default)]
    pub deliveries_completed: Option<u32>,
}

impl CheckOutRequest {
    /// Splits the body into session evidence and the optional work report.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if the fix is missing or
    /// only half present.
    pub fn into_parts(self) -> Result<(SessionEvidence, Option<WorkReport>), LogisticsError> {
        let work = WorkReport {
            description: self.work_description,
            task_count: self.task_count,
            deliveries_completed: self.deliveries_completed,
        };
        let work = (work != WorkReport::default()).then_some(work);
        let evidence = SessionEvidence {
            date: self.date,
            fix: required_fix(self.latitude, self.longitude, self.accuracy_m)?,
            location: self.location,
            photo_path: self.photo_path,
        };
        Ok((evidence, work))
    }
}

fn required_fix(
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy_m: Option<f64>,
) -> Result<GeoFix, LogisticsError> {
    let point = GeoPoint::from_pair(latitude, longitude)?.ok_or_else(|| {
        LogisticsError::InvalidRequest("a GPS fix (latitude, longitude) is required".to_string())
    })?;
    Ok(GeoFix {
        point,
        accuracy_m,
    })
}

/// Query for `GET /attendance`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Whose records; defaults to the acting user.
    pub user_id: Option<UserId>,
    /// A single working date; omit for every record of the user.
    pub date: Option<NaiveDate>,
}

/// Query for `GET /attendance/metrics`.
///
/// Either `date`, or both `from` and `to`. With nothing given the metrics
/// cover today (UTC).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MetricsQuery {
    /// A single day.
    pub date: Option<NaiveDate>,
    /// First day of the range, inclusive.
    pub from: Option<NaiveDate>,
    /// Last day of the range, inclusive.
    pub to: Option<NaiveDate>,
}

impl MetricsQuery {
    /// Resolves the query into an inclusive `(from, to)` range.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] when `date` is combined
    /// with a range or only one end of the range is given.
    pub fn range(&self) -> Result<(NaiveDate, NaiveDate), LogisticsError> {
        match (self.date, self.from, self.to) {
            (Some(date), None, None) => Ok((date, date)),
            (None, Some(from), Some(to)) => Ok((from, to)),
            (None, None, None) => {
                let today = Utc::now().date_naive();
                Ok((today, today))
            }
            _ => Err(LogisticsError::InvalidRequest(
                "give either `date` or both `from` and `to`".to_string(),
            )),
        }
    }
}
