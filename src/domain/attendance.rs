//! Field-staff attendance sessions and daily metrics.
//!
//! One record exists per (user, calendar date). A record is created open at
//! check-in and closed exactly once at check-out; it never changes again.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shipment::non_blank;
use super::{AttendanceId, GeoFix, UserId};
use crate::error::LogisticsError;

/// Derived session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Checked in, not yet out.
    CheckedIn,
    /// Session complete.
    CheckedOut,
}

/// One end of a session: when, where and evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionStamp {
    /// Server time of the event.
    pub at: DateTime<Utc>,
    /// Location label.
    pub location: Option<String>,
    /// Device fix.
    pub fix: GeoFix,
    /// Object path of a selfie or site photo.
    pub photo_path: Option<String>,
}

impl SessionStamp {
    /// Creates a stamp, dropping blank optional text.
    #[must_use]
    pub fn new(
        at: DateTime<Utc>,
        fix: GeoFix,
        location: Option<String>,
        photo_path: Option<String>,
    ) -> Self {
        Self {
            at,
            location: non_blank(location),
            fix,
            photo_path: non_blank(photo_path),
        }
    }
}

/// Work summary supplied at check-out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct WorkReport {
    /// What was done.
    #[serde(default)]
    pub description: Option<String>,
    /// Tasks completed.
    #[serde(default)]
    pub task_count: Option<u32>,
    /// Deliveries completed.
    #[serde(default)]
    pub deliveries_completed: Option<u32>,
}

/// A user's attendance for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    /// Record identity.
    pub id: AttendanceId,
    /// The user.
    pub user_id: UserId,
    /// Calendar date of the session.
    pub work_date: NaiveDate,
    /// Session start.
    pub check_in: SessionStamp,
    /// Session end, absent while open.
    pub check_out: Option<SessionStamp>,
    /// Work summary, supplied at check-out.
    pub work: Option<WorkReport>,
}

impl AttendanceRecord {
    /// Opens a new session.
    #[must_use]
    pub fn open(user_id: UserId, work_date: NaiveDate, check_in: SessionStamp) -> Self {
        Self {
            id: AttendanceId::new(),
            user_id,
            work_date,
            check_in,
            check_out: None,
            work: None,
        }
    }

    /// Current session state.
    #[must_use]
    pub const fn status(&self) -> AttendanceStatus {
        if self.check_out.is_some() {
            AttendanceStatus::CheckedOut
        } else {
            AttendanceStatus::CheckedIn
        }
    }

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::NoOpenSession`] if already checked out and
    /// [`LogisticsError::InvalidRequest`] if `check_out` is not strictly
    /// after check-in.
    pub fn close(
        &mut self,
        check_out: SessionStamp,
        work: Option<WorkReport>,
    ) -> Result<(), LogisticsError> {
        if self.check_out.is_some() {
            return Err(LogisticsError::NoOpenSession {
                user_id: self.user_id,
                date: self.work_date,
            });
        }
        if check_out.at <= self.check_in.at {
            return Err(LogisticsError::InvalidRequest(
                "check-out must be later than check-in".to_string(),
            ));
        }
        self.check_out = Some(check_out);
        self.work = work.map(|w| WorkReport {
            description: non_blank(w.description),
            ..w
        });
        Ok(())
    }

    /// Hours between check-in and check-out, for closed sessions.
    #[must_use]
    pub fn worked_hours(&self) -> Option<f64> {
        self.check_out.as_ref().map(|out| {
            #[allow(clippy::cast_precision_loss)]
            let millis = (out.at - self.check_in.at).num_milliseconds() as f64;
            millis / 3_600_000.0
        })
    }
}

/// Aggregate counts over a set of attendance records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct AttendanceMetrics {
    /// Distinct users with a record.
    pub total_present: usize,
    /// Records still open.
    pub checked_in: usize,
    /// Records closed.
    pub checked_out: usize,
    /// Mean session length in hours over closed sessions; `0.0` if none.
    pub average_work_hours: f64,
    /// Sum of reported task counts.
    pub total_tasks: u64,
    /// Sum of reported deliveries.
    pub total_deliveries: u64,
}

/// Reduces records to [`AttendanceMetrics`].
///
/// Open sessions count toward `checked_in` but not toward the duration
/// average.
#[must_use]
pub fn compute_metrics(records: &[AttendanceRecord]) -> AttendanceMetrics {
    let total_present = records
        .iter()
        .map(|r| r.user_id)
        .collect::<HashSet<_>>()
        .len();

    let mut metrics = AttendanceMetrics {
        total_present,
        ..AttendanceMetrics::default()
    };
    let mut hours_sum = 0.0;

    for record in records {
        match record.worked_hours() {
            Some(hours) => {
                metrics.checked_out += 1;
                hours_sum += hours;
            }
            None => metrics.checked_in += 1,
        }
        if let Some(work) = &record.work {
            metrics.total_tasks += u64::from(work.task_count.unwrap_or(0));
            metrics.total_deliveries += u64::from(work.deliveries_completed.unwrap_or(0));
        }
    }

    if metrics.checked_out > 0 {
        #[allow(clippy::cast_precision_loss)]
        let closed = metrics.checked_out as f64;
        metrics.average_work_hours = hours_sum / closed;
    }
    metrics
}
