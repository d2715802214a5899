//! Attendance session manager.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AttendanceMetrics, AttendanceRecord, GeoFix, GpsPolicy, SessionStamp, UserId, WorkReport,
    compute_metrics,
};
use crate::error::LogisticsError;
use crate::persistence::{AttendanceRepository, Stores};

/// Longest range accepted by [`AttendanceService::metrics`], in days.
const MAX_METRICS_RANGE_DAYS: i64 = 366;

/// Evidence supplied at either end of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvidence {
    /// Working date; defaults to today (UTC).
    pub date: Option<NaiveDate>,
    /// Device fix. Required.
    pub fix: GeoFix,
    /// Location label.
    pub location: Option<String>,
    /// Object path of a photo.
    pub photo_path: Option<String>,
}

/// Metrics for an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MetricsReport {
    /// First date, inclusive.
    pub from: NaiveDate,
    /// Last date, inclusive.
    pub to: NaiveDate,
    /// Aggregates over the range.
    #[serde(flatten)]
    pub metrics: AttendanceMetrics,
}

/// Opens and closes per-day attendance sessions.
#[derive(Debug, Clone)]
pub struct AttendanceService {
    records: Arc<dyn AttendanceRepository>,
    gps_policy: GpsPolicy,
}

impl AttendanceService {
    /// Creates a new `AttendanceService`.
    #[must_use]
    pub fn new(stores: &Stores, gps_policy: GpsPolicy) -> Self {
        Self {
            records: Arc::clone(&stores.attendance),
            gps_policy,
        }
    }

    /// Opens the session for `user_id` on the given (or current) date.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for an impossible fix,
    /// [`LogisticsError::DuplicateCheckIn`] if a record already exists.
    pub async fn check_in(
        &self,
        user_id: UserId,
        evidence: SessionEvidence,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let now = Utc::now();
        let date = evidence.date.unwrap_or_else(|| now.date_naive());
        self.assess(user_id, date, &evidence.fix, "check-in")?;

        let stamp = SessionStamp::new(now, evidence.fix, evidence.location, evidence.photo_path);
        let record = self
            .records
            .open_session(AttendanceRecord::open(user_id, date, stamp))
            .await
            .inspect_err(|e| {
                if matches!(e, LogisticsError::DuplicateCheckIn { .. }) {
                    tracing::warn!(%user_id, %date, "duplicate check-in");
                }
            })?;

        tracing::info!(%user_id, %date, attendance_id = %record.id, "checked in");
        Ok(record)
    }

    /// Closes the open session for `user_id` on the given (or current) date.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for an impossible fix,
    /// [`LogisticsError::NoOpenSession`] if there is nothing to close.
    pub async fn check_out(
        &self,
        user_id: UserId,
        evidence: SessionEvidence,
        work: Option<WorkReport>,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let now = Utc::now();
        let date = evidence.date.unwrap_or_else(|| now.date_naive());
        self.assess(user_id, date, &evidence.fix, "check-out")?;

        let stamp = SessionStamp::new(now, evidence.fix, evidence.location, evidence.photo_path);
        let record = self
            .records
            .close_session(user_id, date, stamp, work)
            .await
            .inspect_err(|e| {
                if matches!(e, LogisticsError::NoOpenSession { .. }) {
                    tracing::warn!(%user_id, %date, "check-out without open session");
                }
            })?;

        tracing::info!(
            %user_id,
            %date,
            hours = record.worked_hours().unwrap_or_default(),
            "checked out"
        );
        Ok(record)
    }

    /// The user's records: the one for `date` if given, otherwise all of
    /// them, most recent first.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    pub async fn records(
        &self,
        user_id: UserId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError> {
        match date {
            Some(date) => Ok(self
                .records
                .find_session(user_id, date)
                .await?
                .into_iter()
                .collect()),
            None => self.records.sessions_for_user(user_id).await,
        }
    }

    /// Aggregates over every record dated `from..=to`.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for an inverted or over-long range.
    pub async fn metrics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<MetricsReport, LogisticsError> {
        if from > to {
            return Err(LogisticsError::InvalidRequest(format!(
                "range start {from} is after end {to}"
            )));
        }
        if (to - from).num_days() >= MAX_METRICS_RANGE_DAYS {
            return Err(LogisticsError::InvalidRequest(format!(
                "range may span at most {MAX_METRICS_RANGE_DAYS} days"
            )));
        }
        let records = self.records.sessions_between(from, to).await?;
        Ok(MetricsReport {
            from,
            to,
            metrics: compute_metrics(&records),
        })
    }

    fn assess(
        &self,
        user_id: UserId,
        date: NaiveDate,
        fix: &GeoFix,
        phase: &str,
    ) -> Result<(), LogisticsError> {
        let assessment = self.gps_policy.assess_fix(fix)?;
        if !assessment.is_clean() {
            tracing::warn!(
                %user_id,
                %date,
                phase,
                risk = ?assessment.risk,
                warnings = ?assessment.warnings,
                "attendance fix raised GPS warnings"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::AttendanceStatus;
    use crate::persistence::memory::InMemoryStore;

    fn make_service() -> AttendanceService {
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
        AttendanceService::new(&stores, GpsPolicy::default())
    }

    fn evidence(date: NaiveDate) -> SessionEvidence {
        SessionEvidence {
            date: Some(date),
            fix: GeoFix::new(12.9716, 77.5946).with_accuracy(15.0),
            location: Some("Bengaluru depot".to_string()),
            photo_path: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap_or_default()
    }

    #[tokio::test]
    async fn check_in_twice_is_duplicate() {
        let service = make_service();
        let user = UserId::new();
        let Ok(record) = service.check_in(user, evidence(day())).await else {
            panic!("first check-in");
        };
        assert_eq!(record.status(), AttendanceStatus::CheckedIn);
        assert!(matches!(
            service.check_in(user, evidence(day())).await,
            Err(LogisticsError::DuplicateCheckIn { .. })
        ));
    }

    #[tokio::test]
    async fn check_out_without_check_in() {
        let service = make_service();
        assert!(matches!(
            service.check_out(UserId::new(), evidence(day()), None).await,
            Err(LogisticsError::NoOpenSession { .. })
        ));
    }

    #[tokio::test]
    async fn check_out_twice_fails_second_time() {
        let service = make_service();
        let user = UserId::new();
        let _ = service.check_in(user, evidence(day())).await;
        // Stamps use the wall clock; make sure check-out lands strictly later.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let Ok(record) = service.check_out(user, evidence(day()), None).await else {
            panic!("first check-out");
        };
        assert_eq!(record.status(), AttendanceStatus::CheckedOut);
        assert!(matches!(
            service.check_out(user, evidence(day()), None).await,
            Err(LogisticsError::NoOpenSession { .. })
        ));
    }

    #[tokio::test]
    async fn impossible_fix_is_rejected() {
        let service = make_service();
        let mut bad = evidence(day());
        bad.fix = GeoFix::new(0.0, 0.0);
        assert!(matches!(
            service.check_in(UserId::new(), bad).await,
            Err(LogisticsError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn metrics_for_a_day() {
        let service = make_service();
        let a = UserId::new();
        let b = UserId::new();
        let _ = service.check_in(a, evidence(day())).await;
        let _ = service.check_in(b, evidence(day())).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let _ = service
            .check_out(
                a,
                evidence(day()),
                Some(WorkReport {
                    description: Some("route 7".to_string()),
                    task_count: Some(4),
                    deliveries_completed: Some(11),
                }),
            )
            .await;

        let Ok(report) = service.metrics(day(), day()).await else {
            panic!("metrics");
        };
        assert_eq!(report.metrics.total_present, 2);
        assert_eq!(report.metrics.checked_in, 1);
        assert_eq!(report.metrics.checked_out, 1);
        assert_eq!(report.metrics.total_deliveries, 11);
        assert!(report.metrics.average_work_hours > 0.0);
    }

    #[tokio::test]
    async fn metrics_range_is_validated() {
        let service = make_service();
        let later = day().succ_opt().unwrap_or_default();
        assert!(service.metrics(later, day()).await.is_err());
        let far = day() + chrono::Duration::days(400);
        assert!(service.metrics(day(), far).await.is_err());
    }

    #[tokio::test]
    async fn records_by_user_and_date() {
        let service = make_service();
        let user = UserId::new();
        let next = day().succ_opt().unwrap_or_default();
        let _ = service.check_in(user, evidence(day())).await;
        let _ = service.check_in(user, evidence(next)).await;

        assert_eq!(service.records(user, Some(day())).await.map(|r| r.len()).ok(), Some(1));
        let Ok(all) = service.records(user, None).await else {
            panic!("records");
        };
        assert_eq!(all.first().map(|r| r.work_date), Some(next));
    }
}
