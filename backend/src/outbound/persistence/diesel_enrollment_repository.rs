//! PostgreSQL-backed `EnrollmentRepository` implementation using Diesel.
//!
//! The two race-prone operations of the sign-up flow are made atomic here:
//! duplicate sign-ups collapse into the `(trip_id, user_id)` unique
//! constraint, and the climbed-accrual runs inside one transaction with
//! the enrollment row locked, so concurrent transitions can never
//! double-count a member's statistics.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    EnrollmentPersistenceError, EnrollmentRepository, NewEnrollment, RosterEntry, StatusTransition,
};
use crate::domain::{Enrollment, EnrollmentId, EnrollmentStatus, Trip, TripId, UserId, Username};

use super::diesel_trip_repository::row_to_trip;
use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{EnrollmentRow, NewEnrollmentRow, TripRow};
use super::pool::{DbPool, PoolError};
use super::schema::{enrollments, trips, users};

/// Diesel-backed implementation of the enrollment repository port.
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> EnrollmentPersistenceError {
    map_pool_error(error, EnrollmentPersistenceError::connection)
}

fn map_diesel(error: diesel::result::Error) -> EnrollmentPersistenceError {
    if is_unique_violation(&error) {
        return EnrollmentPersistenceError::DuplicateEnrollment;
    }
    map_diesel_error(
        error,
        EnrollmentPersistenceError::query,
        EnrollmentPersistenceError::connection,
    )
}

/// Failures inside the transition transaction.
enum TxError {
    Diesel(diesel::result::Error),
    Corrupt(String),
}

impl From<diesel::result::Error> for TxError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

fn map_tx(error: TxError) -> EnrollmentPersistenceError {
    match error {
        TxError::Diesel(err) => map_diesel(err),
        TxError::Corrupt(message) => EnrollmentPersistenceError::query(message),
    }
}

/// Convert a database row into a domain enrollment.
fn row_to_enrollment(row: EnrollmentRow) -> Result<Enrollment, EnrollmentPersistenceError> {
    let status = EnrollmentStatus::parse(&row.status).map_err(|_| {
        EnrollmentPersistenceError::query(format!("unknown stored status: {}", row.status))
    })?;
    Ok(Enrollment {
        id: EnrollmentId::from_uuid(row.id),
        trip_id: TripId::from_uuid(row.trip_id),
        user_id: UserId::from_uuid(row.user_id),
        status,
        created_at: row.created_at,
    })
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn insert(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let new_row = NewEnrollmentRow {
            id: Uuid::new_v4(),
            trip_id: *enrollment.trip_id.as_uuid(),
            user_id: *enrollment.user_id.as_uuid(),
            status: EnrollmentStatus::Registered.as_str(),
        };

        let row = diesel::insert_into(enrollments::table)
            .values(&new_row)
            .returning(EnrollmentRow::as_returning())
            .get_result::<EnrollmentRow>(&mut conn)
            .await
            .map_err(map_diesel)?;

        row_to_enrollment(row)
    }

    async fn find_by_id(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = enrollments::table
            .find(id.as_uuid())
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_enrollment).transpose()
    }

    async fn delete_by_trip_and_user(
        &self,
        trip_id: &TripId,
        user_id: &UserId,
    ) -> Result<bool, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let deleted = diesel::delete(
            enrollments::table
                .filter(enrollments::trip_id.eq(trip_id.as_uuid()))
                .filter(enrollments::user_id.eq(user_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel)?;

        Ok(deleted > 0)
    }

    async fn transition(
        &self,
        id: &EnrollmentId,
        next: EnrollmentStatus,
    ) -> Result<Option<StatusTransition>, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let enrollment_id = *id.as_uuid();

        let outcome = conn
            .transaction::<Option<(EnrollmentRow, bool)>, TxError, _>(|conn| {
                async move {
                    // Lock the row so concurrent transitions serialise and
                    // the accrual predicate sees the settled status.
                    let row = enrollments::table
                        .find(enrollment_id)
                        .select(EnrollmentRow::as_select())
                        .for_update()
                        .first::<EnrollmentRow>(conn)
                        .await
                        .optional()?;
                    let Some(row) = row else {
                        return Ok(None);
                    };

                    let current = EnrollmentStatus::parse(&row.status).map_err(|_| {
                        TxError::Corrupt(format!("unknown stored status: {}", row.status))
                    })?;

                    let accrues = current.accrues_statistics(next);
                    if accrues {
                        let trip: TripRow = trips::table
                            .find(row.trip_id)
                            .select(TripRow::as_select())
                            .first(conn)
                            .await?;
                        diesel::update(users::table.find(row.user_id))
                            .set((
                                users::total_distance_km
                                    .eq(users::total_distance_km + trip.distance_km),
                                users::total_ascent_m.eq(users::total_ascent_m + trip.ascent_m),
                                users::climbs_count.eq(users::climbs_count + 1),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    let updated = diesel::update(enrollments::table.find(enrollment_id))
                        .set(enrollments::status.eq(next.as_str()))
                        .returning(EnrollmentRow::as_returning())
                        .get_result::<EnrollmentRow>(conn)
                        .await?;

                    Ok(Some((updated, accrues)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx)?;

        outcome
            .map(|(row, statistics_recorded)| {
                row_to_enrollment(row).map(|enrollment| StatusTransition {
                    enrollment,
                    statistics_recorded,
                })
            })
            .transpose()
    }

    async fn roster_for_trip(
        &self,
        trip_id: &TripId,
    ) -> Result<Vec<RosterEntry>, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let rows: Vec<(EnrollmentRow, String, String)> = enrollments::table
            .inner_join(users::table)
            .filter(enrollments::trip_id.eq(trip_id.as_uuid()))
            .order(enrollments::created_at.asc())
            .select((
                EnrollmentRow::as_select(),
                users::username,
                users::full_name,
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        rows.into_iter()
            .map(|(row, username, full_name)| {
                let username = Username::new(username).map_err(|err| {
                    EnrollmentPersistenceError::query(format!("decode username: {err}"))
                })?;
                Ok(RosterEntry {
                    enrollment: row_to_enrollment(row)?,
                    username,
                    full_name,
                })
            })
            .collect()
    }

    async fn climbed_trips_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Trip>, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let rows: Vec<TripRow> = enrollments::table
            .inner_join(trips::table)
            .filter(enrollments::user_id.eq(user_id.as_uuid()))
            .filter(enrollments::status.eq(EnrollmentStatus::Climbed.as_str()))
            .order(trips::created_at.asc())
            .select(TripRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(rows.into_iter().map(row_to_trip).collect())
    }

    async fn trip_ids_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TripId>, EnrollmentPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = enrollments::table
            .filter(enrollments::user_id.eq(user_id.as_uuid()))
            .order(enrollments::created_at.asc())
            .select(enrollments::trip_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(ids.into_iter().map(TripId::from_uuid).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn rows_convert_and_reject_unknown_status_labels() {
        let row = EnrollmentRow {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: "registered".into(),
            created_at: Utc::now(),
        };
        let enrollment = row_to_enrollment(row.clone()).expect("valid row converts");
        assert_eq!(enrollment.status, EnrollmentStatus::Registered);

        let corrupt = EnrollmentRow {
            status: "popeo se".into(),
            ..row
        };
        let err = row_to_enrollment(corrupt).expect_err("unknown label rejected");
        assert!(matches!(err, EnrollmentPersistenceError::Query { .. }));
    }

    #[rstest]
    fn unique_violations_map_to_duplicate_enrollment() {
        let err = map_diesel(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        ));
        assert_eq!(err, EnrollmentPersistenceError::DuplicateEnrollment);
    }

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool(PoolError::checkout("connection refused"));
        assert!(matches!(err, EnrollmentPersistenceError::Connection { .. }));
    }
}
