//! PostgreSQL-backed `TripRepository` implementation using Diesel.
//!
//! Completion is a conditional update (`WHERE NOT completed`) so the flag
//! can only flip once even under concurrent calls.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CompletionOutcome, TripPersistenceError, TripRepository};
use crate::domain::{NewTrip, Trip, TripId, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewTripRow, TripRow};
use super::pool::{DbPool, PoolError};
use super::schema::trips;

/// Diesel-backed implementation of the trip repository port.
#[derive(Clone)]
pub struct DieselTripRepository {
    pool: DbPool,
}

impl DieselTripRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> TripPersistenceError {
    map_pool_error(error, TripPersistenceError::connection)
}

fn map_diesel(error: diesel::result::Error) -> TripPersistenceError {
    map_diesel_error(
        error,
        TripPersistenceError::query,
        TripPersistenceError::connection,
    )
}

/// Convert a database row into a domain trip.
pub(crate) fn row_to_trip(row: TripRow) -> Trip {
    let TripRow {
        id,
        name,
        peak,
        trip_date,
        description,
        difficulty,
        image_url,
        distance_km,
        ascent_m,
        completed,
        guide_id,
        second_guide_name,
        created_by,
        created_at,
        updated_at,
    } = row;

    Trip {
        id: TripId::from_uuid(id),
        name,
        peak,
        date: trip_date,
        description,
        difficulty,
        image_url,
        distance_km,
        ascent_m,
        completed,
        guide_id: guide_id.map(UserId::from_uuid),
        second_guide_name,
        created_by: UserId::from_uuid(created_by),
        created_at,
        updated_at,
    }
}

#[async_trait]
impl TripRepository for DieselTripRepository {
    async fn insert(&self, trip: NewTrip) -> Result<Trip, TripPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let new_row = NewTripRow {
            id: Uuid::new_v4(),
            name: &trip.name,
            peak: &trip.peak,
            trip_date: trip.date,
            description: trip.description.as_deref(),
            difficulty: &trip.difficulty,
            distance_km: trip.distance_km,
            ascent_m: trip.ascent_m,
            guide_id: trip.guide_id.map(|id| *id.as_uuid()),
            second_guide_name: trip.second_guide_name.as_deref(),
            created_by: *trip.created_by.as_uuid(),
        };

        diesel::insert_into(trips::table)
            .values(&new_row)
            .returning(TripRow::as_returning())
            .get_result::<TripRow>(&mut conn)
            .await
            .map(row_to_trip)
            .map_err(map_diesel)
    }

    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, TripPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = trips::table
            .find(id.as_uuid())
            .select(TripRow::as_select())
            .first::<TripRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(row.map(row_to_trip))
    }

    async fn list(&self) -> Result<Vec<Trip>, TripPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let rows: Vec<TripRow> = trips::table
            .order(trips::created_at.asc())
            .select(TripRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(rows.into_iter().map(row_to_trip).collect())
    }

    async fn set_image_url(
        &self,
        id: &TripId,
        url: &str,
    ) -> Result<Option<Trip>, TripPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = diesel::update(trips::table.find(id.as_uuid()))
            .set((trips::image_url.eq(url), trips::updated_at.eq(Utc::now())))
            .returning(TripRow::as_returning())
            .get_result::<TripRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(row.map(row_to_trip))
    }

    async fn complete(&self, id: &TripId) -> Result<CompletionOutcome, TripPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        // Conditional flip: only one caller can observe `Completed`.
        let row = diesel::update(
            trips::table
                .find(id.as_uuid())
                .filter(trips::completed.eq(false)),
        )
        .set((trips::completed.eq(true), trips::updated_at.eq(Utc::now())))
        .returning(TripRow::as_returning())
        .get_result::<TripRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel)?;

        if let Some(row) = row {
            return Ok(CompletionOutcome::Completed(row_to_trip(row)));
        }

        let exists: Option<Uuid> = trips::table
            .find(id.as_uuid())
            .select(trips::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(if exists.is_some() {
            CompletionOutcome::AlreadyCompleted
        } else {
            CompletionOutcome::Missing
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn rows_convert_preserving_metrics_and_references() {
        let guide = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let row = TripRow {
            id: Uuid::new_v4(),
            name: "Spring ascent".into(),
            peak: "Triglav".into(),
            trip_date: NaiveDate::from_ymd_opt(2026, 5, 9).expect("date"),
            description: None,
            difficulty: "T3".into(),
            image_url: Some("https://cdn.example/trips/x.jpg".into()),
            distance_km: 12.5,
            ascent_m: 800,
            completed: false,
            guide_id: Some(guide),
            second_guide_name: None,
            created_by: creator,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let trip = row_to_trip(row);
        assert_eq!(trip.distance_km, 12.5);
        assert_eq!(trip.ascent_m, 800);
        assert_eq!(trip.guide_id.map(|id| *id.as_uuid()), Some(guide));
        assert_eq!(*trip.created_by.as_uuid(), creator);
    }

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool(PoolError::checkout("connection refused"));
        assert!(matches!(err, TripPersistenceError::Connection { .. }));
    }
}
