//! Enrollment engine: sign-ups, the status state machine, and the
//! statistics roll-up it triggers.
//!
//! The duplicate check and the climbed-accrual both live behind atomic
//! repository operations (unique constraint, transactional
//! read-modify-write); this service holds the policy around them: role
//! gates, status validation, and the read-side aggregates.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::access::{self, Operation};
use super::enrollment::{ClimbTotals, Enrollment, EnrollmentId, EnrollmentStatus};
use super::error::Error;
use super::ports::{
    EnrollmentPersistenceError, EnrollmentRepository, NewEnrollment, RosterEntry, TripRepository,
    UserRepository,
};
use super::trip::{Trip, TripId};
use super::user::{Role, UserId, UserStats};

/// A member's climbed trips with the on-demand aggregate.
#[derive(Debug, Clone)]
pub struct ClimbReport {
    /// Climbed trips in creation order.
    pub trips: Vec<Trip>,
    /// Aggregate summed over `trips` at query time.
    pub totals: ClimbTotals,
}

/// Enrollment engine service.
#[derive(Clone)]
pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentRepository>,
    trips: Arc<dyn TripRepository>,
    users: Arc<dyn UserRepository>,
}

impl EnrollmentService {
    /// Create a service over the given ports.
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        trips: Arc<dyn TripRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            enrollments,
            trips,
            users,
        }
    }

    /// Sign the member up for a trip.
    ///
    /// At most one enrollment per (member, trip) exists; a second attempt
    /// fails with a conflict backed by the storage-level unique constraint
    /// rather than a separate existence check.
    pub async fn enroll(&self, user_id: UserId, trip_id: TripId) -> Result<Enrollment, Error> {
        self.trips
            .find_by_id(&trip_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("trip not found"))?;

        match self
            .enrollments
            .insert(NewEnrollment { trip_id, user_id })
            .await
        {
            Ok(enrollment) => {
                info!(trip = %trip_id, user = %user_id, "member enrolled");
                Ok(enrollment)
            }
            Err(EnrollmentPersistenceError::DuplicateEnrollment) => Err(Error::conflict(
                "already enrolled for this trip",
            )
            .with_details(json!({ "code": "already_enrolled" }))),
            Err(other) => Err(Error::from(other)),
        }
    }

    /// Withdraw the member's enrollment for a trip.
    ///
    /// Deletion is status-unconditional: any existing row for the
    /// (member, trip) pair is removable.
    pub async fn withdraw(&self, user_id: UserId, trip_id: TripId) -> Result<(), Error> {
        let removed = self
            .enrollments
            .delete_by_trip_and_user(&trip_id, &user_id)
            .await
            .map_err(Error::from)?;
        if !removed {
            return Err(
                Error::conflict("not enrolled for this trip")
                    .with_details(json!({ "code": "not_enrolled" })),
            );
        }
        info!(trip = %trip_id, user = %user_id, "enrollment withdrawn");
        Ok(())
    }

    /// Set an enrollment's status; admins and guides only.
    ///
    /// When the transition first arrives in `climbed` the member's cached
    /// statistics accrue the trip's distance, ascent, and one climb,
    /// atomically with the status write and at most once per enrollment.
    pub async fn set_status(
        &self,
        caller_role: Role,
        id: &EnrollmentId,
        status: &str,
    ) -> Result<Enrollment, Error> {
        access::require(caller_role, Operation::SetEnrollmentStatus)?;

        let next = EnrollmentStatus::parse(status).map_err(|_| {
            Error::invalid_request("unknown status").with_details(json!({
                "allowed": EnrollmentStatus::ALL.map(EnrollmentStatus::as_str),
            }))
        })?;

        let transition = self
            .enrollments
            .transition(id, next)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("enrollment not found"))?;

        info!(
            enrollment = %id,
            status = %next,
            statistics_recorded = transition.statistics_recorded,
            "enrollment status updated"
        );
        Ok(transition.enrollment)
    }

    /// Roster for a trip with resolved member display fields.
    pub async fn roster(&self, trip_id: &TripId) -> Result<Vec<RosterEntry>, Error> {
        self.trips
            .find_by_id(trip_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("trip not found"))?;
        self.enrollments
            .roster_for_trip(trip_id)
            .await
            .map_err(Error::from)
    }

    /// A member's climbed trips with the aggregate computed at query time.
    ///
    /// The totals here are the derived counterpart of the cached
    /// [`UserStats`]; the two paths must agree after every transition.
    pub async fn climbs_for_user(&self, user_id: &UserId) -> Result<ClimbReport, Error> {
        let trips = self
            .enrollments
            .climbed_trips_for_user(user_id)
            .await
            .map_err(Error::from)?;
        let totals = ClimbTotals::for_trips(&trips);
        Ok(ClimbReport { trips, totals })
    }

    /// Cached statistics straight from the member record (fast path).
    pub async fn cached_stats(&self, user_id: &UserId) -> Result<UserStats, Error> {
        let user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("member not found"))?;
        Ok(user.stats)
    }

    /// Identifiers of every trip the member is enrolled in.
    pub async fn enrolled_trip_ids(&self, user_id: &UserId) -> Result<Vec<TripId>, Error> {
        self.enrollments
            .trip_ids_for_user(user_id)
            .await
            .map_err(Error::from)
    }
}
