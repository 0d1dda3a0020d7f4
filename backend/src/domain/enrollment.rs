//! Enrollment record and its status state machine.
//!
//! An enrollment binds one member to one trip. Its status starts at
//! `registered` and may move once to `climbed`, `failed`, or `cancelled`;
//! the move into `climbed` is the single point where the member's cached
//! statistics accrue.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::trip::{Trip, TripId};
use super::user::UserId;

/// Stable enrollment identifier stored as a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(Uuid);

impl EnrollmentId {
    /// Generate a new random [`EnrollmentId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a status label is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown enrollment status label")]
pub struct UnknownStatus;

/// Lifecycle status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Initial state after signing up.
    Registered,
    /// The member completed the trip; statistics accrue on entry.
    Climbed,
    /// The member attempted the trip but did not summit.
    Failed,
    /// The sign-up was cancelled.
    Cancelled,
}

impl EnrollmentStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Registered,
        Self::Climbed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Wire label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Climbed => "climbed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a wire label against the closed set.
    pub fn parse(raw: &str) -> Result<Self, UnknownStatus> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or(UnknownStatus)
    }

    /// Whether a transition from `self` into `next` accrues statistics.
    ///
    /// Only the first arrival in `climbed` counts; re-marking a climbed
    /// enrollment must leave the cached totals untouched.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::EnrollmentStatus;
    ///
    /// assert!(EnrollmentStatus::Registered.accrues_statistics(EnrollmentStatus::Climbed));
    /// assert!(!EnrollmentStatus::Climbed.accrues_statistics(EnrollmentStatus::Climbed));
    /// ```
    pub fn accrues_statistics(self, next: Self) -> bool {
        next == Self::Climbed && self != Self::Climbed
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's sign-up for a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    /// Stable identifier.
    pub id: EnrollmentId,
    /// Trip the member signed up for.
    pub trip_id: TripId,
    /// The enrolled member.
    pub user_id: UserId,
    /// Current lifecycle status.
    pub status: EnrollmentStatus,
    /// Sign-up timestamp.
    pub created_at: DateTime<Utc>,
}

/// On-demand aggregate over a set of climbed trips.
///
/// This is the derived counterpart of the cached [`super::user::UserStats`];
/// the two must agree after every status transition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClimbTotals {
    /// Total kilometres across the trips.
    pub total_distance_km: f64,
    /// Total metres of ascent across the trips.
    pub total_ascent_m: i32,
    /// Number of trips.
    pub climbs_count: i32,
}

impl ClimbTotals {
    /// Sum totals over a slice of trips.
    pub fn for_trips(trips: &[Trip]) -> Self {
        trips.iter().fold(Self::default(), |mut totals, trip| {
            totals.total_distance_km += trip.distance_km;
            totals.total_ascent_m += trip.ascent_m;
            totals.climbs_count += 1;
            totals
        })
    }
}
