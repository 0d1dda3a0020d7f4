//! In-memory port implementations for tests.
//!
//! These doubles honour the same atomicity contracts as the Diesel
//! adapters (storage-level duplicate detection, accrual fused with the
//! status write) so service tests and HTTP integration tests exercise the
//! real policy against a deterministic store. Exposed behind the
//! `test-support` feature; integration tests enable it through the
//! self-referential dev-dependency.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{
    AdminChanges, CompletionOutcome, CredentialError, EnrollmentPersistenceError,
    EnrollmentRepository, NewEnrollment, PasswordHasher, ProfileChanges, RosterEntry,
    SessionClaims, StatusTransition, TokenCodec, TokenError, TripPersistenceError, TripRepository,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, NewTrip, NewUser, Role, SecretHash, Trip, TripId,
    User, UserId, UserProfile, Username,
};

/// In-memory member store.
#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    fn build(user: NewUser) -> User {
        User {
            id: UserId::random(),
            username: user.username,
            secret_hash: user.secret_hash,
            full_name: user.full_name,
            role: user.role,
            profile: user.profile,
            stats: crate::domain::UserStats::default(),
            created_at: Utc::now(),
        }
    }

    /// Directly seed a member, bypassing hashing and validation.
    pub fn seed(&self, username: &str, role: Role) -> User {
        let user = Self::build(NewUser {
            username: Username::new(username).expect("seed username"),
            secret_hash: SecretHash::new("seeded"),
            full_name: username.to_owned(),
            role,
            profile: UserProfile::default(),
        });
        self.rows.lock().expect("users lock").push(user.clone());
        user
    }

    /// Fold climbed-trip metrics into a member's cached statistics.
    ///
    /// Used by [`InMemoryEnrollments`] inside its transition lock, standing
    /// in for the Diesel adapter's transactional update.
    pub fn accrue(&self, id: &UserId, distance_km: f64, ascent_m: i32) {
        let mut rows = self.rows.lock().expect("users lock");
        if let Some(user) = rows.iter_mut().find(|user| user.id == *id) {
            user.stats.accrue(distance_km, ascent_m);
        }
    }

    fn get(&self, id: &UserId) -> Option<User> {
        self.rows
            .lock()
            .expect("users lock")
            .iter()
            .find(|user| user.id == *id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, user: NewUser) -> Result<User, UserPersistenceError> {
        let mut rows = self.rows.lock().expect("users lock");
        if rows.iter().any(|row| row.username == user.username) {
            return Err(UserPersistenceError::DuplicateUsername);
        }
        let user = Self::build(user);
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.get(id))
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        Ok(self
            .rows
            .lock()
            .expect("users lock")
            .iter()
            .find(|user| user.username == *username)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        Ok(self.rows.lock().expect("users lock").clone())
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        Ok(self.rows.lock().expect("users lock").len() as u64)
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut rows = self.rows.lock().expect("users lock");
        if rows
            .iter()
            .any(|row| row.username == changes.username && row.id != *id)
        {
            return Err(UserPersistenceError::DuplicateUsername);
        }
        let Some(user) = rows.iter_mut().find(|user| user.id == *id) else {
            return Ok(None);
        };

        user.username = changes.username;
        user.full_name = changes.full_name;
        if let Some(hash) = changes.secret_hash {
            user.secret_hash = hash;
        }

        let retained_avatar = user.profile.avatar_url.take();
        let retained_disciplinary = user.profile.disciplinary_record.take();
        let retained_appointments = user.profile.club_body_appointments.take();
        let retained_notes = user.profile.notes.take();
        user.profile = changes.profile;
        user.profile.avatar_url = changes.avatar_url.or(retained_avatar);
        match changes.admin_fields {
            Some(fields) => {
                user.profile.disciplinary_record = fields.disciplinary_record;
                user.profile.club_body_appointments = fields.club_body_appointments;
                user.profile.notes = fields.notes;
            }
            None => {
                user.profile.disciplinary_record = retained_disciplinary;
                user.profile.club_body_appointments = retained_appointments;
                user.profile.notes = retained_notes;
            }
        }

        Ok(Some(user.clone()))
    }

    async fn update_admin_fields(
        &self,
        id: &UserId,
        changes: AdminChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut rows = self.rows.lock().expect("users lock");
        let Some(user) = rows.iter_mut().find(|user| user.id == *id) else {
            return Ok(None);
        };
        user.role = changes.role;
        user.profile.disciplinary_record = changes.fields.disciplinary_record;
        user.profile.club_body_appointments = changes.fields.club_body_appointments;
        user.profile.notes = changes.fields.notes;
        Ok(Some(user.clone()))
    }
}

/// In-memory trip store.
#[derive(Default)]
pub struct InMemoryTrips {
    rows: Mutex<Vec<Trip>>,
}

impl InMemoryTrips {
    /// Number of stored trips.
    pub fn len(&self) -> usize {
        self.rows.lock().expect("trips lock").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Directly seed a trip, bypassing validation.
    pub fn seed(&self, trip: Trip) -> Trip {
        self.rows.lock().expect("trips lock").push(trip.clone());
        trip
    }

    fn get(&self, id: &TripId) -> Option<Trip> {
        self.rows
            .lock()
            .expect("trips lock")
            .iter()
            .find(|trip| trip.id == *id)
            .cloned()
    }
}

#[async_trait]
impl TripRepository for InMemoryTrips {
    async fn insert(&self, trip: NewTrip) -> Result<Trip, TripPersistenceError> {
        let now = Utc::now();
        let trip = Trip {
            id: TripId::random(),
            name: trip.name,
            peak: trip.peak,
            date: trip.date,
            description: trip.description,
            difficulty: trip.difficulty,
            image_url: None,
            distance_km: trip.distance_km,
            ascent_m: trip.ascent_m,
            completed: false,
            guide_id: trip.guide_id,
            second_guide_name: trip.second_guide_name,
            created_by: trip.created_by,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().expect("trips lock").push(trip.clone());
        Ok(trip)
    }

    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, TripPersistenceError> {
        Ok(self.get(id))
    }

    async fn list(&self) -> Result<Vec<Trip>, TripPersistenceError> {
        Ok(self.rows.lock().expect("trips lock").clone())
    }

    async fn set_image_url(
        &self,
        id: &TripId,
        url: &str,
    ) -> Result<Option<Trip>, TripPersistenceError> {
        let mut rows = self.rows.lock().expect("trips lock");
        let Some(trip) = rows.iter_mut().find(|trip| trip.id == *id) else {
            return Ok(None);
        };
        trip.image_url = Some(url.to_owned());
        trip.updated_at = Utc::now();
        Ok(Some(trip.clone()))
    }

    async fn complete(&self, id: &TripId) -> Result<CompletionOutcome, TripPersistenceError> {
        let mut rows = self.rows.lock().expect("trips lock");
        let Some(trip) = rows.iter_mut().find(|trip| trip.id == *id) else {
            return Ok(CompletionOutcome::Missing);
        };
        if trip.completed {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        trip.completed = true;
        trip.updated_at = Utc::now();
        Ok(CompletionOutcome::Completed(trip.clone()))
    }
}

/// In-memory enrollment store fused with the user and trip stores so the
/// transition contract (status write + accrual in one step) holds.
pub struct InMemoryEnrollments {
    users: std::sync::Arc<InMemoryUsers>,
    trips: std::sync::Arc<InMemoryTrips>,
    rows: Mutex<Vec<Enrollment>>,
}

impl InMemoryEnrollments {
    /// Create a store linked to the user and trip stores.
    pub fn new(users: std::sync::Arc<InMemoryUsers>, trips: std::sync::Arc<InMemoryTrips>) -> Self {
        Self {
            users,
            trips,
            rows: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollments {
    async fn insert(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, EnrollmentPersistenceError> {
        let mut rows = self.rows.lock().expect("enrollments lock");
        if rows
            .iter()
            .any(|row| row.trip_id == enrollment.trip_id && row.user_id == enrollment.user_id)
        {
            return Err(EnrollmentPersistenceError::DuplicateEnrollment);
        }
        let enrollment = Enrollment {
            id: EnrollmentId::random(),
            trip_id: enrollment.trip_id,
            user_id: enrollment.user_id,
            status: EnrollmentStatus::Registered,
            created_at: Utc::now(),
        };
        rows.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn find_by_id(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentPersistenceError> {
        Ok(self
            .rows
            .lock()
            .expect("enrollments lock")
            .iter()
            .find(|row| row.id == *id)
            .cloned())
    }

    async fn delete_by_trip_and_user(
        &self,
        trip_id: &TripId,
        user_id: &UserId,
    ) -> Result<bool, EnrollmentPersistenceError> {
        let mut rows = self.rows.lock().expect("enrollments lock");
        let before = rows.len();
        rows.retain(|row| !(row.trip_id == *trip_id && row.user_id == *user_id));
        Ok(rows.len() < before)
    }

    async fn transition(
        &self,
        id: &EnrollmentId,
        next: EnrollmentStatus,
    ) -> Result<Option<StatusTransition>, EnrollmentPersistenceError> {
        let mut rows = self.rows.lock().expect("enrollments lock");
        let Some(row) = rows.iter_mut().find(|row| row.id == *id) else {
            return Ok(None);
        };

        let accrues = row.status.accrues_statistics(next);
        if accrues {
            let trip = self.trips.get(&row.trip_id).ok_or_else(|| {
                EnrollmentPersistenceError::query("enrollment references a missing trip")
            })?;
            self.users
                .accrue(&row.user_id, trip.distance_km, trip.ascent_m);
        }
        row.status = next;

        Ok(Some(StatusTransition {
            enrollment: row.clone(),
            statistics_recorded: accrues,
        }))
    }

    async fn roster_for_trip(
        &self,
        trip_id: &TripId,
    ) -> Result<Vec<RosterEntry>, EnrollmentPersistenceError> {
        let rows = self.rows.lock().expect("enrollments lock");
        rows.iter()
            .filter(|row| row.trip_id == *trip_id)
            .map(|row| {
                let user = self.users.get(&row.user_id).ok_or_else(|| {
                    EnrollmentPersistenceError::query("enrollment references a missing member")
                })?;
                Ok(RosterEntry {
                    enrollment: row.clone(),
                    username: user.username,
                    full_name: user.full_name,
                })
            })
            .collect()
    }

    async fn climbed_trips_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Trip>, EnrollmentPersistenceError> {
        let rows = self.rows.lock().expect("enrollments lock");
        rows.iter()
            .filter(|row| row.user_id == *user_id && row.status == EnrollmentStatus::Climbed)
            .map(|row| {
                self.trips.get(&row.trip_id).ok_or_else(|| {
                    EnrollmentPersistenceError::query("enrollment references a missing trip")
                })
            })
            .collect()
    }

    async fn trip_ids_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TripId>, EnrollmentPersistenceError> {
        Ok(self
            .rows
            .lock()
            .expect("enrollments lock")
            .iter()
            .filter(|row| row.user_id == *user_id)
            .map(|row| row.trip_id)
            .collect())
    }
}

/// Transparent password hasher for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubPasswordHasher;

impl PasswordHasher for StubPasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<SecretHash, CredentialError> {
        Ok(SecretHash::new(format!("stub${plaintext}")))
    }

    fn verify(&self, plaintext: &str, hash: &SecretHash) -> bool {
        hash.as_str() == format!("stub${plaintext}")
    }
}

/// Reversible token codec for tests.
///
/// Tokens are `stub|<user id>|<role>|<username>`; anything else fails
/// verification, mirroring the uniform-failure contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubTokenCodec;

impl TokenCodec for StubTokenCodec {
    fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        Ok(format!(
            "stub|{}|{}|{}",
            claims.user_id,
            claims.role.as_str(),
            claims.username
        ))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut parts = token.splitn(4, '|');
        let (Some("stub"), Some(id), Some(role), Some(username)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Invalid);
        };
        Ok(SessionClaims {
            user_id: UserId::parse(id).map_err(|_| TokenError::Invalid)?,
            username: Username::new(username).map_err(|_| TokenError::Invalid)?,
            role: Role::parse(role).map_err(|_| TokenError::Invalid)?,
        })
    }
}

/// Seed a member with a given username and role.
pub fn seeded_member(users: &InMemoryUsers, username: &str, role: Role) -> User {
    users.seed(username, role)
}

/// Seed a trip with the given metrics.
pub fn seeded_trip(trips: &InMemoryTrips, created_by: UserId, distance_km: f64, ascent_m: i32) -> Trip {
    let now = Utc::now();
    trips.seed(Trip {
        id: TripId::random(),
        name: "Seeded trip".to_owned(),
        peak: "Seeded peak".to_owned(),
        date: chrono::NaiveDate::from_ymd_opt(2026, 5, 9).expect("seed date"),
        description: None,
        difficulty: "T2".to_owned(),
        image_url: None,
        distance_km,
        ascent_m,
        completed: false,
        guide_id: None,
        second_guide_name: None,
        created_by,
        created_at: now,
        updated_at: now,
    })
}
