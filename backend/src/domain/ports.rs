//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (database, password hashing, token signing, image hosting). Each trait
//! exposes strongly typed errors so adapters map their failures into
//! predictable variants instead of returning a blanket error type.

use async_trait::async_trait;
use thiserror::Error;

use super::enrollment::{Enrollment, EnrollmentId, EnrollmentStatus};
use super::error::Error;
use super::trip::{NewTrip, Trip, TripId};
use super::user::{NewUser, Role, SecretHash, User, UserId, UserProfile, Username};

/// Persistence errors raised by [`UserRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserPersistenceError {
    /// The username is already taken.
    #[error("username is already taken")]
    DuplicateUsername,
    /// Repository connection could not be established.
    #[error("user repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("user repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl UserPersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<UserPersistenceError> for Error {
    fn from(value: UserPersistenceError) -> Self {
        match value {
            UserPersistenceError::DuplicateUsername => Self::conflict("username is already taken"),
            UserPersistenceError::Connection { message } => Self::service_unavailable(message),
            UserPersistenceError::Query { message } => Self::internal(message),
        }
    }
}

/// Persistence errors raised by [`TripRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripPersistenceError {
    /// Repository connection could not be established.
    #[error("trip repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("trip repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl TripPersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<TripPersistenceError> for Error {
    fn from(value: TripPersistenceError) -> Self {
        match value {
            TripPersistenceError::Connection { message } => Self::service_unavailable(message),
            TripPersistenceError::Query { message } => Self::internal(message),
        }
    }
}

/// Persistence errors raised by [`EnrollmentRepository`] adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentPersistenceError {
    /// The member already holds an enrollment for this trip.
    #[error("member is already enrolled for this trip")]
    DuplicateEnrollment,
    /// Repository connection could not be established.
    #[error("enrollment repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("enrollment repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl EnrollmentPersistenceError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<EnrollmentPersistenceError> for Error {
    fn from(value: EnrollmentPersistenceError) -> Self {
        match value {
            EnrollmentPersistenceError::DuplicateEnrollment => {
                Self::conflict("member is already enrolled for this trip")
            }
            EnrollmentPersistenceError::Connection { message } => {
                Self::service_unavailable(message)
            }
            EnrollmentPersistenceError::Query { message } => Self::internal(message),
        }
    }
}

/// Errors surfaced by the image hosting adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageStoreError {
    /// No image host is configured for this deployment.
    #[error("image uploads are not configured")]
    NotConfigured,
    /// The upload was attempted and failed.
    #[error("image upload failed: {message}")]
    Upload {
        /// Adapter-provided context.
        message: String,
    },
}

impl ImageStoreError {
    /// Helper for upload failures.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the token codec.
///
/// Verification failures are deliberately uniform: malformed tokens, bad
/// signatures, foreign algorithms, and expired tokens all collapse into
/// [`TokenError::Invalid`] so callers cannot distinguish them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token failed verification.
    #[error("invalid or expired token")]
    Invalid,
    /// Signing a fresh token failed.
    #[error("token signing failed: {message}")]
    Issue {
        /// Adapter-provided context.
        message: String,
    },
}

impl TokenError {
    /// Helper for signing failures.
    pub fn issue(message: impl Into<String>) -> Self {
        Self::Issue {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the password hashing adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Hashing the secret failed.
    #[error("password hashing failed: {message}")]
    Hash {
        /// Adapter-provided context.
        message: String,
    },
}

impl CredentialError {
    /// Helper for hashing failures.
    pub fn hash(message: impl Into<String>) -> Self {
        Self::Hash {
            message: message.into(),
        }
    }
}

/// Allow-listed self-edit changes applied through [`UserRepository`].
///
/// The boundary fills every field from the submitted form, so text fields
/// replace their stored values wholesale (a blank submission clears the
/// field). Admin-only fields travel separately and are `None` unless the
/// caller holds the admin role.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    /// New username (may equal the current one).
    pub username: Username,
    /// Display name.
    pub full_name: String,
    /// Replacement membership-card fields (admin-only fields ignored).
    pub profile: UserProfile,
    /// New password hash, when the member changed their password.
    pub secret_hash: Option<SecretHash>,
    /// New avatar URL, when a fresh image was uploaded.
    pub avatar_url: Option<String>,
    /// Admin-only field replacement, present only for admin callers.
    pub admin_fields: Option<AdminFields>,
}

/// Fields only an admin may edit.
#[derive(Debug, Clone, Default)]
pub struct AdminFields {
    /// Disciplinary record.
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies.
    pub club_body_appointments: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Admin edit applied through [`UserRepository::update_admin_fields`].
#[derive(Debug, Clone)]
pub struct AdminChanges {
    /// Role to assign.
    pub role: Role,
    /// Admin-only field replacement.
    pub fields: AdminFields,
}

/// Persistence port for member records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new member; duplicate usernames surface as
    /// [`UserPersistenceError::DuplicateUsername`].
    async fn insert(&self, user: NewUser) -> Result<User, UserPersistenceError>;

    /// Fetch a member by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch a member by exact username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// List every member in creation order.
    async fn list(&self) -> Result<Vec<User>, UserPersistenceError>;

    /// Count stored members (drives the bootstrap gate).
    async fn count(&self) -> Result<u64, UserPersistenceError>;

    /// Apply a self-edit; returns `None` when the member does not exist.
    async fn update_profile(
        &self,
        id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Apply an admin edit; returns `None` when the member does not exist.
    async fn update_admin_fields(
        &self,
        id: &UserId,
        changes: AdminChanges,
    ) -> Result<Option<User>, UserPersistenceError>;
}

/// Outcome of a completion attempt on a trip.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The flag flipped false to true in this call.
    Completed(Trip),
    /// The trip was already completed; nothing changed.
    AlreadyCompleted,
    /// No trip exists under this identifier.
    Missing,
}

/// Persistence port for trip records.
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Insert a validated trip.
    async fn insert(&self, trip: NewTrip) -> Result<Trip, TripPersistenceError>;

    /// Fetch a trip by identifier.
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, TripPersistenceError>;

    /// List every trip in creation order.
    async fn list(&self) -> Result<Vec<Trip>, TripPersistenceError>;

    /// Store the CDN URL of an uploaded image; `None` when the trip is gone.
    async fn set_image_url(
        &self,
        id: &TripId,
        url: &str,
    ) -> Result<Option<Trip>, TripPersistenceError>;

    /// Flip the completion flag false to true at most once.
    ///
    /// Implementations must make the flip conditional so two concurrent
    /// calls cannot both observe [`CompletionOutcome::Completed`].
    async fn complete(&self, id: &TripId) -> Result<CompletionOutcome, TripPersistenceError>;
}

/// Fields required to insert a new enrollment.
#[derive(Debug, Clone, Copy)]
pub struct NewEnrollment {
    /// Trip being signed up for.
    pub trip_id: TripId,
    /// Member signing up.
    pub user_id: UserId,
}

/// Enrollment joined with the member's display fields for roster views.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    /// The enrollment record.
    pub enrollment: Enrollment,
    /// The enrolled member's username.
    pub username: Username,
    /// The enrolled member's display name.
    pub full_name: String,
}

/// Result of an atomic status transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransition {
    /// The enrollment after the transition.
    pub enrollment: Enrollment,
    /// Whether this call accrued statistics on the member.
    pub statistics_recorded: bool,
}

/// Persistence port for enrollments.
///
/// ## Atomicity contract
/// - [`EnrollmentRepository::insert`] must rely on the storage-level
///   uniqueness of `(trip, user)` rather than a separate existence check,
///   surfacing duplicates as
///   [`EnrollmentPersistenceError::DuplicateEnrollment`].
/// - [`EnrollmentRepository::transition`] must apply the status write and
///   the statistics accrual decided by
///   [`EnrollmentStatus::accrues_statistics`] as one atomic unit, so two
///   concurrent transitions cannot double-count.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a fresh `registered` enrollment.
    async fn insert(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, EnrollmentPersistenceError>;

    /// Fetch an enrollment by identifier.
    async fn find_by_id(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentPersistenceError>;

    /// Remove the member's enrollment for a trip; `false` when absent.
    async fn delete_by_trip_and_user(
        &self,
        trip_id: &TripId,
        user_id: &UserId,
    ) -> Result<bool, EnrollmentPersistenceError>;

    /// Atomically set the status, accruing member statistics when the
    /// transition first arrives in `climbed`. `None` when the enrollment
    /// does not exist.
    async fn transition(
        &self,
        id: &EnrollmentId,
        next: EnrollmentStatus,
    ) -> Result<Option<StatusTransition>, EnrollmentPersistenceError>;

    /// Roster for a trip with resolved member display fields.
    async fn roster_for_trip(
        &self,
        trip_id: &TripId,
    ) -> Result<Vec<RosterEntry>, EnrollmentPersistenceError>;

    /// Trips the member has climbed, in creation order.
    async fn climbed_trips_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Trip>, EnrollmentPersistenceError>;

    /// Identifiers of every trip the member is enrolled in.
    async fn trip_ids_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TripId>, EnrollmentPersistenceError>;
}

/// Port for hosting uploaded images on a CDN.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload raw image bytes and return the public URL.
    async fn upload(&self, bytes: Vec<u8>, hint: &str) -> Result<String, ImageStoreError>;
}

/// Image store used when no host is configured; every upload fails with
/// [`ImageStoreError::NotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _bytes: Vec<u8>, _hint: &str) -> Result<String, ImageStoreError> {
        Err(ImageStoreError::NotConfigured)
    }
}

/// Identity claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Authenticated member.
    pub user_id: UserId,
    /// Username at issue time.
    pub username: Username,
    /// Role at issue time.
    pub role: Role,
}

/// Port for issuing and verifying signed session tokens.
pub trait TokenCodec: Send + Sync {
    /// Sign a fresh token for the given claims.
    fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError>;

    /// Verify a presented token and decode its claims.
    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

/// Port for one-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext secret into a PHC string.
    fn hash(&self, plaintext: &str) -> Result<SecretHash, CredentialError>;

    /// Verify a plaintext secret against a stored hash; fails closed on
    /// malformed hashes.
    fn verify(&self, plaintext: &str, hash: &SecretHash) -> bool;
}
