//! Domain primitives, aggregates, services, and ports.
//!
//! Everything here is transport agnostic. Inbound adapters translate HTTP
//! requests into these types; outbound adapters implement the ports.

pub mod access;
pub mod auth_service;
pub mod enrollment;
pub mod enrollment_service;
pub mod error;
pub mod ports;
pub mod trip;
pub mod trip_service;
pub mod user;

pub use self::auth_service::{
    AdminUpdateDraft, AuthService, BootstrapDraft, LoginOutcome, ProfileUpdateDraft,
    ProfileUpdateOutcome, RegistrationDraft, PASSWORD_MIN,
};
pub use self::enrollment::{ClimbTotals, Enrollment, EnrollmentId, EnrollmentStatus};
pub use self::enrollment_service::{ClimbReport, EnrollmentService};
pub use self::error::{Error, ErrorCode};
pub use self::trip::{NewTrip, Trip, TripDraft, TripId, TripValidationError, DATE_FORMAT};
pub use self::trip_service::{ImageUpload, PersonRef, TripBoard, TripDetail, TripService};
pub use self::user::{
    NewUser, Role, SecretHash, User, UserId, UserProfile, UserStats, UserValidationError, Username,
};

/// Convenient API result alias.
pub type ApiResult<T> = Result<T, Error>;
