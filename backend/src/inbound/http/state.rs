//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports, and tests can substitute in-memory
//! implementations without wiring persistence.

use std::sync::Arc;

use crate::domain::ports::{
    EnrollmentRepository, ImageStore, PasswordHasher, TokenCodec, TripRepository, UserRepository,
};
use crate::domain::{AuthService, EnrollmentService, TripService};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    /// Member repository.
    pub users: Arc<dyn UserRepository>,
    /// Trip repository.
    pub trips: Arc<dyn TripRepository>,
    /// Enrollment repository.
    pub enrollments: Arc<dyn EnrollmentRepository>,
    /// Password hashing primitive.
    pub hasher: Arc<dyn PasswordHasher>,
    /// Session token codec.
    pub tokens: Arc<dyn TokenCodec>,
    /// Image hosting adapter.
    pub images: Arc<dyn ImageStore>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Authentication and member management.
    pub auth: AuthService,
    /// Trip registry.
    pub trips: TripService,
    /// Enrollment engine.
    pub enrollments: EnrollmentService,
    /// Token codec consulted by the access guard.
    pub tokens: Arc<dyn TokenCodec>,
    /// Image hosting adapter for avatar uploads.
    pub images: Arc<dyn ImageStore>,
}

impl HttpState {
    /// Assemble the services over a ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            users,
            trips,
            enrollments,
            hasher,
            tokens,
            images,
        } = ports;

        Self {
            auth: AuthService::new(users.clone(), hasher, tokens.clone()),
            trips: TripService::new(trips.clone(), users.clone(), images.clone()),
            enrollments: EnrollmentService::new(enrollments, trips, users),
            tokens,
            images,
        }
    }
}
