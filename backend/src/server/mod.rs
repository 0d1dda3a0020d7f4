//! Application assembly: adapter wiring and route registration.

pub mod config;

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::domain::ports::{DisabledImageStore, ImageStore};
use crate::inbound::http::{enrollments, trips, users, HttpState, HttpStatePorts};
use crate::middleware::Trace;
use crate::outbound::images::CloudinaryImageStore;
use crate::outbound::persistence::{
    DbPool, DieselEnrollmentRepository, DieselTripRepository, DieselUserRepository,
};
use crate::outbound::security::{Argon2PasswordHasher, HmacTokenCodec};

use config::AppConfig;

/// Wire the production adapters into the HTTP state.
pub fn build_state(pool: &DbPool, config: &AppConfig) -> std::io::Result<HttpState> {
    let images: Arc<dyn ImageStore> = match &config.cloudinary {
        Some(cloudinary) => Arc::new(
            CloudinaryImageStore::new(cloudinary.clone()).map_err(std::io::Error::other)?,
        ),
        None => Arc::new(DisabledImageStore),
    };

    Ok(HttpState::new(HttpStatePorts {
        users: Arc::new(DieselUserRepository::new(pool.clone())),
        trips: Arc::new(DieselTripRepository::new(pool.clone())),
        enrollments: Arc::new(DieselEnrollmentRepository::new(pool.clone())),
        hasher: Arc::new(Argon2PasswordHasher),
        tokens: Arc::new(HmacTokenCodec::new(&config.signing_secret, config.token_ttl)),
        images,
    }))
}

/// Build the actix application over prepared state.
pub fn build_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api")
        .service(users::setup_status)
        .service(users::bootstrap_admin)
        .service(users::me)
        .service(users::update_profile)
        .service(users::register)
        .service(users::list_users)
        .service(users::get_user)
        .service(users::admin_update_user)
        .service(users::user_stats)
        .service(trips::list_trips)
        .service(trips::create_trip)
        .service(trips::trip_detail)
        .service(trips::complete_trip)
        .service(enrollments::enroll)
        .service(enrollments::withdraw)
        .service(enrollments::roster)
        .service(enrollments::set_status)
        .service(enrollments::my_climbs)
        .service(enrollments::user_climbs)
        .service(enrollments::my_enrollments);

    let app = App::new()
        .app_data(state)
        .wrap(Trace)
        .service(users::login)
        .service(api);

    #[cfg(debug_assertions)]
    let app = app.service(
        SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", crate::ApiDoc::openapi()),
    );

    app
}
