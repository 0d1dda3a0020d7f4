//! Bearer-token access guard.
//!
//! `AuthenticatedUser` is an extractor: any handler that takes it is
//! behind authentication, and a missing, malformed, expired, or foreign
//! token short-circuits with `401 Unauthorized` before the handler body
//! runs. Second-phase role checks go through the central operation table
//! in [`crate::domain::access`].

use actix_web::http::header;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::domain::access::{self, Operation};
use crate::domain::ports::SessionClaims;
use crate::domain::{Error, Role, UserId, Username};

use super::state::HttpState;

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(SessionClaims);

impl AuthenticatedUser {
    /// The authenticated member's identifier.
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    /// The username carried by the token.
    pub fn username(&self) -> &Username {
        &self.0.username
    }

    /// The role carried by the token.
    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Borrow the full claims.
    pub fn claims(&self) -> &SessionClaims {
        &self.0
    }

    /// Second-phase authorization against the central operation table.
    pub fn authorize(&self, operation: Operation) -> Result<(), Error> {
        access::require(self.role(), operation)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(req: &HttpRequest) -> Result<&str, Error> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("authorization header required"))?
        .to_str()
        .map_err(|_| Error::unauthorized("invalid authorization header"))?
        .trim();

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::unauthorized("invalid authorization format"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::unauthorized("invalid authorization format"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::unauthorized("invalid authorization format"));
    }
    Ok(token)
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("http state is not configured"))?;
    let token = bearer_token(req)?;
    let claims = state
        .tokens
        .verify(token)
        .map_err(|_| Error::unauthorized("invalid or expired token"))?;
    Ok(AuthenticatedUser(claims))
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::TokenCodec;
    use crate::domain::ErrorCode;
    use crate::test_support::{
        InMemoryEnrollments, InMemoryTrips, InMemoryUsers, StubPasswordHasher, StubTokenCodec,
    };
    use actix_web::test::TestRequest;
    use rstest::rstest;
    use std::sync::Arc;

    fn state() -> web::Data<HttpState> {
        let users = Arc::new(InMemoryUsers::default());
        let trips = Arc::new(InMemoryTrips::default());
        let enrollments = Arc::new(InMemoryEnrollments::new(users.clone(), trips.clone()));
        web::Data::new(HttpState::new(super::super::state::HttpStatePorts {
            users,
            trips,
            enrollments,
            hasher: Arc::new(StubPasswordHasher),
            tokens: Arc::new(StubTokenCodec),
            images: Arc::new(crate::domain::ports::DisabledImageStore),
        }))
    }

    fn valid_token() -> String {
        StubTokenCodec
            .issue(&SessionClaims {
                user_id: UserId::random(),
                username: Username::new("ana").expect("username"),
                role: Role::Member,
            })
            .expect("token issued")
    }

    #[rstest]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default().app_data(state()).to_http_request();
        let err = authenticate(&req).expect_err("missing header rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[case("Basic dXNlcjpwdw==")]
    #[case("Bearer")]
    #[case("Bearer   ")]
    #[case("token-without-scheme")]
    fn malformed_headers_are_unauthorized(#[case] header_value: &str) {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, header_value))
            .app_data(state())
            .to_http_request();
        let err = authenticate(&req).expect_err("malformed header rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn foreign_tokens_are_unauthorized() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer not-a-stub-token"))
            .app_data(state())
            .to_http_request();
        let err = authenticate(&req).expect_err("foreign token rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn valid_bearer_tokens_resolve_identity() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", valid_token())))
            .app_data(state())
            .to_http_request();
        let user = authenticate(&req).expect("valid token accepted");
        assert_eq!(user.username().as_str(), "ana");
        assert_eq!(user.role(), Role::Member);
    }

    #[rstest]
    fn scheme_matching_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("bearer {}", valid_token())))
            .app_data(state())
            .to_http_request();
        assert!(authenticate(&req).is_ok());
    }

    #[rstest]
    fn authorize_consults_the_central_table() {
        let user = AuthenticatedUser(SessionClaims {
            user_id: UserId::random(),
            username: Username::new("ana").expect("username"),
            role: Role::Member,
        });
        let err = user
            .authorize(Operation::CreateTrip)
            .expect_err("member cannot create trips");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
