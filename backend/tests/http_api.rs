//! End-to-end HTTP flows over in-memory ports.
//!
//! These tests drive the real route table, extractors, and services with
//! the in-memory repositories and the production argon2/JWT adapters, so
//! the whole request path is exercised without a database.

use std::sync::Arc;
use std::time::Duration;

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test as actix_test, web};
use serde_json::{json, Value};

use backend::inbound::http::{HttpState, HttpStatePorts};
use backend::outbound::security::{Argon2PasswordHasher, HmacTokenCodec, SigningSecret};
use backend::server::build_app;
use backend::test_support::{InMemoryEnrollments, InMemoryTrips, InMemoryUsers};

const TEST_SECRET: &[u8] = b"integration-test-secret";

fn state() -> web::Data<HttpState> {
    let users = Arc::new(InMemoryUsers::default());
    let trips = Arc::new(InMemoryTrips::default());
    let enrollments = Arc::new(InMemoryEnrollments::new(users.clone(), trips.clone()));
    web::Data::new(HttpState::new(HttpStatePorts {
        users,
        trips,
        enrollments,
        hasher: Arc::new(Argon2PasswordHasher),
        tokens: Arc::new(HmacTokenCodec::new(
            &SigningSecret::new(TEST_SECRET),
            Duration::from_secs(60 * 60),
        )),
        images: Arc::new(backend::domain::ports::DisabledImageStore),
    }))
}

async fn app() -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    actix_test::init_service(build_app(state())).await
}

fn multipart_body(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "test-boundary-7f2a";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

async fn bootstrap_admin(
    app: &impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
) {
    let (content_type, body) = multipart_body(&[
        ("username", "ana"),
        ("password", "correct-horse"),
        ("fullName", "Ana Kovac"),
    ]);
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/setup/admin")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

async fn login(
    app: &impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    username: &str,
    password: &str,
) -> String {
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    body.get("token")
        .and_then(Value::as_str)
        .expect("login token")
        .to_owned()
}

async fn register_member(
    app: &impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    admin_token: &str,
    username: &str,
    role: &str,
) -> String {
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/users")
            .insert_header((header::AUTHORIZATION, format!("Bearer {admin_token}")))
            .set_json(json!({
                "username": username,
                "password": "correct-horse",
                "fullName": "Member Name",
                "email": "member@club.example",
                "address": "Trg 1",
                "phone": "+385 91 000 000",
                "role": role,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    body.get("id")
        .and_then(Value::as_str)
        .expect("member id")
        .to_owned()
}

async fn create_trip(
    app: &impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    admin_token: &str,
) -> String {
    let (content_type, body) = multipart_body(&[
        ("name", "Spring ascent"),
        ("peak", "Triglav"),
        ("date", "2026-05-09"),
        ("difficulty", "T3"),
        ("distanceKm", "12.5"),
        ("ascentM", "800"),
    ]);
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/trips")
            .insert_header((header::AUTHORIZATION, format!("Bearer {admin_token}")))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    body.get("id")
        .and_then(Value::as_str)
        .expect("trip id")
        .to_owned()
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

async fn get_json(
    app: &impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    uri: &str,
    token: &str,
) -> Value {
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK, "GET {uri}");
    actix_test::read_body_json(res).await
}

#[actix_web::test]
async fn bootstrap_is_one_time_and_flips_setup_status() {
    let app = app().await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/setup/status")
            .to_request(),
    )
    .await;
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("hasUsers"), Some(&json!(false)));

    bootstrap_admin(&app).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/setup/status")
            .to_request(),
    )
    .await;
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("hasUsers"), Some(&json!(true)));

    // The bootstrap surface closes once a member exists.
    let (content_type, payload) =
        multipart_body(&[("username", "mallory"), ("password", "correct-horse")]);
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/setup/admin")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn login_failures_are_uniform_and_success_grants_access() {
    let app = app().await;
    bootstrap_admin(&app).await;

    let unknown = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "nobody", "password": "correct-horse" }))
            .to_request(),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: Value = actix_test::read_body_json(unknown).await;

    let wrong = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "ana", "password": "wrong-horse" }))
            .to_request(),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = actix_test::read_body_json(wrong).await;

    // No hint which of the two failed.
    assert_eq!(unknown_body, wrong_body);

    let token = login(&app, "ana", "correct-horse").await;
    let me = get_json(&app, "/api/me", &token).await;
    assert_eq!(me.get("username"), Some(&json!("ana")));
    assert_eq!(me.get("role"), Some(&json!("admin")));
    assert!(me.get("passwordHash").is_none());
    assert!(me.get("secretHash").is_none());
}

#[actix_web::test]
async fn protected_routes_reject_missing_and_foreign_tokens() {
    let app = app().await;
    bootstrap_admin(&app).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/api/trips").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Token signed under a different key never reaches a handler.
    let foreign_codec = HmacTokenCodec::new(
        &SigningSecret::new(b"some-other-secret".to_vec()),
        Duration::from_secs(3600),
    );
    let claims = backend::domain::ports::SessionClaims {
        user_id: backend::domain::UserId::random(),
        username: backend::domain::Username::new("ana").expect("username"),
        role: backend::domain::Role::Admin,
    };
    let foreign_token = {
        use backend::domain::ports::TokenCodec;
        foreign_codec.issue(&claims).expect("token issued")
    };
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/trips")
            .insert_header(bearer(&foreign_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn trip_creation_is_admin_only_and_detail_is_public() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    register_member(&app, &admin_token, "marko", "member").await;
    let member_token = login(&app, "marko", "correct-horse").await;

    // A member cannot create trips.
    let (content_type, payload) = multipart_body(&[
        ("name", "Rogue trip"),
        ("peak", "Ucka"),
        ("date", "2026-06-01"),
        ("difficulty", "T1"),
        ("distanceKm", "5"),
        ("ascentM", "300"),
    ]);
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/trips")
            .insert_header(bearer(&member_token))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let trip_id = create_trip(&app, &admin_token).await;

    // Trip detail is readable without any credential.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/trips/{trip_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("peak"), Some(&json!("Triglav")));
    assert_eq!(
        body.get("addedBy").and_then(|v| v.get("username")),
        Some(&json!("ana"))
    );

    // The board partitions by completion.
    let board = get_json(&app, "/api/trips", &member_token).await;
    assert_eq!(
        board.get("active").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
    assert_eq!(
        board
            .get("completed")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(0)
    );
}

#[actix_web::test]
async fn enrollment_lifecycle_accrues_statistics_exactly_once() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    let member_id = register_member(&app, &admin_token, "marko", "member").await;
    register_member(&app, &admin_token, "vesna", "guide").await;
    let member_token = login(&app, "marko", "correct-horse").await;
    let guide_token = login(&app, "vesna", "correct-horse").await;
    let trip_id = create_trip(&app, &admin_token).await;

    // Enroll; a second attempt conflicts.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let enrollment: Value = actix_test::read_body_json(res).await;
    assert_eq!(enrollment.get("status"), Some(&json!("registered")));
    let enrollment_id = enrollment
        .get("id")
        .and_then(Value::as_str)
        .expect("enrollment id")
        .to_owned();

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The roster resolves the member's username.
    let roster = get_json(
        &app,
        &format!("/api/trips/{trip_id}/enrollments"),
        &guide_token,
    )
    .await;
    assert_eq!(
        roster
            .as_array()
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("username")),
        Some(&json!("marko"))
    );

    // Members cannot change statuses.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/enrollments/{enrollment_id}/status"))
            .insert_header(bearer(&member_token))
            .set_json(json!({ "status": "climbed" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Unknown labels are rejected.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/enrollments/{enrollment_id}/status"))
            .insert_header(bearer(&guide_token))
            .set_json(json!({ "status": "summited" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Guide marks climbed; statistics accrue once.
    for _ in 0..2 {
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/enrollments/{enrollment_id}/status"))
                .insert_header(bearer(&guide_token))
                .set_json(json!({ "status": "climbed" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let stats = get_json(
        &app,
        &format!("/api/users/{member_id}/stats"),
        &member_token,
    )
    .await;
    assert_eq!(
        stats.get("stats"),
        Some(&json!({
            "totalDistanceKm": 12.5,
            "totalAscentM": 800,
            "climbsCount": 1,
        }))
    );

    // The derived aggregate agrees with the cached one.
    let climbs = get_json(&app, "/api/me/climbs", &member_token).await;
    assert_eq!(
        climbs.get("totals"),
        Some(&json!({
            "totalDistanceKm": 12.5,
            "totalAscentM": 800,
            "climbsCount": 1,
        }))
    );
    assert_eq!(
        climbs.get("trips").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
}

#[actix_web::test]
async fn withdrawal_frees_the_slot_for_a_fresh_registration() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    register_member(&app, &admin_token, "marko", "member").await;
    let member_token = login(&app, "marko", "correct-horse").await;
    let trip_id = create_trip(&app, &admin_token).await;

    // Withdraw without an enrollment conflicts.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let enrolled = get_json(&app, "/api/me/enrollments", &member_token).await;
    assert_eq!(
        enrolled.get("tripIds"),
        Some(&json!([trip_id.clone()]))
    );

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // Re-enrolling succeeds and starts registered again.
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/enrollments"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("status"), Some(&json!("registered")));
}

#[actix_web::test]
async fn completion_is_role_gated_and_idempotency_guarded() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    register_member(&app, &admin_token, "marko", "member").await;
    let member_token = login(&app, "marko", "correct-horse").await;
    let trip_id = create_trip(&app, &admin_token).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/complete"))
            .insert_header(bearer(&member_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/complete"))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/trips/{trip_id}/complete"))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let board = get_json(&app, "/api/trips", &member_token).await;
    assert_eq!(
        board
            .get("completed")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(1)
    );
}

#[actix_web::test]
async fn admin_edits_roles_and_members_cannot() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    let member_id = register_member(&app, &admin_token, "marko", "member").await;
    let member_token = login(&app, "marko", "correct-horse").await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/users/{member_id}"))
            .insert_header(bearer(&member_token))
            .set_json(json!({ "role": "admin" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/users/{member_id}"))
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "role": "guide", "notes": "leads the beginner group" }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("role"), Some(&json!("guide")));
    assert_eq!(body.get("notes"), Some(&json!("leads the beginner group")));
}

#[actix_web::test]
async fn duplicate_usernames_conflict_on_registration() {
    let app = app().await;
    bootstrap_admin(&app).await;
    let admin_token = login(&app, "ana", "correct-horse").await;
    register_member(&app, &admin_token, "marko", "member").await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&admin_token))
            .set_json(json!({
                "username": "marko",
                "password": "correct-horse",
                "fullName": "Second Marko",
                "email": "marko2@club.example",
                "address": "Trg 2",
                "phone": "+385 91 111 111",
                "role": "member",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
