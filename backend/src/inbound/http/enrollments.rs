//! Enrollment API handlers.
//!
//! ```text
//! POST   /api/trips/{id}/enrollments     sign up for a trip
//! DELETE /api/trips/{id}/enrollments     withdraw a sign-up
//! GET    /api/trips/{id}/enrollments     trip roster
//! POST   /api/enrollments/{id}/status    set status (admin/guide)
//! GET    /api/me/climbs                  calling member's climbed trips
//! GET    /api/me/enrollments             calling member's enrolled trip ids
//! GET    /api/users/{id}/climbs          a member's climbed trips
//! ```

use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::RosterEntry;
use crate::domain::{
    ApiResult, ClimbReport, ClimbTotals, Enrollment, EnrollmentId, EnrollmentStatus, Error, TripId,
    UserId,
};

use super::auth::AuthenticatedUser;
use super::state::HttpState;
use super::trips::TripResponse;

/// Enrollment record as returned to clients.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    /// Stable identifier.
    pub id: Uuid,
    /// Trip signed up for.
    pub trip_id: Uuid,
    /// Enrolled member.
    pub user_id: Uuid,
    /// Lifecycle status.
    pub status: EnrollmentStatus,
    /// Sign-up timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: *enrollment.id.as_uuid(),
            trip_id: *enrollment.trip_id.as_uuid(),
            user_id: *enrollment.user_id.as_uuid(),
            status: enrollment.status,
            created_at: enrollment.created_at,
        }
    }
}

/// Roster entry with resolved member display fields.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntryResponse {
    /// Enrollment identifier.
    pub id: Uuid,
    /// The enrolled member's username.
    pub username: String,
    /// The enrolled member's display name.
    pub full_name: String,
    /// Lifecycle status.
    pub status: EnrollmentStatus,
    /// Sign-up timestamp.
    pub enrolled_at: DateTime<Utc>,
}

impl From<RosterEntry> for RosterEntryResponse {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: *entry.enrollment.id.as_uuid(),
            username: entry.username.into(),
            full_name: entry.full_name,
            status: entry.enrollment.status,
            enrolled_at: entry.enrollment.created_at,
        }
    }
}

/// Sign the calling member up for a trip.
#[utoipa::path(
    post,
    path = "/api/trips/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Trip identifier")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Trip not found", body = Error),
        (status = 409, description = "Already enrolled", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "enroll"
)]
#[post("/trips/{id}/enrollments")]
pub async fn enroll(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let enrollment = state
        .enrollments
        .enroll(user.user_id(), TripId::from_uuid(*id))
        .await?;
    Ok(HttpResponse::Created().json(EnrollmentResponse::from(enrollment)))
}

/// Withdraw the calling member's sign-up for a trip.
#[utoipa::path(
    delete,
    path = "/api/trips/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Trip identifier")),
    responses(
        (status = 204, description = "Withdrawn"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Not enrolled", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "withdraw"
)]
#[delete("/trips/{id}/enrollments")]
pub async fn withdraw(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    state
        .enrollments
        .withdraw(user.user_id(), TripId::from_uuid(*id))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Roster for a trip with resolved member display fields.
#[utoipa::path(
    get,
    path = "/api/trips/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Roster", body = [RosterEntryResponse]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Trip not found", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "tripRoster"
)]
#[get("/trips/{id}/enrollments")]
pub async fn roster(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<Vec<RosterEntryResponse>>> {
    let entries = state.enrollments.roster(&TripId::from_uuid(*id)).await?;
    Ok(web::Json(
        entries.into_iter().map(RosterEntryResponse::from).collect(),
    ))
}

/// Status update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StatusRequest {
    /// New status label from the closed set.
    pub status: String,
}

/// Set an enrollment's status; admins and guides only.
///
/// First arrival in `climbed` accrues the member's statistics exactly
/// once, atomically with the status write.
#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/status",
    params(("id" = Uuid, Path, description = "Enrollment identifier")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status updated", body = EnrollmentResponse),
        (status = 400, description = "Unknown status", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "setEnrollmentStatus"
)]
#[post("/enrollments/{id}/status")]
pub async fn set_status(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    payload: web::Json<StatusRequest>,
) -> ApiResult<web::Json<EnrollmentResponse>> {
    let enrollment = state
        .enrollments
        .set_status(
            user.role(),
            &EnrollmentId::from_uuid(*id),
            payload.status.trim(),
        )
        .await?;
    Ok(web::Json(EnrollmentResponse::from(enrollment)))
}

/// Climbed trips plus the on-demand aggregate.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClimbReportResponse {
    /// Climbed trips in creation order.
    pub trips: Vec<TripResponse>,
    /// Aggregate summed at query time.
    pub totals: ClimbTotals,
}

impl From<ClimbReport> for ClimbReportResponse {
    fn from(report: ClimbReport) -> Self {
        Self {
            trips: report.trips.into_iter().map(TripResponse::from).collect(),
            totals: report.totals,
        }
    }
}

/// Calling member's climbed trips and totals.
#[utoipa::path(
    get,
    path = "/api/me/climbs",
    responses(
        (status = 200, description = "Climb report", body = ClimbReportResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "myClimbs"
)]
#[get("/me/climbs")]
pub async fn my_climbs(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<ClimbReportResponse>> {
    let report = state.enrollments.climbs_for_user(&user.user_id()).await?;
    Ok(web::Json(ClimbReportResponse::from(report)))
}

/// A member's climbed trips and totals.
#[utoipa::path(
    get,
    path = "/api/users/{id}/climbs",
    params(("id" = Uuid, Path, description = "Member identifier")),
    responses(
        (status = 200, description = "Climb report", body = ClimbReportResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "memberClimbs"
)]
#[get("/users/{id}/climbs")]
pub async fn user_climbs(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<ClimbReportResponse>> {
    let report = state
        .enrollments
        .climbs_for_user(&UserId::from_uuid(*id))
        .await?;
    Ok(web::Json(ClimbReportResponse::from(report)))
}

/// Enrolled trip identifiers response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledTripsResponse {
    /// Identifiers of trips the member is enrolled in.
    pub trip_ids: Vec<Uuid>,
}

/// Identifiers of every trip the calling member is enrolled in.
#[utoipa::path(
    get,
    path = "/api/me/enrollments",
    responses(
        (status = 200, description = "Enrolled trips", body = EnrolledTripsResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "myEnrollments"
)]
#[get("/me/enrollments")]
pub async fn my_enrollments(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<EnrolledTripsResponse>> {
    let ids = state
        .enrollments
        .enrolled_trip_ids(&user.user_id())
        .await?;
    Ok(web::Json(EnrolledTripsResponse {
        trip_ids: ids.into_iter().map(|id| *id.as_uuid()).collect(),
    }))
}
