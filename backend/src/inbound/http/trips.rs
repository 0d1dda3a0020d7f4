//! Trip API handlers.
//!
//! ```text
//! GET  /api/trips                trip board (active / completed)
//! POST /api/trips                create a trip (admin, multipart)
//! GET  /api/trips/{id}           public trip detail
//! POST /api/trips/{id}/complete  mark completed (admin/guide)
//! ```

use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    ApiResult, Error, ImageUpload, PersonRef, Trip, TripDetail, TripDraft, TripId, UserId,
};

use super::auth::AuthenticatedUser;
use super::state::HttpState;

/// Trip record as returned to clients.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    /// Stable identifier.
    pub id: Uuid,
    /// Trip name.
    pub name: String,
    /// Target peak.
    pub peak: String,
    /// Scheduled date.
    pub date: NaiveDate,
    /// Free-form description.
    pub description: Option<String>,
    /// Difficulty label.
    pub difficulty: String,
    /// Image URL on the CDN.
    pub image_url: Option<String>,
    /// Route length in kilometres.
    pub distance_km: f64,
    /// Cumulative ascent in metres.
    pub ascent_m: i32,
    /// Completion flag.
    pub completed: bool,
    /// Assigned guide identifier.
    pub guide_id: Option<Uuid>,
    /// Free-text second guide name.
    pub second_guide_name: Option<String>,
    /// Creating member identifier.
    pub created_by: Uuid,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: *trip.id.as_uuid(),
            name: trip.name,
            peak: trip.peak,
            date: trip.date,
            description: trip.description,
            difficulty: trip.difficulty,
            image_url: trip.image_url,
            distance_km: trip.distance_km,
            ascent_m: trip.ascent_m,
            completed: trip.completed,
            guide_id: trip.guide_id.map(|id| *id.as_uuid()),
            second_guide_name: trip.second_guide_name,
            created_by: *trip.created_by.as_uuid(),
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

/// Compact member reference embedded in trip details.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
}

impl From<PersonRef> for PersonSummary {
    fn from(person: PersonRef) -> Self {
        Self {
            username: person.username.into(),
            full_name: person.full_name,
        }
    }
}

/// Trip detail with resolved guide/creator display info.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailResponse {
    /// The trip record.
    #[serde(flatten)]
    pub trip: TripResponse,
    /// Assigned guide, when the reference resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide: Option<PersonSummary>,
    /// Creating member, when the reference resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<PersonSummary>,
}

impl From<TripDetail> for TripDetailResponse {
    fn from(detail: TripDetail) -> Self {
        Self {
            trip: TripResponse::from(detail.trip),
            guide: detail.guide.map(PersonSummary::from),
            added_by: detail.created_by.map(PersonSummary::from),
        }
    }
}

/// Trip board partitioned by the completion flag.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripBoardResponse {
    /// Trips still ahead.
    pub active: Vec<TripResponse>,
    /// Completed trips.
    pub completed: Vec<TripResponse>,
}

/// List trips partitioned into active and completed.
#[utoipa::path(
    get,
    path = "/api/trips",
    responses(
        (status = 200, description = "Trip board", body = TripBoardResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["trips"],
    operation_id = "listTrips"
)]
#[get("/trips")]
pub async fn list_trips(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
) -> ApiResult<web::Json<TripBoardResponse>> {
    let board = state.trips.list().await?;
    Ok(web::Json(TripBoardResponse {
        active: board.active.into_iter().map(TripResponse::from).collect(),
        completed: board
            .completed
            .into_iter()
            .map(TripResponse::from)
            .collect(),
    }))
}

/// Multipart form for trip creation.
#[derive(MultipartForm)]
pub struct CreateTripForm {
    /// Trip name.
    pub name: Text<String>,
    /// Target peak.
    pub peak: Text<String>,
    /// Scheduled date, `YYYY-MM-DD`.
    pub date: Text<String>,
    /// Free-form description.
    pub description: Option<Text<String>>,
    /// Difficulty label.
    pub difficulty: Text<String>,
    /// Route length in kilometres.
    #[multipart(rename = "distanceKm")]
    pub distance_km: Text<String>,
    /// Cumulative ascent in metres.
    #[multipart(rename = "ascentM")]
    pub ascent_m: Text<String>,
    /// Assigned guide identifier.
    #[multipart(rename = "guideId")]
    pub guide_id: Option<Text<String>>,
    /// Free-text second guide name.
    #[multipart(rename = "secondGuideName")]
    pub second_guide_name: Option<Text<String>>,
    /// Optional trip image.
    pub image: Option<Bytes>,
}

/// Create a trip; admins only.
///
/// The trip row is committed before the image upload; a failed upload
/// surfaces an error while the trip stays valid without an image.
#[utoipa::path(
    post,
    path = "/api/trips",
    responses(
        (status = 201, description = "Trip created", body = TripResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["trips"],
    operation_id = "createTrip"
)]
#[post("/trips")]
pub async fn create_trip(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    MultipartForm(form): MultipartForm<CreateTripForm>,
) -> ApiResult<HttpResponse> {
    let guide_id = match form.guide_id.as_deref().map(|raw| raw.trim()) {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map(UserId::from_uuid)
                .map_err(|_| Error::invalid_request("guideId must be a valid UUID"))?,
        ),
    };

    let draft = TripDraft {
        name: form.name.0,
        peak: form.peak.0,
        date: form.date.0,
        description: form.description.map(|field| field.0),
        difficulty: form.difficulty.0,
        distance_km: form.distance_km.0,
        ascent_m: form.ascent_m.0,
        guide_id,
        second_guide_name: form.second_guide_name.map(|field| field.0),
    };
    let image = form.image.map(|bytes| ImageUpload {
        bytes: bytes.data.to_vec(),
    });

    let trip = state
        .trips
        .create(user.role(), draft, image, user.user_id())
        .await?;
    Ok(HttpResponse::Created().json(TripResponse::from(trip)))
}

/// Public trip detail (no authentication; used for shared links).
#[utoipa::path(
    get,
    path = "/api/trips/{id}",
    params(("id" = Uuid, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip detail", body = TripDetailResponse),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["trips"],
    operation_id = "tripDetail",
    security([])
)]
#[get("/trips/{id}")]
pub async fn trip_detail(
    state: web::Data<HttpState>,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<TripDetailResponse>> {
    let detail = state.trips.get(&TripId::from_uuid(*id)).await?;
    Ok(web::Json(TripDetailResponse::from(detail)))
}

/// Mark a trip completed; admins and guides only, at most once.
#[utoipa::path(
    post,
    path = "/api/trips/{id}/complete",
    params(("id" = Uuid, Path, description = "Trip identifier")),
    responses(
        (status = 200, description = "Trip completed", body = TripResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Already completed", body = Error)
    ),
    tags = ["trips"],
    operation_id = "completeTrip"
)]
#[post("/trips/{id}/complete")]
pub async fn complete_trip(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<TripResponse>> {
    let trip = state
        .trips
        .complete(user.role(), &TripId::from_uuid(*id))
        .await?;
    Ok(web::Json(TripResponse::from(trip)))
}
