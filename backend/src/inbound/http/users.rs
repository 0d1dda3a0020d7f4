//! Member API handlers.
//!
//! ```text
//! POST  /login                 authenticate, returns a bearer token
//! GET   /api/setup/status      whether any member exists yet
//! POST  /api/setup/admin       one-time first-admin bootstrap (multipart)
//! GET   /api/me                calling member's record
//! PATCH /api/me                profile self-edit (multipart)
//! POST  /api/users             register a member (admin/secretary)
//! GET   /api/users             list members
//! GET   /api/users/{id}        member detail
//! PATCH /api/users/{id}        admin edit (role, disciplinary fields)
//! GET   /api/users/{id}/stats  cached climb statistics
//! ```

use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{get, patch, post, web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    AdminUpdateDraft, ApiResult, BootstrapDraft, Error, ProfileUpdateDraft, RegistrationDraft,
    Role, User, UserId, UserStats,
};

use super::auth::AuthenticatedUser;
use super::state::HttpState;

/// Member record as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Stable identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Parent name.
    pub parent_name: Option<String>,
    /// Citizenship.
    pub citizenship: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Identity-document number.
    pub id_document_number: Option<String>,
    /// Mountaineering licence number.
    pub licence_number: Option<String>,
    /// Membership stamp number.
    pub membership_card_number: Option<String>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Club joining date.
    pub joined_on: Option<NaiveDate>,
    /// Disciplinary record.
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies.
    pub club_body_appointments: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Cached climb statistics.
    pub stats: UserStats,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let User {
            id,
            username,
            secret_hash: _,
            full_name,
            role,
            profile,
            stats,
            created_at,
        } = user;
        Self {
            id: *id.as_uuid(),
            username: username.into(),
            full_name,
            role,
            parent_name: profile.parent_name,
            citizenship: profile.citizenship,
            address: profile.address,
            phone: profile.phone,
            email: profile.email,
            id_document_number: profile.id_document_number,
            licence_number: profile.licence_number,
            membership_card_number: profile.membership_card_number,
            birth_date: profile.birth_date,
            joined_on: profile.joined_on,
            disciplinary_record: profile.disciplinary_record,
            club_body_appointments: profile.club_body_appointments,
            notes: profile.notes,
            avatar_url: profile.avatar_url,
            stats,
            created_at,
        }
    }
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Compact member reference returned with a login.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
}

/// Login response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Role of the authenticated member.
    pub role: Role,
    /// Compact member reference.
    pub user: LoginUser,
}

/// Authenticate and obtain a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let payload = payload.into_inner();
    let outcome = state.auth.login(&payload.username, &payload.password).await?;
    Ok(web::Json(LoginResponse {
        token: outcome.token,
        role: outcome.user.role,
        user: LoginUser {
            username: outcome.user.username.to_string(),
            full_name: outcome.user.full_name,
        },
    }))
}

/// Setup status response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    /// Whether any member exists yet.
    pub has_users: bool,
}

/// Whether the one-time admin bootstrap is still open.
#[utoipa::path(
    get,
    path = "/api/setup/status",
    responses((status = 200, description = "Setup status", body = SetupStatusResponse)),
    tags = ["setup"],
    operation_id = "setupStatus",
    security([])
)]
#[get("/setup/status")]
pub async fn setup_status(state: web::Data<HttpState>) -> ApiResult<web::Json<SetupStatusResponse>> {
    let has_users = state.auth.has_users().await?;
    Ok(web::Json(SetupStatusResponse { has_users }))
}

/// Multipart form for the one-time admin bootstrap.
#[derive(MultipartForm)]
pub struct BootstrapForm {
    /// Requested username.
    pub username: Text<String>,
    /// Plaintext password.
    pub password: Text<String>,
    /// Display name.
    #[multipart(rename = "fullName")]
    pub full_name: Option<Text<String>>,
    /// Parent name.
    #[multipart(rename = "parentName")]
    pub parent_name: Option<Text<String>>,
    /// Citizenship.
    pub citizenship: Option<Text<String>>,
    /// Postal address.
    pub address: Option<Text<String>>,
    /// Contact phone number.
    pub phone: Option<Text<String>>,
    /// Contact email.
    pub email: Option<Text<String>>,
    /// Identity-document number.
    #[multipart(rename = "idDocumentNumber")]
    pub id_document_number: Option<Text<String>>,
    /// Mountaineering licence number.
    #[multipart(rename = "licenceNumber")]
    pub licence_number: Option<Text<String>>,
    /// Membership stamp number.
    #[multipart(rename = "membershipCardNumber")]
    pub membership_card_number: Option<Text<String>>,
    /// Date of birth, `YYYY-MM-DD`.
    #[multipart(rename = "birthDate")]
    pub birth_date: Option<Text<String>>,
    /// Club joining date, `YYYY-MM-DD`.
    #[multipart(rename = "joinedOn")]
    pub joined_on: Option<Text<String>>,
    /// Disciplinary record.
    #[multipart(rename = "disciplinaryRecord")]
    pub disciplinary_record: Option<Text<String>>,
    /// Appointments to club bodies.
    #[multipart(rename = "clubBodyAppointments")]
    pub club_body_appointments: Option<Text<String>>,
    /// Free-form notes.
    pub notes: Option<Text<String>>,
    /// Optional avatar image.
    pub avatar: Option<Bytes>,
}

fn text(value: Option<Text<String>>) -> Option<String> {
    value.map(|field| field.0)
}

/// Create the very first admin account (permitted only while no member
/// exists).
#[utoipa::path(
    post,
    path = "/api/setup/admin",
    responses(
        (status = 201, description = "Admin created", body = UserResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Members already exist", body = Error)
    ),
    tags = ["setup"],
    operation_id = "bootstrapAdmin",
    security([])
)]
#[post("/setup/admin")]
pub async fn bootstrap_admin(
    state: web::Data<HttpState>,
    MultipartForm(form): MultipartForm<BootstrapForm>,
) -> ApiResult<HttpResponse> {
    // Refuse before touching the image host; the service re-checks inside.
    if state.auth.has_users().await? {
        return Err(Error::forbidden(
            "initial admin registration is closed; members already exist",
        ));
    }

    let avatar_url = match form.avatar {
        Some(avatar) => {
            let hint = format!("avatars/setup-{}", form.username.0);
            let url = state
                .images
                .upload(avatar.data.to_vec(), &hint)
                .await
                .map_err(|err| {
                    Error::internal("avatar upload failed")
                        .with_details(json!({ "code": "image_upload_failed", "reason": err.to_string() }))
                })?;
            Some(url)
        }
        None => None,
    };

    let draft = BootstrapDraft {
        username: form.username.0,
        password: form.password.0,
        full_name: text(form.full_name),
        parent_name: text(form.parent_name),
        citizenship: text(form.citizenship),
        address: text(form.address),
        phone: text(form.phone),
        email: text(form.email),
        id_document_number: text(form.id_document_number),
        licence_number: text(form.licence_number),
        membership_card_number: text(form.membership_card_number),
        birth_date: text(form.birth_date),
        joined_on: text(form.joined_on),
        disciplinary_record: text(form.disciplinary_record),
        club_body_appointments: text(form.club_body_appointments),
        notes: text(form.notes),
        avatar_url,
    };

    let user = state.auth.bootstrap_admin(draft).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Calling member's record.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Member record", body = UserResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["members"],
    operation_id = "me"
)]
#[get("/me")]
pub async fn me(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<UserResponse>> {
    let record = state.auth.me(&user.user_id()).await?;
    Ok(web::Json(UserResponse::from(record)))
}

/// Multipart form for profile self-edits.
#[derive(MultipartForm)]
pub struct ProfileForm {
    /// New username; omit to keep the current one.
    pub username: Option<Text<String>>,
    /// Display name.
    #[multipart(rename = "fullName")]
    pub full_name: Option<Text<String>>,
    /// New plaintext password, when changing it.
    #[multipart(rename = "newPassword")]
    pub new_password: Option<Text<String>>,
    /// Parent name.
    #[multipart(rename = "parentName")]
    pub parent_name: Option<Text<String>>,
    /// Citizenship.
    pub citizenship: Option<Text<String>>,
    /// Postal address.
    pub address: Option<Text<String>>,
    /// Contact phone number.
    pub phone: Option<Text<String>>,
    /// Contact email.
    pub email: Option<Text<String>>,
    /// Identity-document number.
    #[multipart(rename = "idDocumentNumber")]
    pub id_document_number: Option<Text<String>>,
    /// Mountaineering licence number.
    #[multipart(rename = "licenceNumber")]
    pub licence_number: Option<Text<String>>,
    /// Membership stamp number.
    #[multipart(rename = "membershipCardNumber")]
    pub membership_card_number: Option<Text<String>>,
    /// Date of birth, `YYYY-MM-DD`.
    #[multipart(rename = "birthDate")]
    pub birth_date: Option<Text<String>>,
    /// Club joining date, `YYYY-MM-DD`.
    #[multipart(rename = "joinedOn")]
    pub joined_on: Option<Text<String>>,
    /// Disciplinary record (admin callers only).
    #[multipart(rename = "disciplinaryRecord")]
    pub disciplinary_record: Option<Text<String>>,
    /// Appointments to club bodies (admin callers only).
    #[multipart(rename = "clubBodyAppointments")]
    pub club_body_appointments: Option<Text<String>>,
    /// Free-form notes (admin callers only).
    pub notes: Option<Text<String>>,
    /// Optional replacement avatar image.
    pub avatar: Option<Bytes>,
}

/// Profile self-edit response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateResponse {
    /// The member after the edit.
    pub user: UserResponse,
    /// Replacement token when the username changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Edit the calling member's profile.
#[utoipa::path(
    patch,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdateResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Username taken", body = Error)
    ),
    tags = ["members"],
    operation_id = "updateProfile"
)]
#[patch("/me")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    MultipartForm(form): MultipartForm<ProfileForm>,
) -> ApiResult<web::Json<ProfileUpdateResponse>> {
    let new_avatar_url = match form.avatar {
        Some(avatar) => {
            let hint = format!("avatars/{}", user.user_id());
            let url = state
                .images
                .upload(avatar.data.to_vec(), &hint)
                .await
                .map_err(|err| {
                    Error::internal("avatar upload failed")
                        .with_details(json!({ "code": "image_upload_failed", "reason": err.to_string() }))
                })?;
            Some(url)
        }
        None => None,
    };

    let draft = ProfileUpdateDraft {
        username: text(form.username),
        full_name: text(form.full_name),
        new_password: text(form.new_password),
        parent_name: text(form.parent_name),
        citizenship: text(form.citizenship),
        address: text(form.address),
        phone: text(form.phone),
        email: text(form.email),
        id_document_number: text(form.id_document_number),
        licence_number: text(form.licence_number),
        membership_card_number: text(form.membership_card_number),
        birth_date: text(form.birth_date),
        joined_on: text(form.joined_on),
        disciplinary_record: text(form.disciplinary_record),
        club_body_appointments: text(form.club_body_appointments),
        notes: text(form.notes),
    };

    let outcome = state
        .auth
        .update_profile(user.claims(), draft, new_avatar_url)
        .await?;
    Ok(web::Json(ProfileUpdateResponse {
        user: UserResponse::from(outcome.user),
        token: outcome.refreshed_token,
    }))
}

/// Member registration request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Requested username.
    pub username: String,
    /// Plaintext password (min 8 characters).
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// Contact phone number.
    pub phone: String,
    /// Role label from the fixed set.
    pub role: String,
}

/// Register a new member; admins and secretaries only.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member created", body = UserResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 409, description = "Username taken", body = Error)
    ),
    tags = ["members"],
    operation_id = "registerMember"
)]
#[post("/users")]
pub async fn register(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let draft = RegistrationDraft {
        username: payload.username,
        password: payload.password,
        full_name: payload.full_name,
        email: payload.email,
        address: payload.address,
        phone: payload.phone,
        role: payload.role,
    };
    let created = state.auth.register(user.role(), draft).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(created)))
}

/// List every member.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Members", body = [UserResponse]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["members"],
    operation_id = "listMembers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
) -> ApiResult<web::Json<Vec<UserResponse>>> {
    let users = state.auth.list_users().await?;
    Ok(web::Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Member detail by identifier.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Member identifier")),
    responses(
        (status = 200, description = "Member record", body = UserResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["members"],
    operation_id = "memberDetail"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<UserResponse>> {
    let record = state.auth.get_user(&UserId::from_uuid(*id)).await?;
    Ok(web::Json(UserResponse::from(record)))
}

/// Admin member-edit request body.
#[derive(Debug, Deserialize, Serialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateRequest {
    /// New role label; omit to keep the current one.
    pub role: Option<String>,
    /// Disciplinary record.
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies.
    pub club_body_appointments: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Edit a member's role and disciplinary fields; admins only.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "Member identifier")),
    request_body = AdminUpdateRequest,
    responses(
        (status = 200, description = "Member updated", body = UserResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["members"],
    operation_id = "adminUpdateMember"
)]
#[patch("/users/{id}")]
pub async fn admin_update_user(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    payload: web::Json<AdminUpdateRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let payload = payload.into_inner();
    let draft = AdminUpdateDraft {
        role: payload.role,
        disciplinary_record: payload.disciplinary_record,
        club_body_appointments: payload.club_body_appointments,
        notes: payload.notes,
    };
    let updated = state
        .auth
        .admin_update(user.role(), &UserId::from_uuid(*id), draft)
        .await?;
    Ok(web::Json(UserResponse::from(updated)))
}

/// Cached statistics response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Cached climb statistics.
    pub stats: UserStats,
}

/// Cached climb statistics for a member (fast path).
#[utoipa::path(
    get,
    path = "/api/users/{id}/stats",
    params(("id" = Uuid, Path, description = "Member identifier")),
    responses(
        (status = 200, description = "Cached statistics", body = StatsResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["members"],
    operation_id = "memberStats"
)]
#[get("/users/{id}/stats")]
pub async fn user_stats(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> ApiResult<web::Json<StatsResponse>> {
    let stats = state
        .enrollments
        .cached_stats(&UserId::from_uuid(*id))
        .await?;
    Ok(web::Json(StatsResponse { stats }))
}
