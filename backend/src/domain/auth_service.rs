//! Authentication and member-management use-cases.
//!
//! Concentrates credential verification, the one-time admin bootstrap,
//! registration, and profile edits so HTTP handlers stay thin. Login
//! failure is uniform: an unknown username and a wrong password produce
//! the identical error, leaking nothing about account existence.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

use super::access::{self, Operation};
use super::error::Error;
use super::ports::{
    AdminChanges, AdminFields, PasswordHasher, ProfileChanges, SessionClaims, TokenCodec,
    UserPersistenceError, UserRepository,
};
use super::trip::DATE_FORMAT;
use super::user::{NewUser, Role, User, UserId, UserProfile, Username};

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 8;

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Successful login result.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Freshly signed session token.
    pub token: String,
    /// The authenticated member.
    pub user: User,
}

/// Untrusted registration fields (admin/secretary registration).
#[derive(Debug, Clone, Default)]
pub struct RegistrationDraft {
    /// Requested username.
    pub username: String,
    /// Plaintext password; hashed before storage, never stored.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// Contact phone number.
    pub phone: String,
    /// Requested role label.
    pub role: String,
}

/// Untrusted fields for the one-time admin bootstrap.
#[derive(Debug, Clone, Default)]
pub struct BootstrapDraft {
    /// Requested username.
    pub username: String,
    /// Plaintext password; hashed before storage, never stored.
    pub password: String,
    /// Display name.
    pub full_name: Option<String>,
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
    /// Date of birth, `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    /// Club joining date, `YYYY-MM-DD`.
    pub joined_on: Option<String>,
    /// Disciplinary record.
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies.
    pub club_body_appointments: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Avatar URL, populated after a successful upload.
    pub avatar_url: Option<String>,
}

/// Untrusted self-edit fields for `PATCH /me`.
///
/// Mirrors the submitted form wholesale: omitted text fields clear their
/// stored values, matching the membership-card editing flow.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateDraft {
    /// New username; `None` keeps the current one.
    pub username: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// New plaintext password, when changing it.
    pub new_password: Option<String>,
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
    /// Date of birth, `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    /// Club joining date, `YYYY-MM-DD`.
    pub joined_on: Option<String>,
    /// Disciplinary record (applied only for admin callers).
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies (applied only for admin callers).
    pub club_body_appointments: Option<String>,
    /// Free-form notes (applied only for admin callers).
    pub notes: Option<String>,
}

/// Untrusted admin edit for `PATCH /users/{id}`.
#[derive(Debug, Clone, Default)]
pub struct AdminUpdateDraft {
    /// New role label; `None` keeps the current one.
    pub role: Option<String>,
    /// Disciplinary record.
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies.
    pub club_body_appointments: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Result of a profile self-edit.
#[derive(Debug, Clone)]
pub struct ProfileUpdateOutcome {
    /// The member after the edit.
    pub user: User,
    /// Replacement token, present when the username changed.
    pub refreshed_token: Option<String>,
}

/// Authentication and member-management service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenCodec>,
}

impl AuthService {
    /// Create a service over the given ports.
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Verify credentials and issue a session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, Error> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(Error::invalid_request("username and password are required"));
        }
        let Ok(username) = Username::new(username) else {
            return Err(Error::unauthorized(BAD_CREDENTIALS));
        };

        let user = self
            .users
            .find_by_username(&username)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::unauthorized(BAD_CREDENTIALS))?;

        if !self.hasher.verify(password, &user.secret_hash) {
            return Err(Error::unauthorized(BAD_CREDENTIALS));
        }

        let token = self.issue_token(&user)?;
        info!(user = %user.username, "member logged in");
        Ok(LoginOutcome { token, user })
    }

    /// Whether any member exists yet (drives the bootstrap surface).
    pub async fn has_users(&self) -> Result<bool, Error> {
        let count = self.users.count().await.map_err(Error::from)?;
        Ok(count > 0)
    }

    /// Create the very first admin account.
    ///
    /// Permitted only while the member store is empty; once any member
    /// exists the operation is forbidden and registration must go through
    /// an admin or secretary account.
    pub async fn bootstrap_admin(&self, draft: BootstrapDraft) -> Result<User, Error> {
        if self.has_users().await? {
            return Err(Error::forbidden(
                "initial admin registration is closed; members already exist",
            ));
        }

        let username = parse_username(&draft.username)?;
        let secret_hash = self.hash_password(&draft.password)?;

        let profile = UserProfile {
            parent_name: clean(draft.parent_name),
            citizenship: clean(draft.citizenship),
            address: clean(draft.address),
            phone: clean(draft.phone),
            email: clean(draft.email),
            id_document_number: clean(draft.id_document_number),
            licence_number: clean(draft.licence_number),
            membership_card_number: clean(draft.membership_card_number),
            birth_date: parse_optional_date(draft.birth_date.as_deref())?,
            joined_on: parse_optional_date(draft.joined_on.as_deref())?,
            disciplinary_record: clean(draft.disciplinary_record),
            club_body_appointments: clean(draft.club_body_appointments),
            notes: clean(draft.notes),
            avatar_url: draft.avatar_url,
        };

        let user = self
            .insert_user(NewUser {
                username,
                secret_hash,
                full_name: draft.full_name.unwrap_or_default().trim().to_owned(),
                role: Role::Admin,
                profile,
            })
            .await?;
        info!(user = %user.username, "initial admin registered");
        Ok(user)
    }

    /// Register a new member; admins and secretaries only.
    pub async fn register(
        &self,
        caller_role: Role,
        draft: RegistrationDraft,
    ) -> Result<User, Error> {
        access::require(caller_role, Operation::RegisterMember)?;

        let username = parse_username(&draft.username)?;
        let secret_hash = self.hash_password(&draft.password)?;
        let role = Role::parse(draft.role.trim())
            .map_err(|_| Error::invalid_request("unknown role").with_details(role_details()))?;

        for (field, value) in [
            ("fullName", &draft.full_name),
            ("email", &draft.email),
            ("address", &draft.address),
            ("phone", &draft.phone),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_request(format!("{field} is required")));
            }
        }

        let profile = UserProfile {
            email: Some(draft.email.trim().to_owned()),
            address: Some(draft.address.trim().to_owned()),
            phone: Some(draft.phone.trim().to_owned()),
            ..UserProfile::default()
        };

        let user = self
            .insert_user(NewUser {
                username,
                secret_hash,
                full_name: draft.full_name.trim().to_owned(),
                role,
                profile,
            })
            .await?;
        info!(user = %user.username, role = %user.role, "member registered");
        Ok(user)
    }

    /// Fetch the calling member's record.
    pub async fn me(&self, id: &UserId) -> Result<User, Error> {
        self.get_user(id).await
    }

    /// Fetch a member by identifier.
    pub async fn get_user(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("member not found"))
    }

    /// List every member.
    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.users.list().await.map_err(Error::from)
    }

    /// Apply a self-edit to the calling member.
    ///
    /// The admin-only fields in the draft take effect only when the caller
    /// holds the admin role. When the username changes a replacement token
    /// is issued so the client keeps a working credential.
    pub async fn update_profile(
        &self,
        caller: &SessionClaims,
        draft: ProfileUpdateDraft,
        new_avatar_url: Option<String>,
    ) -> Result<ProfileUpdateOutcome, Error> {
        let current = self.get_user(&caller.user_id).await?;

        let secret_hash = match draft.new_password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let username = match draft.username.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let requested = Username::new(raw)
                    .map_err(|err| Error::invalid_request(err.to_string()))?;
                if requested != current.username {
                    let taken = self
                        .users
                        .find_by_username(&requested)
                        .await
                        .map_err(Error::from)?
                        .is_some();
                    if taken {
                        return Err(Error::conflict("username is already taken"));
                    }
                }
                requested
            }
            _ => current.username.clone(),
        };
        let username_changed = username != current.username;

        let admin_fields = (caller.role == Role::Admin).then(|| AdminFields {
            disciplinary_record: clean(draft.disciplinary_record),
            club_body_appointments: clean(draft.club_body_appointments),
            notes: clean(draft.notes),
        });

        let profile = UserProfile {
            parent_name: clean(draft.parent_name),
            citizenship: clean(draft.citizenship),
            address: clean(draft.address),
            phone: clean(draft.phone),
            email: clean(draft.email),
            id_document_number: clean(draft.id_document_number),
            licence_number: clean(draft.licence_number),
            membership_card_number: clean(draft.membership_card_number),
            birth_date: parse_optional_date(draft.birth_date.as_deref())?,
            joined_on: parse_optional_date(draft.joined_on.as_deref())?,
            // Admin-only fields travel separately below.
            disciplinary_record: None,
            club_body_appointments: None,
            notes: None,
            avatar_url: None,
        };

        let changes = ProfileChanges {
            username,
            full_name: draft.full_name.unwrap_or_default().trim().to_owned(),
            profile,
            secret_hash,
            avatar_url: new_avatar_url,
            admin_fields,
        };

        let user = self
            .users
            .update_profile(&caller.user_id, changes)
            .await
            .map_err(map_duplicate_username)?
            .ok_or_else(|| Error::not_found("member not found"))?;

        let refreshed_token = if username_changed {
            Some(self.issue_token(&user)?)
        } else {
            None
        };

        Ok(ProfileUpdateOutcome {
            user,
            refreshed_token,
        })
    }

    /// Apply an admin edit (role and disciplinary fields) to a member.
    pub async fn admin_update(
        &self,
        caller_role: Role,
        target: &UserId,
        draft: AdminUpdateDraft,
    ) -> Result<User, Error> {
        access::require(caller_role, Operation::EditMember)?;

        let current = self.get_user(target).await?;
        let role = match draft.role.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Role::parse(raw)
                .map_err(|_| Error::invalid_request("unknown role").with_details(role_details()))?,
            _ => current.role,
        };

        let changes = AdminChanges {
            role,
            fields: AdminFields {
                disciplinary_record: clean(draft.disciplinary_record),
                club_body_appointments: clean(draft.club_body_appointments),
                notes: clean(draft.notes),
            },
        };

        self.users
            .update_admin_fields(target, changes)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("member not found"))
    }

    fn issue_token(&self, user: &User) -> Result<String, Error> {
        self.tokens
            .issue(&SessionClaims {
                user_id: user.id,
                username: user.username.clone(),
                role: user.role,
            })
            .map_err(|err| Error::internal(err.to_string()))
    }

    fn hash_password(&self, password: &str) -> Result<crate::domain::SecretHash, Error> {
        if password.chars().count() < PASSWORD_MIN {
            return Err(Error::invalid_request(format!(
                "password must be at least {PASSWORD_MIN} characters"
            )));
        }
        self.hasher
            .hash(password)
            .map_err(|err| Error::internal(err.to_string()))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, Error> {
        self.users.insert(user).await.map_err(map_duplicate_username)
    }
}

fn map_duplicate_username(err: UserPersistenceError) -> Error {
    match err {
        UserPersistenceError::DuplicateUsername => Error::conflict("username is already taken")
            .with_details(json!({ "field": "username", "code": "duplicate_username" })),
        other => Error::from(other),
    }
}

fn parse_username(raw: &str) -> Result<Username, Error> {
    Username::new(raw.trim()).map_err(|err| Error::invalid_request(err.to_string()))
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| Error::invalid_request("dates must use the YYYY-MM-DD format")),
    }
}

fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn role_details() -> serde_json::Value {
    json!({ "allowed": Role::ALL.map(Role::as_str) })
}
