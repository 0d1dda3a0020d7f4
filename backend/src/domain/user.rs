//! Club member aggregate and its value types.
//!
//! `User` carries identity, credentials (hash only), the fixed role set, the
//! optional membership-card profile fields, and the cached climb statistics
//! maintained by the enrollment engine.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable member identifier stored as a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identifier from its canonical textual form.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation errors for user value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    /// Identifier is not a valid UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
    /// Username is empty once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Username carries surrounding whitespace.
    #[error("username must not contain surrounding whitespace")]
    PaddedUsername,
    /// Username exceeds the storage limit.
    #[error("username must be at most {max} characters")]
    UsernameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// Username contains characters outside the accepted set.
    #[error("username may only contain letters, numbers, dots, dashes, or underscores")]
    UsernameInvalidCharacters,
    /// Role label is not part of the fixed set.
    #[error("unknown role label")]
    UnknownRole,
}

/// Maximum accepted username length.
pub const USERNAME_MAX: usize = 64;

/// Unique login name, matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    ///
    /// # Examples
    /// ```
    /// use backend::domain::Username;
    ///
    /// let name = Username::new("ana.k").expect("valid username");
    /// assert_eq!(name.as_str(), "ana.k");
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if raw.trim() != raw {
            return Err(UserValidationError::PaddedUsername);
        }
        if raw.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(raw))
    }

    /// Borrow the username as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Fixed role set carried by every member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Ordinary club member.
    Member,
    /// Leads trips and may update enrollment statuses for them.
    Guide,
    /// Handles membership fees.
    Treasurer,
    /// May register new members alongside admins.
    Secretary,
    /// Manages shared club equipment.
    EquipmentManager,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::Member,
        Self::Guide,
        Self::Treasurer,
        Self::Secretary,
        Self::EquipmentManager,
    ];

    /// Wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Guide => "guide",
            Self::Treasurer => "treasurer",
            Self::Secretary => "secretary",
            Self::EquipmentManager => "equipment-manager",
        }
    }

    /// Parse a wire label back into a role.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == raw)
            .ok_or(UserValidationError::UnknownRole)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored password hash in PHC string form.
///
/// The wrapper keeps hashes out of `Debug` output and has no serde support,
/// so a hash can never leak into a response or log line by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wrap an already-hashed secret.
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// Borrow the PHC string for verification.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(..)")
    }
}

/// Cached climb statistics, maintained eagerly by the enrollment engine.
///
/// ## Invariants
/// - Fields only ever grow, and equal the sums over the member's
///   `climbed` enrollments at all times.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Total kilometres across climbed trips.
    pub total_distance_km: f64,
    /// Total metres of ascent across climbed trips.
    pub total_ascent_m: i32,
    /// Number of climbed trips.
    pub climbs_count: i32,
}

impl UserStats {
    /// Fold one climbed trip into the cached totals.
    pub fn accrue(&mut self, distance_km: f64, ascent_m: i32) {
        self.total_distance_km += distance_km;
        self.total_ascent_m += ascent_m;
        self.climbs_count += 1;
    }
}

/// Optional membership-card profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    /// Parent name recorded on the membership card.
    pub parent_name: Option<String>,
    /// Citizenship.
    pub citizenship: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Contact email address.
    pub email: Option<String>,
    /// Identity-document number.
    pub id_document_number: Option<String>,
    /// Mountaineering licence number.
    pub licence_number: Option<String>,
    /// Membership stamp number.
    pub membership_card_number: Option<String>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Date the member joined the club.
    pub joined_on: Option<NaiveDate>,
    /// Disciplinary record (admin-editable only).
    pub disciplinary_record: Option<String>,
    /// Appointments to club bodies (admin-editable only).
    pub club_body_appointments: Option<String>,
    /// Free-form notes (admin-editable only).
    pub notes: Option<String>,
    /// Avatar image URL on the CDN.
    pub avatar_url: Option<String>,
}

/// Club member record.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Hashed login secret.
    pub secret_hash: SecretHash,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Optional membership-card fields.
    pub profile: UserProfile,
    /// Cached climb statistics.
    pub stats: UserStats,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new member.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name.
    pub username: Username,
    /// Hashed login secret.
    pub secret_hash: SecretHash,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Optional membership-card fields.
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyUsername)]
    #[case("   ", UserValidationError::EmptyUsername)]
    #[case(" ana", UserValidationError::PaddedUsername)]
    #[case("ana ", UserValidationError::PaddedUsername)]
    #[case("ana kovac", UserValidationError::UsernameInvalidCharacters)]
    #[case("ana@club", UserValidationError::UsernameInvalidCharacters)]
    fn username_rejects_bad_input(#[case] raw: &str, #[case] expected: UserValidationError) {
        let err = Username::new(raw).expect_err("invalid username rejected");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn username_rejects_overlong_input() {
        let raw = "a".repeat(USERNAME_MAX + 1);
        let err = Username::new(raw).expect_err("overlong username rejected");
        assert_eq!(err, UserValidationError::UsernameTooLong { max: USERNAME_MAX });
    }

    #[rstest]
    #[case("ana")]
    #[case("ana.kovac-92_x")]
    fn username_accepts_clean_input(#[case] raw: &str) {
        let name = Username::new(raw).expect("valid username");
        assert_eq!(name.as_str(), raw);
    }

    #[rstest]
    fn every_role_label_round_trips() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Ok(role));
        }
    }

    #[rstest]
    fn unknown_role_label_is_rejected() {
        assert_eq!(Role::parse("president"), Err(UserValidationError::UnknownRole));
    }

    #[rstest]
    fn role_serde_uses_kebab_case_labels() {
        let value = serde_json::to_value(Role::EquipmentManager).expect("serialize role");
        assert_eq!(value, serde_json::json!("equipment-manager"));
    }

    #[rstest]
    fn secret_hash_debug_is_redacted() {
        let hash = SecretHash::new("$argon2id$v=19$m=19456,t=2,p=1$abc$def");
        assert_eq!(format!("{hash:?}"), "SecretHash(..)");
    }

    #[rstest]
    fn stats_accrue_adds_one_climb() {
        let mut stats = UserStats::default();
        stats.accrue(12.5, 800);
        stats.accrue(7.5, 200);
        assert_eq!(stats.total_distance_km, 20.0);
        assert_eq!(stats.total_ascent_m, 1000);
        assert_eq!(stats.climbs_count, 2);
    }
}
