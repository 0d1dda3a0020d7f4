//! Trip aggregate and draft validation.
//!
//! A trip is created from an untrusted draft (multipart form fields at the
//! boundary); `TripDraft::validate` enforces the required fields and numeric
//! bounds before anything reaches the registry.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::user::UserId;

/// Calendar format accepted for trip and profile dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stable trip identifier stored as a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    /// Generate a new random [`TripId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identifier from its canonical textual form.
    pub fn parse(raw: &str) -> Result<Self, TripValidationError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| TripValidationError::InvalidId)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation errors for trip drafts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripValidationError {
    /// Identifier is not a valid UUID.
    #[error("trip id must be a valid UUID")]
    InvalidId,
    /// A required text field is empty.
    #[error("{field} must not be empty")]
    MissingField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The date is not in `YYYY-MM-DD` form.
    #[error("date must use the YYYY-MM-DD format")]
    InvalidDate,
    /// Distance must parse as a non-negative number of kilometres.
    #[error("distance must be a non-negative number of kilometres")]
    InvalidDistance,
    /// Ascent must parse as a non-negative whole number of metres.
    #[error("ascent must be a non-negative whole number of metres")]
    InvalidAscent,
}

/// Scheduled or completed club trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// Stable identifier.
    pub id: TripId,
    /// Trip name.
    pub name: String,
    /// Target peak.
    pub peak: String,
    /// Scheduled date.
    pub date: NaiveDate,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Difficulty label.
    pub difficulty: String,
    /// Image URL on the CDN, if one was uploaded.
    pub image_url: Option<String>,
    /// Route length in kilometres.
    pub distance_km: f64,
    /// Cumulative ascent in metres.
    pub ascent_m: i32,
    /// Completion flag; flips false to true exactly once.
    pub completed: bool,
    /// Assigned guide, if any.
    pub guide_id: Option<UserId>,
    /// Free-text name of a second guide.
    pub second_guide_name: Option<String>,
    /// Member who created the trip.
    pub created_by: UserId,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Untrusted trip fields as received from the boundary.
#[derive(Debug, Clone, Default)]
pub struct TripDraft {
    /// Trip name.
    pub name: String,
    /// Target peak.
    pub peak: String,
    /// Scheduled date in `YYYY-MM-DD` form.
    pub date: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Difficulty label.
    pub difficulty: String,
    /// Route length in kilometres, textual.
    pub distance_km: String,
    /// Cumulative ascent in metres, textual.
    pub ascent_m: String,
    /// Assigned guide, if any.
    pub guide_id: Option<UserId>,
    /// Free-text name of a second guide.
    pub second_guide_name: Option<String>,
}

/// Validated trip fields ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTrip {
    /// Trip name.
    pub name: String,
    /// Target peak.
    pub peak: String,
    /// Scheduled date.
    pub date: NaiveDate,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Difficulty label.
    pub difficulty: String,
    /// Route length in kilometres.
    pub distance_km: f64,
    /// Cumulative ascent in metres.
    pub ascent_m: i32,
    /// Assigned guide, if any.
    pub guide_id: Option<UserId>,
    /// Free-text name of a second guide.
    pub second_guide_name: Option<String>,
    /// Member creating the trip.
    pub created_by: UserId,
}

impl TripDraft {
    /// Validate the draft into an insertable trip.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{TripDraft, UserId};
    ///
    /// let draft = TripDraft {
    ///     name: "Spring ascent".into(),
    ///     peak: "Triglav".into(),
    ///     date: "2026-05-09".into(),
    ///     difficulty: "T3".into(),
    ///     distance_km: "12.5".into(),
    ///     ascent_m: "800".into(),
    ///     ..TripDraft::default()
    /// };
    /// let trip = draft.validate(UserId::random()).expect("valid draft");
    /// assert_eq!(trip.ascent_m, 800);
    /// ```
    pub fn validate(self, created_by: UserId) -> Result<NewTrip, TripValidationError> {
        let name = required(self.name, "name")?;
        let peak = required(self.peak, "peak")?;
        let difficulty = required(self.difficulty, "difficulty")?;
        if self.date.trim().is_empty() {
            return Err(TripValidationError::MissingField { field: "date" });
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| TripValidationError::InvalidDate)?;

        let distance_km: f64 = self
            .distance_km
            .trim()
            .parse()
            .map_err(|_| TripValidationError::InvalidDistance)?;
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(TripValidationError::InvalidDistance);
        }
        let ascent_m: i32 = self
            .ascent_m
            .trim()
            .parse()
            .map_err(|_| TripValidationError::InvalidAscent)?;
        if ascent_m < 0 {
            return Err(TripValidationError::InvalidAscent);
        }

        Ok(NewTrip {
            name,
            peak,
            date,
            description: normalized(self.description),
            difficulty,
            distance_km,
            ascent_m,
            guide_id: self.guide_id,
            second_guide_name: normalized(self.second_guide_name),
            created_by,
        })
    }
}

fn required(raw: String, field: &'static str) -> Result<String, TripValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TripValidationError::MissingField { field });
    }
    Ok(trimmed.to_owned())
}

fn normalized(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn draft() -> TripDraft {
        TripDraft {
            name: "Spring ascent".into(),
            peak: "Triglav".into(),
            date: "2026-05-09".into(),
            description: Some("Two-day trip".into()),
            difficulty: "T3".into(),
            distance_km: "12.5".into(),
            ascent_m: "800".into(),
            guide_id: None,
            second_guide_name: Some("  ".into()),
        }
    }

    #[rstest]
    fn valid_draft_passes(draft: TripDraft) {
        let trip = draft.validate(UserId::random()).expect("valid draft");
        assert_eq!(trip.name, "Spring ascent");
        assert_eq!(trip.date, NaiveDate::from_ymd_opt(2026, 5, 9).expect("date"));
        assert_eq!(trip.distance_km, 12.5);
        assert_eq!(trip.ascent_m, 800);
        // Blank second-guide entries collapse to none.
        assert_eq!(trip.second_guide_name, None);
    }

    #[rstest]
    #[case::blank_name(|d: &mut TripDraft| d.name = "  ".into(), TripValidationError::MissingField { field: "name" })]
    #[case::blank_peak(|d: &mut TripDraft| d.peak = String::new(), TripValidationError::MissingField { field: "peak" })]
    #[case::blank_difficulty(|d: &mut TripDraft| d.difficulty = String::new(), TripValidationError::MissingField { field: "difficulty" })]
    #[case::blank_date(|d: &mut TripDraft| d.date = String::new(), TripValidationError::MissingField { field: "date" })]
    #[case::bad_date(|d: &mut TripDraft| d.date = "09.05.2026".into(), TripValidationError::InvalidDate)]
    #[case::bad_distance(|d: &mut TripDraft| d.distance_km = "twelve".into(), TripValidationError::InvalidDistance)]
    #[case::negative_distance(|d: &mut TripDraft| d.distance_km = "-1".into(), TripValidationError::InvalidDistance)]
    #[case::fractional_ascent(|d: &mut TripDraft| d.ascent_m = "800.5".into(), TripValidationError::InvalidAscent)]
    #[case::negative_ascent(|d: &mut TripDraft| d.ascent_m = "-10".into(), TripValidationError::InvalidAscent)]
    fn invalid_drafts_are_rejected(
        mut draft: TripDraft,
        #[case] mutate: impl FnOnce(&mut TripDraft),
        #[case] expected: TripValidationError,
    ) {
        mutate(&mut draft);
        let err = draft.validate(UserId::random()).expect_err("draft rejected");
        assert_eq!(err, expected);
    }
}
