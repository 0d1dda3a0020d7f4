//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and
//! must never be exposed to the domain; each adapter converts them through
//! the validated domain constructors.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{enrollments, trips, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub parent_name: Option<String>,
    pub citizenship: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub id_document_number: Option<String>,
    pub licence_number: Option<String>,
    pub membership_card_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub disciplinary_record: Option<String>,
    pub club_body_appointments: Option<String>,
    pub notes: Option<String>,
    pub avatar_url: Option<String>,
    pub total_distance_km: f64,
    pub total_ascent_m: i32,
    pub climbs_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new member records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub role: &'a str,
    pub parent_name: Option<&'a str>,
    pub citizenship: Option<&'a str>,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub id_document_number: Option<&'a str>,
    pub licence_number: Option<&'a str>,
    pub membership_card_number: Option<&'a str>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub disciplinary_record: Option<&'a str>,
    pub club_body_appointments: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

/// Changeset replacing the self-editable member fields wholesale.
///
/// `treat_none_as_null` makes an omitted form field clear its column,
/// matching the membership-card editing semantics.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ProfileChangeset<'a> {
    pub username: &'a str,
    pub full_name: &'a str,
    pub parent_name: Option<&'a str>,
    pub citizenship: Option<&'a str>,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub id_document_number: Option<&'a str>,
    pub licence_number: Option<&'a str>,
    pub membership_card_number: Option<&'a str>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
}

/// Changeset replacing the admin-only member fields.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AdminFieldsChangeset<'a> {
    pub disciplinary_record: Option<&'a str>,
    pub club_body_appointments: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Row struct for reading from the trips table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = trips)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TripRow {
    pub id: Uuid,
    pub name: String,
    pub peak: String,
    pub trip_date: NaiveDate,
    pub description: Option<String>,
    pub difficulty: String,
    pub image_url: Option<String>,
    pub distance_km: f64,
    pub ascent_m: i32,
    pub completed: bool,
    pub guide_id: Option<Uuid>,
    pub second_guide_name: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new trip records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trips)]
pub(crate) struct NewTripRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub peak: &'a str,
    pub trip_date: NaiveDate,
    pub description: Option<&'a str>,
    pub difficulty: &'a str,
    pub distance_km: f64,
    pub ascent_m: i32,
    pub guide_id: Option<Uuid>,
    pub second_guide_name: Option<&'a str>,
    pub created_by: Uuid,
}

/// Row struct for reading from the enrollments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new enrollment records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = enrollments)]
pub(crate) struct NewEnrollmentRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub status: &'static str,
}
