//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations exactly; Diesel uses them
//! for compile-time query validation and type-safe SQL generation.

diesel::table! {
    /// Club members.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login name.
        username -> Varchar,
        /// PHC-string password hash.
        password_hash -> Varchar,
        /// Display name.
        full_name -> Varchar,
        /// Role label from the fixed set.
        role -> Varchar,
        /// Parent name from the membership card.
        parent_name -> Nullable<Varchar>,
        /// Citizenship.
        citizenship -> Nullable<Varchar>,
        /// Postal address.
        address -> Nullable<Varchar>,
        /// Contact phone number.
        phone -> Nullable<Varchar>,
        /// Contact email.
        email -> Nullable<Varchar>,
        /// Identity-document number.
        id_document_number -> Nullable<Varchar>,
        /// Mountaineering licence number.
        licence_number -> Nullable<Varchar>,
        /// Membership stamp number.
        membership_card_number -> Nullable<Varchar>,
        /// Date of birth.
        birth_date -> Nullable<Date>,
        /// Club joining date.
        joined_on -> Nullable<Date>,
        /// Disciplinary record (admin-editable).
        disciplinary_record -> Nullable<Text>,
        /// Appointments to club bodies (admin-editable).
        club_body_appointments -> Nullable<Text>,
        /// Free-form notes (admin-editable).
        notes -> Nullable<Text>,
        /// Avatar URL on the CDN.
        avatar_url -> Nullable<Varchar>,
        /// Cached: kilometres across climbed trips.
        total_distance_km -> Double,
        /// Cached: metres of ascent across climbed trips.
        total_ascent_m -> Integer,
        /// Cached: number of climbed trips.
        climbs_count -> Integer,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Club trips.
    trips (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Trip name.
        name -> Varchar,
        /// Target peak.
        peak -> Varchar,
        /// Scheduled date.
        trip_date -> Date,
        /// Free-form description.
        description -> Nullable<Text>,
        /// Difficulty label.
        difficulty -> Varchar,
        /// Image URL on the CDN.
        image_url -> Nullable<Varchar>,
        /// Route length in kilometres.
        distance_km -> Double,
        /// Cumulative ascent in metres.
        ascent_m -> Integer,
        /// Completion flag.
        completed -> Bool,
        /// Assigned guide.
        guide_id -> Nullable<Uuid>,
        /// Free-text second guide name.
        second_guide_name -> Nullable<Varchar>,
        /// Creating member.
        created_by -> Uuid,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Trip sign-ups; unique per (trip, member).
    enrollments (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Trip being signed up for.
        trip_id -> Uuid,
        /// Enrolled member.
        user_id -> Uuid,
        /// Lifecycle status label.
        status -> Varchar,
        /// Sign-up timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(enrollments -> trips (trip_id));
diesel::joinable!(enrollments -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, trips, enrollments);
