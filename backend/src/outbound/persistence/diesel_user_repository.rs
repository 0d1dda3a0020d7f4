//! PostgreSQL-backed `UserRepository` implementation using Diesel.
//!
//! Duplicate usernames are surfaced by the unique constraint rather than a
//! separate existence check, so concurrent registrations collapse into a
//! typed duplicate error.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{AdminChanges, ProfileChanges, UserPersistenceError, UserRepository};
use crate::domain::{NewUser, Role, SecretHash, User, UserId, UserProfile, Username, UserStats};

use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{AdminFieldsChangeset, NewUserRow, ProfileChangeset, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the member repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> UserPersistenceError {
    map_pool_error(error, UserPersistenceError::connection)
}

fn map_diesel(error: diesel::result::Error) -> UserPersistenceError {
    if is_unique_violation(&error) {
        return UserPersistenceError::DuplicateUsername;
    }
    map_diesel_error(
        error,
        UserPersistenceError::query,
        UserPersistenceError::connection,
    )
}

/// Convert a database row into a validated domain member.
pub(crate) fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let UserRow {
        id,
        username,
        password_hash,
        full_name,
        role,
        parent_name,
        citizenship,
        address,
        phone,
        email,
        id_document_number,
        licence_number,
        membership_card_number,
        birth_date,
        joined_on,
        disciplinary_record,
        club_body_appointments,
        notes,
        avatar_url,
        total_distance_km,
        total_ascent_m,
        climbs_count,
        created_at,
    } = row;

    let username = Username::new(username)
        .map_err(|err| UserPersistenceError::query(format!("decode username: {err}")))?;
    let role = Role::parse(&role)
        .map_err(|err| UserPersistenceError::query(format!("decode role: {err}")))?;

    Ok(User {
        id: UserId::from_uuid(id),
        username,
        secret_hash: SecretHash::new(password_hash),
        full_name,
        role,
        profile: UserProfile {
            parent_name,
            citizenship,
            address,
            phone,
            email,
            id_document_number,
            licence_number,
            membership_card_number,
            birth_date,
            joined_on,
            disciplinary_record,
            club_body_appointments,
            notes,
            avatar_url,
        },
        stats: UserStats {
            total_distance_km,
            total_ascent_m,
            climbs_count,
        },
        created_at,
    })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let new_row = NewUserRow {
            id: Uuid::new_v4(),
            username: user.username.as_str(),
            password_hash: user.secret_hash.as_str(),
            full_name: &user.full_name,
            role: user.role.as_str(),
            parent_name: user.profile.parent_name.as_deref(),
            citizenship: user.profile.citizenship.as_deref(),
            address: user.profile.address.as_deref(),
            phone: user.profile.phone.as_deref(),
            email: user.profile.email.as_deref(),
            id_document_number: user.profile.id_document_number.as_deref(),
            licence_number: user.profile.licence_number.as_deref(),
            membership_card_number: user.profile.membership_card_number.as_deref(),
            birth_date: user.profile.birth_date,
            joined_on: user.profile.joined_on,
            disciplinary_record: user.profile.disciplinary_record.as_deref(),
            club_body_appointments: user.profile.club_body_appointments.as_deref(),
            notes: user.profile.notes.as_deref(),
            avatar_url: user.profile.avatar_url.as_deref(),
        };

        let row = diesel::insert_into(users::table)
            .values(&new_row)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel)?;

        row_to_user(row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = users::table
            .filter(users::username.eq(username.as_str()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_user).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let rows: Vec<UserRow> = users::table
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        rows.into_iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let count: i64 = users::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(count.unsigned_abs())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: ProfileChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let changeset = ProfileChangeset {
            username: changes.username.as_str(),
            full_name: &changes.full_name,
            parent_name: changes.profile.parent_name.as_deref(),
            citizenship: changes.profile.citizenship.as_deref(),
            address: changes.profile.address.as_deref(),
            phone: changes.profile.phone.as_deref(),
            email: changes.profile.email.as_deref(),
            id_document_number: changes.profile.id_document_number.as_deref(),
            licence_number: changes.profile.licence_number.as_deref(),
            membership_card_number: changes.profile.membership_card_number.as_deref(),
            birth_date: changes.profile.birth_date,
            joined_on: changes.profile.joined_on,
        };

        let row = diesel::update(users::table.find(id.as_uuid()))
            .set(&changeset)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        if row.is_none() {
            return Ok(None);
        }

        if let Some(hash) = &changes.secret_hash {
            diesel::update(users::table.find(id.as_uuid()))
                .set(users::password_hash.eq(hash.as_str()))
                .execute(&mut conn)
                .await
                .map_err(map_diesel)?;
        }

        if let Some(url) = &changes.avatar_url {
            diesel::update(users::table.find(id.as_uuid()))
                .set(users::avatar_url.eq(url.as_str()))
                .execute(&mut conn)
                .await
                .map_err(map_diesel)?;
        }

        if let Some(fields) = &changes.admin_fields {
            diesel::update(users::table.find(id.as_uuid()))
                .set(&AdminFieldsChangeset {
                    disciplinary_record: fields.disciplinary_record.as_deref(),
                    club_body_appointments: fields.club_body_appointments.as_deref(),
                    notes: fields.notes.as_deref(),
                })
                .execute(&mut conn)
                .await
                .map_err(map_diesel)?;
        }

        let row = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_user).transpose()
    }

    async fn update_admin_fields(
        &self,
        id: &UserId,
        changes: AdminChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = diesel::update(users::table.find(id.as_uuid()))
            .set((
                users::role.eq(changes.role.as_str()),
                &AdminFieldsChangeset {
                    disciplinary_record: changes.fields.disciplinary_record.as_deref(),
                    club_body_appointments: changes.fields.club_body_appointments.as_deref(),
                    notes: changes.fields.notes.as_deref(),
                },
            ))
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_user).transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping and row conversion edge cases.

    use chrono::Utc;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn valid_row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "ana".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            full_name: "Ana Kovac".into(),
            role: "guide".into(),
            parent_name: None,
            citizenship: None,
            address: None,
            phone: None,
            email: Some("ana@club.example".into()),
            id_document_number: None,
            licence_number: None,
            membership_card_number: None,
            birth_date: None,
            joined_on: None,
            disciplinary_record: None,
            club_body_appointments: None,
            notes: None,
            avatar_url: None,
            total_distance_km: 20.0,
            total_ascent_m: 1000,
            climbs_count: 2,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn valid_rows_convert(valid_row: UserRow) {
        let user = row_to_user(valid_row).expect("valid row converts");
        assert_eq!(user.role, Role::Guide);
        assert_eq!(user.stats.climbs_count, 2);
    }

    #[rstest]
    fn unknown_role_labels_fail_conversion(mut valid_row: UserRow) {
        valid_row.role = "president".into();
        let err = row_to_user(valid_row).expect_err("unknown role rejected");
        assert!(matches!(err, UserPersistenceError::Query { .. }));
    }

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool(PoolError::checkout("connection refused"));
        assert!(matches!(err, UserPersistenceError::Connection { .. }));
    }

    #[rstest]
    fn unique_violations_map_to_duplicate_username() {
        let err = map_diesel(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        ));
        assert_eq!(err, UserPersistenceError::DuplicateUsername);
    }
}
