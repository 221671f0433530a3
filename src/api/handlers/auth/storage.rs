//! Database helpers for identity and OTP state.
//!
//! Every mutation is a single conditional statement so concurrent requests
//! cannot observe a half-applied transition; an OTP is consumed by the same
//! `UPDATE` that checks it.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::ProfileUpdateRequest;
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new identity.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(Uuid),
    Conflict,
}

/// Outcome of an allow-listed profile update.
#[derive(Debug)]
pub(super) enum ProfileUpdateOutcome {
    Updated(ProfileRecord),
    Missing,
    Conflict,
}

/// Fields needed by the signin and OTP flows.
pub(super) struct UserRecord {
    pub(super) id: Uuid,
    pub(super) full_name: String,
    pub(super) email: Option<String>,
    pub(super) mobile: Option<String>,
    pub(super) password_hash: String,
    pub(super) verified: bool,
}

/// Seed values for a fresh identity. The OTP pair is part of the insert so
/// a new record is born awaiting verification.
pub(super) struct NewUser<'a> {
    pub(super) full_name: &'a str,
    pub(super) email: Option<&'a str>,
    pub(super) mobile: Option<&'a str>,
    pub(super) password_hash: &'a str,
    pub(super) age: Option<i32>,
    pub(super) city: Option<&'a str>,
    pub(super) address: Option<&'a str>,
    pub(super) otp_code: &'a str,
    pub(super) otp_expires_at: DateTime<Utc>,
}

/// Profile columns exposed by the profile endpoints. The secret columns
/// (`password_hash`, the OTP pair) are never selected here.
#[derive(Debug)]
pub(super) struct ProfileRecord {
    pub(super) id: String,
    pub(super) full_name: String,
    pub(super) email: Option<String>,
    pub(super) mobile: Option<String>,
    pub(super) alternate_mobile: Option<String>,
    pub(super) age: Option<i32>,
    pub(super) dob: Option<NaiveDate>,
    pub(super) address: Option<String>,
    pub(super) city: Option<String>,
    pub(super) state: Option<String>,
    pub(super) pincode: Option<String>,
    pub(super) gender: Option<String>,
    pub(super) verified: bool,
    pub(super) created_at: String,
    pub(super) updated_at: String,
}

pub(super) async fn insert_user(pool: &PgPool, user: &NewUser<'_>) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (full_name, email, mobile, password_hash, age, city, address,
             otp_code, otp_expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user.full_name)
        .bind(user.email)
        .bind(user.mobile)
        .bind(user.password_hash)
        .bind(user.age)
        .bind(user.city)
        .bind(user.address)
        .bind(user.otp_code)
        .bind(user.otp_expires_at)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Look up an identity by email or mobile (both live in one namespace).
pub(super) async fn find_user_by_identifier(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, full_name, email, mobile, password_hash, verified
        FROM users
        WHERE email = $1 OR mobile = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(identifier)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by identifier")?;

    Ok(row.map(|row| read_user(&row)))
}

pub(super) async fn find_user_auth_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, full_name, email, mobile, password_hash, verified
        FROM users
        WHERE id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| read_user(&row)))
}

/// Overwrite the OTP pair. A reissue replaces any live challenge.
pub(super) async fn store_otp(
    pool: &PgPool,
    user_id: Uuid,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET otp_code = $2,
            otp_expires_at = $3,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store otp")?;
    Ok(())
}

/// Consume the signup OTP and mark the identity verified in one statement.
/// Returns false when the code is wrong or expired; the stored pair is left
/// untouched in that case so the caller may retry.
pub(super) async fn consume_signup_otp(pool: &PgPool, user_id: Uuid, code: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET otp_code = NULL,
            otp_expires_at = NULL,
            verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
          AND otp_code = $2
          AND otp_expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to consume signup otp")?;

    Ok(result.rows_affected() > 0)
}

/// Consume a signin OTP. Same conditional shape as the signup variant,
/// without flipping `verified`.
pub(super) async fn consume_otp(pool: &PgPool, user_id: Uuid, code: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET otp_code = NULL,
            otp_expires_at = NULL,
            updated_at = NOW()
        WHERE id = $1
          AND otp_code = $2
          AND otp_expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to consume otp")?;

    Ok(result.rows_affected() > 0)
}

/// Consume a reset OTP and replace the password hash in one statement.
pub(super) async fn consume_otp_set_password(
    pool: &PgPool,
    user_id: Uuid,
    code: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $3,
            otp_code = NULL,
            otp_expires_at = NULL,
            updated_at = NOW()
        WHERE id = $1
          AND otp_code = $2
          AND otp_expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to reset password")?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRecord>> {
    let query = r#"
        SELECT
            id::text AS id,
            full_name,
            email,
            mobile,
            alternate_mobile,
            age,
            dob,
            address,
            city,
            state,
            pincode,
            gender,
            verified,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM users
        WHERE id = $1
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch profile")?;

    Ok(row.map(|row| read_profile(&row)))
}

/// Apply an allow-listed partial update. Absent fields keep their stored
/// value via `COALESCE`; an email/mobile collision surfaces as `Conflict`.
pub(super) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    changes: &ProfileUpdateRequest,
) -> Result<ProfileUpdateOutcome> {
    let query = r#"
        UPDATE users
        SET
            full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            mobile = COALESCE($4, mobile),
            alternate_mobile = COALESCE($5, alternate_mobile),
            age = COALESCE($6, age),
            dob = COALESCE($7, dob),
            address = COALESCE($8, address),
            city = COALESCE($9, city),
            state = COALESCE($10, state),
            pincode = COALESCE($11, pincode),
            gender = COALESCE($12, gender),
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id::text AS id,
            full_name,
            email,
            mobile,
            alternate_mobile,
            age,
            dob,
            address,
            city,
            state,
            pincode,
            gender,
            verified,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(changes.full_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.mobile.as_deref())
        .bind(changes.alternate_mobile.as_deref())
        .bind(changes.age)
        .bind(changes.dob)
        .bind(changes.address.as_deref())
        .bind(changes.city.as_deref())
        .bind(changes.state.as_deref())
        .bind(changes.pincode.as_deref())
        .bind(changes.gender.map(super::types::Gender::as_str))
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(ProfileUpdateOutcome::Updated(read_profile(&row))),
        Ok(None) => Ok(ProfileUpdateOutcome::Missing),
        Err(err) if is_unique_violation(&err) => Ok(ProfileUpdateOutcome::Conflict),
        Err(err) => Err(err).context("failed to update profile"),
    }
}

fn read_user(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        mobile: row.get("mobile"),
        password_hash: row.get("password_hash"),
        verified: row.get("verified"),
    }
}

fn read_profile(row: &PgRow) -> ProfileRecord {
    ProfileRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        mobile: row.get("mobile"),
        alternate_mobile: row.get("alternate_mobile"),
        age: row.get("age"),
        dob: row.get("dob"),
        address: row.get("address"),
        city: row.get("city"),
        state: row.get("state"),
        pincode: row.get("pincode"),
        gender: row.get("gender"),
        verified: row.get("verified"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewUser, ProfileUpdateOutcome, SignupOutcome, UserRecord};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn signup_outcome_debug_names() {
        assert!(format!("{:?}", SignupOutcome::Created(Uuid::nil())).starts_with("Created("));
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[test]
    fn profile_update_outcome_debug_names() {
        assert_eq!(format!("{:?}", ProfileUpdateOutcome::Missing), "Missing");
        assert_eq!(format!("{:?}", ProfileUpdateOutcome::Conflict), "Conflict");
    }

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            id: Uuid::nil(),
            full_name: "Alice".to_string(),
            email: Some("alice@example.com".to_string()),
            mobile: None,
            password_hash: "$argon2id$stub".to_string(),
            verified: true,
        };
        assert_eq!(record.id, Uuid::nil());
        assert_eq!(record.email.as_deref(), Some("alice@example.com"));
        assert!(record.verified);
    }

    #[test]
    fn new_user_keeps_identifier_split() {
        let expires = Utc::now();
        let user = NewUser {
            full_name: "Alice",
            email: None,
            mobile: Some("9876543210"),
            password_hash: "$argon2id$stub",
            age: Some(30),
            city: None,
            address: None,
            otp_code: "123456",
            otp_expires_at: expires,
        };
        assert_eq!(user.email, None);
        assert_eq!(user.mobile, Some("9876543210"));
        assert_eq!(user.otp_code, "123456");
    }
}
