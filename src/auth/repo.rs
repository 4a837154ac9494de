use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::services;

const KEY_LENGTH: usize = 50;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_verified, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, first_name, last_name, is_verified, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// The two single-use key flows share one shape; only the table differs.
#[derive(Debug, Clone, Copy)]
pub enum KeyKind {
    Activation,
    ResetPassword,
}

impl KeyKind {
    fn table(self) -> &'static str {
        match self {
            KeyKind::Activation => "activation_keys",
            KeyKind::ResetPassword => "reset_password_keys",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key: String,
    pub is_used: bool,
    pub created_at: OffsetDateTime,
}

impl AccountKey {
    /// Reuse the user's unused key if one exists; otherwise mint a fresh
    /// random one, retrying on the (vanishingly rare) collision.
    pub async fn get_or_create(
        db: &PgPool,
        kind: KeyKind,
        user_id: Uuid,
    ) -> anyhow::Result<AccountKey> {
        let select = format!(
            "SELECT id, user_id, key, is_used, created_at FROM {} \
             WHERE user_id = $1 AND is_used = FALSE",
            kind.table()
        );
        if let Some(existing) = sqlx::query_as::<_, AccountKey>(&select)
            .bind(user_id)
            .fetch_optional(db)
            .await?
        {
            return Ok(existing);
        }

        let probe = format!("SELECT id FROM {} WHERE key = $1", kind.table());
        let insert = format!(
            "INSERT INTO {} (user_id, key) VALUES ($1, $2) \
             RETURNING id, user_id, key, is_used, created_at",
            kind.table()
        );
        loop {
            let key = services::generate_key(KEY_LENGTH);
            let taken = sqlx::query_scalar::<_, Uuid>(&probe)
                .bind(&key)
                .fetch_optional(db)
                .await?;
            if taken.is_some() {
                continue;
            }
            let created = sqlx::query_as::<_, AccountKey>(&insert)
                .bind(user_id)
                .bind(&key)
                .fetch_one(db)
                .await?;
            return Ok(created);
        }
    }

    pub async fn find_unused(
        db: &PgPool,
        kind: KeyKind,
        key: &str,
    ) -> anyhow::Result<Option<AccountKey>> {
        let select = format!(
            "SELECT id, user_id, key, is_used, created_at FROM {} \
             WHERE key = $1 AND is_used = FALSE",
            kind.table()
        );
        let record = sqlx::query_as::<_, AccountKey>(&select)
            .bind(key)
            .fetch_optional(db)
            .await?;
        Ok(record)
    }

    pub async fn mark_used(db: &PgPool, kind: KeyKind, id: Uuid) -> anyhow::Result<()> {
        let update = format!("UPDATE {} SET is_used = TRUE WHERE id = $1", kind.table());
        sqlx::query(&update).bind(id).execute(db).await?;
        Ok(())
    }
}
