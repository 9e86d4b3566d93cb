use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewUser, User, UserChanges, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User Not Found")]
    NotFound,
    /// Carries the violated constraint name, e.g. `users_email_key`.
    #[error("duplicate key value violates unique constraint \"{0}\"")]
    UniqueViolation(String),
    #[error("stored user id {0} does not fit in u32")]
    InvalidId(i64),
    #[error("no user ids left to assign")]
    IdsExhausted,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err
                    .constraint()
                    .unwrap_or_else(|| db_err.message())
                    .to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Data access for the User resource.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by id.
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;
    async fn find_by_id(&self, id: u32) -> Result<User, StoreError>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn update_by_id(&self, id: u32, changes: UserChanges) -> Result<User, StoreError>;
    async fn delete_by_id(&self, id: u32) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, email, phone, password_hash, created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_by_id(&self, id: u32) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, email, phone, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(i64::from(id))
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;
        User::try_from(row)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (first_name, last_name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email, phone, password_hash, created_at, updated_at
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        User::try_from(row)
    }

    async fn update_by_id(&self, id: u32, changes: UserChanges) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET first_name = $2,
                   last_name = $3,
                   email = $4,
                   phone = $5,
                   password_hash = COALESCE($6, password_hash),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, first_name, last_name, email, phone, password_hash, created_at, updated_at
            "#,
        )
        .bind(i64::from(id))
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;
        User::try_from(row)
    }

    async fn delete_by_id(&self, id: u32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(i64::from(id))
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
