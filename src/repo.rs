use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{User, Verification, VerificationPurpose};

/// Persistence boundary for the account service. Production runs on
/// Postgres; tests run on the in-memory double below.
#[async_trait]
pub trait AuthRepo: Send + Sync {
    async fn get_user(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Existence checks go through the list form so "no rows" is not an error.
    async fn list_users(&self, email: &str) -> anyhow::Result<Vec<User>>;
    async fn create_user(&self, user: &User) -> anyhow::Result<()>;
    async fn update_user(&self, user: &User) -> anyhow::Result<()>;
    /// Removes the user and any verification rows; reports whether a user
    /// row existed.
    async fn delete_user(&self, email: &str) -> anyhow::Result<bool>;
    async fn upsert_verification(&self, record: &Verification) -> anyhow::Result<()>;
    async fn get_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> anyhow::Result<Option<Verification>>;
    async fn delete_verification(&self, email: &str) -> anyhow::Result<()>;
}

pub struct PgRepo {
    db: PgPool,
}

impl PgRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, status, role, created_at, updated_at";

#[async_trait]
impl AuthRepo for PgRepo {
    async fn get_user(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_users(&self, email: &str) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, status, role)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status)
        .bind(&user.role)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, status = $3, role = $4, updated_at = now()
            WHERE id = $5
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status)
        .bind(&user.role)
        .bind(user.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM verification WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_verification(&self, record: &Verification) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification (email, purpose, code, expires_at, attempts_remaining)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email, purpose)
            DO UPDATE SET code = $3, expires_at = $4, attempts_remaining = $5, updated_at = now()
            "#,
        )
        .bind(&record.email)
        .bind(record.purpose)
        .bind(&record.code)
        .bind(record.expires_at)
        .bind(record.attempts_remaining)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> anyhow::Result<Option<Verification>> {
        let record = sqlx::query_as::<_, Verification>(
            r#"
            SELECT email, purpose, code, expires_at, attempts_remaining, created_at, updated_at
            FROM verification
            WHERE email = $1 AND purpose = $2
            "#,
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn delete_verification(&self, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM verification WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// In-memory repository double. Serializes everything behind one mutex;
/// good enough for unit tests and local experiments.
#[derive(Default)]
pub struct MemoryRepo {
    inner: std::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: Vec<User>,
    verifications: Vec<Verification>,
}

#[async_trait]
impl AuthRepo for MemoryRepo {
    async fn get_user(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, email: &str) -> anyhow::Result<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|u| u.email == email)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            anyhow::bail!("duplicate key value violates unique constraint");
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => anyhow::bail!("no user with id {}", user.id),
        }
    }

    async fn delete_user(&self, email: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.verifications.retain(|v| v.email != email);
        let before = inner.users.len();
        inner.users.retain(|u| u.email != email);
        Ok(inner.users.len() < before)
    }

    async fn upsert_verification(&self, record: &Verification) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .verifications
            .retain(|v| !(v.email == record.email && v.purpose == record.purpose));
        inner.verifications.push(record.clone());
        Ok(())
    }

    async fn get_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> anyhow::Result<Option<Verification>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .verifications
            .iter()
            .find(|v| v.email == email && v.purpose == purpose)
            .cloned())
    }

    async fn delete_verification(&self, email: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.verifications.retain(|v| v.email != email);
        Ok(())
    }
}
