use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{NewPayment, User};

pub mod memory;
pub mod queries;

pub use memory::MemoryStore;

use queries::{PaymentQueries, UserQueries};

/// Persistence seam for accounts and their credit balance.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `AppError::UserExists` when the email is taken. Emails
    /// compare case-insensitively here and in `find_by_email`.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Takes one credit if the balance is positive and returns the new
    /// balance. `None` means nothing was taken.
    async fn consume_credit(&self, id: Uuid) -> Result<Option<i32>>;

    /// Gives back a credit taken by `consume_credit`.
    async fn refund_credit(&self, id: Uuid) -> Result<i32>;

    /// Records the payment and overwrites plan and credits in one unit.
    /// Fails with `AppError::DuplicateOrder` when the order was seen before.
    async fn apply_purchase(&self, payment: &NewPayment) -> Result<User>;

    async fn ping(&self) -> Result<()>;
}

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("Creating database connection pool...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        tracing::info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::errors::AppError::Internal(e.into()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        UserQueries::create_user(&self.pool, name, email, password_hash).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        UserQueries::find_by_email(&self.pool, email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserQueries::find_by_id(&self.pool, id).await
    }

    async fn consume_credit(&self, id: Uuid) -> Result<Option<i32>> {
        UserQueries::consume_credit(&self.pool, id).await
    }

    async fn refund_credit(&self, id: Uuid) -> Result<i32> {
        UserQueries::refund_credit(&self.pool, id).await
    }

    async fn apply_purchase(&self, payment: &NewPayment) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        PaymentQueries::insert(&mut *tx, payment).await?;
        let user = UserQueries::set_plan_and_credits(&mut *tx, payment.user_id, payment.plan, payment.quantity).await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
