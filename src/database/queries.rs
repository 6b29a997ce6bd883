use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::errors::{AppError, Result};
use crate::models::*;

const USER_COLUMNS: &str = "id, name, email, password_hash, plan, photo_credits, created_at, updated_at";

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct UserQueries;

impl UserQueries {
    pub async fn create_user(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| if is_unique_violation(&e) { AppError::UserExists } else { e.into() })?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Check and decrement happen in one statement, so two concurrent
    /// requests cannot both spend the last credit.
    pub async fn consume_credit(pool: &PgPool, id: Uuid) -> Result<Option<i32>> {
        let remaining = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET photo_credits = photo_credits - 1, updated_at = NOW()
            WHERE id = $1 AND photo_credits > 0
            RETURNING photo_credits
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(remaining)
    }

    pub async fn refund_credit(pool: &PgPool, id: Uuid) -> Result<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET photo_credits = photo_credits + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING photo_credits
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn set_plan_and_credits(
        conn: &mut PgConnection,
        id: Uuid,
        plan: Plan,
        credits: i32,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET plan = $1, photo_credits = $2, updated_at = NOW() WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(plan)
        .bind(credits)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppError::NotFound)
    }
}

pub struct PaymentQueries;

impl PaymentQueries {
    pub async fn insert(conn: &mut PgConnection, payment: &NewPayment) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (user_id, plan, order_id, payer_id, quantity, amount_minor, verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, plan, order_id, payer_id, quantity, amount_minor, verified, created_at
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.plan)
        .bind(&payment.order_id)
        .bind(&payment.payer_id)
        .bind(payment.quantity)
        .bind(payment.amount_minor)
        .bind(payment.verified)
        .fetch_one(conn)
        .await
        .map_err(|e| if is_unique_violation(&e) { AppError::DuplicateOrder } else { e.into() })?;

        Ok(payment)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, plan, order_id, payer_id, quantity, amount_minor, verified, created_at
            FROM payments
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }
}
