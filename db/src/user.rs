use async_trait::async_trait;
use common::error::{AppError, Res};
use sqlx::PgPool;

use crate::models::user::UserRecord;

/// Storage for per-user documents.
///
/// Updates touch single fields only, so concurrent writers of different
/// fields never clobber each other.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Res<Option<UserRecord>>;

    /// Creates the record on first sign-in, otherwise refreshes the email.
    /// A missing email leaves the stored one untouched.
    async fn upsert_email(&self, user_id: &str, email: Option<&str>) -> Res<UserRecord>;

    /// Stores `customer_id` unless the user already has one and returns
    /// whichever id is stored afterwards.
    async fn claim_customer_id(&self, user_id: &str, customer_id: &str) -> Res<String>;

    /// Swaps `stale_id` for `customer_id` if it is still the stored id and
    /// returns whichever id is stored afterwards.
    async fn replace_customer_id(
        &self,
        user_id: &str,
        stale_id: &str,
        customer_id: &str,
    ) -> Res<String>;

    async fn add_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()>;

    async fn remove_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        PgUserStore { pool }
    }

    async fn stored_customer_id(&self, user_id: &str) -> Res<String> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))?
            .stripe_customer_id
            .ok_or_else(|| AppError::Internal(format!("Customer id of {} vanished", user_id)))
    }
}

fn user_not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("User {} does not exist", user_id))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user(&self, user_id: &str) -> Res<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn upsert_email(&self, user_id: &str, email: Option<&str>) -> Res<UserRecord> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, users.email),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn claim_customer_id(&self, user_id: &str, customer_id: &str) -> Res<String> {
        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET stripe_customer_id = $2, updated_at = now()
            WHERE id = $1 AND stripe_customer_id IS NULL
            RETURNING stripe_customer_id
            "#,
        )
        .bind(user_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        match claimed {
            Some(id) => Ok(id),
            // another request stored a customer first
            None => self.stored_customer_id(user_id).await,
        }
    }

    async fn replace_customer_id(
        &self,
        user_id: &str,
        stale_id: &str,
        customer_id: &str,
    ) -> Res<String> {
        let replaced: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET stripe_customer_id = $3, updated_at = now()
            WHERE id = $1 AND stripe_customer_id = $2
            RETURNING stripe_customer_id
            "#,
        )
        .bind(user_id)
        .bind(stale_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        match replaced {
            Some(id) => Ok(id),
            None => self.stored_customer_id(user_id).await,
        }
    }

    async fn add_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET active_plans = CASE
                    WHEN $2 = ANY(active_plans) THEN active_plans
                    ELSE array_append(active_plans, $2)
                END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(subscription_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }

    async fn remove_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET active_plans = array_remove(active_plans, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(subscription_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }
}
