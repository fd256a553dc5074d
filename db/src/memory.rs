use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{AppError, Res};

use crate::{models::user::UserRecord, user::UserStore};

/// `UserStore` kept in process memory. Used by tests and local tooling.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }

    fn update<F>(&self, user_id: &str, apply: F) -> Res<UserRecord>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AppError::Internal("User store lock poisoned".to_string()))?;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))?;
        apply(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Res<Option<UserRecord>> {
        let users = self
            .users
            .lock()
            .map_err(|_| AppError::Internal("User store lock poisoned".to_string()))?;
        Ok(users.get(user_id).cloned())
    }

    async fn upsert_email(&self, user_id: &str, email: Option<&str>) -> Res<UserRecord> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AppError::Internal("User store lock poisoned".to_string()))?;
        let user = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::new(user_id, None));
        if let Some(email) = email {
            user.email = Some(email.to_string());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn claim_customer_id(&self, user_id: &str, customer_id: &str) -> Res<String> {
        let user = self.update(user_id, |user| {
            if user.stripe_customer_id.is_none() {
                user.stripe_customer_id = Some(customer_id.to_string());
            }
        })?;
        user.stripe_customer_id
            .ok_or_else(|| AppError::Internal(format!("Customer id of {} vanished", user_id)))
    }

    async fn replace_customer_id(
        &self,
        user_id: &str,
        stale_id: &str,
        customer_id: &str,
    ) -> Res<String> {
        let user = self.update(user_id, |user| {
            if user.stripe_customer_id.as_deref() == Some(stale_id) {
                user.stripe_customer_id = Some(customer_id.to_string());
            }
        })?;
        user.stripe_customer_id
            .ok_or_else(|| AppError::Internal(format!("Customer id of {} vanished", user_id)))
    }

    async fn add_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()> {
        self.update(user_id, |user| {
            if !user.active_plans.iter().any(|id| id == subscription_id) {
                user.active_plans.push(subscription_id.to_string());
            }
        })
        .map(|_| ())
    }

    async fn remove_active_plan(&self, user_id: &str, subscription_id: &str) -> Res<()> {
        self.update(user_id, |user| {
            user.active_plans.retain(|id| id != subscription_id);
        })
        .map(|_| ())
    }
}
