use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user document: identity, cached billing customer and the
/// subscriptions the payments provider reported as active.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub active_plans: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: &str, email: Option<String>) -> Self {
        let now = Utc::now();
        UserRecord {
            id: id.to_string(),
            email,
            stripe_customer_id: None,
            active_plans: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
