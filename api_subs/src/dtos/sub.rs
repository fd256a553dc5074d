use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Recurring price id, one of the configured plans.
    pub plan: String,
    /// Payment method collected by the browser SDK.
    pub payment_method: String,
}
