use common::error::{AppError, Res};
use db::UserStore;

use crate::dtos::sub::CreateSubscriptionRequest;

use super::{
    billing::{BillingProvider, CreatedSubscription, SubscriptionSummary},
    customer::ensure_customer,
};

pub async fn list_subscriptions(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    user_id: &str,
) -> Res<Vec<SubscriptionSummary>> {
    let customer = ensure_customer(billing, store, user_id).await?;
    billing.list_subscriptions(&customer.id).await
}

/// Subscribes the user to one of the configured plans, paying with the
/// given payment method which also becomes the customer's default.
///
/// The plan is only recorded as active right away when the first payment
/// already succeeded. Otherwise the webhook records it once the provider
/// reports the subscription.
pub async fn create_subscription(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    plans: &[String],
    user_id: &str,
    req: CreateSubscriptionRequest,
) -> Res<CreatedSubscription> {
    if !plans.iter().any(|plan| *plan == req.plan) {
        return Err(AppError::Validation(format!("Unknown plan: {}", req.plan)));
    }
    if req.payment_method.trim().is_empty() {
        return Err(AppError::Validation("Payment method is required".to_string()));
    }

    let customer = ensure_customer(billing, store, user_id).await?;
    billing
        .attach_default_payment_method(&customer.id, &req.payment_method)
        .await?;
    let subscription = billing.create_subscription(&customer.id, &req.plan).await?;

    if subscription.payment_intent_status.as_deref() == Some("succeeded") {
        store.add_active_plan(user_id, &subscription.id).await?;
    }
    log::info!(
        "User {} subscribed to {} ({}, {})",
        user_id,
        req.plan,
        subscription.id,
        subscription.status
    );
    Ok(subscription)
}

/// Cancels a subscription owned by the user.
///
/// Fails with `OwnershipMismatch` before touching the subscription when the
/// customer does not point back to the user, or when the subscription
/// belongs to another customer.
pub async fn cancel_subscription(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    user_id: &str,
    subscription_id: &str,
) -> Res<SubscriptionSummary> {
    let customer = ensure_customer(billing, store, user_id).await?;
    if customer.owner_user_id.as_deref() != Some(user_id) {
        log::warn!(
            "User {} tried to cancel {} through customer {} owned by {:?}",
            user_id,
            subscription_id,
            customer.id,
            customer.owner_user_id
        );
        return Err(AppError::OwnershipMismatch(
            "Billing customer belongs to another user".to_string(),
        ));
    }

    let subscription = billing.retrieve_subscription(subscription_id).await?;
    if subscription.customer_id != customer.id {
        return Err(AppError::OwnershipMismatch(
            "Subscription belongs to another customer".to_string(),
        ));
    }

    let canceled = billing.cancel_subscription(subscription_id).await?;
    if canceled.status == "canceled" {
        store.remove_active_plan(user_id, &canceled.id).await?;
    }
    Ok(canceled)
}
