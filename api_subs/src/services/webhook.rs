use common::error::{AppError, Res};
use db::UserStore;
use stripe::{Event, EventObject, EventType, Subscription, Webhook, WebhookError};

use super::billing::BillingProvider;

/// Subscription fields the reconciler needs out of an event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
}

impl From<Subscription> for SubscriptionObject {
    fn from(subscription: Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            customer: subscription.customer.id().to_string(),
            status: subscription.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    SubscriptionCreated(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    Unhandled(String),
}

/// Verifies the `Stripe-Signature` header against the raw body and decodes the event.
pub fn construct_event(payload: &str, signature: &str, secret: &str) -> Res<WebhookEvent> {
    construct_event_at(payload, signature, secret, chrono::Utc::now().timestamp())
}

/// Same as [`construct_event`] with the clock supplied by the caller.
pub fn construct_event_at(
    payload: &str,
    signature: &str,
    secret: &str,
    now: i64,
) -> Res<WebhookEvent> {
    match Webhook::construct_event_with_timestamp(payload, signature, secret, now) {
        Ok(event) => into_webhook_event(event),
        // The signature already matched, so the body is Stripe's but its shape is not one
        // this SDK version knows.
        Err(WebhookError::BadParse(e)) => unparsed_event(payload, e),
        Err(e) => {
            log::warn!("Rejected webhook delivery: {}", e);
            Err(AppError::InvalidSignature(format!("Webhook Error: {}", e)))
        }
    }
}

fn into_webhook_event(event: Event) -> Res<WebhookEvent> {
    log::debug!("Received event {} of type {}", event.id, event.type_);

    match (event.type_, event.data.object) {
        (EventType::CustomerSubscriptionCreated, EventObject::Subscription(subscription)) => {
            Ok(WebhookEvent::SubscriptionCreated(subscription.into()))
        }
        (EventType::CustomerSubscriptionDeleted, EventObject::Subscription(subscription)) => {
            Ok(WebhookEvent::SubscriptionDeleted(subscription.into()))
        }
        (
            type_ @ (EventType::CustomerSubscriptionCreated
            | EventType::CustomerSubscriptionDeleted),
            _,
        ) => Err(AppError::BadRequest(format!(
            "Event {} does not carry a subscription",
            type_
        ))),
        (type_, _) => Ok(WebhookEvent::Unhandled(type_.to_string())),
    }
}

fn unparsed_event(payload: &str, error: serde_json::Error) -> Res<WebhookEvent> {
    let type_ = serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| value.get("type")?.as_str().map(str::to_string))
        .unwrap_or_default();

    if type_ == EventType::CustomerSubscriptionCreated.to_string()
        || type_ == EventType::CustomerSubscriptionDeleted.to_string()
    {
        return Err(AppError::BadRequest(format!("Malformed subscription event: {}", error)));
    }
    log::warn!("Could not decode signed event of type {:?}: {}", type_, error);
    Ok(WebhookEvent::Unhandled(type_))
}

async fn owner_of(billing: &dyn BillingProvider, customer_id: &str) -> Res<String> {
    billing
        .retrieve_customer(customer_id)
        .await?
        .owner_user_id
        .ok_or_else(|| {
            AppError::NotFound(format!("Customer {} has no user back-reference", customer_id))
        })
}

/// Applies a subscription lifecycle event to the owning user's active plans.
pub async fn reconcile(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    event: &WebhookEvent,
) -> Res<()> {
    match event {
        WebhookEvent::SubscriptionCreated(subscription) => {
            let user_id = owner_of(billing, &subscription.customer).await?;
            store.add_active_plan(&user_id, &subscription.id).await?;
            log::info!("Plan {} activated for {}", subscription.id, user_id);
        }
        WebhookEvent::SubscriptionDeleted(subscription) => {
            let user_id = owner_of(billing, &subscription.customer).await?;
            store.remove_active_plan(&user_id, &subscription.id).await?;
            log::info!("Plan {} removed from {}", subscription.id, user_id);
        }
        WebhookEvent::Unhandled(type_) => {
            log::info!("Ignoring unhandled event type {}", type_);
        }
    }
    Ok(())
}
