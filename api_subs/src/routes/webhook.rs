use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::UserStore;

use crate::services::{self, billing::BillingProvider};

/// Receives subscription lifecycle events from Stripe.
///
/// # Input
/// - `payload`: Raw request body, the signature covers it byte for byte
/// - `req`: HTTP request carrying the `Stripe-Signature` header
/// - `config`: Application configuration with the webhook signing secret
///
/// # Output
/// - Success: 200 OK for handled and for ignored event types
/// - Error: 400 Bad Request for a missing or invalid signature, and when handling fails
///   so that Stripe delivers the event again
///
/// # Note
/// This endpoint is not called by the frontend. Configure it in the Stripe Dashboard
/// under Developers → Webhooks as `https://yourapp.com/api/stripe/webhook`, subscribe to
/// `customer.subscription.created` and `customer.subscription.deleted`, and set the
/// signing secret as STRIPE_WEBHOOK_SECRET.
#[post("/webhook")]
pub async fn post_webhook(
    payload: web::Bytes,
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<HttpResponse> {
    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Stripe signature missing".to_string()))?;
    if payload.is_empty() {
        return Err(AppError::InvalidSignature("Empty payload".to_string()));
    }
    let payload = std::str::from_utf8(&payload)
        .map_err(|_| AppError::InvalidSignature("Payload is not UTF-8".to_string()))?;

    let event =
        services::webhook::construct_event(payload, signature, &config.stripe.webhook_secret)?;

    if let Err(e) =
        services::webhook::reconcile(billing.get_ref(), store.get_ref(), &event).await
    {
        log::error!("Webhook handling failed for {:?}: {}", event, e);
        return Ok(HttpResponse::BadRequest().finish());
    }
    Ok(HttpResponse::Ok().finish())
}
