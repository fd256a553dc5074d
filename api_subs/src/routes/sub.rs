use std::sync::Arc;

use actix_web::{Responder, delete, get, post, web};
use common::{env_config::Config, error::Res, http::Success, session::IdentityClaims};
use db::UserStore;

use crate::{
    dtos::sub::CreateSubscriptionRequest,
    services::{self, billing::BillingProvider},
};

/// Lists the signed-in user's subscriptions, canceled ones excluded.
///
/// # Output
/// - Success: an array of
///   `{ "id": "sub_...", "customer_id": "cus_...", "status": "active", "price_ids": ["price_..."], "current_period_end": 1700000000, "cancel_at_period_end": false }`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/subscriptions', { credentials: 'include' });
/// const subscriptions = await response.json();
/// ```
#[get("/subscriptions")]
pub async fn get_subscriptions(
    claims: web::ReqData<IdentityClaims>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<impl Responder> {
    let subscriptions = services::sub::list_subscriptions(
        billing.get_ref(),
        store.get_ref(),
        claims.user_id(),
    )
    .await?;
    Success::ok(subscriptions)
}

/// Subscribes the signed-in user to a plan.
///
/// # Input
/// - `req`: JSON payload with
///   - `plan`: one of the price ids returned by `/billing/config`
///   - `payment_method`: payment method id created by the browser SDK
///
/// # Output
/// - Success: `{ "id": "sub_...", "status": "active", "payment_intent_status": "succeeded", "client_secret": "..." }`
///   When `payment_intent_status` is `requires_action` the client confirms the payment with `client_secret`.
/// - Error: 400 Bad Request for an unknown plan or a declined card
///
/// # Frontend Example
/// ```javascript
/// const { paymentMethod } = await stripe.createPaymentMethod({ type: 'card', card: cardElement });
/// const response = await fetch('/api/dashboard/billing/subscriptions', {
///   method: 'POST',
///   credentials: 'include',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ plan: 'price_123', payment_method: paymentMethod.id })
/// });
///
/// const subscription = await response.json();
/// if (subscription.payment_intent_status === 'requires_action') {
///   await stripe.confirmCardPayment(subscription.client_secret);
/// }
/// ```
#[post("/subscriptions")]
pub async fn post_subscription(
    req: web::Json<CreateSubscriptionRequest>,
    claims: web::ReqData<IdentityClaims>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let subscription = services::sub::create_subscription(
        billing.get_ref(),
        store.get_ref(),
        &config.stripe.plan_price_ids,
        claims.user_id(),
        req.into_inner(),
    )
    .await?;
    Success::created(subscription)
}

/// Cancels one of the signed-in user's subscriptions immediately.
///
/// # Output
/// - Success: the canceled subscription
/// - Error: 403 Forbidden when the subscription does not belong to the user
///
/// # Frontend Example
/// ```javascript
/// await fetch(`/api/dashboard/billing/subscriptions/${subscriptionId}`, {
///   method: 'DELETE',
///   credentials: 'include'
/// });
/// ```
#[delete("/subscriptions/{id}")]
pub async fn delete_subscription(
    path: web::Path<String>,
    claims: web::ReqData<IdentityClaims>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<impl Responder> {
    let subscription = services::sub::cancel_subscription(
        billing.get_ref(),
        store.get_ref(),
        claims.user_id(),
        path.as_str(),
    )
    .await?;
    Success::ok(subscription)
}
