use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::Success,
    session::IdentityClaims,
};
use db::UserStore;

use crate::{
    dtos::pay::{BillingConfigResponse, CheckoutRequest, PaymentIntentRequest},
    services::{self, billing::BillingProvider, pay::PaymentAmount},
};

/// Returns what the browser needs to initialise the payments SDK.
///
/// # Output
/// - Success: `{ "publishable_key": "pk_...", "plans": ["price_..."] }`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/config', { credentials: 'include' });
/// const { publishable_key, plans } = await response.json();
/// const stripe = await loadStripe(publishable_key);
/// ```
#[get("/config")]
pub async fn get_config(config: web::Data<Arc<Config>>) -> Res<impl Responder> {
    Success::ok(BillingConfigResponse {
        publishable_key: config.stripe.publishable_key.clone(),
        plans: config.stripe.plan_price_ids.clone(),
    })
}

/// Creates a hosted checkout session for a one-off payment.
///
/// # Input
/// - `req`: JSON payload with
///   - `line_items`: items with a `quantity` and either a `price` id or inline `price_data`
///   - `success_url`, `cancel_url`: (Optional) return URLs, default to the web app's checkout page
///
/// # Output
/// - Success: `{ "id": "cs_...", "url": "https://checkout.stripe.com/..." }`
/// - Error: 400 Bad Request for empty or malformed line items
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/checkout', {
///   method: 'POST',
///   credentials: 'include',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({
///     line_items: [{
///       price_data: {
///         currency: 'usd',
///         unit_amount: 2000,
///         product_data: { name: 'T-shirt' }
///       },
///       quantity: 1
///     }]
///   })
/// });
///
/// if (response.ok) {
///   const session = await response.json();
///   await stripe.redirectToCheckout({ sessionId: session.id });
/// }
/// ```
#[post("/checkout")]
pub async fn post_checkout(
    req: web::Json<CheckoutRequest>,
    billing: web::Data<dyn BillingProvider>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let session = services::pay::create_checkout_session(
        billing.get_ref(),
        &config.web_app_url,
        req.into_inner(),
    )
    .await?;
    Success::created(session)
}

/// Creates a payment intent for a one-off card charge.
///
/// # Input
/// - `req`: JSON payload with `amount` in cents, as a number or numeric string, between 50 and 9999999
///
/// # Output
/// - Success: `{ "id": "pi_...", "client_secret": "...", "amount": 2500, "status": "requires_payment_method" }`
/// - Error: 400 Bad Request when the amount is out of range
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/payment-intents', {
///   method: 'POST',
///   credentials: 'include',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ amount: 2500 })
/// });
///
/// const intent = await response.json();
/// await stripe.confirmCardPayment(intent.client_secret, {
///   payment_method: { card: cardElement }
/// });
/// ```
#[post("/payment-intents")]
pub async fn post_payment_intent(
    req: web::Json<PaymentIntentRequest>,
    billing: web::Data<dyn BillingProvider>,
) -> Res<impl Responder> {
    let amount = PaymentAmount::try_from(req.into_inner().amount)?;
    let intent = services::pay::create_payment_intent(billing.get_ref(), amount).await?;
    Success::created(intent)
}

/// Creates a setup intent to save a card for the signed-in user's billing customer.
///
/// # Output
/// - Success: `{ "id": "seti_...", "client_secret": "...", "status": "requires_payment_method" }`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/setup-intents', {
///   method: 'POST',
///   credentials: 'include'
/// });
///
/// const intent = await response.json();
/// await stripe.confirmCardSetup(intent.client_secret, {
///   payment_method: { card: cardElement }
/// });
/// ```
#[post("/setup-intents")]
pub async fn post_setup_intent(
    claims: web::ReqData<IdentityClaims>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<impl Responder> {
    let intent =
        services::pay::create_setup_intent(billing.get_ref(), store.get_ref(), claims.user_id())
            .await?;
    Success::created(intent)
}

/// Lists the cards saved for the signed-in user.
///
/// # Output
/// - Success: `[{ "id": "pm_...", "brand": "visa", "last4": "4242", "exp_month": 12, "exp_year": 2030 }]`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/billing/payment-methods', { credentials: 'include' });
/// const cards = await response.json();
/// ```
#[get("/payment-methods")]
pub async fn get_payment_methods(
    claims: web::ReqData<IdentityClaims>,
    billing: web::Data<dyn BillingProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<impl Responder> {
    let methods =
        services::pay::list_payment_methods(billing.get_ref(), store.get_ref(), claims.user_id())
            .await?;
    Success::ok(methods)
}
