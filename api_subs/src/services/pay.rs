use common::error::{AppError, Res};
use db::UserStore;

use crate::dtos::pay::{AmountInput, CheckoutLineItem, CheckoutRequest};

use super::{
    billing::{
        BillingProvider, CardPaymentMethod, CheckoutSessionRef, PaymentIntentRef, SetupIntentRef,
    },
    customer::ensure_customer,
};

/// A one-off charge in minor currency units, within the provider's card limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmount(i64);

impl PaymentAmount {
    pub const MIN: i64 = 50;
    pub const MAX: i64 = 9_999_999;

    pub fn new(amount: i64) -> Res<Self> {
        if (Self::MIN..=Self::MAX).contains(&amount) {
            Ok(PaymentAmount(amount))
        } else {
            Err(AppError::Validation(format!(
                "Amount must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                amount
            )))
        }
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl TryFrom<AmountInput> for PaymentAmount {
    type Error = AppError;

    fn try_from(input: AmountInput) -> Res<Self> {
        let amount = match input {
            AmountInput::Number(amount) => amount,
            AmountInput::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::Validation(format!("Amount is not a number: {}", text)))?,
        };
        PaymentAmount::new(amount)
    }
}

fn validate_line_item(item: &CheckoutLineItem) -> Res<()> {
    if item.quantity == 0 {
        return Err(AppError::Validation("Line item quantity must be at least 1".to_string()));
    }
    match (&item.price, &item.price_data) {
        (Some(price), None) if !price.trim().is_empty() => Ok(()),
        (None, Some(data)) => {
            if data.unit_amount <= 0 {
                return Err(AppError::Validation("Unit amount must be positive".to_string()));
            }
            if data.product_data.name.trim().is_empty() {
                return Err(AppError::Validation("Product name is required".to_string()));
            }
            Ok(())
        }
        _ => Err(AppError::Validation(
            "Line item needs either a price or price_data".to_string(),
        )),
    }
}

/// Creates a hosted checkout session for a one-off card payment.
///
/// Return URLs default to the checkout page of the web app.
pub async fn create_checkout_session(
    billing: &dyn BillingProvider,
    web_app_url: &str,
    req: CheckoutRequest,
) -> Res<CheckoutSessionRef> {
    if req.line_items.is_empty() {
        return Err(AppError::Validation("At least one line item is required".to_string()));
    }
    req.line_items.iter().try_for_each(validate_line_item)?;

    let success_url = req.success_url.unwrap_or_else(|| {
        format!(
            "{}/app/checkout?session_id={{CHECKOUT_SESSION_ID}}&success=true",
            web_app_url
        )
    });
    let cancel_url = req.cancel_url.unwrap_or_else(|| {
        format!(
            "{}/app/checkout?session_id={{CHECKOUT_SESSION_ID}}&success=false",
            web_app_url
        )
    });

    billing
        .create_checkout_session(&req.line_items, &success_url, &cancel_url)
        .await
}

pub async fn create_payment_intent(
    billing: &dyn BillingProvider,
    amount: PaymentAmount,
) -> Res<PaymentIntentRef> {
    billing.create_payment_intent(amount.value()).await
}

pub async fn create_setup_intent(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    user_id: &str,
) -> Res<SetupIntentRef> {
    let customer = ensure_customer(billing, store, user_id).await?;
    billing.create_setup_intent(&customer.id).await
}

pub async fn list_payment_methods(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    user_id: &str,
) -> Res<Vec<CardPaymentMethod>> {
    let customer = ensure_customer(billing, store, user_id).await?;
    billing.list_card_payment_methods(&customer.id).await
}
