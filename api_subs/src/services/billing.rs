use std::{collections::HashMap, fmt::Display, str::FromStr};

use async_trait::async_trait;
use common::{
    env_config::StripeConfig,
    error::{AppError, Res},
};
use serde::Serialize;
use stripe::{
    AttachPaymentMethod, CancelSubscription, CheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCustomer, CreatePaymentIntent, CreateSetupIntent,
    CreateSubscription, CreateSubscriptionItems, Currency, Customer, CustomerId,
    CustomerInvoiceSettings, ListPaymentMethods, ListSubscriptions, PaymentIntent, PaymentMethod,
    PaymentMethodId, SetupIntent, Subscription, SubscriptionId, UpdateCustomer,
};

use crate::dtos::pay::CheckoutLineItem;

/// Customer metadata key holding the id of the application user.
pub const CUSTOMER_OWNER_KEY: &str = "firebaseUID";

/// Page size for list calls, the most Stripe returns at once.
const LIST_LIMIT: u64 = 100;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BillingCustomer {
    pub id: String,
    pub email: Option<String>,
    /// Back-reference stored in the customer metadata.
    pub owner_user_id: Option<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckoutSessionRef {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentIntentRef {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SetupIntentRef {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardPaymentMethod {
    pub id: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubscriptionSummary {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub price_ids: Vec<String>,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatedSubscription {
    pub id: String,
    pub status: String,
    /// Status of the first invoice's payment, `succeeded` once it is paid.
    pub payment_intent_status: Option<String>,
    /// Present while the first payment still needs confirmation in the browser.
    pub client_secret: Option<String>,
}

/// Hosted billing operations the payment routes rely on.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn retrieve_customer(&self, customer_id: &str) -> Res<BillingCustomer>;

    /// Creates a customer tagged with the application user id.
    async fn create_customer(&self, user_id: &str, email: Option<&str>) -> Res<BillingCustomer>;

    async fn create_checkout_session(
        &self,
        line_items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Res<CheckoutSessionRef>;

    /// `amount` is in minor units of USD.
    async fn create_payment_intent(&self, amount: i64) -> Res<PaymentIntentRef>;

    async fn create_setup_intent(&self, customer_id: &str) -> Res<SetupIntentRef>;

    async fn list_card_payment_methods(&self, customer_id: &str) -> Res<Vec<CardPaymentMethod>>;

    /// Attaches the payment method and makes it the default for invoices.
    async fn attach_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Res<()>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> Res<CreatedSubscription>;

    async fn list_subscriptions(&self, customer_id: &str) -> Res<Vec<SubscriptionSummary>>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<SubscriptionSummary>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<SubscriptionSummary>;
}

pub struct StripeBilling {
    client: &'static Client,
}

impl StripeBilling {
    pub fn new(config: &StripeConfig) -> Self {
        StripeBilling {
            client: common::stripe::client(&config.secret_key),
        }
    }
}

fn parse_id<T>(raw: &str, what: &str) -> Res<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::BadRequest(format!("Invalid {} id {}: {}", what, raw, e)))
}

fn parse_currency(raw: &str) -> Res<Currency> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| AppError::BadRequest(format!("Unsupported currency: {}", raw)))
}

impl From<Customer> for BillingCustomer {
    fn from(customer: Customer) -> Self {
        BillingCustomer {
            id: customer.id.to_string(),
            email: customer.email,
            owner_user_id: customer
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.get(CUSTOMER_OWNER_KEY))
                .cloned(),
            deleted: customer.deleted,
        }
    }
}

impl From<Subscription> for SubscriptionSummary {
    fn from(subscription: Subscription) -> Self {
        SubscriptionSummary {
            id: subscription.id.to_string(),
            customer_id: subscription.customer.id().to_string(),
            status: subscription.status.to_string(),
            price_ids: subscription
                .items
                .data
                .iter()
                .filter_map(|item| item.price.as_ref().map(|price| price.id.to_string()))
                .collect(),
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
        }
    }
}

#[async_trait]
impl BillingProvider for StripeBilling {
    async fn retrieve_customer(&self, customer_id: &str) -> Res<BillingCustomer> {
        let id = parse_id::<CustomerId>(customer_id, "customer")?;
        let customer = Customer::retrieve(self.client, &id, &[]).await?;
        Ok(customer.into())
    }

    async fn create_customer(&self, user_id: &str, email: Option<&str>) -> Res<BillingCustomer> {
        let params = CreateCustomer {
            email,
            metadata: Some(HashMap::from([(
                CUSTOMER_OWNER_KEY.to_string(),
                user_id.to_string(),
            )])),
            ..Default::default()
        };
        let customer = Customer::create(self.client, params).await?;
        Ok(customer.into())
    }

    async fn create_checkout_session(
        &self,
        line_items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Res<CheckoutSessionRef> {
        let mut items = Vec::with_capacity(line_items.len());
        for item in line_items {
            let price_data = match &item.price_data {
                Some(data) => Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                    currency: parse_currency(&data.currency)?,
                    unit_amount: Some(data.unit_amount),
                    product_data: Some(
                        stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                            name: data.product_data.name.clone(),
                            description: data.product_data.description.clone(),
                            images: data.product_data.images.clone(),
                            ..Default::default()
                        },
                    ),
                    ..Default::default()
                }),
                None => None,
            };
            items.push(stripe::CreateCheckoutSessionLineItems {
                price: item.price.clone(),
                price_data,
                quantity: Some(item.quantity),
                ..Default::default()
            });
        }

        let params = CreateCheckoutSession {
            payment_method_types: Some(vec![
                stripe::CreateCheckoutSessionPaymentMethodTypes::Card,
            ]),
            line_items: Some(items),
            mode: Some(CheckoutSessionMode::Payment),
            success_url: Some(success_url),
            cancel_url: Some(cancel_url),
            ..Default::default()
        };
        let session = CheckoutSession::create(self.client, params).await?;
        Ok(CheckoutSessionRef {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn create_payment_intent(&self, amount: i64) -> Res<PaymentIntentRef> {
        let mut params = CreatePaymentIntent::new(amount, Currency::USD);
        params.payment_method_types = Some(vec!["card".to_string()]);
        let intent = PaymentIntent::create(self.client, params).await?;
        Ok(PaymentIntentRef {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            amount: intent.amount,
            status: intent.status.to_string(),
        })
    }

    async fn create_setup_intent(&self, customer_id: &str) -> Res<SetupIntentRef> {
        let mut params = CreateSetupIntent::new();
        params.customer = Some(parse_id::<CustomerId>(customer_id, "customer")?);
        params.payment_method_types = Some(vec!["card".to_string()]);
        let intent = SetupIntent::create(self.client, params).await?;
        Ok(SetupIntentRef {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            status: intent.status.to_string(),
        })
    }

    async fn list_card_payment_methods(&self, customer_id: &str) -> Res<Vec<CardPaymentMethod>> {
        let mut params = ListPaymentMethods::new();
        params.customer = Some(parse_id::<CustomerId>(customer_id, "customer")?);
        params.limit = Some(LIST_LIMIT);
        let methods = PaymentMethod::list(self.client, &params).await?;

        // only cards carry card details
        Ok(methods
            .data
            .into_iter()
            .filter_map(|method| {
                let card = method.card?;
                Some(CardPaymentMethod {
                    id: method.id.to_string(),
                    brand: card.brand,
                    last4: card.last4,
                    exp_month: card.exp_month,
                    exp_year: card.exp_year,
                })
            })
            .collect())
    }

    async fn attach_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Res<()> {
        let customer = parse_id::<CustomerId>(customer_id, "customer")?;
        let method = parse_id::<PaymentMethodId>(payment_method_id, "payment method")?;

        PaymentMethod::attach(
            self.client,
            &method,
            AttachPaymentMethod {
                customer: customer.clone(),
            },
        )
        .await?;

        let params = UpdateCustomer {
            invoice_settings: Some(CustomerInvoiceSettings {
                default_payment_method: Some(method.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        Customer::update(self.client, &customer, params).await?;
        Ok(())
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> Res<CreatedSubscription> {
        let mut params = CreateSubscription::new(parse_id::<CustomerId>(customer_id, "customer")?);
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            ..Default::default()
        }]);
        params.expand = &["latest_invoice.payment_intent"];
        let subscription = Subscription::create(self.client, params).await?;

        let payment_intent = subscription
            .latest_invoice
            .as_ref()
            .and_then(|invoice| invoice.as_object())
            .and_then(|invoice| invoice.payment_intent.as_ref())
            .and_then(|intent| intent.as_object());

        Ok(CreatedSubscription {
            id: subscription.id.to_string(),
            status: subscription.status.to_string(),
            payment_intent_status: payment_intent.map(|intent| intent.status.to_string()),
            client_secret: payment_intent.and_then(|intent| intent.client_secret.clone()),
        })
    }

    async fn list_subscriptions(&self, customer_id: &str) -> Res<Vec<SubscriptionSummary>> {
        let params = subscription_list_params(customer_id)?;
        let subscriptions = Subscription::list(self.client, &params).await?;
        Ok(subscriptions.data.into_iter().map(Into::into).collect())
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Res<SubscriptionSummary> {
        let id = parse_id::<SubscriptionId>(subscription_id, "subscription")?;
        let subscription = Subscription::retrieve(self.client, &id, &[]).await?;
        Ok(subscription.into())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Res<SubscriptionSummary> {
        let id = parse_id::<SubscriptionId>(subscription_id, "subscription")?;
        let subscription = Subscription::cancel(self.client, &id, CancelSubscription::new()).await?;
        Ok(subscription.into())
    }
}

fn subscription_list_params(customer_id: &str) -> Res<ListSubscriptions<'static>> {
    let mut params = ListSubscriptions::new();
    params.customer = Some(parse_id::<CustomerId>(customer_id, "customer")?);
    params.limit = Some(LIST_LIMIT);
    Ok(params)
}
