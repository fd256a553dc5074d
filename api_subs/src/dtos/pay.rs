use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// A checkout line item references either an existing price or describes
/// one inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub price: Option<String>,
    pub price_data: Option<LineItemPriceData>,
    pub quantity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemPriceData {
    pub currency: String,
    /// In minor currency units.
    pub unit_amount: i64,
    pub product_data: LineItemProduct,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemProduct {
    pub name: String,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Payment forms post the amount either as a number or as the raw input string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: AmountInput,
}

#[derive(Debug, Serialize)]
pub struct BillingConfigResponse {
    pub publishable_key: String,
    pub plans: Vec<String>,
}
