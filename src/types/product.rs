//! Product-related types
//!
//! Lookup inputs (`ProductQueryItem`) and the `ProductDetails` record the
//! serialization layer produces from native product details.

use super::billing_result::BillingResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native scale of `priceAmountMicros` values
const MICROS_SCALE: u32 = 6;

/// Kind of product sold through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// One-time (consumable or non-consumable) product
    #[serde(rename = "inapp")]
    InApp,

    /// Auto-renewing subscription
    #[serde(rename = "subs")]
    Subscription,
}

impl ProductType {
    /// The string the native layer uses for this product type
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::InApp => "inapp",
            ProductType::Subscription => "subs",
        }
    }

    /// Parse a native product type string
    pub fn from_native(value: &str) -> Option<Self> {
        match value {
            "inapp" => Some(ProductType::InApp),
            "subs" => Some(ProductType::Subscription),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single product to look up
///
/// Input-only; `product_id` must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQueryItem {
    pub product_id: String,
    pub product_type: ProductType,
}

impl ProductQueryItem {
    pub fn new(product_id: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            product_id: product_id.into(),
            product_type,
        }
    }
}

/// How a subscription pricing phase recurs
///
/// Serialized as the native integer code. Codes outside the known set are
/// preserved in `Unknown` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum RecurrenceMode {
    InfiniteRecurring,
    FiniteRecurring,
    NonRecurring,
    Unknown(i32),
}

impl From<i32> for RecurrenceMode {
    fn from(code: i32) -> Self {
        match code {
            1 => RecurrenceMode::InfiniteRecurring,
            2 => RecurrenceMode::FiniteRecurring,
            3 => RecurrenceMode::NonRecurring,
            other => RecurrenceMode::Unknown(other),
        }
    }
}

impl From<RecurrenceMode> for i32 {
    fn from(mode: RecurrenceMode) -> Self {
        match mode {
            RecurrenceMode::InfiniteRecurring => 1,
            RecurrenceMode::FiniteRecurring => 2,
            RecurrenceMode::NonRecurring => 3,
            RecurrenceMode::Unknown(code) => code,
        }
    }
}

/// Price of a one-time product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePurchaseOfferDetails {
    /// Price formatted for display, including the currency symbol
    pub formatted_price: String,

    /// Price in micro-units (1,000,000 micro-units = 1 currency unit)
    pub price_amount_micros: i64,

    /// ISO 4217 currency code
    pub price_currency_code: String,
}

impl OneTimePurchaseOfferDetails {
    /// Price as a decimal amount in currency units
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_amount_micros, MICROS_SCALE).normalize()
    }
}

/// One pricing phase of a subscription offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPhase {
    /// Number of billing cycles for finite phases, 0 otherwise
    pub billing_cycle_count: u32,

    /// ISO-8601 duration, passed through untouched
    pub billing_period: String,

    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
    pub recurrence_mode: RecurrenceMode,
}

impl PricingPhase {
    /// Price of one billing cycle as a decimal amount in currency units
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_amount_micros, MICROS_SCALE).normalize()
    }
}

/// A purchasable subscription offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOfferDetails {
    pub base_plan_id: String,

    /// Present only for developer-defined offers on top of the base plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,

    /// Token to pass back when launching a billing flow for this offer
    pub offer_token: String,

    pub pricing_phases: Vec<PricingPhase>,
}

/// Details of a product, as returned by a product lookup
///
/// The native layer populates one of the two offer fields depending on the
/// product type. Either may be absent; an absent field is omitted from the
/// serialized record rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub product_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_time_purchase_offer_details: Option<OneTimePurchaseOfferDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_offer_details: Option<Vec<SubscriptionOfferDetails>>,
}

/// Result of `query_product_details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsResult {
    pub billing_result: BillingResult,
    pub product_details_list: Vec<ProductDetails>,
}

impl ProductDetailsResult {
    /// A result carrying only an outcome and no details
    pub fn empty(billing_result: BillingResult) -> Self {
        Self {
            billing_result,
            product_details_list: Vec::new(),
        }
    }
}
