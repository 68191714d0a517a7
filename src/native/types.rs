//! Native billing object model
//!
//! These mirror the objects the store SDK hands to its callbacks and the
//! parameter objects it accepts. They are owned by the native side: the
//! bridge reads them through the serialization layer and builds parameter
//! objects from caller records, but never exposes them to callers.

use serde::{Deserialize, Serialize};

/// Native product type string for one-time products
pub const PRODUCT_TYPE_INAPP: &str = "inapp";

/// Native product type string for subscriptions
pub const PRODUCT_TYPE_SUBS: &str = "subs";

/// Outcome object passed to every native callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBillingResult {
    pub response_code: i32,
    pub debug_message: String,
}

impl NativeBillingResult {
    pub fn new(response_code: i32, debug_message: impl Into<String>) -> Self {
        Self {
            response_code,
            debug_message: debug_message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeOneTimePurchaseOfferDetails {
    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePricingPhase {
    pub billing_cycle_count: i32,
    pub billing_period: String,
    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
    pub recurrence_mode: i32,
}

/// Wrapper the SDK uses around the ordered phase list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePricingPhases {
    pub pricing_phase_list: Vec<NativePricingPhase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSubscriptionOfferDetails {
    pub base_plan_id: String,
    #[serde(default)]
    pub offer_id: Option<String>,
    pub offer_token: String,
    #[serde(default)]
    pub pricing_phases: NativePricingPhases,
}

/// Native product details handle
///
/// Besides being translated into a record, the handle itself is passed back
/// to the SDK when launching a billing flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeProductDetails {
    pub product_id: String,
    pub product_type: String,
    #[serde(default)]
    pub one_time_purchase_offer_details: Option<NativeOneTimePurchaseOfferDetails>,
    #[serde(default)]
    pub subscription_offer_details: Option<Vec<NativeSubscriptionOfferDetails>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePurchase {
    pub order_id: Option<String>,
    pub products: Vec<String>,
    pub purchase_token: String,
    pub acknowledged: bool,
}

impl NativePurchase {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }
}

/// One product entry in a product details query
///
/// Fields stay optional because the SDK builder accepts partially filled
/// entries and reports the problem through its own result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryProduct {
    pub product_id: Option<String>,
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryProductDetailsParams {
    pub product_list: Vec<QueryProduct>,
}

/// One product entry in a billing flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetailsParams {
    pub product_details: Option<NativeProductDetails>,
    pub offer_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingFlowParams {
    pub product_details_params_list: Vec<ProductDetailsParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcknowledgePurchaseParams {
    pub purchase_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPurchasesParams {
    pub product_type: Option<String>,
}
