//! Purchase-related types
//!
//! `Purchase` records are produced only by translating native purchases; the
//! bridge never constructs one on its own behalf and keeps none after the call
//! or event that delivered it.

use super::billing_result::BillingResult;
use super::product::ProductType;
use serde::{Deserialize, Serialize};

/// A completed (or pending) store transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// Store order identifier; absent for some pending and test purchases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    /// Product identifiers included in this purchase, in native order
    pub products: Vec<String>,

    /// Unique token identifying this purchase
    pub purchase_token: String,

    pub is_acknowledged: bool,
}

/// Result of `query_purchases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasesResult {
    pub billing_result: BillingResult,
    pub purchases: Vec<Purchase>,
}

impl PurchasesResult {
    /// A result carrying only an outcome and no purchases
    pub fn empty(billing_result: BillingResult) -> Self {
        Self {
            billing_result,
            purchases: Vec::new(),
        }
    }
}

/// A product to buy in a billing flow
///
/// `offer_token` selects a subscription offer and is only needed for
/// subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchBillingFlowItem {
    pub product_id: String,
    pub product_type: ProductType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_token: Option<String>,
}

impl LaunchBillingFlowItem {
    pub fn new(product_id: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            product_id: product_id.into(),
            product_type,
            offer_token: None,
        }
    }

    pub fn with_offer_token(mut self, offer_token: impl Into<String>) -> Self {
        self.offer_token = Some(offer_token.into());
        self
    }
}
