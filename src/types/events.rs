//! Payloads of the broadcast event channels

use super::billing_result::BillingResult;
use super::purchase::Purchase;
use serde::{Deserialize, Serialize};

/// Channel name for purchase-state changes
pub const PURCHASES_UPDATED_EVENT: &str = "purchasesUpdated";

/// Channel name for unsolicited connection loss
pub const SERVICE_DISCONNECTED_EVENT: &str = "billingServiceDisconnected";

/// Emitted whenever the native layer reports a purchase-state change,
/// including the outcome of a billing flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasesUpdatedEvent {
    pub billing_result: BillingResult,
    pub purchases: Vec<Purchase>,
}

/// Emitted when the native service drops the connection on its own
///
/// Carries no data and serializes as an empty record (`{}`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDisconnectedEvent {}
