//! Types module
//!
//! Contains the records that cross the bridge boundary.
//! This module organizes types into logical submodules:
//! - `billing_result`: Response codes and the `BillingResult` outcome record
//! - `product`: Product lookup inputs and product details records
//! - `purchase`: Purchase records and billing flow launch inputs
//! - `options`: Option records accepted by the boundary operations
//! - `events`: Payloads of the two broadcast event channels
//! - `error`: Precondition error type for the bridge
//!
//! Every record here is a plain, acyclic value. Records never hold references
//! to native objects or to each other.

pub mod billing_result;
pub mod error;
pub mod events;
pub mod options;
pub mod product;
pub mod purchase;

pub use billing_result::{BillingResponseCode, BillingResult};
pub use error::BridgeError;
pub use events::{
    PurchasesUpdatedEvent, ServiceDisconnectedEvent, PURCHASES_UPDATED_EVENT,
    SERVICE_DISCONNECTED_EVENT,
};
pub use options::{
    AcknowledgePurchaseOptions, LaunchBillingFlowOptions, QueryProductDetailsOptions,
    QueryPurchasesOptions,
};
pub use product::{
    OneTimePurchaseOfferDetails, PricingPhase, ProductDetails, ProductDetailsResult,
    ProductQueryItem, ProductType, RecurrenceMode, SubscriptionOfferDetails,
};
pub use purchase::{LaunchBillingFlowItem, Purchase, PurchasesResult};
