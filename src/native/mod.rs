//! Native billing layer boundary
//!
//! The store SDK is an external collaborator: it reports every asynchronous
//! outcome through a callback that fires exactly once, on a thread of its
//! choosing, and pushes unsolicited notifications through listeners. This
//! module describes that surface as traits so the bridge can be driven by the
//! real SDK binding or by the in-process [`simulated::SimulatedBillingClient`].
//!
//! # Components
//!
//! - `types` - Native objects and parameter objects
//! - `activity` - Foreground context provider used by billing flows
//! - `simulated` - In-process store used by the harness, tests and benches

pub mod activity;
pub mod simulated;
pub mod types;

pub use activity::{Activity, ForegroundContextProvider, ForegroundSlot};
pub use simulated::{NativeOperation, SimulatedBillingClient};
pub use types::{
    AcknowledgePurchaseParams, BillingFlowParams, NativeBillingResult, NativeProductDetails,
    NativePurchase, ProductDetailsParams, QueryProductDetailsParams, QueryPurchasesParams,
};

use std::sync::Arc;

/// Completion callback for `query_product_details_async`
pub type ProductDetailsCallback =
    Box<dyn FnOnce(NativeBillingResult, Option<Vec<NativeProductDetails>>) + Send>;

/// Completion callback for `query_purchases_async`
pub type PurchasesCallback =
    Box<dyn FnOnce(NativeBillingResult, Option<Vec<NativePurchase>>) + Send>;

/// Completion callback for `acknowledge_purchase`
pub type AcknowledgeCallback = Box<dyn FnOnce(NativeBillingResult) + Send>;

/// Listener for the outcome of a connection attempt and later connection loss
pub trait BillingClientStateListener: Send + Sync {
    /// The connection attempt finished, successfully or not
    fn on_billing_setup_finished(&self, result: NativeBillingResult);

    /// The service dropped an established connection on its own
    fn on_billing_service_disconnected(&self);
}

/// Listener for purchase-state changes, registered once per client
pub trait PurchasesUpdatedListener: Send + Sync {
    fn on_purchases_updated(&self, result: NativeBillingResult, purchases: Option<Vec<NativePurchase>>);
}

/// The callback-driven native billing client
///
/// Each `*_async` method and `acknowledge_purchase` invokes its callback
/// exactly once. The SDK offers no way to cancel an issued call.
pub trait NativeBillingClient: Send + Sync {
    /// Register the listener for purchase updates
    fn set_purchases_updated_listener(&self, listener: Arc<dyn PurchasesUpdatedListener>);

    /// Whether the native connection is currently established
    fn is_ready(&self) -> bool;

    /// Begin connecting; the outcome arrives on `listener`
    fn start_connection(&self, listener: Arc<dyn BillingClientStateListener>);

    /// Close the connection and release native resources
    fn end_connection(&self);

    fn query_product_details_async(
        &self,
        params: QueryProductDetailsParams,
        callback: ProductDetailsCallback,
    );

    /// Show the store purchase UI
    ///
    /// Returns immediately with the launch outcome. The purchase itself is
    /// reported later through the purchases-updated listener.
    fn launch_billing_flow(&self, activity: &Activity, params: BillingFlowParams) -> NativeBillingResult;

    fn acknowledge_purchase(&self, params: AcknowledgePurchaseParams, callback: AcknowledgeCallback);

    fn query_purchases_async(&self, params: QueryPurchasesParams, callback: PurchasesCallback);
}
