//! In-process simulated store
//!
//! `SimulatedBillingClient` implements [`NativeBillingClient`] without a real
//! store behind it. It behaves the way the SDK does where the bridge can
//! observe it:
//!
//! - callbacks and listener notifications are delivered serially on a
//!   dedicated native thread, never on the caller's thread
//! - operations issued while disconnected report `SERVICE_DISCONNECTED`
//! - a successful billing flow returns OK immediately and reports the new
//!   purchase later through the purchases-updated listener
//!
//! Tests and the harness steer it through injected responses, a callback
//! delay, unsolicited disconnects and per-operation call counters.
//!
//! # Architecture
//!
//! ```text
//! SimulatedBillingClient
//!     ├── Arc<SimState>        (catalog, owned purchases, listeners, counters)
//!     └── Sender<Job>  ──────► "billing-native" thread (serial callback delivery)
//! ```

use super::activity::Activity;
use super::types::{
    AcknowledgePurchaseParams, BillingFlowParams, NativeBillingResult, NativeOneTimePurchaseOfferDetails,
    NativePricingPhase, NativePricingPhases, NativeProductDetails, NativePurchase,
    NativeSubscriptionOfferDetails, QueryProductDetailsParams, QueryPurchasesParams, PRODUCT_TYPE_INAPP,
    PRODUCT_TYPE_SUBS,
};
use super::{
    AcknowledgeCallback, BillingClientStateListener, NativeBillingClient, ProductDetailsCallback,
    PurchasesCallback, PurchasesUpdatedListener,
};
use crate::types::{BillingResponseCode, BridgeError};
use dashmap::DashMap;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

type Job = Box<dyn FnOnce() + Send>;

/// Native operations, used to key injected responses and call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOperation {
    StartConnection,
    QueryProductDetails,
    LaunchBillingFlow,
    AcknowledgePurchase,
    QueryPurchases,
}

impl fmt::Display for NativeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeOperation::StartConnection => "startConnection",
            NativeOperation::QueryProductDetails => "queryProductDetailsAsync",
            NativeOperation::LaunchBillingFlow => "launchBillingFlow",
            NativeOperation::AcknowledgePurchase => "acknowledgePurchase",
            NativeOperation::QueryPurchases => "queryPurchasesAsync",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
struct OwnedPurchase {
    sequence: u64,
    product_type: String,
    purchase: NativePurchase,
}

#[derive(Default)]
struct SimState {
    catalog: DashMap<String, NativeProductDetails>,
    owned: DashMap<String, OwnedPurchase>,
    injected: DashMap<NativeOperation, NativeBillingResult>,
    calls: DashMap<NativeOperation, usize>,
    end_connection_calls: AtomicUsize,
    connected: AtomicBool,
    next_sequence: AtomicU64,
    callback_delay_ms: AtomicU64,
    state_listener: Mutex<Option<Arc<dyn BillingClientStateListener>>>,
    purchases_listener: Mutex<Option<Arc<dyn PurchasesUpdatedListener>>>,
}

impl SimState {
    fn record_call(&self, operation: NativeOperation) {
        *self.calls.entry(operation).or_insert(0) += 1;
        trace!(%operation, "native call");
    }

    /// Consume an injected response for `operation`, if one is queued
    fn take_injected(&self, operation: NativeOperation) -> Option<NativeBillingResult> {
        self.injected.remove(&operation).map(|(_, result)| result)
    }

    fn state_listener(&self) -> Option<Arc<dyn BillingClientStateListener>> {
        self.state_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn purchases_listener(&self) -> Option<Arc<dyn PurchasesUpdatedListener>> {
        self.purchases_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn owns_one_time_product(&self, product_id: &str) -> bool {
        self.owned.iter().any(|entry| {
            entry.product_type == PRODUCT_TYPE_INAPP
                && entry.purchase.products.iter().any(|p| p == product_id)
        })
    }

    fn insert_purchase(&self, product_ids: Vec<String>, product_type: &str) -> NativePurchase {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let purchase = NativePurchase {
            order_id: Some(format!("GPA.SIM-{:04}", sequence)),
            products: product_ids,
            purchase_token: format!("sim-token-{}", sequence),
            acknowledged: false,
        };
        self.owned.insert(
            purchase.purchase_token.clone(),
            OwnedPurchase {
                sequence,
                product_type: product_type.to_string(),
                purchase: purchase.clone(),
            },
        );
        purchase
    }
}

fn result(code: BillingResponseCode, message: &str) -> NativeBillingResult {
    NativeBillingResult::new(code.code(), message)
}

fn disconnected() -> NativeBillingResult {
    result(
        BillingResponseCode::ServiceDisconnected,
        "Service connection is disconnected.",
    )
}

/// Simulated native billing client
///
/// Cloning yields another handle to the same simulated store.
#[derive(Clone)]
pub struct SimulatedBillingClient {
    state: Arc<SimState>,
    jobs: mpsc::Sender<Job>,
}

impl SimulatedBillingClient {
    /// Create a simulated store with an empty catalog
    ///
    /// Spawns the native callback thread; it exits once every handle to the
    /// client has been dropped.
    pub fn new() -> Self {
        let state = Arc::new(SimState::default());
        let (jobs, receiver) = mpsc::channel::<Job>();

        let worker_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name("billing-native".to_string())
            .spawn(move || {
                for job in receiver {
                    let delay = worker_state.callback_delay_ms.load(Ordering::Relaxed);
                    if delay > 0 {
                        thread::sleep(Duration::from_millis(delay));
                    }
                    job();
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "native callback thread failed to start; callbacks will be dropped");
        }

        Self { state, jobs }
    }

    /// Create a simulated store selling the given products
    pub fn with_catalog(products: Vec<NativeProductDetails>) -> Self {
        let client = Self::new();
        for product in products {
            client.add_product(product);
        }
        client
    }

    /// Create a simulated store with a small built-in catalog
    pub fn with_demo_catalog() -> Self {
        Self::with_catalog(demo_catalog())
    }

    /// Create a simulated store from a JSON catalog
    ///
    /// The catalog is an array of native product details objects. Every entry
    /// needs a non-empty `product_id` and a `product_type` of `inapp` or `subs`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Catalog` if the JSON is malformed or an entry is
    /// invalid, and `BridgeError::Io` if the reader fails.
    pub fn from_catalog_json<R: Read>(reader: R) -> Result<Self, BridgeError> {
        let products: Vec<NativeProductDetails> = serde_json::from_reader(reader)?;

        for (index, product) in products.iter().enumerate() {
            if product.product_id.is_empty() {
                return Err(BridgeError::catalog(format!(
                    "entry {} has an empty product_id",
                    index
                )));
            }
            if product.product_type != PRODUCT_TYPE_INAPP && product.product_type != PRODUCT_TYPE_SUBS {
                return Err(BridgeError::catalog(format!(
                    "entry {} ({}) has unknown product_type '{}'",
                    index, product.product_id, product.product_type
                )));
            }
        }

        Ok(Self::with_catalog(products))
    }

    pub fn add_product(&self, product: NativeProductDetails) {
        self.state.catalog.insert(product.product_id.clone(), product);
    }

    /// Products in the catalog, ordered by product id
    pub fn catalog(&self) -> Vec<NativeProductDetails> {
        let mut products: Vec<NativeProductDetails> = self
            .state
            .catalog
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        products
    }

    /// Record a purchase the user already owns
    pub fn grant_purchase(&self, product_id: &str, product_type: &str) -> NativePurchase {
        self.state
            .insert_purchase(vec![product_id.to_string()], product_type)
    }

    /// Make the next call of `operation` report `result` instead of its normal outcome
    pub fn respond_next(&self, operation: NativeOperation, result: NativeBillingResult) {
        self.state.injected.insert(operation, result);
    }

    /// Delay applied before each callback on the native thread
    pub fn set_callback_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.callback_delay_ms.store(millis, Ordering::Relaxed);
    }

    /// Number of times `operation` was issued
    pub fn calls(&self, operation: NativeOperation) -> usize {
        self.state.calls.get(&operation).map(|count| *count).unwrap_or(0)
    }

    pub fn end_connection_calls(&self) -> usize {
        self.state.end_connection_calls.load(Ordering::SeqCst)
    }

    /// Drop the connection as the service would on its own
    pub fn simulate_disconnect(&self) {
        let state = Arc::clone(&self.state);
        self.dispatch(move || {
            state.connected.store(false, Ordering::SeqCst);
            if let Some(listener) = state.state_listener() {
                listener.on_billing_service_disconnected();
            }
        });
    }

    /// Push a purchase update that did not originate from a billing flow
    pub fn simulate_purchases_updated(
        &self,
        result: NativeBillingResult,
        purchases: Option<Vec<NativePurchase>>,
    ) {
        let state = Arc::clone(&self.state);
        self.dispatch(move || {
            if let Some(listener) = state.purchases_listener() {
                listener.on_purchases_updated(result, purchases);
            }
        });
    }

    /// Wait until every callback queued so far has been delivered
    pub async fn settle(&self) {
        let (done, finished) = tokio::sync::oneshot::channel();
        self.dispatch(move || {
            let _ = done.send(());
        });
        let _ = finished.await;
    }

    fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        if self.jobs.send(Box::new(job)).is_err() {
            debug!("native callback thread is gone; dropping callback");
        }
    }
}

impl Default for SimulatedBillingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatedBillingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedBillingClient")
            .field("products", &self.state.catalog.len())
            .field("owned", &self.state.owned.len())
            .field("connected", &self.state.connected.load(Ordering::SeqCst))
            .finish()
    }
}

impl NativeBillingClient for SimulatedBillingClient {
    fn set_purchases_updated_listener(&self, listener: Arc<dyn PurchasesUpdatedListener>) {
        *self
            .state
            .purchases_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    fn is_ready(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    fn start_connection(&self, listener: Arc<dyn BillingClientStateListener>) {
        self.state.record_call(NativeOperation::StartConnection);
        *self
            .state
            .state_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&listener));

        let outcome = self
            .state
            .take_injected(NativeOperation::StartConnection)
            .unwrap_or_else(|| result(BillingResponseCode::Ok, ""));
        let state = Arc::clone(&self.state);
        self.dispatch(move || {
            if outcome.response_code == BillingResponseCode::Ok.code() {
                state.connected.store(true, Ordering::SeqCst);
            }
            listener.on_billing_setup_finished(outcome);
        });
    }

    fn end_connection(&self) {
        self.state.end_connection_calls.fetch_add(1, Ordering::SeqCst);
        self.state.connected.store(false, Ordering::SeqCst);
        self.state
            .state_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn query_product_details_async(
        &self,
        params: QueryProductDetailsParams,
        callback: ProductDetailsCallback,
    ) {
        self.state.record_call(NativeOperation::QueryProductDetails);

        let (outcome, details) = if let Some(injected) =
            self.state.take_injected(NativeOperation::QueryProductDetails)
        {
            (injected, None)
        } else if !self.is_ready() {
            (disconnected(), None)
        } else if params
            .product_list
            .iter()
            .any(|p| p.product_id.is_none() || p.product_type.is_none())
        {
            (
                result(
                    BillingResponseCode::DeveloperError,
                    "Product id and product type must be set.",
                ),
                None,
            )
        } else {
            let found = params
                .product_list
                .iter()
                .filter_map(|query| {
                    let product = self.state.catalog.get(query.product_id.as_deref()?)?;
                    (Some(product.product_type.as_str()) == query.product_type.as_deref())
                        .then(|| product.value().clone())
                })
                .collect();
            (result(BillingResponseCode::Ok, ""), Some(found))
        };

        self.dispatch(move || callback(outcome, details));
    }

    fn launch_billing_flow(&self, activity: &Activity, params: BillingFlowParams) -> NativeBillingResult {
        self.state.record_call(NativeOperation::LaunchBillingFlow);
        debug!(activity = activity.name(), "launching simulated billing flow");

        if let Some(injected) = self.state.take_injected(NativeOperation::LaunchBillingFlow) {
            return injected;
        }
        if !self.is_ready() {
            return disconnected();
        }
        if params.product_details_params_list.is_empty() {
            return result(
                BillingResponseCode::DeveloperError,
                "Product details params list must not be empty.",
            );
        }

        let mut product_ids = Vec::with_capacity(params.product_details_params_list.len());
        let mut product_type = PRODUCT_TYPE_INAPP;
        for entry in &params.product_details_params_list {
            let Some(details) = entry.product_details.as_ref() else {
                return result(
                    BillingResponseCode::DeveloperError,
                    "ProductDetails must be provided.",
                );
            };
            if details.product_type == PRODUCT_TYPE_SUBS {
                if entry.offer_token.is_none() {
                    return result(
                        BillingResponseCode::DeveloperError,
                        "Offer token is required for subscriptions.",
                    );
                }
                product_type = PRODUCT_TYPE_SUBS;
            } else if self.state.owns_one_time_product(&details.product_id) {
                return result(
                    BillingResponseCode::ItemAlreadyOwned,
                    "Item is already owned.",
                );
            }
            product_ids.push(details.product_id.clone());
        }

        let purchase = self.state.insert_purchase(product_ids, product_type);
        let state = Arc::clone(&self.state);
        self.dispatch(move || {
            if let Some(listener) = state.purchases_listener() {
                listener.on_purchases_updated(result(BillingResponseCode::Ok, ""), Some(vec![purchase]));
            }
        });

        result(BillingResponseCode::Ok, "")
    }

    fn acknowledge_purchase(&self, params: AcknowledgePurchaseParams, callback: AcknowledgeCallback) {
        self.state.record_call(NativeOperation::AcknowledgePurchase);

        let outcome = if let Some(injected) =
            self.state.take_injected(NativeOperation::AcknowledgePurchase)
        {
            injected
        } else if !self.is_ready() {
            disconnected()
        } else {
            match params.purchase_token.as_deref() {
                None => result(
                    BillingResponseCode::DeveloperError,
                    "Purchase token must be set.",
                ),
                Some(token) => match self.state.owned.get_mut(token) {
                    None => result(BillingResponseCode::ItemNotOwned, "Unknown purchase token."),
                    Some(entry) if entry.purchase.acknowledged => result(
                        BillingResponseCode::DeveloperError,
                        "Purchase has already been acknowledged.",
                    ),
                    Some(mut entry) => {
                        entry.purchase.acknowledged = true;
                        result(BillingResponseCode::Ok, "")
                    }
                },
            }
        };

        self.dispatch(move || callback(outcome));
    }

    fn query_purchases_async(&self, params: QueryPurchasesParams, callback: PurchasesCallback) {
        self.state.record_call(NativeOperation::QueryPurchases);

        let (outcome, purchases) = if let Some(injected) =
            self.state.take_injected(NativeOperation::QueryPurchases)
        {
            (injected, None)
        } else if !self.is_ready() {
            (disconnected(), Some(Vec::new()))
        } else {
            match params.product_type.as_deref() {
                None => (
                    result(BillingResponseCode::DeveloperError, "Product type must be set."),
                    None,
                ),
                Some(product_type) => {
                    let mut owned: Vec<OwnedPurchase> = self
                        .state
                        .owned
                        .iter()
                        .filter(|entry| entry.product_type == product_type)
                        .map(|entry| entry.value().clone())
                        .collect();
                    owned.sort_by_key(|entry| entry.sequence);
                    let purchases = owned.into_iter().map(|entry| entry.purchase).collect();
                    (result(BillingResponseCode::Ok, ""), Some(purchases))
                }
            }
        };

        self.dispatch(move || callback(outcome, purchases));
    }
}

/// Built-in catalog: one one-time product and one subscription with a trial offer
pub fn demo_catalog() -> Vec<NativeProductDetails> {
    vec![
        NativeProductDetails {
            product_id: "premium_upgrade".to_string(),
            product_type: PRODUCT_TYPE_INAPP.to_string(),
            one_time_purchase_offer_details: Some(NativeOneTimePurchaseOfferDetails {
                formatted_price: "$4.99".to_string(),
                price_amount_micros: 4_990_000,
                price_currency_code: "USD".to_string(),
            }),
            subscription_offer_details: None,
        },
        NativeProductDetails {
            product_id: "pro_monthly".to_string(),
            product_type: PRODUCT_TYPE_SUBS.to_string(),
            one_time_purchase_offer_details: None,
            subscription_offer_details: Some(vec![
                NativeSubscriptionOfferDetails {
                    base_plan_id: "monthly".to_string(),
                    offer_id: Some("free-trial".to_string()),
                    offer_token: "pro_monthly:monthly:free-trial".to_string(),
                    pricing_phases: NativePricingPhases {
                        pricing_phase_list: vec![
                            NativePricingPhase {
                                billing_cycle_count: 1,
                                billing_period: "P1W".to_string(),
                                formatted_price: "Free".to_string(),
                                price_amount_micros: 0,
                                price_currency_code: "USD".to_string(),
                                recurrence_mode: 2,
                            },
                            NativePricingPhase {
                                billing_cycle_count: 0,
                                billing_period: "P1M".to_string(),
                                formatted_price: "$2.99".to_string(),
                                price_amount_micros: 2_990_000,
                                price_currency_code: "USD".to_string(),
                                recurrence_mode: 1,
                            },
                        ],
                    },
                },
                NativeSubscriptionOfferDetails {
                    base_plan_id: "monthly".to_string(),
                    offer_id: None,
                    offer_token: "pro_monthly:monthly".to_string(),
                    pricing_phases: NativePricingPhases {
                        pricing_phase_list: vec![NativePricingPhase {
                            billing_cycle_count: 0,
                            billing_period: "P1M".to_string(),
                            formatted_price: "$2.99".to_string(),
                            price_amount_micros: 2_990_000,
                            price_currency_code: "USD".to_string(),
                            recurrence_mode: 1,
                        }],
                    },
                },
            ]),
        },
    ]
}
