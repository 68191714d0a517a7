//! The boundary surface of the billing bridge
//!
//! `BillingBridge` composes the connection manager, the request correlator,
//! the event broadcaster and the billing flow orchestrator into the
//! operations a caller sees.
//!
//! # Error model
//!
//! Every operation returns `Result<_, BridgeError>`. `Err` means a caller
//! defect found before any native call was made (missing input, no
//! foreground activity, or `NotConnected` under [`ReadinessPolicy::Require`]).
//! Everything the native layer reports, failures included, arrives as
//! `Ok` with a `BillingResult`.
//!
//! # Teardown
//!
//! Dropping the bridge calls [`BillingBridge::shutdown`], which ends the
//! native connection only if it is `Ready`.

use super::broadcaster::{EventBroadcaster, EventStream, Subscription};
use super::connection::{ConnectionManager, ConnectionState};
use super::correlator::correlate;
use super::orchestrator::BillingFlowOrchestrator;
use crate::config::{BridgeConfig, ReadinessPolicy};
use crate::native::types::{NativeBillingResult, NativePurchase};
use crate::native::{ForegroundContextProvider, NativeBillingClient, PurchasesUpdatedListener};
use crate::serialization::{params, records};
use crate::types::{
    AcknowledgePurchaseOptions, BillingResult, BridgeError, LaunchBillingFlowOptions,
    ProductDetailsResult, PurchasesResult, PurchasesUpdatedEvent, QueryProductDetailsOptions,
    QueryPurchasesOptions, ServiceDisconnectedEvent,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Relays native purchase updates onto the broadcaster
struct PurchasesRelay {
    events: Arc<EventBroadcaster>,
}

impl PurchasesUpdatedListener for PurchasesRelay {
    fn on_purchases_updated(&self, result: NativeBillingResult, purchases: Option<Vec<NativePurchase>>) {
        let event = PurchasesUpdatedEvent {
            billing_result: records::billing_result(&result),
            purchases: records::purchases(purchases.as_deref()),
        };
        self.events.emit_purchases_updated(&event);
    }
}

/// Bridge between a callback-driven native billing client and async callers
///
/// Share it behind an `Arc` to issue operations from several tasks; every
/// operation takes `&self` and operations may run concurrently.
pub struct BillingBridge {
    native: Arc<dyn NativeBillingClient>,
    connection: ConnectionManager,
    events: Arc<EventBroadcaster>,
    orchestrator: BillingFlowOrchestrator,
    config: BridgeConfig,
}

impl BillingBridge {
    /// Create a bridge over `native`
    ///
    /// Registers the bridge's purchases-updated listener on the native client.
    /// The connection starts `Disconnected`.
    pub fn new(
        native: Arc<dyn NativeBillingClient>,
        foreground: Arc<dyn ForegroundContextProvider>,
        config: BridgeConfig,
    ) -> Self {
        let events = Arc::new(EventBroadcaster::new());
        native.set_purchases_updated_listener(Arc::new(PurchasesRelay {
            events: Arc::clone(&events),
        }));

        Self {
            connection: ConnectionManager::new(Arc::clone(&native), Arc::clone(&events)),
            orchestrator: BillingFlowOrchestrator::new(Arc::clone(&native), foreground),
            native,
            events,
            config,
        }
    }

    pub fn config(&self) -> BridgeConfig {
        self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the last connection transition succeeded and no disconnect has
    /// been reported since
    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    /// Connect to the billing service
    ///
    /// Returns OK immediately when already connected and joins the attempt in
    /// flight while connecting.
    #[instrument(skip(self))]
    pub async fn start_connection(&self) -> BillingResult {
        self.connection.ensure_ready().await
    }

    /// Look up product details
    ///
    /// # Errors
    ///
    /// Returns `BridgeError` if `products` is absent, empty or has an empty
    /// product id, or if the readiness policy refuses the call.
    #[instrument(skip_all, fields(products = options.products.as_ref().map(Vec::len)))]
    pub async fn query_product_details(
        &self,
        options: &QueryProductDetailsOptions,
    ) -> Result<ProductDetailsResult, BridgeError> {
        let products = options.validate()?;
        if let Some(refused) = self.admit().await? {
            return Ok(ProductDetailsResult::empty(refused));
        }

        let query = params::query_product_details_params(products);
        let result = correlate("queryProductDetailsAsync", |completion| {
            self.native.query_product_details_async(
                query,
                Box::new(move |result, details| {
                    completion.complete(ProductDetailsResult {
                        billing_result: records::billing_result(&result),
                        product_details_list: records::product_details_list(details.as_deref()),
                    });
                }),
            );
        })
        .await;

        debug!(
            code = %result.billing_result.response_code,
            found = result.product_details_list.len(),
            "product details query finished"
        );
        Ok(result)
    }

    /// Look up the requested products and launch the store purchase UI
    ///
    /// The purchase outcome itself arrives later on the purchases-updated
    /// channel; the returned result only reports whether the flow launched.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NoForegroundContext` if no activity can host the
    /// flow, and a field error if `products` is absent or unusable. Both are
    /// checked before any native call.
    #[instrument(skip_all, fields(products = options.products.as_ref().map(Vec::len)))]
    pub async fn launch_billing_flow(
        &self,
        options: &LaunchBillingFlowOptions,
    ) -> Result<BillingResult, BridgeError> {
        let (activity, products) = self.orchestrator.prepare(options)?;
        if let Some(refused) = self.admit().await? {
            return Ok(refused);
        }

        let result = self.orchestrator.launch(&activity, products).await;
        debug!(code = %result.response_code, "billing flow finished");
        Ok(result)
    }

    /// Acknowledge a purchase
    ///
    /// # Errors
    ///
    /// Returns `BridgeError` if `purchaseToken` is absent or empty, or if the
    /// readiness policy refuses the call.
    #[instrument(skip_all)]
    pub async fn acknowledge_purchase(
        &self,
        options: &AcknowledgePurchaseOptions,
    ) -> Result<BillingResult, BridgeError> {
        let purchase_token = options.validate()?;
        if let Some(refused) = self.admit().await? {
            return Ok(refused);
        }

        let acknowledge = params::acknowledge_purchase_params(purchase_token);
        let result = correlate("acknowledgePurchase", |completion| {
            self.native.acknowledge_purchase(
                acknowledge,
                Box::new(move |result| {
                    completion.complete(records::billing_result(&result));
                }),
            );
        })
        .await;

        debug!(code = %result.response_code, "acknowledge finished");
        Ok(result)
    }

    /// List the purchases the user owns for one product type
    ///
    /// # Errors
    ///
    /// Returns `BridgeError` if `productType` is absent, or if the readiness
    /// policy refuses the call.
    #[instrument(skip_all, fields(product_type = ?options.product_type))]
    pub async fn query_purchases(
        &self,
        options: &QueryPurchasesOptions,
    ) -> Result<PurchasesResult, BridgeError> {
        let product_type = options.validate()?;
        if let Some(refused) = self.admit().await? {
            return Ok(PurchasesResult::empty(refused));
        }

        let query = params::query_purchases_params(product_type);
        let result = correlate("queryPurchasesAsync", |completion| {
            self.native.query_purchases_async(
                query,
                Box::new(move |result, purchases| {
                    completion.complete(PurchasesResult {
                        billing_result: records::billing_result(&result),
                        purchases: records::purchases(purchases.as_deref()),
                    });
                }),
            );
        })
        .await;

        debug!(
            code = %result.billing_result.response_code,
            purchases = result.purchases.len(),
            "purchases query finished"
        );
        Ok(result)
    }

    /// Subscribe to purchase-state changes
    pub fn on_purchases_updated<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PurchasesUpdatedEvent) + Send + Sync + 'static,
    {
        self.events.on_purchases_updated(handler)
    }

    /// Subscribe to unsolicited connection loss
    pub fn on_service_disconnected<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ServiceDisconnectedEvent) + Send + Sync + 'static,
    {
        self.events.on_service_disconnected(handler)
    }

    pub fn purchases_updated_stream(&self) -> EventStream<PurchasesUpdatedEvent> {
        self.events.purchases_updated_stream()
    }

    pub fn service_disconnected_stream(&self) -> EventStream<ServiceDisconnectedEvent> {
        self.events.service_disconnected_stream()
    }

    /// End the native connection if it is `Ready`; otherwise a no-op
    pub fn shutdown(&self) {
        self.connection.shutdown();
    }

    /// Apply the readiness policy
    ///
    /// `Ok(Some(result))` carries a failed connection outcome that the
    /// operation returns instead of issuing its native call.
    async fn admit(&self) -> Result<Option<BillingResult>, BridgeError> {
        match self.config.readiness {
            ReadinessPolicy::Unguarded => Ok(None),
            ReadinessPolicy::Require if self.is_ready() => Ok(None),
            ReadinessPolicy::Require => Err(BridgeError::NotConnected),
            ReadinessPolicy::Connect => {
                let result = self.connection.ensure_ready().await;
                Ok((!result.is_ok()).then_some(result))
            }
        }
    }
}

impl Drop for BillingBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for BillingBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillingBridge")
            .field("connection", &self.connection)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}
