//! Integration scenario against the simulated store
//!
//! Drives a `BillingBridge` through the same sequence a host app exercises:
//! subscribe to both event channels, check readiness, connect, list owned
//! purchases, look up every catalog product, buy the first one, acknowledge
//! whatever purchases the update channel delivered, and shut down. Every step
//! becomes one [`StepReport`] row.
//!
//! Refused steps (precondition errors) are recorded and the scenario
//! continues; they are what the report is for.

pub mod report;

pub use report::{write_report, ReportFormat, StepReport, StepStatus};

use crate::config::BridgeConfig;
use crate::core::{BillingBridge, EventStream};
use crate::native::types::NativeBillingResult;
use crate::native::{
    Activity, ForegroundSlot, NativeOperation, NativeProductDetails, SimulatedBillingClient,
};
use crate::types::{
    AcknowledgePurchaseOptions, BillingResponseCode, LaunchBillingFlowItem, LaunchBillingFlowOptions,
    ProductQueryItem, ProductType, Purchase, PurchasesUpdatedEvent, QueryProductDetailsOptions,
    QueryPurchasesOptions, ServiceDisconnectedEvent,
};
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the activity hosting harness billing flows
pub const HARNESS_ACTIVITY: &str = "HarnessActivity";

/// Knobs of one scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioOptions {
    pub bridge: BridgeConfig,
    /// Whether a foreground activity is available for the billing flow
    pub foreground: bool,
    /// Make the simulated store reject the connection attempt
    pub fail_connection: bool,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            foreground: true,
            fail_connection: false,
        }
    }
}

/// Run the integration scenario and return one report row per step
pub async fn run_scenario(native: &SimulatedBillingClient, options: ScenarioOptions) -> Vec<StepReport> {
    let foreground = if options.foreground {
        ForegroundSlot::with_activity(Activity::new(HARNESS_ACTIVITY))
    } else {
        ForegroundSlot::new()
    };
    if options.fail_connection {
        native.respond_next(
            NativeOperation::StartConnection,
            NativeBillingResult::new(
                BillingResponseCode::BillingUnavailable.code(),
                "Billing is unavailable on this device (simulated)",
            ),
        );
    }

    let bridge = BillingBridge::new(Arc::new(native.clone()), Arc::new(foreground), options.bridge);
    let mut purchases_events = bridge.purchases_updated_stream();
    let mut disconnected_events = bridge.service_disconnected_stream();
    let mut rows = Vec::new();

    rows.push(StepReport::info("isReady", bridge.is_ready().to_string()));

    let connection = bridge.start_connection().await;
    rows.push(StepReport::outcome("startConnection", &connection, ""));

    for product_type in [ProductType::InApp, ProductType::Subscription] {
        let step = format!("queryPurchases[{}]", product_type);
        match bridge.query_purchases(&QueryPurchasesOptions::new(product_type)).await {
            Ok(result) => rows.push(StepReport::outcome(
                step,
                &result.billing_result,
                format!("{} purchases", result.purchases.len()),
            )),
            Err(e) => rows.push(StepReport::rejected(step, &e)),
        }
    }

    let catalog = native.catalog();
    for product in &catalog {
        let step = format!("queryProductDetails[{}]", product.product_id);
        let Some(product_type) = ProductType::from_native(&product.product_type) else {
            warn!(product_id = %product.product_id, "skipping product with unknown type");
            continue;
        };
        let query = QueryProductDetailsOptions::new(vec![ProductQueryItem::new(
            product.product_id.clone(),
            product_type,
        )]);
        match bridge.query_product_details(&query).await {
            Ok(result) => rows.push(StepReport::outcome(
                step,
                &result.billing_result,
                format!("{} details", result.product_details_list.len()),
            )),
            Err(e) => rows.push(StepReport::rejected(step, &e)),
        }
    }

    match catalog.first().and_then(launch_item) {
        Some(item) => {
            let step = format!("launchBillingFlow[{}]", item.product_id);
            match bridge
                .launch_billing_flow(&LaunchBillingFlowOptions::new(vec![item]))
                .await
            {
                Ok(result) => rows.push(StepReport::outcome(step, &result, "")),
                Err(e) => rows.push(StepReport::rejected(step, &e)),
            }
        }
        None => rows.push(StepReport::info("launchBillingFlow", "catalog is empty")),
    }

    // Purchase updates from the flow arrive on the native thread.
    native.settle().await;
    let updates = drain(&mut purchases_events);

    for purchase in pending_acknowledgement(&updates) {
        let step = format!("acknowledgePurchase[{}]", purchase.purchase_token);
        match bridge
            .acknowledge_purchase(&AcknowledgePurchaseOptions::new(purchase.purchase_token.clone()))
            .await
        {
            Ok(result) => rows.push(StepReport::outcome(step, &result, purchase.products.join(" "))),
            Err(e) => rows.push(StepReport::rejected(step, &e)),
        }
    }

    native.settle().await;
    let disconnects: Vec<ServiceDisconnectedEvent> = drain(&mut disconnected_events);
    rows.push(StepReport::info(
        "event:purchasesUpdated",
        format!("{} events", updates.len()),
    ));
    rows.push(StepReport::info(
        "event:billingServiceDisconnected",
        format!("{} events", disconnects.len()),
    ));

    bridge.shutdown();
    rows.push(StepReport::info("shutdown", bridge.connection_state().to_string()));

    info!(steps = rows.len(), "scenario finished");
    rows
}

/// Build the launch item for a catalog product, picking the first offer of a subscription
fn launch_item(product: &NativeProductDetails) -> Option<LaunchBillingFlowItem> {
    let product_type = ProductType::from_native(&product.product_type)?;
    let item = LaunchBillingFlowItem::new(product.product_id.clone(), product_type);

    let offer_token = product
        .subscription_offer_details
        .as_ref()
        .and_then(|offers| offers.first())
        .map(|offer| offer.offer_token.clone());

    Some(match offer_token {
        Some(token) => item.with_offer_token(token),
        None => item,
    })
}

/// Purchases delivered with an OK result that still need acknowledging
fn pending_acknowledgement(updates: &[PurchasesUpdatedEvent]) -> Vec<&Purchase> {
    updates
        .iter()
        .filter(|event| event.billing_result.is_ok())
        .flat_map(|event| event.purchases.iter())
        .filter(|purchase| !purchase.is_acknowledged)
        .collect()
}

/// Take every event already buffered on `stream` without waiting
fn drain<E>(stream: &mut EventStream<E>) -> Vec<E> {
    let mut events = Vec::new();
    while let Some(Some(event)) = stream.next().now_or_never() {
        events.push(event);
    }
    events
}
