//! Bridge integration tests
//!
//! These tests drive a `BillingBridge` over the simulated store and check the
//! behaviour callers rely on:
//! - single-winner connection and readiness tracking
//! - precondition errors raised before any native call
//! - the lookup-then-launch billing flow and its short-circuit
//! - event fan-out for purchase updates and unsolicited disconnects
//! - caller abandonment and teardown
//! - the readiness policies

#[cfg(test)]
mod tests {
    use billing_bridge::core::run_until_cancelled;
    use billing_bridge::native::types::NativeBillingResult;
    use billing_bridge::native::{Activity, ForegroundSlot, NativeOperation, SimulatedBillingClient};
    use billing_bridge::types::{
        AcknowledgePurchaseOptions, BillingResponseCode, BillingResult, BridgeError,
        LaunchBillingFlowItem, LaunchBillingFlowOptions, ProductQueryItem, ProductType,
        QueryProductDetailsOptions, QueryPurchasesOptions,
    };
    use billing_bridge::{
        BillingBridge, BridgeConfig, ConnectionState, NativeBillingClient, ReadinessPolicy,
    };
    use futures::future::join_all;
    use futures::StreamExt;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn bridge_with(native: &SimulatedBillingClient, readiness: ReadinessPolicy) -> BillingBridge {
        BillingBridge::new(
            Arc::new(native.clone()),
            Arc::new(ForegroundSlot::with_activity(Activity::new("MainActivity"))),
            BridgeConfig::new(readiness),
        )
    }

    fn bridge(native: &SimulatedBillingClient) -> BillingBridge {
        bridge_with(native, ReadinessPolicy::Unguarded)
    }

    async fn connected() -> (SimulatedBillingClient, BillingBridge) {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = bridge(&native);
        assert!(bridge.start_connection().await.is_ok());
        (native, bridge)
    }

    fn buy(product_id: &str, product_type: ProductType) -> LaunchBillingFlowOptions {
        LaunchBillingFlowOptions::new(vec![LaunchBillingFlowItem::new(product_id, product_type)])
    }

    // Connection lifecycle

    #[tokio::test]
    async fn test_concurrent_start_connection_issues_one_native_connect() {
        let native = SimulatedBillingClient::with_demo_catalog();
        native.set_callback_delay(Duration::from_millis(25));
        let bridge = bridge(&native);

        let results = join_all((0..10).map(|_| bridge.start_connection())).await;

        assert_eq!(native.calls(NativeOperation::StartConnection), 1);
        assert!(results.iter().all(|result| *result == results[0]));
        assert!(results[0].is_ok());
        assert!(bridge.is_ready());
    }

    #[tokio::test]
    async fn test_connection_failure_reported_as_result() {
        let native = SimulatedBillingClient::new();
        native.respond_next(
            NativeOperation::StartConnection,
            NativeBillingResult::new(3, "Billing unavailable"),
        );
        let bridge = bridge(&native);

        let result = bridge.start_connection().await;

        assert_eq!(result.response_code, BillingResponseCode::BillingUnavailable);
        assert!(!bridge.is_ready());
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_then_unsolicited_disconnect() {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = bridge(&native);

        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&first);
        let _a = bridge.on_service_disconnected(move |event| {
            sink.lock().unwrap().push(serde_json::to_value(event).unwrap());
        });
        let counter = Arc::clone(&second);
        let _b = bridge.on_service_disconnected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!bridge.is_ready());
        assert!(bridge.start_connection().await.is_ok());
        assert!(bridge.is_ready());

        native.simulate_disconnect();
        native.settle().await;

        assert!(!bridge.is_ready());
        assert_eq!(*first.lock().unwrap(), vec![serde_json::json!({})]);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_automatic_reconnect_after_disconnect() {
        let (native, bridge) = connected().await;

        native.simulate_disconnect();
        native.settle().await;

        assert!(!bridge.is_ready());
        assert_eq!(native.calls(NativeOperation::StartConnection), 1);

        assert!(bridge.start_connection().await.is_ok());
        assert_eq!(native.calls(NativeOperation::StartConnection), 2);
    }

    #[tokio::test]
    async fn test_disconnect_does_not_fail_in_flight_requests() {
        let (native, bridge) = connected().await;
        native.set_callback_delay(Duration::from_millis(20));

        let options = QueryPurchasesOptions::new(ProductType::InApp);
        let mut query = Box::pin(bridge.query_purchases(&options));
        assert!(futures::poll!(&mut query).is_pending());
        native.simulate_disconnect();
        let result = query.await.unwrap();

        assert!(result.billing_result.is_ok());
        native.settle().await;
        assert!(!bridge.is_ready());
    }

    // Precondition errors

    #[tokio::test]
    async fn test_missing_products_rejected_before_native_call() {
        let (native, bridge) = connected().await;

        let error = bridge
            .query_product_details(&QueryProductDetailsOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error, BridgeError::missing_field("products"));

        let error = bridge
            .launch_billing_flow(&LaunchBillingFlowOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error, BridgeError::missing_field("products"));

        assert_eq!(native.calls(NativeOperation::QueryProductDetails), 0);
        assert_eq!(native.calls(NativeOperation::LaunchBillingFlow), 0);
    }

    #[rstest]
    #[case::empty_list(QueryProductDetailsOptions::new(vec![]))]
    #[case::empty_id(QueryProductDetailsOptions::new(vec![ProductQueryItem::new("", ProductType::InApp)]))]
    #[tokio::test]
    async fn test_invalid_products_rejected(#[case] options: QueryProductDetailsOptions) {
        let (native, bridge) = connected().await;

        let error = bridge.query_product_details(&options).await.unwrap_err();

        assert!(matches!(error, BridgeError::InvalidField { .. }));
        assert_eq!(native.calls(NativeOperation::QueryProductDetails), 0);
    }

    #[tokio::test]
    async fn test_launch_without_foreground_fails_fast() {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = BillingBridge::new(
            Arc::new(native.clone()),
            Arc::new(ForegroundSlot::new()),
            BridgeConfig::default(),
        );
        bridge.start_connection().await;

        let error = bridge
            .launch_billing_flow(&buy("premium_upgrade", ProductType::InApp))
            .await
            .unwrap_err();

        assert_eq!(error, BridgeError::NoForegroundContext);
        assert_eq!(native.calls(NativeOperation::QueryProductDetails), 0);
        assert_eq!(native.calls(NativeOperation::LaunchBillingFlow), 0);
    }

    #[tokio::test]
    async fn test_missing_purchase_token_and_product_type() {
        let (_native, bridge) = connected().await;

        let error = bridge
            .acknowledge_purchase(&AcknowledgePurchaseOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error, BridgeError::missing_field("purchaseToken"));

        let error = bridge
            .query_purchases(&QueryPurchasesOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error, BridgeError::missing_field("productType"));
    }

    // Product details

    #[tokio::test]
    async fn test_query_one_time_product_details() {
        let (_native, bridge) = connected().await;

        let result = bridge
            .query_product_details(&QueryProductDetailsOptions::new(vec![ProductQueryItem::new(
                "premium_upgrade",
                ProductType::InApp,
            )]))
            .await
            .unwrap();

        assert!(result.billing_result.is_ok());
        assert_eq!(result.product_details_list.len(), 1);
        let details = &result.product_details_list[0];
        assert!(details.subscription_offer_details.is_none());

        let json = serde_json::to_value(details).unwrap();
        assert!(json.get("subscriptionOfferDetails").is_none());
        assert_eq!(json["oneTimePurchaseOfferDetails"]["priceAmountMicros"], 4_990_000);
    }

    #[tokio::test]
    async fn test_every_query_is_a_fresh_round_trip() {
        let (native, bridge) = connected().await;
        let options = QueryProductDetailsOptions::new(vec![ProductQueryItem::new(
            "pro_monthly",
            ProductType::Subscription,
        )]);

        let results = join_all((0..3).map(|_| bridge.query_product_details(&options))).await;

        assert_eq!(native.calls(NativeOperation::QueryProductDetails), 3);
        for result in results {
            let result = result.unwrap();
            let offers = result.product_details_list[0]
                .subscription_offer_details
                .as_ref()
                .unwrap();
            assert_eq!(offers[0].pricing_phases.len(), 2);
        }
    }

    // Billing flow

    #[tokio::test]
    async fn test_launch_short_circuits_on_failed_lookup() {
        let (native, bridge) = connected().await;
        native.respond_next(
            NativeOperation::QueryProductDetails,
            NativeBillingResult::new(-3, "Timed out"),
        );

        let result = bridge
            .launch_billing_flow(&buy("premium_upgrade", ProductType::InApp))
            .await
            .unwrap();

        assert_eq!(
            result,
            BillingResult::new(BillingResponseCode::ServiceTimeout, "Timed out")
        );
        assert_eq!(native.calls(NativeOperation::LaunchBillingFlow), 0);
    }

    #[tokio::test]
    async fn test_launch_delivers_purchase_event() {
        let (native, bridge) = connected().await;
        let mut updates = bridge.purchases_updated_stream();

        let result = bridge
            .launch_billing_flow(&buy("premium_upgrade", ProductType::InApp))
            .await
            .unwrap();
        assert!(result.is_ok());

        let event = tokio::time::timeout(Duration::from_secs(2), updates.next())
            .await
            .unwrap()
            .unwrap();
        assert!(event.billing_result.is_ok());
        assert_eq!(event.purchases.len(), 1);
        assert_eq!(event.purchases[0].products, vec!["premium_upgrade"]);
        assert!(!event.purchases[0].is_acknowledged);

        // A second purchase of the same one-time product is refused natively.
        let again = bridge
            .launch_billing_flow(&buy("premium_upgrade", ProductType::InApp))
            .await
            .unwrap();
        assert_eq!(again.response_code, BillingResponseCode::ItemAlreadyOwned);
        assert_eq!(native.calls(NativeOperation::LaunchBillingFlow), 2);
    }

    #[tokio::test]
    async fn test_subscription_launch_needs_offer_token() {
        let (_native, bridge) = connected().await;

        let without_offer = bridge
            .launch_billing_flow(&buy("pro_monthly", ProductType::Subscription))
            .await
            .unwrap();
        assert_eq!(without_offer.response_code, BillingResponseCode::DeveloperError);

        let with_offer = bridge
            .launch_billing_flow(&LaunchBillingFlowOptions::new(vec![LaunchBillingFlowItem::new(
                "pro_monthly",
                ProductType::Subscription,
            )
            .with_offer_token("pro_monthly:monthly")]))
            .await
            .unwrap();
        assert!(with_offer.is_ok());
    }

    // Acknowledge and purchase queries

    #[tokio::test]
    async fn test_acknowledge_twice_reports_non_ok() {
        let (native, bridge) = connected().await;
        let purchase = native.grant_purchase("premium_upgrade", "inapp");
        let options = AcknowledgePurchaseOptions::new(purchase.purchase_token.clone());

        let first = bridge.acknowledge_purchase(&options).await.unwrap();
        let second = bridge.acknowledge_purchase(&options).await.unwrap();

        assert!(first.is_ok());
        assert!(!second.is_ok());
        assert_eq!(second.response_code, BillingResponseCode::DeveloperError);
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_token() {
        let (_native, bridge) = connected().await;

        let result = bridge
            .acknowledge_purchase(&AcknowledgePurchaseOptions::new("tok"))
            .await
            .unwrap();

        assert_eq!(result.response_code, BillingResponseCode::ItemNotOwned);
    }

    #[tokio::test]
    async fn test_concurrent_purchase_queries_are_independent() {
        let (native, bridge) = connected().await;
        native.grant_purchase("premium_upgrade", "inapp");
        native.grant_purchase("pro_monthly", "subs");
        native.grant_purchase("coins", "inapp");

        let inapp_options = QueryPurchasesOptions::new(ProductType::InApp);
        let subs_options = QueryPurchasesOptions::new(ProductType::Subscription);
        let (inapp, subs) = tokio::join!(
            bridge.query_purchases(&inapp_options),
            bridge.query_purchases(&subs_options),
        );

        let inapp = inapp.unwrap();
        let subs = subs.unwrap();
        let inapp_products: Vec<&str> = inapp
            .purchases
            .iter()
            .flat_map(|p| p.products.iter().map(String::as_str))
            .collect();
        assert_eq!(inapp_products, vec!["premium_upgrade", "coins"]);
        assert_eq!(subs.purchases.len(), 1);
        assert_eq!(subs.purchases[0].products, vec!["pro_monthly"]);
    }

    #[tokio::test]
    async fn test_unguarded_operation_reports_native_disconnect() {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = bridge(&native);

        let result = bridge
            .query_purchases(&QueryPurchasesOptions::new(ProductType::InApp))
            .await
            .unwrap();

        assert_eq!(
            result.billing_result.response_code,
            BillingResponseCode::ServiceDisconnected
        );
        assert!(result.purchases.is_empty());
        assert_eq!(native.calls(NativeOperation::QueryPurchases), 1);
    }

    // Readiness policies

    #[tokio::test]
    async fn test_require_policy_rejects_when_not_ready() {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = bridge_with(&native, ReadinessPolicy::Require);

        let error = bridge
            .query_purchases(&QueryPurchasesOptions::new(ProductType::InApp))
            .await
            .unwrap_err();
        assert_eq!(error, BridgeError::NotConnected);
        assert_eq!(native.calls(NativeOperation::QueryPurchases), 0);

        bridge.start_connection().await;
        assert!(bridge
            .query_purchases(&QueryPurchasesOptions::new(ProductType::InApp))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_connect_policy_connects_first() {
        let native = SimulatedBillingClient::with_demo_catalog();
        let bridge = bridge_with(&native, ReadinessPolicy::Connect);

        let result = bridge
            .query_purchases(&QueryPurchasesOptions::new(ProductType::InApp))
            .await
            .unwrap();

        assert!(result.billing_result.is_ok());
        assert!(bridge.is_ready());
        assert_eq!(native.calls(NativeOperation::StartConnection), 1);
    }

    #[tokio::test]
    async fn test_connect_policy_returns_failed_connection() {
        let native = SimulatedBillingClient::with_demo_catalog();
        native.respond_next(
            NativeOperation::StartConnection,
            NativeBillingResult::new(2, "Service unavailable"),
        );
        let bridge = bridge_with(&native, ReadinessPolicy::Connect);

        let result = bridge
            .launch_billing_flow(&buy("premium_upgrade", ProductType::InApp))
            .await
            .unwrap();

        assert_eq!(result.response_code, BillingResponseCode::ServiceUnavailable);
        assert_eq!(native.calls(NativeOperation::QueryProductDetails), 0);
        assert_eq!(native.calls(NativeOperation::LaunchBillingFlow), 0);
    }

    // Abandonment and teardown

    #[tokio::test]
    async fn test_cancelled_request_drops_late_result() {
        let (native, bridge) = connected().await;
        native.set_callback_delay(Duration::from_millis(50));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });
        let outcome = run_until_cancelled(
            &token,
            bridge.query_purchases(&QueryPurchasesOptions::new(ProductType::InApp)),
        )
        .await;

        assert!(outcome.is_none());
        native.settle().await;
        assert_eq!(native.calls(NativeOperation::QueryPurchases), 1);
    }

    #[tokio::test]
    async fn test_abandoned_request_keeps_native_side_effect() {
        let (native, bridge) = connected().await;
        let purchase = native.grant_purchase("premium_upgrade", "inapp");
        native.set_callback_delay(Duration::from_millis(50));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            bridge.acknowledge_purchase(&AcknowledgePurchaseOptions::new(purchase.purchase_token)),
        )
        .await;
        assert!(abandoned.is_err());

        native.set_callback_delay(Duration::ZERO);
        let owned = bridge
            .query_purchases(&QueryPurchasesOptions::new(ProductType::InApp))
            .await
            .unwrap();
        assert!(owned.purchases[0].is_acknowledged);
    }

    #[tokio::test]
    async fn test_dropping_bridge_ends_ready_connection_only() {
        let native = SimulatedBillingClient::with_demo_catalog();
        drop(bridge(&native));
        assert_eq!(native.end_connection_calls(), 0);

        let (native, bridge) = connected().await;
        drop(bridge);
        assert_eq!(native.end_connection_calls(), 1);
        assert!(!native.is_ready());
    }

    #[tokio::test]
    async fn test_removed_subscription_stops_receiving() {
        let (native, bridge) = connected().await;
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let subscription = bridge.on_purchases_updated(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        native.simulate_purchases_updated(NativeBillingResult::new(1, "User canceled"), None);
        native.settle().await;
        subscription.remove();
        native.simulate_purchases_updated(NativeBillingResult::new(0, ""), Some(vec![]));
        native.settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
