//! Native objects → boundary records

use crate::native::types::{
    NativeBillingResult, NativeOneTimePurchaseOfferDetails, NativePricingPhase, NativeProductDetails,
    NativePurchase, NativeSubscriptionOfferDetails,
};
use crate::types::{
    BillingResponseCode, BillingResult, OneTimePurchaseOfferDetails, PricingPhase, ProductDetails,
    Purchase, RecurrenceMode, SubscriptionOfferDetails,
};
use tracing::warn;

/// Convert a native billing result
///
/// Response codes outside the known table become `Error`; the unmapped code
/// is logged since the record has no room for it.
pub fn billing_result(native: &NativeBillingResult) -> BillingResult {
    let response_code = BillingResponseCode::from_code(native.response_code).unwrap_or_else(|| {
        warn!(
            code = native.response_code,
            "unknown billing response code, reporting ERROR"
        );
        BillingResponseCode::Error
    });

    BillingResult {
        response_code,
        debug_message: native.debug_message.clone(),
    }
}

/// Convert a native product details handle
///
/// Offer fields absent on the native object stay absent on the record.
pub fn product_details(native: &NativeProductDetails) -> ProductDetails {
    ProductDetails {
        product_id: native.product_id.clone(),
        one_time_purchase_offer_details: native
            .one_time_purchase_offer_details
            .as_ref()
            .map(one_time_offer),
        subscription_offer_details: native
            .subscription_offer_details
            .as_ref()
            .map(|offers| offers.iter().map(subscription_offer).collect()),
    }
}

/// Convert a native product details list, treating an absent list as empty
pub fn product_details_list(native: Option<&[NativeProductDetails]>) -> Vec<ProductDetails> {
    native
        .unwrap_or_default()
        .iter()
        .map(product_details)
        .collect()
}

pub fn purchase(native: &NativePurchase) -> Purchase {
    Purchase {
        order_id: native.order_id.clone(),
        products: native.products.clone(),
        purchase_token: native.purchase_token.clone(),
        is_acknowledged: native.is_acknowledged(),
    }
}

/// Convert a native purchase list, treating an absent list as empty
pub fn purchases(native: Option<&[NativePurchase]>) -> Vec<Purchase> {
    native.unwrap_or_default().iter().map(purchase).collect()
}

fn one_time_offer(native: &NativeOneTimePurchaseOfferDetails) -> OneTimePurchaseOfferDetails {
    OneTimePurchaseOfferDetails {
        formatted_price: native.formatted_price.clone(),
        price_amount_micros: native.price_amount_micros,
        price_currency_code: native.price_currency_code.clone(),
    }
}

fn subscription_offer(native: &NativeSubscriptionOfferDetails) -> SubscriptionOfferDetails {
    SubscriptionOfferDetails {
        base_plan_id: native.base_plan_id.clone(),
        offer_id: native.offer_id.clone(),
        offer_token: native.offer_token.clone(),
        pricing_phases: native
            .pricing_phases
            .pricing_phase_list
            .iter()
            .map(pricing_phase)
            .collect(),
    }
}

fn pricing_phase(native: &NativePricingPhase) -> PricingPhase {
    let recurrence_mode = RecurrenceMode::from(native.recurrence_mode);
    if let RecurrenceMode::Unknown(code) = recurrence_mode {
        warn!(code, billing_period = %native.billing_period, "unknown recurrence mode");
    }

    PricingPhase {
        // The SDK never reports negative counts; clamp rather than wrap if it does.
        billing_cycle_count: u32::try_from(native.billing_cycle_count).unwrap_or(0),
        billing_period: native.billing_period.clone(),
        formatted_price: native.formatted_price.clone(),
        price_amount_micros: native.price_amount_micros,
        price_currency_code: native.price_currency_code.clone(),
        recurrence_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::simulated::demo_catalog;
    use crate::native::types::NativePricingPhases;
    use rstest::rstest;

    #[rstest]
    #[case::ok(0, BillingResponseCode::Ok)]
    #[case::already_owned(7, BillingResponseCode::ItemAlreadyOwned)]
    #[case::disconnected(-1, BillingResponseCode::ServiceDisconnected)]
    #[case::unknown(99, BillingResponseCode::Error)]
    fn test_billing_result_codes(#[case] code: i32, #[case] expected: BillingResponseCode) {
        let mapped = billing_result(&NativeBillingResult::new(code, "msg"));
        assert_eq!(mapped.response_code, expected);
        assert_eq!(mapped.debug_message, "msg");
    }

    #[test]
    fn test_one_time_product_has_no_subscription_field() {
        let catalog = demo_catalog();
        let inapp = catalog
            .iter()
            .find(|p| p.product_id == "premium_upgrade")
            .unwrap();

        let record = product_details(inapp);
        assert!(record.subscription_offer_details.is_none());
        assert_eq!(
            record.one_time_purchase_offer_details.as_ref().unwrap().price_amount_micros,
            4_990_000
        );

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("subscriptionOfferDetails").is_none());
    }

    #[test]
    fn test_subscription_offers_keep_phase_order() {
        let catalog = demo_catalog();
        let subs = catalog.iter().find(|p| p.product_id == "pro_monthly").unwrap();

        let record = product_details(subs);
        assert!(record.one_time_purchase_offer_details.is_none());

        let offers = record.subscription_offer_details.unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].offer_id.as_deref(), Some("free-trial"));
        assert_eq!(offers[1].offer_id, None);

        let phases = &offers[0].pricing_phases;
        assert_eq!(phases[0].billing_period, "P1W");
        assert_eq!(phases[0].recurrence_mode, RecurrenceMode::FiniteRecurring);
        assert_eq!(phases[1].billing_period, "P1M");
        assert_eq!(phases[1].recurrence_mode, RecurrenceMode::InfiniteRecurring);
    }

    #[test]
    fn test_product_without_offers_is_valid() {
        let native = NativeProductDetails {
            product_id: "bare".to_string(),
            product_type: "inapp".to_string(),
            one_time_purchase_offer_details: None,
            subscription_offer_details: None,
        };

        let json = serde_json::to_value(product_details(&native)).unwrap();
        assert_eq!(json, serde_json::json!({ "productId": "bare" }));
    }

    #[test]
    fn test_unknown_recurrence_mode_is_preserved() {
        let native = NativeSubscriptionOfferDetails {
            base_plan_id: "weekly".to_string(),
            offer_id: None,
            offer_token: "tok".to_string(),
            pricing_phases: NativePricingPhases {
                pricing_phase_list: vec![NativePricingPhase {
                    billing_cycle_count: -1,
                    billing_period: "P1W".to_string(),
                    formatted_price: "$1.00".to_string(),
                    price_amount_micros: 1_000_000,
                    price_currency_code: "USD".to_string(),
                    recurrence_mode: 9,
                }],
            },
        };

        let offer = subscription_offer(&native);
        assert_eq!(offer.pricing_phases[0].recurrence_mode, RecurrenceMode::Unknown(9));
        assert_eq!(offer.pricing_phases[0].billing_cycle_count, 0);
    }

    #[test]
    fn test_absent_lists_map_to_empty() {
        assert!(purchases(None).is_empty());
        assert!(product_details_list(None).is_empty());
    }

    #[test]
    fn test_purchase_mapping() {
        let native = NativePurchase {
            order_id: None,
            products: vec!["a".to_string(), "b".to_string()],
            purchase_token: "tok".to_string(),
            acknowledged: true,
        };

        let record = purchase(&native);
        assert_eq!(record.order_id, None);
        assert_eq!(record.products, vec!["a", "b"]);
        assert!(record.is_acknowledged);
    }
}
