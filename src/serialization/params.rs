//! Caller records → native parameter objects

use crate::native::types::{
    AcknowledgePurchaseParams, BillingFlowParams, NativeProductDetails, ProductDetailsParams,
    QueryProduct, QueryProductDetailsParams, QueryPurchasesParams,
};
use crate::types::{LaunchBillingFlowItem, ProductQueryItem, ProductType};
use std::collections::HashMap;

fn query_product(product_id: &str, product_type: ProductType) -> QueryProduct {
    QueryProduct {
        product_id: Some(product_id.to_string()),
        product_type: Some(product_type.as_str().to_string()),
    }
}

/// Build a product details query for exactly the given items, in order
pub fn query_product_details_params(products: &[ProductQueryItem]) -> QueryProductDetailsParams {
    QueryProductDetailsParams {
        product_list: products
            .iter()
            .map(|item| query_product(&item.product_id, item.product_type))
            .collect(),
    }
}

/// Build the lookup issued ahead of a billing flow
///
/// Restricted to the identifiers and types of the products being bought.
pub fn query_product_details_params_for_launch(
    products: &[LaunchBillingFlowItem],
) -> QueryProductDetailsParams {
    QueryProductDetailsParams {
        product_list: products
            .iter()
            .map(|item| query_product(&item.product_id, item.product_type))
            .collect(),
    }
}

/// Pair each requested product with its resolved details handle and offer token
///
/// Products missing from `resolved` are passed through without details; the
/// native layer decides whether that is acceptable.
pub fn billing_flow_params(
    products: &[LaunchBillingFlowItem],
    resolved: &HashMap<&str, &NativeProductDetails>,
) -> BillingFlowParams {
    BillingFlowParams {
        product_details_params_list: products
            .iter()
            .map(|item| ProductDetailsParams {
                product_details: resolved
                    .get(item.product_id.as_str())
                    .map(|details| (*details).clone()),
                offer_token: item.offer_token.clone(),
            })
            .collect(),
    }
}

pub fn acknowledge_purchase_params(purchase_token: &str) -> AcknowledgePurchaseParams {
    AcknowledgePurchaseParams {
        purchase_token: Some(purchase_token.to_string()),
    }
}

pub fn query_purchases_params(product_type: ProductType) -> QueryPurchasesParams {
    QueryPurchasesParams {
        product_type: Some(product_type.as_str().to_string()),
    }
}
