//! Billing flow orchestration
//!
//! Launching a purchase takes two native calls in sequence:
//!
//! 1. a product details lookup restricted to the requested products
//! 2. the launch call, fed with the native details handles from step 1
//!
//! If the lookup is not OK, or returns no details list at all, its result is
//! returned as-is and nothing is launched. Individual products missing from
//! the lookup are passed to the launch without details.

use super::correlator::{correlate, ProductLookup};
use crate::native::{Activity, ForegroundContextProvider, NativeBillingClient, NativeProductDetails};
use crate::serialization::{params, records};
use crate::types::{
    BillingResponseCode, BillingResult, BridgeError, LaunchBillingFlowItem, LaunchBillingFlowOptions,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct BillingFlowOrchestrator {
    native: Arc<dyn NativeBillingClient>,
    foreground: Arc<dyn ForegroundContextProvider>,
}

impl BillingFlowOrchestrator {
    pub fn new(
        native: Arc<dyn NativeBillingClient>,
        foreground: Arc<dyn ForegroundContextProvider>,
    ) -> Self {
        Self { native, foreground }
    }

    /// Check the preconditions of a billing flow
    ///
    /// The foreground activity is checked first, then the product list.
    ///
    /// # Errors
    ///
    /// - `NoForegroundContext` if no activity is in the foreground
    /// - `MissingField` / `InvalidField` if the product list is absent or unusable
    pub fn prepare<'a>(
        &self,
        options: &'a LaunchBillingFlowOptions,
    ) -> Result<(Activity, &'a [LaunchBillingFlowItem]), BridgeError> {
        let activity = self
            .foreground
            .current_activity()
            .ok_or(BridgeError::NoForegroundContext)?;
        let products = options.validate()?;
        Ok((activity, products))
    }

    /// Look up `products` and launch the billing flow for them
    pub async fn launch(&self, activity: &Activity, products: &[LaunchBillingFlowItem]) -> BillingResult {
        let lookup = self.lookup(products).await;

        let details = match lookup.details {
            Some(details) if lookup.result.response_code == BillingResponseCode::Ok.code() => details,
            _ => {
                debug!(
                    code = lookup.result.response_code,
                    "product lookup failed, billing flow not launched"
                );
                return records::billing_result(&lookup.result);
            }
        };

        let resolved: HashMap<&str, &NativeProductDetails> = details
            .iter()
            .map(|handle| (handle.product_id.as_str(), handle))
            .collect();
        if resolved.len() < products.len() {
            debug!(
                requested = products.len(),
                resolved = resolved.len(),
                "launching with unresolved products"
            );
        }

        let flow = params::billing_flow_params(products, &resolved);
        let result = self.native.launch_billing_flow(activity, flow);
        records::billing_result(&result)
    }

    async fn lookup(&self, products: &[LaunchBillingFlowItem]) -> ProductLookup {
        let query = params::query_product_details_params_for_launch(products);
        correlate("queryProductDetailsAsync", |completion| {
            self.native.query_product_details_async(
                query,
                Box::new(move |result, details| {
                    completion.complete(ProductLookup { result, details });
                }),
            );
        })
        .await
    }
}
