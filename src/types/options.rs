//! Option records accepted by the boundary operations
//!
//! Fields are optional so that records arriving from a host runtime can be
//! represented as-is. Each option type validates itself and hands back the
//! checked input, so precondition errors are reported before the bridge talks
//! to the native layer.

use super::error::BridgeError;
use super::product::{ProductQueryItem, ProductType};
use super::purchase::LaunchBillingFlowItem;
use serde::{Deserialize, Serialize};

/// Options for `query_product_details`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProductDetailsOptions {
    #[serde(default)]
    pub products: Option<Vec<ProductQueryItem>>,
}

impl QueryProductDetailsOptions {
    pub fn new(products: Vec<ProductQueryItem>) -> Self {
        Self {
            products: Some(products),
        }
    }

    /// Check the product list and return it
    ///
    /// # Errors
    ///
    /// - `MissingField` if `products` is absent
    /// - `InvalidField` if the list is empty or any `productId` is empty
    pub fn validate(&self) -> Result<&[ProductQueryItem], BridgeError> {
        let products = required_products(self.products.as_deref())?;
        for (index, item) in products.iter().enumerate() {
            check_product_id(index, &item.product_id)?;
        }
        Ok(products)
    }
}

/// Options for `launch_billing_flow`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchBillingFlowOptions {
    #[serde(default)]
    pub products: Option<Vec<LaunchBillingFlowItem>>,
}

impl LaunchBillingFlowOptions {
    pub fn new(products: Vec<LaunchBillingFlowItem>) -> Self {
        Self {
            products: Some(products),
        }
    }

    /// Check the product list and return it
    ///
    /// # Errors
    ///
    /// - `MissingField` if `products` is absent
    /// - `InvalidField` if the list is empty or any `productId` is empty
    pub fn validate(&self) -> Result<&[LaunchBillingFlowItem], BridgeError> {
        let products = required_products(self.products.as_deref())?;
        for (index, item) in products.iter().enumerate() {
            check_product_id(index, &item.product_id)?;
        }
        Ok(products)
    }
}

/// Options for `acknowledge_purchase`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgePurchaseOptions {
    #[serde(default)]
    pub purchase_token: Option<String>,
}

impl AcknowledgePurchaseOptions {
    pub fn new(purchase_token: impl Into<String>) -> Self {
        Self {
            purchase_token: Some(purchase_token.into()),
        }
    }

    pub fn validate(&self) -> Result<&str, BridgeError> {
        match self.purchase_token.as_deref() {
            None => Err(BridgeError::missing_field("purchaseToken")),
            Some("") => Err(BridgeError::invalid_field(
                "purchaseToken",
                "must not be empty",
            )),
            Some(token) => Ok(token),
        }
    }
}

/// Options for `query_purchases`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPurchasesOptions {
    #[serde(default)]
    pub product_type: Option<ProductType>,
}

impl QueryPurchasesOptions {
    pub fn new(product_type: ProductType) -> Self {
        Self {
            product_type: Some(product_type),
        }
    }

    pub fn validate(&self) -> Result<ProductType, BridgeError> {
        self.product_type
            .ok_or_else(|| BridgeError::missing_field("productType"))
    }
}

fn required_products<T>(products: Option<&[T]>) -> Result<&[T], BridgeError> {
    match products {
        None => Err(BridgeError::missing_field("products")),
        Some([]) => Err(BridgeError::invalid_field("products", "must not be empty")),
        Some(products) => Ok(products),
    }
}

fn check_product_id(index: usize, product_id: &str) -> Result<(), BridgeError> {
    if product_id.is_empty() {
        return Err(BridgeError::invalid_field(
            &format!("products[{}].productId", index),
            "must not be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_missing_products_from_record() {
        let options: QueryProductDetailsOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(
            options.validate().unwrap_err(),
            BridgeError::missing_field("products")
        );
    }

    #[test]
    fn test_empty_products_rejected() {
        let options = LaunchBillingFlowOptions::new(vec![]);
        assert_eq!(
            options.validate().unwrap_err(),
            BridgeError::invalid_field("products", "must not be empty")
        );
    }

    #[test]
    fn test_empty_product_id_reports_index() {
        let options = QueryProductDetailsOptions::new(vec![
            ProductQueryItem::new("p1", ProductType::InApp),
            ProductQueryItem::new("", ProductType::InApp),
        ]);
        assert_eq!(
            options.validate().unwrap_err(),
            BridgeError::invalid_field("products[1].productId", "must not be empty")
        );
    }

    #[test]
    fn test_valid_products_pass_through() {
        let options = QueryProductDetailsOptions::new(vec![ProductQueryItem::new(
            "p1",
            ProductType::InApp,
        )]);
        let products = options.validate().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "p1");
    }

    #[rstest]
    #[case::absent(AcknowledgePurchaseOptions::default(), Err(BridgeError::missing_field("purchaseToken")))]
    #[case::empty(
        AcknowledgePurchaseOptions::new(""),
        Err(BridgeError::invalid_field("purchaseToken", "must not be empty"))
    )]
    #[case::present(AcknowledgePurchaseOptions::new("tok"), Ok("tok"))]
    fn test_acknowledge_validation(
        #[case] options: AcknowledgePurchaseOptions,
        #[case] expected: Result<&str, BridgeError>,
    ) {
        assert_eq!(options.validate(), expected);
    }

    #[test]
    fn test_query_purchases_requires_type() {
        assert_eq!(
            QueryPurchasesOptions::default().validate(),
            Err(BridgeError::missing_field("productType"))
        );
        let options: QueryPurchasesOptions =
            serde_json::from_str(r#"{"productType": "subs"}"#).unwrap();
        assert_eq!(options.validate(), Ok(ProductType::Subscription));
    }
}
