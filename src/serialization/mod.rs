//! Serialization layer
//!
//! Canonical mapping between native billing objects and the records that
//! cross the bridge boundary.
//!
//! # Components
//!
//! - `records` - native objects → boundary records (results, product details, purchases)
//! - `params` - caller records → native parameter objects (query, launch, acknowledge)
//!
//! All functions are pure and total: no I/O, no shared state, and no input
//! makes them fail. Enumerated native codes are mapped through explicit
//! tables; unknown codes degrade instead of aborting the mapping.

pub mod params;
pub mod records;

pub use params::{
    acknowledge_purchase_params, billing_flow_params, query_product_details_params,
    query_product_details_params_for_launch, query_purchases_params,
};
pub use records::{billing_result, product_details, product_details_list, purchase, purchases};
