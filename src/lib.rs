//! Billing Bridge Library
//! # Overview
//!
//! This library bridges a callback-driven native billing client to async
//! callers: one-shot native callbacks become awaitable results, unsolicited
//! native notifications become multicast events, and a single shared
//! connection is guarded by an explicit state machine.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Boundary records (BillingResult, ProductDetails, Purchase, options, events, errors)
//! - [`native`] - The native billing client trait, native object model and a simulated store
//! - [`serialization`] - Native objects ↔ boundary records
//! - [`core`] - Bridge components:
//!   - [`core::connection`] - Connection lifecycle state machine
//!   - [`core::correlator`] - Callback-to-future correlation
//!   - [`core::broadcaster`] - Event fan-out to subscribers
//!   - [`core::orchestrator`] - Lookup-then-launch billing flow
//!   - [`core::bridge`] - The `BillingBridge` boundary surface
//! - [`config`] - Readiness policy and runtime configuration
//! - [`cli`] / [`harness`] - Integration scenario runner
//!
//! # Error Classes
//!
//! - **Precondition errors** ([`BridgeError`]): missing input or no foreground
//!   activity, raised before any native call
//! - **Operational outcomes** ([`BillingResult`]): everything the native layer
//!   reports, success or failure, returned as a resolved value

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod harness;
pub mod native;
pub mod serialization;
pub mod types;

pub use config::{BridgeConfig, ReadinessPolicy, RuntimeConfig};
pub use self::core::{run_until_cancelled, BillingBridge, ConnectionState, EventStream, Subscription};
pub use native::{ForegroundContextProvider, NativeBillingClient, SimulatedBillingClient};
pub use types::{
    BillingResponseCode, BillingResult, BridgeError, ProductDetails, ProductDetailsResult,
    ProductType, Purchase, PurchasesResult,
};
