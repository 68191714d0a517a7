//! Core bridge components
//!
//! - `connection` - Connection lifecycle state machine and single-winner connect
//! - `correlator` - One-shot native callbacks as awaitable results
//! - `broadcaster` - Multicast delivery of unsolicited native events
//! - `orchestrator` - Lookup-then-launch billing flow with short-circuit
//! - `bridge` - The boundary surface composing the above

pub mod bridge;
pub mod broadcaster;
pub mod connection;
pub mod correlator;
pub mod orchestrator;

pub use bridge::BillingBridge;
pub use broadcaster::{EventBroadcaster, EventStream, Subscription};
pub use connection::{ConnectionManager, ConnectionState};
pub use correlator::{correlate, run_until_cancelled, Completion, Correlated, DroppedCallback, ProductLookup};
pub use orchestrator::BillingFlowOrchestrator;
