//! Billing outcome types
//!
//! Every native operation reports its outcome as a `BillingResult`. The bridge
//! never turns a non-OK outcome into an error; callers inspect the response
//! code and decide what to do.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response codes reported by the native billing layer
///
/// Serialized as the integer code the native layer uses. Conversion from an
/// integer goes through an explicit table: codes outside the known set map to
/// [`BillingResponseCode::Error`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum BillingResponseCode {
    Ok,
    UserCanceled,
    ServiceUnavailable,
    BillingUnavailable,
    ItemUnavailable,
    DeveloperError,
    Error,
    ItemAlreadyOwned,
    ItemNotOwned,
    FeatureNotSupported,
    NetworkError,
    ServiceDisconnected,
    ServiceTimeout,
}

impl BillingResponseCode {
    /// All known response codes, in native code order
    pub const ALL: [BillingResponseCode; 13] = [
        BillingResponseCode::ServiceTimeout,
        BillingResponseCode::FeatureNotSupported,
        BillingResponseCode::ServiceDisconnected,
        BillingResponseCode::Ok,
        BillingResponseCode::UserCanceled,
        BillingResponseCode::ServiceUnavailable,
        BillingResponseCode::BillingUnavailable,
        BillingResponseCode::ItemUnavailable,
        BillingResponseCode::DeveloperError,
        BillingResponseCode::Error,
        BillingResponseCode::ItemAlreadyOwned,
        BillingResponseCode::ItemNotOwned,
        BillingResponseCode::NetworkError,
    ];

    /// Look up a native integer code
    ///
    /// Returns `None` for codes outside the known set.
    pub fn from_code(code: i32) -> Option<Self> {
        let known = match code {
            0 => BillingResponseCode::Ok,
            1 => BillingResponseCode::UserCanceled,
            2 => BillingResponseCode::ServiceUnavailable,
            3 => BillingResponseCode::BillingUnavailable,
            4 => BillingResponseCode::ItemUnavailable,
            5 => BillingResponseCode::DeveloperError,
            6 => BillingResponseCode::Error,
            7 => BillingResponseCode::ItemAlreadyOwned,
            8 => BillingResponseCode::ItemNotOwned,
            12 => BillingResponseCode::NetworkError,
            -1 => BillingResponseCode::ServiceDisconnected,
            -2 => BillingResponseCode::FeatureNotSupported,
            -3 => BillingResponseCode::ServiceTimeout,
            _ => return None,
        };
        Some(known)
    }

    /// The native integer code for this response
    pub fn code(self) -> i32 {
        match self {
            BillingResponseCode::Ok => 0,
            BillingResponseCode::UserCanceled => 1,
            BillingResponseCode::ServiceUnavailable => 2,
            BillingResponseCode::BillingUnavailable => 3,
            BillingResponseCode::ItemUnavailable => 4,
            BillingResponseCode::DeveloperError => 5,
            BillingResponseCode::Error => 6,
            BillingResponseCode::ItemAlreadyOwned => 7,
            BillingResponseCode::ItemNotOwned => 8,
            BillingResponseCode::NetworkError => 12,
            BillingResponseCode::ServiceDisconnected => -1,
            BillingResponseCode::FeatureNotSupported => -2,
            BillingResponseCode::ServiceTimeout => -3,
        }
    }

    /// Whether a caller may reasonably re-issue the operation
    ///
    /// `ServiceDisconnected` usually calls for a fresh `start_connection`
    /// first. The bridge itself never retries.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            BillingResponseCode::ServiceDisconnected
                | BillingResponseCode::ServiceUnavailable
                | BillingResponseCode::ServiceTimeout
                | BillingResponseCode::NetworkError
                | BillingResponseCode::Error
        )
    }
}

impl From<i32> for BillingResponseCode {
    fn from(code: i32) -> Self {
        BillingResponseCode::from_code(code).unwrap_or(BillingResponseCode::Error)
    }
}

impl From<BillingResponseCode> for i32 {
    fn from(code: BillingResponseCode) -> Self {
        code.code()
    }
}

impl fmt::Display for BillingResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BillingResponseCode::Ok => "OK",
            BillingResponseCode::UserCanceled => "USER_CANCELED",
            BillingResponseCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            BillingResponseCode::BillingUnavailable => "BILLING_UNAVAILABLE",
            BillingResponseCode::ItemUnavailable => "ITEM_UNAVAILABLE",
            BillingResponseCode::DeveloperError => "DEVELOPER_ERROR",
            BillingResponseCode::Error => "ERROR",
            BillingResponseCode::ItemAlreadyOwned => "ITEM_ALREADY_OWNED",
            BillingResponseCode::ItemNotOwned => "ITEM_NOT_OWNED",
            BillingResponseCode::FeatureNotSupported => "FEATURE_NOT_SUPPORTED",
            BillingResponseCode::NetworkError => "NETWORK_ERROR",
            BillingResponseCode::ServiceDisconnected => "SERVICE_DISCONNECTED",
            BillingResponseCode::ServiceTimeout => "SERVICE_TIMEOUT",
        };
        f.write_str(name)
    }
}

/// Outcome of a native billing operation
///
/// Immutable once produced. Success and failure are both represented here;
/// only precondition violations surface as [`crate::types::BridgeError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResult {
    /// Response code reported by the native layer
    pub response_code: BillingResponseCode,

    /// Free-form diagnostic text from the native layer (may be empty)
    pub debug_message: String,
}

impl BillingResult {
    pub fn new(response_code: BillingResponseCode, debug_message: impl Into<String>) -> Self {
        Self {
            response_code,
            debug_message: debug_message.into(),
        }
    }

    /// A successful result with an empty debug message
    pub fn ok() -> Self {
        Self::new(BillingResponseCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.response_code == BillingResponseCode::Ok
    }

    pub fn is_retryable(&self) -> bool {
        self.response_code.is_retryable()
    }
}

impl fmt::Display for BillingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.debug_message.is_empty() {
            write!(f, "{}", self.response_code)
        } else {
            write!(f, "{}: {}", self.response_code, self.debug_message)
        }
    }
}
