//! One-shot native callbacks as awaitable results
//!
//! Every correlated call gets its own single-assignment cell: a oneshot
//! channel whose sending half travels into the native callback as a
//! [`Completion`] and whose receiving half is handed to the caller as a
//! [`Correlated`] future. There is no shared request table, so concurrent
//! calls of the same kind never observe each other.
//!
//! # Abandonment
//!
//! Dropping a `Correlated` future abandons the call. The native call itself
//! keeps running; when its callback fires later, `Completion::complete` finds
//! the receiver gone and discards the value. [`run_until_cancelled`] offers the
//! same through a `CancellationToken`.

use crate::native::types::{NativeBillingResult, NativeProductDetails};
use crate::types::{BillingResponseCode, BillingResult, ProductDetailsResult, PurchasesResult};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Value a correlated call resolves to if the native layer drops its callback
/// without invoking it
pub trait DroppedCallback {
    fn dropped_callback(operation: &'static str) -> Self;
}

fn dropped_message(operation: &str) -> String {
    format!("{} callback was dropped without being invoked", operation)
}

impl DroppedCallback for BillingResult {
    fn dropped_callback(operation: &'static str) -> Self {
        BillingResult::new(BillingResponseCode::Error, dropped_message(operation))
    }
}

impl DroppedCallback for NativeBillingResult {
    fn dropped_callback(operation: &'static str) -> Self {
        NativeBillingResult::new(BillingResponseCode::Error.code(), dropped_message(operation))
    }
}

impl DroppedCallback for ProductDetailsResult {
    fn dropped_callback(operation: &'static str) -> Self {
        ProductDetailsResult::empty(BillingResult::dropped_callback(operation))
    }
}

impl DroppedCallback for PurchasesResult {
    fn dropped_callback(operation: &'static str) -> Self {
        PurchasesResult::empty(BillingResult::dropped_callback(operation))
    }
}

/// Raw outcome of a product details lookup, native handles included
///
/// The billing flow needs the handles themselves, not their records.
#[derive(Debug, Clone)]
pub struct ProductLookup {
    pub result: NativeBillingResult,
    pub details: Option<Vec<NativeProductDetails>>,
}

impl DroppedCallback for ProductLookup {
    fn dropped_callback(operation: &'static str) -> Self {
        Self {
            result: NativeBillingResult::dropped_callback(operation),
            details: None,
        }
    }
}

/// Sending half of a correlated call, moved into the native callback
#[derive(Debug)]
pub struct Completion<T> {
    sender: oneshot::Sender<T>,
    operation: &'static str,
}

impl<T> Completion<T> {
    /// Resolve the call
    ///
    /// Returns `false`, and discards `value`, if the caller has already
    /// abandoned it.
    pub fn complete(self, value: T) -> bool {
        let delivered = self.sender.send(value).is_ok();
        if !delivered {
            debug!(
                operation = self.operation,
                "caller abandoned the request, dropping late native result"
            );
        }
        delivered
    }
}

/// Receiving half of a correlated call
///
/// Resolves exactly once with the value passed to [`Completion::complete`], or
/// with `T::dropped_callback` if the completion is dropped unused.
#[derive(Debug)]
#[must_use = "a correlated call does nothing observable unless awaited"]
pub struct Correlated<T> {
    receiver: oneshot::Receiver<T>,
    operation: &'static str,
}

impl<T: DroppedCallback> Future for Correlated<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let operation = self.operation;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(_)) => {
                debug!(operation, "native layer dropped its callback");
                Poll::Ready(T::dropped_callback(operation))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Issue a native call and correlate its single callback
///
/// `issue` runs immediately and must hand the `Completion` to the native
/// callback.
pub fn correlate<T, F>(operation: &'static str, issue: F) -> Correlated<T>
where
    F: FnOnce(Completion<T>),
{
    let (sender, receiver) = oneshot::channel();
    issue(Completion { sender, operation });
    Correlated {
        receiver,
        operation,
    }
}

/// Drive `operation` until it finishes or `token` is cancelled
///
/// Returns `None` if the caller cancelled first. The native side effect of an
/// already issued call is not undone.
pub async fn run_until_cancelled<F>(token: &CancellationToken, operation: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("operation abandoned by caller");
            None
        }
        output = operation => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_with_callback_value() {
        let result = correlate("test", |completion| {
            completion.complete(BillingResult::ok());
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_resolves_from_another_thread() {
        let result = correlate("test", |completion: Completion<BillingResult>| {
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                completion.complete(BillingResult::new(BillingResponseCode::UserCanceled, "cancel"));
            });
        })
        .await;
        assert_eq!(result.response_code, BillingResponseCode::UserCanceled);
    }

    #[tokio::test]
    async fn test_dropped_completion_resolves_to_error() {
        let result: BillingResult = correlate("acknowledgePurchase", drop).await;
        assert_eq!(result.response_code, BillingResponseCode::Error);
        assert!(result.debug_message.contains("acknowledgePurchase"));

        let lookup: ProductLookup = correlate("queryProductDetailsAsync", drop).await;
        assert!(lookup.details.is_none());
        assert_eq!(lookup.result.response_code, BillingResponseCode::Error.code());
    }

    #[tokio::test]
    async fn test_late_completion_after_abandonment_is_discarded() {
        let stash: Arc<Mutex<Option<Completion<BillingResult>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&stash);
        let pending = correlate("test", move |completion| {
            *slot.lock().unwrap() = Some(completion);
        });

        drop(pending);

        let completion = stash.lock().unwrap().take().unwrap();
        assert!(!completion.complete(BillingResult::ok()));
    }

    #[tokio::test]
    async fn test_completion_reports_delivery() {
        let stash: Arc<Mutex<Option<Completion<BillingResult>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&stash);
        let pending = correlate("test", move |completion| {
            *slot.lock().unwrap() = Some(completion);
        });

        let completion = stash.lock().unwrap().take().unwrap();
        assert!(completion.complete(BillingResult::new(BillingResponseCode::ItemNotOwned, "")));
        assert_eq!(pending.await.response_code, BillingResponseCode::ItemNotOwned);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let calls = (0..16).map(|i| {
            correlate("test", move |completion: Completion<PurchasesResult>| {
                std::thread::spawn(move || {
                    let code = if i % 2 == 0 {
                        BillingResponseCode::Ok
                    } else {
                        BillingResponseCode::NetworkError
                    };
                    completion.complete(PurchasesResult::empty(BillingResult::new(
                        code,
                        i.to_string(),
                    )));
                });
            })
        });

        let results = join_all(calls).await;
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.billing_result.debug_message, i.to_string());
            assert_eq!(result.billing_result.is_ok(), i % 2 == 0);
        }
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let token = CancellationToken::new();
        let finished = run_until_cancelled(&token, async { 7 }).await;
        assert_eq!(finished, Some(7));

        token.cancel();
        let never = correlate("test", |completion: Completion<BillingResult>| {
            std::mem::forget(completion);
        });
        assert_eq!(run_until_cancelled(&token, never).await, None);
    }
}
