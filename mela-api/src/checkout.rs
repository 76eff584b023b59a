//! Bridges the browser-hosted payment widget to the orchestrator.
//!
//! A submission that reaches `AwaitingPayment` parks here under its order id
//! until the widget reports back through the payment or dismiss callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use mela_core::payment::{CheckoutOutcome, CheckoutParams, CheckoutWidget};
use mela_order::{OrchestratorError, SubmissionOutcome};

/// Resolves with whatever the visitor's browser reports for this submission.
pub struct HostedCheckout {
    outcome: Mutex<Option<oneshot::Receiver<CheckoutOutcome>>>,
}

impl HostedCheckout {
    pub fn channel() -> (Self, oneshot::Sender<CheckoutOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                outcome: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl CheckoutWidget for HostedCheckout {
    async fn open(&self, params: CheckoutParams) -> CheckoutOutcome {
        let rx = match self.outcome.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        let Some(rx) = rx else {
            return CheckoutOutcome::Failed("checkout already opened".to_string());
        };

        tracing::debug!(order_id = %params.order_id, "Waiting on hosted checkout");
        // A dropped sender means the pending entry was discarded without a callback.
        rx.await
            .unwrap_or_else(|_| CheckoutOutcome::Failed("checkout abandoned".to_string()))
    }
}

pub type SubmissionTask = JoinHandle<Result<SubmissionOutcome, OrchestratorError>>;

pub struct PendingCheckout {
    pub outcome: oneshot::Sender<CheckoutOutcome>,
    pub submission: SubmissionTask,
}

/// Parked checkouts are dropped after this long without a callback.
pub const DEFAULT_ABANDON_AFTER: Duration = Duration::from_secs(15 * 60);

struct Parked {
    checkout: PendingCheckout,
    parked_at: Instant,
}

/// Submissions waiting on the widget, keyed by gateway order id.
///
/// A visitor who closes the tab never calls back. Entries older than
/// `abandon_after` are evicted, which drops their callback sender and lets the
/// parked submission finish as a failed checkout.
pub struct PendingCheckouts {
    inner: Mutex<HashMap<String, Parked>>,
    abandon_after: Duration,
}

impl Default for PendingCheckouts {
    fn default() -> Self {
        Self::new(DEFAULT_ABANDON_AFTER)
    }
}

impl PendingCheckouts {
    pub fn new(abandon_after: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            abandon_after,
        }
    }

    pub fn abandon_after(&self) -> Duration {
        self.abandon_after
    }

    pub fn insert(&self, order_id: String, pending: PendingCheckout) {
        if let Ok(mut inner) = self.inner.lock() {
            evict_abandoned(&mut inner, self.abandon_after);
            inner.insert(
                order_id,
                Parked {
                    checkout: pending,
                    parked_at: Instant::now(),
                },
            );
        }
    }

    /// Removing the entry is what makes each callback single-use.
    pub fn take(&self, order_id: &str) -> Option<PendingCheckout> {
        self.inner
            .lock()
            .ok()?
            .remove(order_id)
            .map(|parked| parked.checkout)
    }

    /// Drop every checkout parked longer than `abandon_after`. Returns how many went.
    pub fn sweep(&self) -> usize {
        self.inner
            .lock()
            .map(|mut inner| evict_abandoned(&mut inner, self.abandon_after))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_abandoned(inner: &mut HashMap<String, Parked>, abandon_after: Duration) -> usize {
    let before = inner.len();
    inner.retain(|order_id, parked| {
        let keep = parked.parked_at.elapsed() < abandon_after;
        if !keep {
            tracing::warn!(order_id = %order_id, "Checkout abandoned without a callback");
        }
        keep
    });
    before - inner.len()
}

/// Periodically evicts abandoned checkouts that no new insert would reach.
pub fn spawn_sweeper(pending: Arc<PendingCheckouts>) -> JoinHandle<()> {
    let period = pending.abandon_after().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = pending.sweep();
            if evicted > 0 {
                tracing::info!(evicted, "Swept abandoned checkouts");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_core::payment::{CheckoutTheme, PaymentConfirmation, Prefill};

    fn params() -> CheckoutParams {
        CheckoutParams {
            key: "rzp_test".to_string(),
            amount: 349000,
            currency: "INR".to_string(),
            name: "EOD Adventure Park".to_string(),
            description: "School Package Booking".to_string(),
            order_id: "order_1".to_string(),
            prefill: Prefill {
                name: "Asha".to_string(),
                email: "asha@gmail.com".to_string().into(),
                contact: "9876543210".to_string().into(),
            },
            theme: CheckoutTheme {
                color: "#2C65EB".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_hosted_checkout_resolves_with_callback() {
        let (checkout, tx) = HostedCheckout::channel();
        let confirmation = PaymentConfirmation {
            payment_id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            signature: None,
        };
        tx.send(CheckoutOutcome::Paid(confirmation.clone())).unwrap();

        assert_eq!(checkout.open(params()).await, CheckoutOutcome::Paid(confirmation));
    }

    #[tokio::test]
    async fn test_hosted_checkout_opens_once() {
        let (checkout, tx) = HostedCheckout::channel();
        tx.send(CheckoutOutcome::Dismissed).unwrap();

        assert_eq!(checkout.open(params()).await, CheckoutOutcome::Dismissed);
        assert!(matches!(checkout.open(params()).await, CheckoutOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_dropped_callback_fails_the_checkout() {
        let (checkout, tx) = HostedCheckout::channel();
        drop(tx);

        assert!(matches!(checkout.open(params()).await, CheckoutOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_pending_entries_are_taken_once() {
        let pending = PendingCheckouts::default();
        let (tx, _rx) = oneshot::channel();
        let submission = tokio::spawn(async { Ok(SubmissionOutcome::Invalid(Vec::new())) });

        pending.insert("order_1".to_string(), PendingCheckout { outcome: tx, submission });
        assert_eq!(pending.len(), 1);

        assert!(pending.take("order_1").is_some());
        assert!(pending.take("order_1").is_none());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_checkout_is_evicted_and_its_submission_ends() {
        let pending = PendingCheckouts::new(Duration::ZERO);
        let (checkout, tx) = HostedCheckout::channel();
        let (seen_tx, seen_rx) = oneshot::channel();
        let submission = tokio::spawn(async move {
            let _ = seen_tx.send(checkout.open(params()).await);
            Ok(SubmissionOutcome::Invalid(Vec::new()))
        });
        pending.insert("order_1".to_string(), PendingCheckout { outcome: tx, submission });

        assert_eq!(pending.sweep(), 1);
        assert!(pending.take("order_1").is_none());
        assert_eq!(
            seen_rx.await.unwrap(),
            CheckoutOutcome::Failed("checkout abandoned".to_string())
        );
    }

    #[tokio::test]
    async fn test_insert_evicts_stale_entries() {
        let pending = PendingCheckouts::new(Duration::ZERO);
        for order_id in ["order_1", "order_2", "order_3"] {
            let (tx, _rx) = oneshot::channel();
            let submission = tokio::spawn(async { Ok(SubmissionOutcome::Invalid(Vec::new())) });
            pending.insert(order_id.to_string(), PendingCheckout { outcome: tx, submission });
        }

        assert_eq!(pending.len(), 1);
        assert!(pending.take("order_3").is_some());
    }

    #[tokio::test]
    async fn test_fresh_entries_survive_a_sweep() {
        let pending = PendingCheckouts::default();
        let (tx, _rx) = oneshot::channel();
        let submission = tokio::spawn(async { Ok(SubmissionOutcome::Invalid(Vec::new())) });
        pending.insert("order_1".to_string(), PendingCheckout { outcome: tx, submission });

        assert_eq!(pending.sweep(), 0);
        assert_eq!(pending.len(), 1);
    }
}
