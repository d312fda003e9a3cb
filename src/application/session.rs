use crate::application::orchestrator::{PaymentOrchestrator, Submission};
use crate::application::pricing::compute_total;
use crate::application::resolver::NetworkResolver;
use crate::config::CheckoutConfig;
use crate::domain::amount::BaseUnits;
use crate::domain::catalog::{Catalog, ItemId};
use crate::domain::network::NetworkIdentity;
use crate::domain::outcome::TransactionOutcome;
use crate::domain::ports::SigningContextRef;
use crate::domain::selection::SelectionState;
use crate::error::{CheckoutError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// One user's checkout: selection state, the attached signer, and at most one
/// submission in flight.
///
/// Locks are held only for short synchronous sections, never across ledger
/// calls, so selection toggles stay responsive while a submission runs.
pub struct CheckoutSession {
    catalog: Arc<Catalog>,
    orchestrator: PaymentOrchestrator,
    selection: RwLock<SelectionState>,
    resolver: Mutex<NetworkResolver>,
    context: RwLock<Option<SigningContextRef>>,
    in_flight: AtomicBool,
}

impl CheckoutSession {
    pub fn new(catalog: Arc<Catalog>, config: CheckoutConfig) -> Self {
        Self {
            orchestrator: PaymentOrchestrator::new(catalog.clone(), config),
            catalog,
            selection: RwLock::new(SelectionState::new()),
            resolver: Mutex::new(NetworkResolver::new()),
            context: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &CheckoutConfig {
        self.orchestrator.config()
    }

    pub async fn toggle_selection(&self, id: ItemId) -> bool {
        let selected = self.selection.write().await.toggle_selection(id);
        debug!(%id, selected, "Toggled selection");
        selected
    }

    pub async fn toggle_description(&self, id: ItemId) -> bool {
        self.selection.write().await.toggle_description(id)
    }

    pub async fn reset_selection(&self) {
        self.selection.write().await.clear_selection();
    }

    /// Snapshot of the current selection state.
    pub async fn selection(&self) -> SelectionState {
        self.selection.read().await.clone()
    }

    /// Price of the current selection.
    pub async fn total(&self) -> Result<BaseUnits> {
        let selected = self.selection.read().await.selected_ids();
        compute_total(&selected, &self.catalog)
    }

    /// Resolved network of the attached signer. `Unknown` while its query is
    /// still running or when nothing is attached.
    pub async fn network(&self) -> NetworkIdentity {
        self.attached().await.1
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Attaches (or detaches) the signing context and resolves its network if
    /// it is not the context already resolved.
    pub async fn attach_signer(&self, context: Option<SigningContextRef>) -> NetworkIdentity {
        *self.context.write().await = context.clone();
        self.resolve_network(context).await
    }

    /// Re-queries the attached context even if it was already resolved.
    pub async fn refresh_network(&self) -> NetworkIdentity {
        self.resolver.lock().await.invalidate();
        let context = self.context.read().await.clone();
        self.resolve_network(context).await
    }

    async fn resolve_network(&self, context: Option<SigningContextRef>) -> NetworkIdentity {
        let Some(context) = context else {
            let mut resolver = self.resolver.lock().await;
            resolver.invalidate();
            return resolver.identity();
        };

        {
            let resolver = self.resolver.lock().await;
            if resolver.is_current(context.context_id()) {
                return resolver.identity();
            }
        }

        let result = context.active_network().await;

        let mut resolver = self.resolver.lock().await;
        let still_attached = self
            .context
            .read()
            .await
            .as_ref()
            .is_some_and(|current| current.context_id() == context.context_id());
        if !still_attached {
            debug!(
                context = context.context_id(),
                "Discarding network of a detached signing context"
            );
            return NetworkIdentity::Unknown;
        }
        resolver.record(context.context_id(), result)
    }

    /// The attached context paired with the network resolved for that same
    /// context. A cached network of a previous context is never returned.
    async fn attached(&self) -> (Option<SigningContextRef>, NetworkIdentity) {
        let context = self.context.read().await.clone();
        let network = match &context {
            Some(context) => self.resolver.lock().await.identity_for(context.context_id()),
            None => NetworkIdentity::Unknown,
        };
        (context, network)
    }

    /// Submits the current selection. A second call while one is running is
    /// turned away with `SUBMISSION_IN_PROGRESS`.
    pub async fn submit(&self) -> TransactionOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("Submission rejected: another submission is in progress");
            return TransactionOutcome::rejected(&CheckoutError::SubmissionInProgress);
        };

        let selection = self.selection.read().await.selected_ids();
        let (context, network) = self.attached().await;
        let submission = Submission { selection, network };

        self.orchestrator
            .submit(submission, context.as_deref())
            .await
    }
}

/// Marks a submission as running until dropped.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
