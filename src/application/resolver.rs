use crate::domain::network::{NetworkId, NetworkIdentity};
use crate::error::LedgerError;
use tracing::{info, warn};

/// Caches the signer's network, resolved once per signing context.
///
/// Entries are keyed by the signing context id. The session queries again only
/// when that id changes or after [`NetworkResolver::invalidate`]. Failed
/// queries are cached as `Unknown` and never retried on their own.
#[derive(Debug, Default)]
pub struct NetworkResolver {
    resolved_for: Option<String>,
    identity: NetworkIdentity,
}

impl NetworkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last resolved identity.
    pub fn identity(&self) -> NetworkIdentity {
        self.identity
    }

    /// The cached identity if it belongs to `context_id`, `Unknown` otherwise.
    pub fn identity_for(&self, context_id: &str) -> NetworkIdentity {
        if self.is_current(context_id) {
            self.identity
        } else {
            NetworkIdentity::Unknown
        }
    }

    /// Whether the cached value already belongs to `context_id`.
    pub fn is_current(&self, context_id: &str) -> bool {
        self.resolved_for.as_deref() == Some(context_id)
    }

    /// Stores the result of querying the context `context_id`.
    pub fn record(
        &mut self,
        context_id: &str,
        result: Result<NetworkId, LedgerError>,
    ) -> NetworkIdentity {
        self.identity = match result {
            Ok(network) => {
                info!(context = context_id, %network, "Resolved signer network");
                NetworkIdentity::Known(network)
            }
            Err(e) => {
                warn!(context = context_id, error = %e, "Could not resolve signer network");
                NetworkIdentity::Unknown
            }
        };
        self.resolved_for = Some(context_id.to_string());
        self.identity
    }

    /// Forgets the cached value; used when no signing context is available.
    pub fn invalidate(&mut self) {
        self.resolved_for = None;
        self.identity = NetworkIdentity::Unknown;
    }
}
