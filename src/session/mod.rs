// Session client: the caller-owned front end over guard, gateway and registry.
//
// States:
//   Disconnected   initial, and where every failed connect lands
//   Connecting     acquiring a context and running the network guard
//   Connected      ready for reads and joins
//   AwaitingWrite  a join is submitted and not yet resolved
//
// The membership view is only written from registry reads taken after a
// write resolves. Join attempts are tracked per account so that a retry
// after an ambiguous failure reconciles the earlier submission instead of
// blindly sending a second join.

mod connector;

pub use connector::{ConnectionContext, Connector, HttpConnector, StaticConnector};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::{Address, TxHash};
use crate::errors::{AllowlistError, Result};
use crate::gateway::{interpret_join, TransactionGateway};
use crate::guard::NetworkGuard;
use crate::ledger::{Call, Query, QueryResult, Receipt};
use crate::providers::Signer;
use crate::registry::{JoinOutcome, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    AwaitingWrite,
}

/// What the session last read from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipView {
    /// Account the `is_member` flag refers to
    pub account: Option<Address>,
    pub is_member: bool,
    pub count: u64,
    pub capacity: u64,
}

impl MembershipView {
    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.count)
    }
}

/// Where this session stands with an account's join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinIntent {
    /// Sent to the provider without an acknowledgement. A retry resubmits
    /// under the same intent id, which the ledger deduplicates.
    Submitting {
        intent_id: Uuid,
        prior: Option<TxHash>,
    },
    /// Pending on the ledger. A retry waits for this transaction.
    Submitted {
        intent_id: Uuid,
        tx_hash: TxHash,
        prior: Option<TxHash>,
    },
    /// This session's join was accepted in `tx_hash`.
    Joined { tx_hash: TxHash },
}

impl JoinIntent {
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, JoinIntent::Joined { .. })
    }
}

/// Resolved result of `SessionClient::join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReport {
    pub outcome: JoinOutcome,
    pub tx_hash: TxHash,
    /// For a duplicate: the transaction in which this session joined earlier.
    /// `None` means the membership came from somewhere else.
    pub prior_attempt: Option<TxHash>,
}

pub struct SessionClient {
    connector: Arc<dyn Connector>,
    guard: NetworkGuard,
    gateway: TransactionGateway,
    registry: Address,
    state: SessionState,
    context: Option<ConnectionContext>,
    view: Option<MembershipView>,
    intents: HashMap<Address, JoinIntent>,
}

impl SessionClient {
    pub fn new(
        connector: Arc<dyn Connector>,
        guard: NetworkGuard,
        gateway: TransactionGateway,
        registry: Address,
    ) -> Self {
        Self {
            connector,
            guard,
            gateway,
            registry,
            state: SessionState::Disconnected,
            context: None,
            view: None,
            intents: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub fn view(&self) -> Option<&MembershipView> {
        self.view.as_ref()
    }

    pub fn account(&self) -> Option<Address> {
        self.context.as_ref().and_then(|ctx| ctx.account())
    }

    pub fn intent(&self, account: &Address) -> Option<JoinIntent> {
        self.intents.get(account).copied()
    }

    /// Acquire a connection and verify its network.
    ///
    /// On failure the session is back in `Disconnected` with no context.
    /// A failed view refresh after a good connection is logged, not returned.
    pub async fn connect(&mut self) -> Result<()> {
        self.state = SessionState::Connecting;
        self.context = None;
        self.view = None;

        let context = match self.acquire().await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Connect failed");
                self.state = SessionState::Disconnected;
                return Err(e);
            }
        };

        info!(
            provider = context.provider().name(),
            account = ?context.account(),
            registry = %self.registry,
            "Session connected"
        );
        self.context = Some(context);
        self.state = SessionState::Connected;

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Initial membership refresh failed");
        }
        Ok(())
    }

    async fn acquire(&self) -> Result<ConnectionContext> {
        let context = self.connector.connect().await?;
        self.guard.check(context.provider().as_ref()).await?;
        Ok(context)
    }

    pub fn disconnect(&mut self) {
        self.context = None;
        self.view = None;
        self.state = SessionState::Disconnected;
        debug!("Session disconnected");
    }

    /// Context for a guarded read or write.
    async fn guarded_context(&self) -> Result<ConnectionContext> {
        let context = match (&self.state, &self.context) {
            (SessionState::Connected, Some(context)) => context.clone(),
            _ => return Err(self.unavailable().await),
        };
        self.guard.check(context.provider().as_ref()).await?;
        Ok(context)
    }

    /// Why an operation cannot run without a session context.
    ///
    /// The connector is asked for a context and the guard runs on it, so a
    /// wallet on the wrong chain hears `WrongNetwork` with nothing sent to
    /// the registry. The context is dropped either way: only `connect`
    /// establishes a session.
    async fn unavailable(&self) -> AllowlistError {
        let context = match self.connector.connect().await {
            Ok(context) => context,
            Err(e) => {
                debug!(error = %e, "No connection available");
                return AllowlistError::NotConnected;
            }
        };
        match self.guard.check(context.provider().as_ref()).await {
            Err(e @ AllowlistError::WrongNetwork { .. }) => e,
            _ => AllowlistError::NotConnected,
        }
    }

    async fn query(&self, context: &ConnectionContext, query: Query) -> Result<QueryResult> {
        context.provider().call(self.registry, query).await
    }

    pub async fn is_member(&self, address: Address) -> Result<bool> {
        let context = self.guarded_context().await?;
        match self.query(&context, Query::IsMember { address }).await? {
            QueryResult::IsMember(member) => Ok(member),
            other => Err(unexpected(other)),
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let context = self.guarded_context().await?;
        read_count(self.query(&context, Query::Count).await?)
    }

    pub async fn capacity(&self) -> Result<u64> {
        let context = self.guarded_context().await?;
        read_capacity(self.query(&context, Query::Capacity).await?)
    }

    /// Re-read the view from the registry.
    pub async fn refresh(&mut self) -> Result<&MembershipView> {
        let context = self.guarded_context().await?;
        let account = context.account();

        let is_member = match account {
            Some(address) => match self.query(&context, Query::IsMember { address }).await? {
                QueryResult::IsMember(member) => member,
                other => return Err(unexpected(other)),
            },
            None => false,
        };
        let count = read_count(self.query(&context, Query::Count).await?)?;
        let capacity = read_capacity(self.query(&context, Query::Capacity).await?)?;

        debug!(is_member, count, capacity, "Membership view refreshed");
        Ok(self.view.insert(MembershipView {
            account,
            is_member,
            count,
            capacity,
        }))
    }

    /// Join the registry with the session's account.
    pub async fn join(&mut self) -> Result<JoinReport> {
        self.join_inner(None).await
    }

    /// Join, but stop waiting for confirmation after `timeout`.
    ///
    /// The transaction may still confirm after a timeout; the next `join`
    /// picks it up instead of submitting again.
    pub async fn join_with_timeout(&mut self, timeout: Duration) -> Result<JoinReport> {
        self.join_inner(Some(timeout)).await
    }

    async fn join_inner(&mut self, timeout: Option<Duration>) -> Result<JoinReport> {
        let context = self.guarded_context().await?;
        let signer = context.signer()?;

        self.state = SessionState::AwaitingWrite;
        let result = self.run_join(&signer, timeout).await;
        self.state = SessionState::Connected;

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Membership refresh after join failed");
        }

        match &result {
            Ok(report) => info!(
                account = %signer.account(),
                tx_hash = %report.tx_hash,
                outcome = ?report.outcome,
                "Join resolved"
            ),
            Err(e) => warn!(account = %signer.account(), error = %e, "Join failed"),
        }
        result
    }

    async fn run_join(&mut self, signer: &Signer, timeout: Option<Duration>) -> Result<JoinReport> {
        let account = signer.account();
        let (intent_id, prior, known_hash) = match self.intents.get(&account).copied() {
            Some(JoinIntent::Submitting { intent_id, prior }) => (intent_id, prior, None),
            Some(JoinIntent::Submitted {
                intent_id,
                tx_hash,
                prior,
            }) => (intent_id, prior, Some(tx_hash)),
            Some(JoinIntent::Joined { tx_hash }) => (Uuid::new_v4(), Some(tx_hash), None),
            None => (Uuid::new_v4(), None, None),
        };

        let pending = match known_hash {
            Some(tx_hash) => {
                info!(%tx_hash, "Reconciling earlier join submission");
                self.gateway.resume(Arc::clone(signer.provider()), tx_hash)
            }
            None => {
                self.intents
                    .insert(account, JoinIntent::Submitting { intent_id, prior });
                let submitted = self
                    .gateway
                    .submit(signer, Call::Join { registry: self.registry }, intent_id)
                    .await;
                match submitted {
                    Ok(pending) => pending,
                    Err(e) => {
                        if !e.is_retryable() {
                            self.settle(account, prior);
                        }
                        return Err(e);
                    }
                }
            }
        };

        let tx_hash = pending.tx_hash();
        self.intents.insert(
            account,
            JoinIntent::Submitted {
                intent_id,
                tx_hash,
                prior,
            },
        );

        let receipt = self.await_receipt(&pending, timeout).await?;
        let outcome = interpret_join(&receipt);
        match outcome {
            Ok(JoinOutcome::Accepted) => {
                self.intents.insert(account, JoinIntent::Joined { tx_hash });
            }
            _ => self.settle(account, prior),
        }
        let outcome = outcome?;

        let prior_attempt = match outcome {
            JoinOutcome::Rejected(Rejection::DuplicateParticipant) => prior,
            _ => None,
        };
        Ok(JoinReport {
            outcome,
            tx_hash,
            prior_attempt,
        })
    }

    async fn await_receipt(
        &self,
        pending: &crate::gateway::PendingTransaction,
        timeout: Option<Duration>,
    ) -> Result<Receipt> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, pending.wait())
                .await
                .map_err(|_| AllowlistError::ConfirmationTimeout {
                    tx_hash: pending.tx_hash(),
                })?,
            None => pending.wait().await,
        }
    }

    /// Drop an attempt that resolved without admitting the account, keeping
    /// any earlier accepted join on record.
    fn settle(&mut self, account: Address, prior: Option<TxHash>) {
        match prior {
            Some(tx_hash) => {
                self.intents.insert(account, JoinIntent::Joined { tx_hash });
            }
            None => {
                self.intents.remove(&account);
            }
        }
    }
}

fn read_count(result: QueryResult) -> Result<u64> {
    match result {
        QueryResult::Count(count) => Ok(count),
        other => Err(unexpected(other)),
    }
}

fn read_capacity(result: QueryResult) -> Result<u64> {
    match result {
        QueryResult::Capacity(capacity) => Ok(capacity),
        other => Err(unexpected(other)),
    }
}

fn unexpected(result: QueryResult) -> AllowlistError {
    AllowlistError::TransportFailure(format!("Provider returned mismatched result {result:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use crate::guard::Network;
    use crate::ledger::Ledger;
    use crate::providers::{LocalProvider, Provider};

    async fn deployed(capacity: u64) -> (Arc<Ledger>, Address) {
        let ledger = Arc::new(Ledger::new(ChainId(80001)));
        let hash = ledger
            .submit(crate::ledger::TransactionRequest::new(
                Address::from_seed("deployer"),
                Call::Deploy { capacity },
            ))
            .await
            .unwrap();
        ledger.produce_block().await;
        let registry = ledger.receipt(&hash).await.unwrap().contract_address.unwrap();
        (ledger, registry)
    }

    fn session(provider: LocalProvider, account: Option<Address>, registry: Address) -> SessionClient {
        let provider: Arc<dyn Provider> = Arc::new(provider);
        SessionClient::new(
            Arc::new(StaticConnector::new(provider, account)),
            NetworkGuard::new(Network::default()),
            TransactionGateway::new(Duration::from_millis(20)),
            registry,
        )
    }

    #[tokio::test]
    async fn test_connect_reads_view() {
        let (ledger, registry) = deployed(143).await;
        let alice = Address::from_seed("alice");
        let mut client = session(LocalProvider::new(ledger), Some(alice), registry);

        assert_eq!(client.state(), SessionState::Disconnected);
        client.connect().await.unwrap();
        assert_eq!(client.state(), SessionState::Connected);

        let view = client.view().unwrap();
        assert_eq!(view.account, Some(alice));
        assert!(!view.is_member);
        assert_eq!(view.count, 0);
        assert_eq!(view.capacity, 143);
        assert_eq!(view.remaining(), 143);
    }

    #[tokio::test]
    async fn test_connect_on_wrong_network_stays_disconnected() {
        let (ledger, registry) = deployed(1).await;
        let mut client = session(LocalProvider::new(ledger).on_chain(ChainId(1)), None, registry);

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, AllowlistError::WrongNetwork { .. }));
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(client.view().is_none());
        assert!(client.account().is_none());
    }

    #[tokio::test]
    async fn test_disconnected_read_on_wrong_network_reports_it() {
        let (ledger, registry) = deployed(1).await;
        let mut client = session(LocalProvider::new(ledger).on_chain(ChainId(137)), None, registry);
        assert!(client.connect().await.is_err());

        let err = client.is_member(Address::from_seed("alice")).await.unwrap_err();
        assert!(matches!(
            err,
            AllowlistError::WrongNetwork {
                actual: ChainId(137),
                ..
            }
        ));
        assert!(matches!(client.join().await, Err(AllowlistError::WrongNetwork { .. })));
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reads_require_connection() {
        let (ledger, registry) = deployed(1).await;
        let client = session(LocalProvider::new(ledger), None, registry);
        assert_eq!(client.count().await.unwrap_err(), AllowlistError::NotConnected);
    }

    #[tokio::test]
    async fn test_read_only_session_cannot_join() {
        let (ledger, registry) = deployed(1).await;
        let mut client = session(LocalProvider::new(ledger), None, registry);
        client.connect().await.unwrap();
        assert_eq!(client.join().await.unwrap_err(), AllowlistError::NoSigner);
        assert_eq!(client.state(), SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_reconcile() {
        let (ledger, registry) = deployed(5).await;
        let alice = Address::from_seed("alice");
        let mut client = session(LocalProvider::new(Arc::clone(&ledger)), Some(alice), registry);
        client.connect().await.unwrap();

        // No block producer: the join cannot confirm.
        let err = client
            .join_with_timeout(Duration::from_millis(100))
            .await
            .unwrap_err();
        let pending_hash = match err {
            AllowlistError::ConfirmationTimeout { tx_hash } => tx_hash,
            other => panic!("Expected ConfirmationTimeout, got {other:?}"),
        };
        assert_eq!(client.state(), SessionState::Connected);
        assert!(client.intent(&alice).unwrap().is_unresolved());
        assert!(!client.view().unwrap().is_member);

        ledger.produce_block().await;

        // The retry waits on the first submission rather than sending another.
        let report = client.join().await.unwrap();
        assert_eq!(report.tx_hash, pending_hash);
        assert_eq!(report.outcome, JoinOutcome::Accepted);
        assert_eq!(ledger.pending_count().await, 0);
        assert_eq!(client.intent(&alice), Some(JoinIntent::Joined { tx_hash: pending_hash }));
        assert!(client.view().unwrap().is_member);
    }
}
