//! PIN Gate
//!
//! Per-user state machine guarding financial data:
//!
//! ```text
//! Idle ──sensitive request, code configured──▶ AwaitingCode(action)
//! Idle ──sensitive request, no code──────────▶ Idle
//! AwaitingCode ──4-digit message (consumed)──▶ Idle
//! ```
//!
//! Non-code messages never touch the pending entry; a newer sensitive
//! request replaces it.

use crate::error::StoreError;
use crate::models::{SensitiveAction, UserId};
use crate::store::{RecordStore, StoreResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod pending;

pub use pending::PendingActions;

/// Result of a gate transition
#[derive(Debug)]
pub enum GateOutcome {
    /// Entry registered; the user must send their code.
    AwaitingCode(SensitiveAction),
    /// The user has no code on record.
    CodeNotConfigured,
    /// Code matched and the retrieval returned data.
    Released(String),
    /// Code matched but the store had nothing to return.
    RetrievalFailed,
    /// Code mismatch; the entry is gone.
    Denied,
    StoreUnavailable(StoreError),
}

pub struct PinGate {
    store: Arc<dyn RecordStore>,
    pending: PendingActions,
}

impl PinGate {
    pub fn new(store: Arc<dyn RecordStore>, pending: PendingActions) -> Self {
        Self { store, pending }
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub async fn has_pending(&self, user: UserId) -> bool {
        self.pending.is_pending(user).await
    }

    /// Gate a freshly classified sensitive request.
    pub async fn request_access(&self, user: UserId, action: SensitiveAction) -> GateOutcome {
        let record = match self.store.get_user(user).await {
            Ok(record) => record,
            Err(e) => return GateOutcome::StoreUnavailable(e),
        };

        let has_code = record
            .as_ref()
            .and_then(|u| u.access_code.as_deref())
            .is_some();

        if !has_code {
            info!(%user, %action, "Sensitive request without configured code");
            return GateOutcome::CodeNotConfigured;
        }

        if let Some(previous) = self.pending.register(user, action).await {
            debug!(%user, %previous, "Discarded unconsumed pending action");
        }
        info!(%user, %action, "Awaiting access code");
        GateOutcome::AwaitingCode(action)
    }

    /// Evaluate a code attempt. Returns `None` when nothing is pending, in
    /// which case the message is not a code attempt at all.
    pub async fn submit_code(&self, user: UserId, code: &str) -> Option<GateOutcome> {
        let action = self.pending.take(user).await?;

        let record = match self.store.get_user(user).await {
            Ok(record) => record,
            Err(e) => return Some(GateOutcome::StoreUnavailable(e)),
        };

        let Some(stored) = record.and_then(|u| u.access_code) else {
            warn!(%user, "Code attempt without configured code");
            return Some(GateOutcome::CodeNotConfigured);
        };

        if stored != code {
            warn!(%user, %action, "Access code mismatch");
            return Some(GateOutcome::Denied);
        }

        info!(%user, %action, "Access code verified");
        let outcome = match self.run(action, user).await {
            Ok(Some(data)) => GateOutcome::Released(data),
            Ok(None) => GateOutcome::RetrievalFailed,
            Err(e) => GateOutcome::StoreUnavailable(e),
        };
        Some(outcome)
    }

    /// Fixed lookup from deferred action to store operation.
    async fn run(&self, action: SensitiveAction, user: UserId) -> StoreResult<Option<String>> {
        match action {
            SensitiveAction::BalanceQuery => self.store.accounts_summary(user).await,
            SensitiveAction::LoanQuery => self.store.loans_summary(user).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Loan, User};
    use crate::store::InMemoryRecordStore;

    async fn gate_with_user(code: Option<&str>) -> (PinGate, UserId) {
        let store = InMemoryRecordStore::new();
        let user = UserId(42);
        store
            .insert_user(User {
                id: user,
                display_name: "Ana".to_string(),
                access_code: code.map(str::to_string),
            })
            .await;
        store
            .add_loan(
                user,
                Loan {
                    name: "Consumo".to_string(),
                    total: 50000.0,
                    paid: Some(10000.0),
                    due_date: None,
                },
            )
            .await;

        (PinGate::new(Arc::new(store), PendingActions::new()), user)
    }

    #[tokio::test]
    async fn test_no_code_stays_idle() {
        let (gate, user) = gate_with_user(None).await;

        let outcome = gate.request_access(user, SensitiveAction::BalanceQuery).await;
        assert!(matches!(outcome, GateOutcome::CodeNotConfigured));
        assert!(!gate.has_pending(user).await);
    }

    #[tokio::test]
    async fn test_unknown_user_stays_idle() {
        let (gate, _) = gate_with_user(Some("7788")).await;

        let outcome = gate.request_access(UserId(99), SensitiveAction::LoanQuery).await;
        assert!(matches!(outcome, GateOutcome::CodeNotConfigured));
        assert!(gate.pending().is_empty().await);
    }

    #[tokio::test]
    async fn test_correct_code_releases_once() {
        let (gate, user) = gate_with_user(Some("7788")).await;

        let outcome = gate.request_access(user, SensitiveAction::LoanQuery).await;
        assert!(matches!(outcome, GateOutcome::AwaitingCode(SensitiveAction::LoanQuery)));

        match gate.submit_code(user, "7788").await {
            Some(GateOutcome::Released(data)) => assert!(data.contains("Pendiente $40000.00")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert!(gate.submit_code(user, "7788").await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_consumes_entry() {
        let (gate, user) = gate_with_user(Some("1234")).await;

        gate.request_access(user, SensitiveAction::BalanceQuery).await;
        assert!(matches!(
            gate.submit_code(user, "0000").await,
            Some(GateOutcome::Denied)
        ));
        assert!(!gate.has_pending(user).await);
        assert!(gate.submit_code(user, "1234").await.is_none());
    }

    #[tokio::test]
    async fn test_latest_request_wins() {
        let (gate, user) = gate_with_user(Some("1234")).await;

        gate.request_access(user, SensitiveAction::BalanceQuery).await;
        gate.request_access(user, SensitiveAction::LoanQuery).await;

        match gate.submit_code(user, "1234").await {
            Some(GateOutcome::Released(data)) => assert!(data.contains("préstamos")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_code_removed_between_request_and_attempt() {
        let store = Arc::new(InMemoryRecordStore::new());
        let user = UserId(5);
        store
            .insert_user(User {
                id: user,
                display_name: "Leo".to_string(),
                access_code: Some("1111".to_string()),
            })
            .await;

        let pending = PendingActions::new();
        let gate = PinGate::new(store.clone(), pending.clone());
        gate.request_access(user, SensitiveAction::BalanceQuery).await;

        // a second gate over an empty store sees no code for the same user
        let empty_gate = PinGate::new(Arc::new(InMemoryRecordStore::new()), pending);
        assert!(matches!(
            empty_gate.submit_code(user, "1111").await,
            Some(GateOutcome::CodeNotConfigured)
        ));
        assert!(!gate.has_pending(user).await);
    }
}
