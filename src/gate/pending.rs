//! Pending-action registry
//!
//! At most one deferred retrieval per user. Registering replaces any
//! unconsumed entry; taking removes it.

use crate::models::{SensitiveAction, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct PendingActions {
    slots: Arc<RwLock<HashMap<UserId, SensitiveAction>>>,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `action` for `user`, returning the entry it displaced.
    pub async fn register(&self, user: UserId, action: SensitiveAction) -> Option<SensitiveAction> {
        self.slots.write().await.insert(user, action)
    }

    pub async fn take(&self, user: UserId) -> Option<SensitiveAction> {
        self.slots.write().await.remove(&user)
    }

    pub async fn is_pending(&self, user: UserId) -> bool {
        self.slots.read().await.contains_key(&user)
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_overwrites() {
        let pending = PendingActions::new();
        let user = UserId(1);

        assert_eq!(pending.register(user, SensitiveAction::BalanceQuery).await, None);
        assert_eq!(
            pending.register(user, SensitiveAction::LoanQuery).await,
            Some(SensitiveAction::BalanceQuery)
        );
        assert_eq!(pending.take(user).await, Some(SensitiveAction::LoanQuery));
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_consumes_once() {
        let pending = PendingActions::new();
        let user = UserId(2);

        pending.register(user, SensitiveAction::LoanQuery).await;
        assert_eq!(pending.take(user).await, Some(SensitiveAction::LoanQuery));
        assert_eq!(pending.take(user).await, None);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let pending = PendingActions::new();

        pending.register(UserId(1), SensitiveAction::BalanceQuery).await;
        pending.register(UserId(2), SensitiveAction::LoanQuery).await;
        pending.take(UserId(1)).await;

        assert!(!pending.is_pending(UserId(1)).await);
        assert!(pending.is_pending(UserId(2)).await);
    }
}
