use log::{debug, error, warn};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;
use crate::errors::{DbError, DomainError, DomainResult};

/// Lifecycle of one transactional unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionState {
    InProgress,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::RolledBack)
    }
}

/// Scoped transaction guard.
///
/// Every write of a multi-step operation goes through `tx()`. `finish` commits
/// on success and rolls back on failure. If the scope is dropped while still in
/// progress (early return, `?`, panic) the underlying sqlx transaction is rolled
/// back on drop, so no partial write is ever committed.
pub struct TransactionScope {
    id: Uuid,
    label: &'static str,
    state: TransactionState,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .finish()
    }
}

impl TransactionScope {
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> DomainResult<Self> {
        let id = Uuid::new_v4();
        let tx = pool.begin().await.map_err(|e| {
            error!("[tx {}] failed to begin {}: {}", id, label, e);
            DbError::Transaction(format!("Failed to begin transaction for {}: {}", label, e))
        })?;
        debug!("[tx {}] begin {}", id, label);

        Ok(Self {
            id,
            label,
            state: TransactionState::InProgress,
            tx: Some(tx),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Borrow the open transaction for repository `_with_tx` calls
    pub fn tx(&mut self) -> DomainResult<&mut Transaction<'static, Sqlite>> {
        self.tx.as_mut().ok_or_else(|| {
            DomainError::Internal(format!("Transaction {} for {} is already finished", self.id, self.label))
        })
    }

    pub async fn commit(mut self) -> DomainResult<()> {
        let tx = self.take()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                debug!("[tx {}] committed {}", self.id, self.label);
                Ok(())
            }
            Err(e) => {
                // A failed commit leaves nothing applied
                self.state = TransactionState::RolledBack;
                error!("[tx {}] commit failed for {}: {}", self.id, self.label, e);
                Err(DbError::Transaction(format!("Commit failed for {}: {}", self.label, e)).into())
            }
        }
    }

    pub async fn rollback(mut self) -> DomainResult<()> {
        let tx = self.take()?;
        self.state = TransactionState::RolledBack;
        debug!("[tx {}] rolling back {}", self.id, self.label);
        tx.rollback()
            .await
            .map_err(|e| DbError::Transaction(format!("Rollback failed for {}: {}", self.label, e)).into())
    }

    /// Commit when `result` is Ok, roll back when it is Err. The original error is returned untouched.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DomainError> + std::fmt::Display,
    {
        match result {
            Ok(value) => {
                self.commit().await.map_err(E::from)?;
                Ok(value)
            }
            Err(err) => {
                let id = self.id;
                let label = self.label;
                warn!("[tx {}] {} failed, rolling back: {}", id, label, err);
                if let Err(rollback_err) = self.rollback().await {
                    // Dropping the connection still discards the writes
                    error!("[tx {}] explicit rollback of {} failed: {}", id, label, rollback_err);
                }
                Err(err)
            }
        }
    }

    fn take(&mut self) -> DomainResult<Transaction<'static, Sqlite>> {
        self.tx.take().ok_or_else(|| {
            DomainError::Internal(format!("Transaction {} for {} is already finished", self.id, self.label))
        })
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.state == TransactionState::InProgress && self.tx.is_some() {
            warn!("[tx {}] {} dropped without commit; changes are rolled back", self.id, self.label);
            self.state = TransactionState::RolledBack;
        }
    }
}
