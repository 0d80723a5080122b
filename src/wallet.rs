// Cash wallet ledger over the wallet_transactions slice

use crate::models::{keys, TransactionKind, WalletTransaction};
use crate::sync::SyncSession;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),
}

pub struct Wallet {
    session: Arc<SyncSession>,
}

impl Wallet {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self { session }
    }

    /// Full ledger, oldest first
    pub async fn transactions(&self) -> Vec<WalletTransaction> {
        self.session.load(keys::WALLET_TRANSACTIONS, Vec::new()).await
    }

    pub async fn record(
        &self,
        kind: TransactionKind,
        amount_cents: i64,
        note: Option<String>,
    ) -> Result<WalletTransaction, WalletError> {
        if amount_cents <= 0 {
            return Err(WalletError::InvalidAmount(amount_cents));
        }

        let mut transactions = self.transactions().await;
        let tx = WalletTransaction::new(kind, amount_cents, note);
        transactions.push(tx.clone());
        self.session.save(keys::WALLET_TRANSACTIONS, &transactions);
        Ok(tx)
    }

    /// Deposits minus withdrawals, in cents. May go negative when the
    /// ledger starts mid-history.
    pub async fn balance_cents(&self) -> i64 {
        self.transactions()
            .await
            .iter()
            .map(|tx| match tx.kind {
                TransactionKind::Deposit => tx.amount_cents,
                TransactionKind::Withdrawal => -tx.amount_cents,
            })
            .sum()
    }
}
