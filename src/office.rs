// Application shell wiring the cache, sync session and services

use crate::auth::Accounts;
use crate::cache::{CacheError, LocalStore};
use crate::models::{Employee, PayrollSchedule, UserAccount, WalletTransaction};
use crate::payroll::Payroll;
use crate::permissions::{AccessPolicy, RoleAccess};
use crate::roster::Roster;
use crate::sync::SyncSession;
use crate::wallet::Wallet;
use std::path::Path;
use std::sync::Arc;

/// Every state slice, loaded once at startup
#[derive(Debug)]
pub struct OfficeSnapshot {
    pub employees: Vec<Employee>,
    pub users: Vec<UserAccount>,
    pub role_access: RoleAccess,
    pub schedule: PayrollSchedule,
    pub transactions: Vec<WalletTransaction>,
}

pub struct BackOffice {
    session: Arc<SyncSession>,
}

impl BackOffice {
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        let local = Arc::new(LocalStore::new(db_path)?);
        Ok(Self::new(local))
    }

    pub fn new(local: Arc<LocalStore>) -> Self {
        Self {
            session: Arc::new(SyncSession::new(local)),
        }
    }

    /// The persistence session, including the cloud configuration
    /// surface (`set_config` / `clear_config` / `reload_config`)
    pub fn session(&self) -> Arc<SyncSession> {
        Arc::clone(&self.session)
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.session())
    }

    pub fn roster(&self) -> Roster {
        Roster::new(self.session())
    }

    pub fn payroll(&self) -> Payroll {
        Payroll::new(self.session())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.session())
    }

    pub fn wallet(&self) -> Wallet {
        Wallet::new(self.session())
    }

    /// Preload every slice concurrently. Slow or broken cloud sync
    /// degrades to cached data, so startup always completes.
    pub async fn bootstrap(&self) -> OfficeSnapshot {
        let roster = self.roster();
        let accounts = self.accounts();
        let access_policy = self.access_policy();
        let payroll = self.payroll();
        let wallet = self.wallet();
        let (employees, users, role_access, schedule, transactions) = futures::join!(
            roster.list(),
            accounts.list(),
            access_policy.table(),
            payroll.schedule(),
            wallet.transactions(),
        );

        OfficeSnapshot {
            employees,
            users,
            role_access,
            schedule,
            transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessRole, Section, StaffStation};

    fn office() -> BackOffice {
        BackOffice::new(Arc::new(LocalStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn bootstrap_on_a_fresh_install() {
        let office = office();
        let snapshot = office.bootstrap().await;

        assert!(snapshot.employees.is_empty());
        assert_eq!(snapshot.users.len(), 1, "default admin is seeded");
        assert_eq!(
            snapshot.role_access[&AccessRole::Admin].len(),
            Section::all().len()
        );
        assert!(snapshot.schedule.shifts.is_empty());
        assert!(snapshot.transactions.is_empty());
    }

    #[tokio::test]
    async fn services_share_one_session() {
        let office = office();
        let ana = office
            .roster()
            .add("Ana", StaffStation::Chef, 2800, "2026-01-12".parse().unwrap())
            .await;

        // A second service handle sees the write
        let snapshot = office.bootstrap().await;
        assert_eq!(snapshot.employees.len(), 1);
        assert_eq!(snapshot.employees[0].id, ana.id);
    }

    #[tokio::test]
    async fn open_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("office.db");

        {
            let office = BackOffice::open(&path).unwrap();
            office
                .roster()
                .add("Ana", StaffStation::Chef, 2800, "2026-01-12".parse().unwrap())
                .await;
        }

        let office = BackOffice::open(&path).unwrap();
        assert_eq!(office.roster().list().await.len(), 1);
    }
}
