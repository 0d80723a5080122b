// Shared data types for the back-office

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage slice keys. One key per logical slice of application state.
pub mod keys {
    pub const EMPLOYEES: &str = "employees";
    pub const USERS: &str = "users";
    pub const ROLE_ACCESS: &str = "role_access";
    pub const WALLET_TRANSACTIONS: &str = "wallet_transactions";
    pub const PAYROLL_SCHEDULE: &str = "payroll_schedule";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStation {
    Manager,
    Chef,
    LineCook,
    Server,
    Host,
    Dishwasher,
}

impl StaffStation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStation::Manager => "Manager",
            StaffStation::Chef => "Chef",
            StaffStation::LineCook => "Line cook",
            StaffStation::Server => "Server",
            StaffStation::Host => "Host",
            StaffStation::Dishwasher => "Dishwasher",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub station: StaffStation,
    /// Hourly wage in cents to keep payroll math exact
    pub wage_cents: i64,
    #[serde(default)]
    pub phone: Option<String>,
    pub hired_on: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Employee {
    pub fn new(name: String, station: StaffStation, wage_cents: i64, hired_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            station,
            wage_cents,
            phone: None,
            hired_on,
            active: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRole {
    Admin,
    Employee,
}

impl AccessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRole::Admin => "Admin",
            AccessRole::Employee => "Employee",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    /// SHA-256 digest of the password, hex encoded
    pub password_hash: String,
    pub role: AccessRole,
    /// Optional link to the roster entry this login belongs to
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl UserAccount {
    pub fn new(username: String, password_hash: String, role: AccessRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            role,
            employee_id: None,
            active: true,
        }
    }
}

/// A single scheduled shift. Times are naive wall-clock values; a shift
/// whose end is at or before its start runs past midnight into the next
/// day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub employee_id: String,
    pub day: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub station: StaffStation,
}

impl Shift {
    pub fn new(
        employee_id: String,
        day: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        station: StaffStation,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id,
            day,
            start,
            end,
            station,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayrollSchedule {
    /// Monday of the week this schedule covers
    #[serde(default)]
    pub week_of: Option<NaiveDate>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(kind: TransactionKind, amount_cents: i64, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            amount_cents,
            note,
            at: Utc::now(),
        }
    }
}

/// Back-office sections a role can be granted access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Dashboard,
    Payroll,
    Wallet,
    Users,
    Settings,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Payroll => "Payroll",
            Section::Wallet => "Wallet",
            Section::Users => "Users",
            Section::Settings => "Settings",
        }
    }

    pub fn all() -> [Section; 5] {
        [
            Section::Dashboard,
            Section::Payroll,
            Section::Wallet,
            Section::Users,
            Section::Settings,
        ]
    }
}
