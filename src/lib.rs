// Restaurant back-office core - Brigade

pub mod auth;
pub mod cache;
pub mod models;
pub mod office;
pub mod payroll;
pub mod permissions;
pub mod remote;
pub mod roster;
pub mod sync;
pub mod wallet;

pub use cache::LocalStore;
pub use office::{BackOffice, OfficeSnapshot};
pub use sync::SyncSession;

/// Install the process-wide tracing subscriber. Call once at startup;
/// filtering follows `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
