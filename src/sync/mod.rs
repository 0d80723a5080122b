// Persistence facade: local-first reads and writes with debounced
// cloud sync and degrade-to-offline on configuration faults

mod debounce;

pub use debounce::KeyedDebouncer;

use crate::cache::LocalStore;
use crate::remote::{CloudConfig, CloudStore, Fault, RemoteError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "app_";
const FLUSH_DELAY: Duration = Duration::from_millis(1000);

fn namespaced(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// Remove object fields holding the absent marker before a cloud
/// write. The backend's serialization treats an omitted field and an
/// explicit empty marker differently, so absent fields must not cross
/// the wire. Array elements are kept as-is.
fn strip_absent(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_absent(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_absent).collect()),
        other => other,
    }
}

fn note_remote_failure(disabled: &AtomicBool, key: &str, action: &str, err: &RemoteError) {
    match err.fault() {
        Fault::PrivilegedKey => {
            tracing::error!(
                "Cloud {} for '{}' rejected a privileged key where a publishable key is required; sync disabled until restart: {}",
                action, key, err
            );
            disabled.store(true, Ordering::Relaxed);
        }
        Fault::TableMissing => {
            tracing::error!(
                "Cloud {} for '{}' failed, the app_data table is not provisioned; sync disabled until restart: {}",
                action, key, err
            );
            disabled.store(true, Ordering::Relaxed);
        }
        _ => {
            tracing::warn!("Cloud {} for '{}' failed: {}", action, key, err);
        }
    }
}

/// One persistence session per process. Owns the circuit-breaker state
/// and the memoized cloud client, so every piece of sync state is
/// constructed fresh with the session instead of living in globals.
pub struct SyncSession {
    local: Arc<LocalStore>,
    client: Mutex<Option<Arc<CloudStore>>>,
    sync_disabled: Arc<AtomicBool>,
    pending: KeyedDebouncer,
    flush_delay: Duration,
}

impl SyncSession {
    /// Reads the credential record from the local cache once and
    /// memoizes a client handle if the record is complete.
    pub fn new(local: Arc<LocalStore>) -> Self {
        let client = Self::build_client(&local);
        Self {
            local,
            client: Mutex::new(client),
            sync_disabled: Arc::new(AtomicBool::new(false)),
            pending: KeyedDebouncer::new(),
            flush_delay: FLUSH_DELAY,
        }
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    fn build_client(local: &LocalStore) -> Option<Arc<CloudStore>> {
        CloudConfig::load(local)
            .filter(CloudConfig::is_usable)
            .map(|config| Arc::new(CloudStore::new(&config.endpoint_url, &config.access_key)))
    }

    /// Memoized cloud client, or `None` when sync is unconfigured
    pub fn client(&self) -> Option<Arc<CloudStore>> {
        self.client.lock().clone()
    }

    /// Persist new backend credentials and eagerly swap in a client
    /// for them. Reachability is not validated here; a bad endpoint
    /// surfaces on first use.
    pub fn set_config(&self, endpoint_url: &str, access_key: &str) {
        let config = CloudConfig::new(endpoint_url.to_string(), access_key.to_string());
        if let Err(err) = config.store(&self.local) {
            tracing::warn!("Failed to persist cloud config: {}", err);
        }
        *self.client.lock() = Some(Arc::new(CloudStore::new(endpoint_url, access_key)));
    }

    /// Disconnect: drop the credential record and the memoized client
    pub fn clear_config(&self) {
        if let Err(err) = CloudConfig::clear(&self.local) {
            tracing::warn!("Failed to remove cloud config: {}", err);
        }
        *self.client.lock() = None;
    }

    /// Re-read the credential record from the local cache, rebuilding
    /// or dropping the memoized client to match.
    pub fn reload_config(&self) {
        *self.client.lock() = Self::build_client(&self.local);
    }

    /// True once a fatal configuration fault has been classified; only
    /// a restart re-enables cloud sync.
    pub fn cloud_sync_disabled(&self) -> bool {
        self.sync_disabled.load(Ordering::Relaxed)
    }

    pub fn has_pending_write(&self, key: &str) -> bool {
        self.pending.is_pending(key)
    }

    /// Read-through load. Prefers the cloud copy (warming the local
    /// cache with it), falls back to the local cache and then to
    /// `default`. Never fails; remote trouble is logged and classified.
    pub async fn load<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        if self.cloud_sync_disabled() {
            return self.local_or(key, default);
        }

        let client = match self.client() {
            Some(client) => client,
            None => return self.local_or(key, default),
        };

        match client.fetch(key).await {
            Ok(Some(value)) => {
                if let Err(err) = self.local.set(&namespaced(key), &value.to_string()) {
                    tracing::warn!("Local cache write for '{}' failed: {}", key, err);
                }
                match serde_json::from_value(value) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        tracing::warn!("Cloud value for '{}' has an unexpected shape: {}", key, err);
                        default
                    }
                }
            }
            Ok(None) => self.local_or(key, default),
            Err(err) => {
                note_remote_failure(&self.sync_disabled, key, "read", &err);
                self.local_or(key, default)
            }
        }
    }

    /// Write-behind save. The local write happens synchronously before
    /// this returns; the cloud write is debounced per key so rapid
    /// repeated saves collapse into one upsert carrying the latest
    /// value. Fire-and-forget: callers cannot observe the cloud
    /// outcome. Must be called from within a tokio runtime.
    pub fn save<T>(&self, key: &str, value: &T)
    where
        T: Serialize,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Value for '{}' is not serializable: {}", key, err);
                return;
            }
        };
        // An absent value is never persisted
        if value.is_null() {
            return;
        }

        if let Err(err) = self.local.set(&namespaced(key), &value.to_string()) {
            tracing::warn!("Local cache write for '{}' failed: {}", key, err);
        }

        if self.cloud_sync_disabled() {
            return;
        }
        let client = match self.client() {
            Some(client) => client,
            None => return,
        };

        let disabled = Arc::clone(&self.sync_disabled);
        let flush_key = key.to_string();
        self.pending.schedule(key, self.flush_delay, async move {
            // The breaker may have tripped while this write was pending
            if disabled.load(Ordering::Relaxed) {
                return;
            }
            let normalized = strip_absent(value);
            match client.upsert(&flush_key, &normalized).await {
                Ok(()) => tracing::debug!("Synced '{}' to cloud", flush_key),
                Err(err) => note_remote_failure(&disabled, &flush_key, "write", &err),
            }
        });
    }

    fn local_or<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        match self.local.get(&namespaced(key)) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!("Cached value for '{}' is unreadable: {}", key, err);
                    default
                }
            },
            Ok(None) => default,
            Err(err) => {
                tracing::warn!("Local cache read for '{}' failed: {}", key, err);
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> (Arc<LocalStore>, SyncSession) {
        let local = Arc::new(LocalStore::in_memory().unwrap());
        let session = SyncSession::new(Arc::clone(&local));
        (local, session)
    }

    #[test]
    fn strip_absent_removes_null_fields() {
        let value = json!({"name": "Ana", "phone": null});
        assert_eq!(strip_absent(value), json!({"name": "Ana"}));
    }

    #[test]
    fn strip_absent_recurses_into_nested_values() {
        let value = json!({
            "outer": {"keep": 1, "drop": null},
            "list": [{"a": null, "b": 2}]
        });
        assert_eq!(
            strip_absent(value),
            json!({"outer": {"keep": 1}, "list": [{"b": 2}]})
        );
    }

    #[test]
    fn strip_absent_keeps_null_array_elements() {
        let value = json!([1, null, 3]);
        assert_eq!(strip_absent(value), json!([1, null, 3]));
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(namespaced("employees"), "app_employees");
    }

    #[tokio::test]
    async fn load_returns_default_when_nothing_stored() {
        let (_, session) = session();
        let value: Vec<String> = session.load("employees", vec!["seed".to_string()]).await;
        assert_eq!(value, vec!["seed".to_string()]);
    }

    #[tokio::test]
    async fn load_prefers_local_entry_over_default() {
        let (local, session) = session();
        local.set("app_employees", r#"["ana"]"#).unwrap();
        let value: Vec<String> = session.load("employees", Vec::new()).await;
        assert_eq!(value, vec!["ana".to_string()]);
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_through_local_cache() {
        let (_, session) = session();
        session.save("employees", &vec!["ana".to_string()]);
        let value: Vec<String> = session.load("employees", Vec::new()).await;
        assert_eq!(value, vec!["ana".to_string()]);
    }

    #[tokio::test]
    async fn saving_an_absent_value_is_a_no_op() {
        let (local, session) = session();
        session.save("employees", &Option::<Vec<String>>::None);
        assert!(local.get("app_employees").unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_cached_value_falls_back_to_default() {
        let (local, session) = session();
        local.set("app_employees", "not json").unwrap();
        let value: Vec<String> = session.load("employees", Vec::new()).await;
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn config_lifecycle_controls_the_client_handle() {
        let (_, session) = session();
        assert!(session.client().is_none());

        session.set_config("https://x.test", "anon-key-123");
        assert!(session.client().is_some());

        session.clear_config();
        assert!(session.client().is_none());
    }

    #[tokio::test]
    async fn reload_config_picks_up_an_externally_written_record() {
        let (local, session) = session();
        assert!(session.client().is_none());

        CloudConfig::new("https://x.test".into(), "anon-key-123".into())
            .store(&local)
            .unwrap();
        session.reload_config();
        assert!(session.client().is_some());

        CloudConfig::clear(&local).unwrap();
        session.reload_config();
        assert!(session.client().is_none());
    }

    #[tokio::test]
    async fn new_session_builds_client_from_stored_config() {
        let local = Arc::new(LocalStore::in_memory().unwrap());
        CloudConfig::new("https://x.test".into(), "anon-key-123".into())
            .store(&local)
            .unwrap();
        let session = SyncSession::new(local);
        assert!(session.client().is_some());
    }

    #[tokio::test]
    async fn incomplete_config_yields_no_client() {
        let local = Arc::new(LocalStore::in_memory().unwrap());
        CloudConfig::new("https://x.test".into(), String::new())
            .store(&local)
            .unwrap();
        let session = SyncSession::new(local);
        assert!(session.client().is_none());
    }

    #[tokio::test]
    async fn save_without_client_schedules_no_flush() {
        let (_, session) = session();
        session.save("employees", &vec!["ana".to_string()]);
        assert!(!session.has_pending_write("employees"));
    }
}
