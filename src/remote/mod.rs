// Cloud state backend client (PostgREST-style single-table API)
//
// The backend exposes one table holding every state slice as a JSON
// blob. The operator provisions it with:
//
//   create table if not exists app_data (
//     key text primary key,
//     value jsonb not null,
//     updated_at timestamptz default now()
//   );
//   alter table app_data enable row level security;
//   create policy "Public Access" on app_data for all using (true) with check (true);

use crate::cache::LocalStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const REST_PATH: &str = "/rest/v1";
const STATE_TABLE: &str = "app_data";

/// Fixed cache key for the backend credential record. Deliberately
/// outside the `app_` slice namespace.
pub const CONFIG_KEY: &str = "cloud_sync_config";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        code: Option<String>,
        message: String,
    },
}

/// What a remote failure means for the sync layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Point select matched no row; a cache miss, not an error
    RowMissing,
    /// The backing table has not been provisioned
    TableMissing,
    /// A privileged/secret key was used where a publishable one is
    /// required
    PrivilegedKey,
    Other,
}

impl RemoteError {
    /// Classify by stable error code where the backend provides one,
    /// falling back to message wording only where no code exists (the
    /// privileged-key case has none).
    pub fn fault(&self) -> Fault {
        match self {
            RemoteError::Api { code, message, .. } => {
                match code.as_deref() {
                    Some("PGRST116") => return Fault::RowMissing,
                    Some("PGRST205") | Some("42P01") => return Fault::TableMissing,
                    _ => {}
                }
                classify_message(message)
            }
            RemoteError::Transport(err) => classify_message(&err.to_string()),
        }
    }
}

fn classify_message(message: &str) -> Fault {
    let msg = message.to_lowercase();
    if msg.contains("service_role")
        || msg.contains("secret api key")
        || msg.contains("legacy api key")
    {
        return Fault::PrivilegedKey;
    }
    if msg.contains("could not find the table")
        || (msg.contains("relation") && msg.contains("does not exist"))
    {
        return Fault::TableMissing;
    }
    Fault::Other
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StateRow {
    value: Value,
}

#[derive(Serialize)]
struct UpsertRow<'a> {
    key: &'a str,
    value: &'a Value,
    updated_at: String,
}

/// Handle to the cloud state backend. Construction is cheap and does
/// not validate reachability; bad credentials surface on first use.
pub struct CloudStore {
    http_client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl CloudStore {
    pub fn new(endpoint_url: &str, access_key: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: endpoint_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self) -> String {
        format!("{}{}/{}", self.base_url, REST_PATH, STATE_TABLE)
    }

    /// Point select by key. A missing row is `Ok(None)`.
    pub async fn fetch(&self, key: &str) -> Result<Option<Value>, RemoteError> {
        let url = format!(
            "{}?select=value&key=eq.{}",
            self.table_url(),
            urlencoding::encode(key)
        );

        let resp = self
            .http_client
            .get(&url)
            .header("apikey", &self.access_key)
            .bearer_auth(&self.access_key)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;

        if resp.status().is_success() {
            let row: StateRow = resp.json().await?;
            return Ok(Some(row.value));
        }

        let err = Self::api_error(resp).await;
        match err.fault() {
            Fault::RowMissing => Ok(None),
            _ => Err(err),
        }
    }

    /// Insert-or-replace the row for `key`. Exactly one row per key.
    pub async fn upsert(&self, key: &str, value: &Value) -> Result<(), RemoteError> {
        let row = UpsertRow {
            key,
            value,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let resp = self
            .http_client
            .post(self.table_url())
            .header("apikey", &self.access_key)
            .bearer_auth(&self.access_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }

        Err(Self::api_error(resp).await)
    }

    async fn api_error(resp: reqwest::Response) -> RemoteError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();

        let (code, message) = match parsed {
            Some(e) => (e.code, e.message.unwrap_or_else(|| body.clone())),
            None => (None, body),
        };

        RemoteError::Api {
            status,
            code,
            message,
        }
    }
}

/// Credential record for the cloud backend, persisted in the local
/// cache under [`CONFIG_KEY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudConfig {
    pub endpoint_url: String,
    pub access_key: String,
    pub is_configured: bool,
}

impl CloudConfig {
    pub fn new(endpoint_url: String, access_key: String) -> Self {
        Self {
            endpoint_url,
            access_key,
            is_configured: true,
        }
    }

    /// A client handle may only be built from a complete record
    pub fn is_usable(&self) -> bool {
        self.is_configured && !self.endpoint_url.is_empty() && !self.access_key.is_empty()
    }

    pub fn load(store: &LocalStore) -> Option<CloudConfig> {
        match store.get(CONFIG_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(config) => Some(config),
                Err(err) => {
                    tracing::warn!("Stored cloud config is unreadable: {}", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Failed to read cloud config: {}", err);
                None
            }
        }
    }

    pub fn store(&self, store: &LocalStore) -> Result<(), crate::cache::CacheError> {
        let raw = serde_json::to_string(self)?;
        store.set(CONFIG_KEY, &raw)
    }

    pub fn clear(store: &LocalStore) -> Result<(), crate::cache::CacheError> {
        store.remove(CONFIG_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_err(code: Option<&str>, message: &str) -> RemoteError {
        RemoteError::Api {
            status: reqwest::StatusCode::BAD_REQUEST,
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn row_miss_code_classifies_benign() {
        let err = api_err(
            Some("PGRST116"),
            "JSON object requested, multiple (or no) rows returned",
        );
        assert_eq!(err.fault(), Fault::RowMissing);
    }

    #[test]
    fn missing_table_codes_are_fatal() {
        for code in ["PGRST205", "42P01"] {
            assert_eq!(
                api_err(Some(code), "whatever").fault(),
                Fault::TableMissing
            );
        }
    }

    #[test]
    fn missing_table_message_fallback() {
        let err = api_err(None, "Could not find the table 'public.app_data' in the schema cache");
        assert_eq!(err.fault(), Fault::TableMissing);

        let err = api_err(None, r#"relation "app_data" does not exist"#);
        assert_eq!(err.fault(), Fault::TableMissing);
    }

    #[test]
    fn privileged_key_message_is_fatal() {
        let err = api_err(
            None,
            "Forbidden use of service_role key in a public context",
        );
        assert_eq!(err.fault(), Fault::PrivilegedKey);

        let err = api_err(None, "Invalid request: Secret API key provided");
        assert_eq!(err.fault(), Fault::PrivilegedKey);
    }

    #[test]
    fn unknown_errors_are_other() {
        assert_eq!(api_err(None, "upstream timeout").fault(), Fault::Other);
        assert_eq!(
            api_err(Some("PGRST999"), "something else").fault(),
            Fault::Other
        );
    }

    #[test]
    fn config_roundtrip_and_clear() {
        let store = LocalStore::in_memory().unwrap();
        assert!(CloudConfig::load(&store).is_none());

        let config = CloudConfig::new("https://x.test".into(), "anon-key-123".into());
        config.store(&store).unwrap();

        let loaded = CloudConfig::load(&store).unwrap();
        assert!(loaded.is_usable());
        assert_eq!(loaded.endpoint_url, "https://x.test");
        assert_eq!(loaded.access_key, "anon-key-123");

        CloudConfig::clear(&store).unwrap();
        assert!(CloudConfig::load(&store).is_none());
    }

    #[test]
    fn incomplete_config_is_not_usable() {
        let mut config = CloudConfig::new("https://x.test".into(), "".into());
        assert!(!config.is_usable());
        config.access_key = "k".into();
        config.is_configured = false;
        assert!(!config.is_usable());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CloudStore::new("https://x.test/", "k");
        assert_eq!(client.endpoint(), "https://x.test");
    }
}
