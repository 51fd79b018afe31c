// Session storage backed by SQLite
// Persists tokens and the cached user under a prefixed key namespace

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::models::User;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "user";

/// Default namespace for every stored key
pub const DEFAULT_PREFIX: &str = "event_planner_";

/// Persisted session: both tokens plus the cached profile
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<User>,
}

/// Process-wide token store
///
/// Synchronous key/value storage in a single `storage_kv` table. Share it as
/// `Arc<TokenStore>`; every component that needs session data gets a handle.
pub struct TokenStore {
    conn: Mutex<Connection>,
    prefix: String,
}

impl TokenStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path, prefix: &str) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create storage directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;

        Self::init(conn, prefix)
    }

    /// Store that lives only as long as the process
    pub fn in_memory(prefix: &str) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::init(conn, prefix)
    }

    fn init(conn: Connection, prefix: &str) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .context("Failed to create storage_kv table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        let conn = self.lock();
        conn.query_row(
            "SELECT value FROM storage_kv WHERE key = ?",
            [self.key(key)],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .unwrap_or_else(|e| {
            tracing::warn!(key = %key, error = %e, "Failed to read from storage");
            None
        })
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO storage_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![self.key(key), value],
        )?;
        Ok(())
    }

    // === Tokens ===

    pub fn get_access_token(&self) -> Option<String> {
        self.read_raw(ACCESS_TOKEN_KEY)
    }

    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.write_raw(ACCESS_TOKEN_KEY, token)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.read_raw(REFRESH_TOKEN_KEY)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.write_raw(REFRESH_TOKEN_KEY, token)
    }

    // === Cached user ===

    pub fn get_user(&self) -> Option<User> {
        let raw = self.read_raw(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Cached user is not a valid profile, ignoring");
                None
            }
        }
    }

    pub fn set_user(&self, user: &User) -> Result<()> {
        self.set(USER_KEY, user)
    }

    // === Session ===

    /// Persist a whole session in one transaction
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let user_json = session
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let upsert = "INSERT INTO storage_kv (key, value) VALUES (?1, ?2)
                      ON CONFLICT(key) DO UPDATE SET value = excluded.value";
        tx.execute(upsert, params![self.key(ACCESS_TOKEN_KEY), session.access_token])?;
        tx.execute(upsert, params![self.key(REFRESH_TOKEN_KEY), session.refresh_token])?;
        match user_json {
            Some(json) => {
                tx.execute(upsert, params![self.key(USER_KEY), json])?;
            }
            None => {
                tx.execute(
                    "DELETE FROM storage_kv WHERE key = ?",
                    [self.key(USER_KEY)],
                )?;
            }
        }
        tx.commit()?;

        tracing::debug!("Session saved");
        Ok(())
    }

    /// Load the stored session; both tokens must be present
    pub fn load_session(&self) -> Option<Session> {
        Some(Session {
            access_token: self.get_access_token()?,
            refresh_token: self.get_refresh_token()?,
            user: self.get_user(),
        })
    }

    /// Remove access token, refresh token and cached user in one transaction
    pub fn clear_all(&self) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            tx.execute("DELETE FROM storage_kv WHERE key = ?", [self.key(key)])?;
        }
        tx.commit()?;

        tracing::debug!("Session cleared");
        Ok(())
    }

    // === Generic keyed values ===

    /// Read a value, parsed as JSON when possible and returned raw otherwise
    pub fn get(&self, key: &str) -> Option<Value> {
        let raw = self.read_raw(key)?;
        Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }

    /// Store the JSON encoding of `value`
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.write_raw(key, &json)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM storage_kv WHERE key = ?", [self.key(key)])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn store() -> TokenStore {
        TokenStore::in_memory(DEFAULT_PREFIX).unwrap()
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
            role: None,
            created_at: None,
        }
    }

    #[test]
    fn test_tokens_overwrite() {
        let store = store();
        assert!(store.get_access_token().is_none());

        assert_ok!(store.set_access_token("first"));
        assert_ok!(store.set_access_token("second"));
        assert_eq!(store.get_access_token().as_deref(), Some("second"));

        assert_ok!(store.set_refresh_token("refresh"));
        assert_eq!(store.get_refresh_token().as_deref(), Some("refresh"));
    }

    #[test]
    fn test_clear_all_removes_session() {
        let store = store();
        store
            .save_session(&Session {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                user: Some(user()),
            })
            .unwrap();
        store.set("theme", "dark").unwrap();

        assert_ok!(store.clear_all());

        assert!(store.get_access_token().is_none());
        assert!(store.get_refresh_token().is_none());
        assert!(store.get_user().is_none());
        // Unrelated keys survive a logout
        assert_eq!(store.get("theme"), Some(json!("dark")));
    }

    #[test]
    fn test_get_falls_back_to_raw_string() {
        let store = store();
        store.set_access_token("eyJhbGciOi.not-json").unwrap();
        assert_eq!(
            store.get(ACCESS_TOKEN_KEY),
            Some(Value::String("eyJhbGciOi.not-json".to_string()))
        );
    }

    #[test]
    fn test_generic_set_get_remove() {
        let store = store();
        store.set("filters", &json!({"status": "done"})).unwrap();
        assert_eq!(store.get("filters"), Some(json!({"status": "done"})));

        store.remove("filters").unwrap();
        assert!(store.get("filters").is_none());

        // Removing a missing key is not an error
        assert_ok!(store.remove("filters"));
    }

    #[test]
    fn test_session_round_trip() {
        let store = store();
        assert!(store.load_session().is_none());

        let session = Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            user: Some(user()),
        };
        store.save_session(&session).unwrap();
        assert_eq!(store.load_session(), Some(session));
    }

    #[test]
    fn test_session_requires_both_tokens() {
        let store = store();
        store.set_access_token("a").unwrap();
        assert!(store.load_session().is_none());
    }

    #[test]
    fn test_prefix_isolation() {
        let conn_path = std::env::temp_dir().join(format!(
            "planner-storage-{}.sqlite3",
            uuid::Uuid::new_v4()
        ));
        let a = TokenStore::open(&conn_path, "app_a_").unwrap();
        let b = TokenStore::open(&conn_path, "app_b_").unwrap();

        a.set_access_token("token-a").unwrap();
        assert!(b.get_access_token().is_none());

        b.clear_all().unwrap();
        assert_eq!(a.get_access_token().as_deref(), Some("token-a"));

        drop(a);
        drop(b);
        let _ = std::fs::remove_file(&conn_path);
    }

    #[test]
    fn test_corrupt_cached_user_is_ignored() {
        let store = store();
        store.set(USER_KEY, "not a user").unwrap();
        assert!(store.get_user().is_none());
    }
}
