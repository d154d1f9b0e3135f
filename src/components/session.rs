//! Session storage.
//!
//! [`SessionStore`] keeps values in memory and, with the `file` handler,
//! mirrors them into a JSON document after every mutation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::components::filesystem::FileSystem;
use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing has been read from or written to the session yet
    None,
    Active,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionHandler {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub handler: SessionHandler,

    /// Backing file for the `file` handler
    pub session_path: Option<PathBuf>,

    pub session_id: Option<String>,

    #[serde(default)]
    pub auto_start: bool,
}

pub trait Session: Send + Sync {
    fn id(&self) -> String;

    fn status(&self) -> SessionStatus;

    fn get(&self, key: &str) -> Option<Value>;

    fn add(&self, key: &str, value: Value) -> AppResult<()>;

    fn remove(&self, key: &str) -> AppResult<Option<Value>>;

    fn clear(&self) -> AppResult<()>;
}

pub struct SessionStore {
    id: String,
    data: RwLock<Map<String, Value>>,
    status: RwLock<SessionStatus>,
    backing: Option<(PathBuf, Arc<dyn FileSystem>)>,
}

impl SessionStore {
    pub const CLASS: &'static str = "app_kernel::components::SessionStore";

    /// In-memory session.
    pub fn new(config: &SessionConfig) -> Self {
        let status = if config.auto_start {
            SessionStatus::Active
        } else {
            SessionStatus::None
        };

        Self {
            id: config
                .session_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            data: RwLock::new(Map::new()),
            status: RwLock::new(status),
            backing: None,
        }
    }

    /// Builds a session for `config`, loading the backing file when the
    /// `file` handler is selected.
    pub fn open(config: &SessionConfig, files: Arc<dyn FileSystem>) -> AppResult<Self> {
        let mut store = Self::new(config);
        if config.handler == SessionHandler::Memory {
            return Ok(store);
        }

        let path = config.session_path.clone().ok_or_else(|| {
            AppError::Config("file session handler requires session_path".to_string())
        })?;

        if files.exists(&path) {
            let content = files.read_to_string(&path)?;
            if !content.trim().is_empty() {
                let data: Map<String, Value> = serde_json::from_str(&content)
                    .map_err(|e| AppError::Session(format!("corrupt session file: {}", e)))?;
                *store.data.get_mut() = data;
            }
        }

        tracing::debug!(path = %path.display(), "file session opened");
        store.backing = Some((path, files));
        Ok(store)
    }

    fn persist(&self, data: &Map<String, Value>) -> AppResult<()> {
        let Some((path, files)) = &self.backing else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(data)?;
        files
            .write(path, &content)
            .map_err(|e| AppError::Session(e.to_string()))
    }

    fn activate(&self) {
        *self.status.write() = SessionStatus::Active;
    }
}

impl Session for SessionStore {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn status(&self) -> SessionStatus {
        *self.status.read()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    fn add(&self, key: &str, value: Value) -> AppResult<()> {
        let mut data = self.data.write();
        let mut next = data.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *data = next;
        drop(data);

        self.activate();
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<Option<Value>> {
        let mut data = self.data.write();
        if !data.contains_key(key) {
            return Ok(None);
        }

        let mut next = data.clone();
        let removed = next.remove(key);
        self.persist(&next)?;
        *data = next;
        Ok(removed)
    }

    fn clear(&self) -> AppResult<()> {
        let mut data = self.data.write();
        self.persist(&Map::new())?;
        data.clear();
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("id", &self.id)
            .field("keys", &self.data.read().len())
            .field("file_backed", &self.backing.is_some())
            .finish()
    }
}
