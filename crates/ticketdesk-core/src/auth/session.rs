use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Sessions older than this are treated as signed out.
const SESSION_MAX_AGE_DAYS: i64 = 30;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    Staff,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Organizer => "Organizer",
            Role::Staff => "Staff",
            Role::Unknown => "Unknown",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role '{}' (expected admin, organizer or staff)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub organizer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.created_at + Duration::days(SESSION_MAX_AGE_DAYS)
    }

    /// Days remaining until the session lapses (for display)
    pub fn days_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::days(SESSION_MAX_AGE_DAYS);
        (expiry - Utc::now()).num_days().max(0)
    }
}

/// The authentication framework's view of the current session.
///
/// `token()` is an async lookup and callers must await it; the fetch wrapper
/// uses it only when the credential store is empty.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Token of the current session, if one is active
    async fn token(&self) -> Option<String>;

    /// Record a freshly authenticated session
    async fn sign_in(&self, data: SessionData) -> Result<(), SessionError>;

    /// End the current session without navigating anywhere
    async fn sign_out(&self) -> Result<(), SessionError>;
}

/// A provider with no session at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

#[async_trait]
impl SessionProvider for NoSession {
    async fn token(&self) -> Option<String> {
        None
    }

    async fn sign_in(&self, _data: SessionData) -> Result<(), SessionError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Session persisted as JSON in the cache directory.
pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns whether a live session was found.
    pub fn load(&mut self) -> Result<bool, SessionError> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let data: SessionData = serde_json::from_str(&contents)?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
            debug!("Stored session has expired");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<(), SessionError> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if session is valid
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.token.as_str())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

/// `SessionProvider` backed by a `Session` file.
///
/// The file is read lazily on first lookup so constructing the provider never
/// touches the disk.
pub struct FileSessionProvider {
    session: Mutex<Session>,
    loaded: AtomicBool,
}

impl FileSessionProvider {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            session: Mutex::new(Session::new(cache_dir)),
            loaded: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session, if any
    pub async fn current(&self) -> Option<SessionData> {
        let mut session = self.session.lock().await;
        self.ensure_loaded(&mut session);
        session.data.clone().filter(|d| !d.is_expired())
    }

    fn ensure_loaded(&self, session: &mut Session) {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return;
        }
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to load session, starting signed out"),
        }
    }
}

#[async_trait]
impl SessionProvider for FileSessionProvider {
    async fn token(&self) -> Option<String> {
        let mut session = self.session.lock().await;
        self.ensure_loaded(&mut session);
        session.token().map(str::to_string)
    }

    async fn sign_in(&self, data: SessionData) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        self.loaded.store(true, Ordering::SeqCst);
        info!(email = %data.email, role = data.role.display_name(), "Session started");
        session.update(data);
        session.save()
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        self.loaded.store(true, Ordering::SeqCst);
        info!("Session ended");
        session.clear()
    }
}
