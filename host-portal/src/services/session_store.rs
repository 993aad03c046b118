//! Durable session state for the portal user.
//!
//! The store is the only place the session lives. Readers take cheap
//! snapshots; writes are serialised, persisted first and only then published,
//! so a reader never observes a half-written session. Writing is restricted to
//! this crate: login, logout and the gateway's refresh path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use thiserror::Error;

use crate::models::session::{Role, Session};

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session file I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Where a session is persisted between process runs.
pub trait SessionBackend: Send + Sync {
    fn load(&self) -> Result<Option<Session>, SessionStoreError>;
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;
    fn erase(&self) -> Result<(), SessionStoreError>;
}

/// JSON file backend. Writes go through a temp file and a rename.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_vec_pretty(session)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))
    }

    fn erase(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-process backend, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBackend {
    saved: Mutex<Option<Session>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds `session`, as if persisted by an earlier run.
    pub fn seeded(session: Session) -> Self {
        Self {
            saved: Mutex::new(Some(session)),
        }
    }

    pub fn saved(&self) -> Option<Session> {
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.saved())
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn erase(&self) -> Result<(), SessionStoreError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

pub struct SessionStore {
    current: RwLock<Session>,
    backend: Box<dyn SessionBackend>,
    writer: Mutex<()>,
    /// Bumped whenever the signed-in user changes: sign-in, sign-out or a
    /// session ended by the gateway. Token refreshes keep it.
    generation: AtomicU64,
}

impl SessionStore {
    /// Restore the persisted session. Unreadable or corrupt state is logged
    /// and the user starts signed out.
    pub fn open(backend: impl SessionBackend + 'static) -> Self {
        let session = match backend.load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session state");
                Session::anonymous()
            }
        };

        tracing::debug!(
            authenticated = session.is_authenticated(),
            "Session store opened"
        );

        Self {
            current: RwLock::new(session),
            backend: Box::new(backend),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::open(FileBackend::new(path))
    }

    pub fn in_memory() -> Self {
        Self::open(MemoryBackend::new())
    }

    pub fn snapshot(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_authenticated()
    }

    /// The signed-in role, or `None` when anonymous.
    pub fn current_role(&self) -> Option<Role> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .current_role()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .access_token
            .clone()
    }

    /// Identifies whose session is current. Per-user view state cached
    /// under one generation is stale under any other.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replace the whole session. Persisted before it becomes visible.
    pub(crate) fn set_session(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        role: Option<Role>,
        identity: Option<String>,
    ) -> Result<(), SessionStoreError> {
        let session = Session {
            access_token: Some(access_token),
            refresh_token,
            role,
            identity,
        };

        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.backend.save(&session)?;

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let same_user = current.is_authenticated() && current.identity == session.identity;
        *current = session;
        drop(current);

        if !same_user {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    /// Erase every field. Idempotent. The in-memory session is cleared even
    /// when erasing the durable copy fails.
    pub(crate) fn clear_session(&self) -> Result<(), SessionStoreError> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::take(&mut *self.current.write().unwrap_or_else(|e| e.into_inner()));
        if previous != Session::anonymous() {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.backend.erase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn set_and_clear_session() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert_eq!(store.current_role(), None);

        store
            .set_session(
                "access".into(),
                Some("refresh".into()),
                Some(Role::Host),
                Some("host@example.com".into()),
            )
            .unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.current_role(), Some(Role::Host));

        store.clear_session().unwrap();
        assert_eq!(store.snapshot(), Session::anonymous());

        // second clear is a no-op
        store.clear_session().unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn generation_tracks_user_changes_not_refreshes() {
        let store = SessionStore::in_memory();
        let start = store.generation();

        store
            .set_session("a-1".into(), Some("r".into()), Some(Role::User), Some("a@example.com".into()))
            .unwrap();
        let signed_in = store.generation();
        assert_ne!(signed_in, start);

        // refresh for the same user
        store
            .set_session("a-2".into(), Some("r".into()), Some(Role::User), Some("a@example.com".into()))
            .unwrap();
        assert_eq!(store.generation(), signed_in);

        store.clear_session().unwrap();
        let signed_out = store.generation();
        assert_ne!(signed_out, signed_in);
        store.clear_session().unwrap();
        assert_eq!(store.generation(), signed_out);

        store
            .set_session("b-1".into(), None, Some(Role::Host), Some("b@example.com".into()))
            .unwrap();
        assert_ne!(store.generation(), signed_out);
    }

    #[test]
    fn session_survives_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let store = SessionStore::file(&path);
        store
            .set_session(
                "access".into(),
                Some("refresh".into()),
                Some(Role::Admin),
                Some("admin@example.com".into()),
            )
            .unwrap();
        drop(store);

        let reopened = SessionStore::file(&path);
        let session = reopened.snapshot();
        assert_eq!(session.current_role(), Some(Role::Admin));
        assert_eq!(session.identity(), Some("admin@example.com"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));

        reopened.clear_session().unwrap();
        assert!(!path.exists());
        assert!(!SessionStore::file(&path).is_authenticated());
    }

    #[test]
    fn corrupt_file_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").unwrap();

        let store = SessionStore::file(&path);
        assert!(!store.is_authenticated());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::file(&path);
        store
            .set_session("access".into(), None, None, None)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn readers_never_see_partial_sessions() {
        let store = Arc::new(SessionStore::in_memory());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200 {
                    store
                        .set_session(
                            format!("access-{}", i),
                            Some(format!("refresh-{}", i)),
                            Some(Role::Host),
                            Some("host@example.com".into()),
                        )
                        .unwrap();
                    store.clear_session().unwrap();
                }
            })
        };

        for _ in 0..2000 {
            let session = store.snapshot();
            match (&session.access_token, &session.refresh_token) {
                (Some(access), Some(refresh)) => {
                    assert_eq!(access.trim_start_matches("access-"), refresh.trim_start_matches("refresh-"));
                    assert_eq!(session.role, Some(Role::Host));
                }
                (None, None) => assert_eq!(session, Session::anonymous()),
                _ => panic!("partial session observed: {:?}", session),
            }
        }

        writer.join().unwrap();
    }
}
