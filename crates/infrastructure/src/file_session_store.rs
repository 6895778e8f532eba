use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use seva_application::SessionStore;
use seva_core::{AppError, AppResult, SessionIdentity};

/// Session store persisted as a JSON file between CLI runs.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by `path`; the file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AppResult<Option<SessionIdentity>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read session file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&raw).map(Some).map_err(|error| {
            AppError::Internal(format!(
                "session file '{}' is malformed: {error}",
                self.path.display()
            ))
        })
    }

    async fn save(&self, identity: &SessionIdentity) -> AppResult<()> {
        let raw = serde_json::to_string_pretty(identity).map_err(|error| {
            AppError::Internal(format!("failed to serialize session: {error}"))
        })?;
        tokio::fs::write(&self.path, raw).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write session file '{}': {error}",
                self.path.display()
            ))
        })
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to remove session file '{}': {error}",
                self.path.display()
            ))),
        }
    }
}
