use async_trait::async_trait;
use seva_application::SessionStore;
use seva_core::{AppResult, SessionIdentity};
use tokio::sync::RwLock;

/// Session store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    identity: RwLock<Option<SessionIdentity>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding an identity.
    #[must_use]
    pub fn with_identity(identity: SessionIdentity) -> Self {
        Self {
            identity: RwLock::new(Some(identity)),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> AppResult<Option<SessionIdentity>> {
        Ok(self.identity.read().await.clone())
    }

    async fn save(&self, identity: &SessionIdentity) -> AppResult<()> {
        *self.identity.write().await = Some(identity.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.identity.write().await.take();
        Ok(())
    }
}
