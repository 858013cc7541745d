use std::sync::Arc;

use tracing::{debug, warn};

use super::{KeyValueStore, StoreError};
use crate::domain::session::SessionUser;

pub const SESSION_USER_KEY: &str = "pestpro_user";

/// Cached signed-in user, backed by an injected store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// An unreadable cached entry counts as signed out.
    pub async fn current_user(&self) -> Result<Option<SessionUser>, StoreError> {
        let Some(raw) = self.store.get(SESSION_USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(error) => {
                warn!(
                    event_name = "session.cache.corrupt",
                    error = %error,
                    "ignoring unreadable cached session user"
                );
                Ok(None)
            }
        }
    }

    pub async fn sign_in(&self, user: &SessionUser) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_string(user).map_err(|error| StoreError::Encode(error.to_string()))?;
        self.store.set(SESSION_USER_KEY, encoded).await?;
        debug!(event_name = "session.signed_in", email = %user.email, "session user cached");
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_USER_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::session::SessionUser;
    use crate::store::session::SESSION_USER_KEY;
    use crate::store::{InMemoryStore, KeyValueStore, SessionStore};

    fn admin() -> SessionUser {
        SessionUser { email: "admin@pestpro.test".to_string(), role: "Admin".to_string() }
    }

    #[tokio::test]
    async fn sign_in_then_sign_out() {
        let session = SessionStore::new(Arc::new(InMemoryStore::default()));
        assert_eq!(session.current_user().await.expect("read"), None);

        session.sign_in(&admin()).await.expect("sign in");
        assert_eq!(session.current_user().await.expect("read"), Some(admin()));

        session.sign_out().await.expect("sign out");
        assert_eq!(session.current_user().await.expect("read"), None);
    }

    #[tokio::test]
    async fn corrupt_cached_user_reads_as_signed_out() {
        let store = Arc::new(InMemoryStore::default());
        store.set(SESSION_USER_KEY, "{not json".to_string()).await.expect("seed");

        let session = SessionStore::new(store);

        assert_eq!(session.current_user().await.expect("read"), None);
    }
}
