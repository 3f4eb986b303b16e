use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use coffee_bar_core::CoreError;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::identity::{IdentityProvider, TokenGrant};

/// Storage key of the persisted token, shared with the browser panel.
pub const TOKEN_STORAGE_KEY: &str = "auth0_token";

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(<redacted>)")
    }
}

/// Process-wide access token. Readers clone the cell freely; only [`Session`]
/// publishes, and every published change is broadcast to subscribers.
#[derive(Clone)]
pub struct AccessTokenCell {
    sender: Arc<watch::Sender<Option<AccessToken>>>,
}

impl AccessTokenCell {
    pub fn new(initial: Option<AccessToken>) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Option<AccessToken> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccessToken>> {
        self.sender.subscribe()
    }

    /// Returns whether the stored token actually changed.
    pub(crate) fn publish(&self, next: Option<AccessToken>) -> bool {
        self.sender.send_if_modified(|slot| {
            if *slot == next {
                return false;
            }
            *slot = next;
            true
        })
    }
}

impl Default for AccessTokenCell {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for AccessTokenCell {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.sender.borrow().is_some() {
            "<present>"
        } else {
            "<absent>"
        };
        formatter
            .debug_struct("AccessTokenCell")
            .field("token", &state)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl StoredToken {
    fn from_grant(grant: TokenGrant, previous_refresh_token: Option<String>) -> Self {
        let expires_at = grant.expires_in.map(|seconds| unix_now().saturating_add(seconds));
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(previous_refresh_token),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| expires_at <= unix_now())
            .unwrap_or(false)
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StoredToken")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<StoredToken>, CoreError>;
    async fn store(&self, key: &str, token: &StoredToken) -> Result<(), CoreError>;
    async fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// Key/value token file, one JSON object per data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, StoredToken>, CoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(CoreError::DependencyUnavailable(format!(
                    "failed to read token file {}: {err}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "token file is corrupt; treating it as empty"
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn write_all(&self, entries: &HashMap<String, StoredToken>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    CoreError::DependencyUnavailable(format!(
                        "failed to create token directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }

        let rendered = serde_json::to_string_pretty(entries).map_err(|err| {
            CoreError::DependencyUnavailable(format!("failed to serialize token file: {err}"))
        })?;
        tokio::fs::write(&self.path, rendered.as_bytes())
            .await
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to write token file {}: {err}",
                    self.path.display()
                ))
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(error) = tokio::fs::set_permissions(&self.path, permissions).await {
                warn!(error = %error, "failed to restrict token file permissions");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self, key: &str) -> Result<Option<StoredToken>, CoreError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn store(&self, key: &str, token: &StoredToken) -> Result<(), CoreError> {
        let mut entries = self.read_all().await?;
        entries.insert(key.to_owned(), token.clone());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(CoreError::DependencyUnavailable(format!(
                    "failed to remove token file {}: {err}",
                    self.path.display()
                ))),
            };
        }
        self.write_all(&entries).await
    }
}

/// Storage that never touches disk; used for tokens supplied from the environment.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<HashMap<String, StoredToken>>,
}

impl MemoryTokenStorage {
    pub fn with_token(key: &str, token: StoredToken) -> Self {
        Self {
            entries: Mutex::new(HashMap::from([(key.to_owned(), token)])),
        }
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self, key: &str) -> Result<Option<StoredToken>, CoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, token: &StoredToken) -> Result<(), CoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), token.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Owns the token lifecycle: the sole writer of the [`AccessTokenCell`].
pub struct Session {
    identity: Arc<dyn IdentityProvider>,
    storage: Arc<dyn TokenStorage>,
    tokens: AccessTokenCell,
    refresh_gate: Mutex<()>,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(identity: Arc<dyn IdentityProvider>, storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            identity,
            storage,
            tokens: AccessTokenCell::default(),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> AccessTokenCell {
        self.tokens.clone()
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Publishes the persisted token, refreshing it first when it has expired.
    /// Returns whether a usable token is now available.
    pub async fn restore(&self) -> Result<bool, CoreError> {
        let Some(stored) = self.storage.load(TOKEN_STORAGE_KEY).await? else {
            self.tokens.publish(None);
            return Ok(false);
        };

        if stored.is_expired() {
            debug!("stored access token expired; refreshing");
            return match self.refresh().await {
                Ok(_) => Ok(true),
                Err(CoreError::Identity(message)) => {
                    info!(reason = %message, "stored session could not be renewed");
                    Ok(false)
                }
                Err(error) => Err(error),
            };
        }

        self.tokens.publish(Some(AccessToken::new(stored.access_token)));
        Ok(true)
    }

    pub fn authorize_url(&self, state: &str) -> Result<String, CoreError> {
        self.identity.authorize_url(state)
    }

    /// Completes the redirect flow with the authorization code.
    pub async fn sign_in(&self, code: &str) -> Result<AccessToken, CoreError> {
        let _guard = self.refresh_gate.lock().await;
        match self.identity.exchange_code(code).await {
            Ok(grant) => self.accept(grant, None).await,
            Err(error) => {
                self.forget().await;
                Err(error)
            }
        }
    }

    /// Renews the access token. Concurrent callers share a single renewal.
    pub async fn refresh(&self) -> Result<AccessToken, CoreError> {
        let mut observed = self.tokens.subscribe();
        let _guard = self.refresh_gate.lock().await;
        if observed.has_changed().unwrap_or(false) {
            if let Some(token) = observed.borrow_and_update().clone() {
                debug!("access token renewed by a concurrent caller");
                return Ok(token);
            }
        }

        let refresh_token = self
            .storage
            .load(TOKEN_STORAGE_KEY)
            .await?
            .and_then(|stored| stored.refresh_token);
        let Some(refresh_token) = refresh_token else {
            self.forget().await;
            return Err(CoreError::Identity(
                "session expired and no refresh token is stored".to_owned(),
            ));
        };

        match self.identity.refresh(&refresh_token).await {
            Ok(grant) => self.accept(grant, Some(refresh_token)).await,
            Err(error) => {
                warn!(error = %error, "access token refresh failed");
                self.forget().await;
                Err(error)
            }
        }
    }

    /// Clears the token everywhere and returns the provider's logout URL.
    pub async fn sign_out(&self) -> Result<String, CoreError> {
        let _guard = self.refresh_gate.lock().await;
        self.storage.remove(TOKEN_STORAGE_KEY).await?;
        self.tokens.publish(None);
        info!("signed out");
        self.identity.logout_url()
    }

    async fn accept(
        &self,
        grant: TokenGrant,
        previous_refresh_token: Option<String>,
    ) -> Result<AccessToken, CoreError> {
        let stored = StoredToken::from_grant(grant, previous_refresh_token);
        let token = AccessToken::new(stored.access_token.clone());
        self.storage.store(TOKEN_STORAGE_KEY, &stored).await?;
        if self.tokens.publish(Some(token.clone())) {
            info!("access token updated");
        }
        Ok(token)
    }

    async fn forget(&self) {
        if let Err(error) = self.storage.remove(TOKEN_STORAGE_KEY).await {
            warn!(error = %error, "failed to remove stored access token");
        }
        self.tokens.publish(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct StubIdentity {
        refresh_calls: AtomicUsize,
        fail_exchange: bool,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        fn authorize_url(&self, state: &str) -> Result<String, CoreError> {
            Ok(format!("https://id.example.com/authorize?state={state}"))
        }

        async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CoreError> {
            if self.fail_exchange {
                return Err(CoreError::DomainNotAllowed);
            }
            Ok(TokenGrant::new(format!("access-{code}"), Some("refresh-1".to_owned()), Some(3600)))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError> {
            let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(TokenGrant::new(format!("access-r{call}-{refresh_token}"), None, Some(3600)))
        }

        fn logout_url(&self) -> Result<String, CoreError> {
            Ok("https://id.example.com/v2/logout".to_owned())
        }
    }

    fn session_with(identity: StubIdentity) -> (Session, Arc<MemoryTokenStorage>) {
        let storage = Arc::new(MemoryTokenStorage::default());
        let session = Session::new(Arc::new(identity), storage.clone());
        (session, storage)
    }

    #[tokio::test]
    async fn sign_in_persists_and_publishes_the_token() {
        let (session, storage) = session_with(StubIdentity::default());
        let mut changes = session.tokens().subscribe();

        let token = session.sign_in("abc").await.expect("sign in");
        assert_eq!(token.expose(), "access-abc");
        assert!(changes.has_changed().expect("sender alive"));
        assert_eq!(session.tokens().current(), Some(token));

        let stored = storage
            .load(TOKEN_STORAGE_KEY)
            .await
            .expect("load")
            .expect("token stored");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn failed_sign_in_removes_any_stored_token() {
        let (session, storage) = session_with(StubIdentity {
            fail_exchange: true,
            ..StubIdentity::default()
        });
        storage
            .store(
                TOKEN_STORAGE_KEY,
                &StoredToken {
                    access_token: "old".to_owned(),
                    refresh_token: None,
                    expires_at: None,
                },
            )
            .await
            .expect("seed");
        session.restore().await.expect("restore");
        assert!(session.tokens().current().is_some());

        let error = session.sign_in("abc").await.expect_err("domain rejected");
        assert_eq!(error, CoreError::DomainNotAllowed);
        assert_eq!(storage.load(TOKEN_STORAGE_KEY).await.expect("load"), None);
        assert_eq!(session.tokens().current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_provider_call() {
        let (session, _storage) = session_with(StubIdentity::default());
        session.sign_in("abc").await.expect("sign in");

        let (first, second) = tokio::join!(session.refresh(), session.refresh());
        let first = first.expect("first refresh");
        let second = second.expect("second refresh");

        assert_eq!(first, second);
        assert_eq!(first.expose(), "access-r1-refresh-1");
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_signs_the_user_out() {
        let storage = Arc::new(MemoryTokenStorage::with_token(
            TOKEN_STORAGE_KEY,
            StoredToken {
                access_token: "static".to_owned(),
                refresh_token: None,
                expires_at: None,
            },
        ));
        let session = Session::new(Arc::new(StubIdentity::default()), storage.clone());
        assert!(session.restore().await.expect("restore"));

        let error = session.refresh().await.expect_err("nothing to refresh with");
        assert!(matches!(error, CoreError::Identity(_)));
        assert_eq!(session.tokens().current(), None);
        assert_eq!(storage.load(TOKEN_STORAGE_KEY).await.expect("load"), None);
    }

    #[tokio::test]
    async fn sign_out_clears_storage_and_returns_logout_url() {
        let (session, storage) = session_with(StubIdentity::default());
        session.sign_in("abc").await.expect("sign in");

        let url = session.sign_out().await.expect("sign out");
        assert_eq!(url, "https://id.example.com/v2/logout");
        assert_eq!(session.tokens().current(), None);
        assert_eq!(storage.load(TOKEN_STORAGE_KEY).await.expect("load"), None);
    }

    #[tokio::test]
    async fn file_storage_keeps_tokens_under_their_key() {
        let dir = std::env::temp_dir().join(format!(
            "coffee-bar-token-{}-{}",
            std::process::id(),
            unix_now()
        ));
        let storage = FileTokenStorage::new(dir.join("token.json"));
        let token = StoredToken {
            access_token: "jwt".to_owned(),
            refresh_token: Some("r".to_owned()),
            expires_at: Some(1),
        };

        storage.store(TOKEN_STORAGE_KEY, &token).await.expect("store");
        let raw = std::fs::read_to_string(storage.path()).expect("token file");
        assert!(raw.contains(TOKEN_STORAGE_KEY));
        assert_eq!(storage.load(TOKEN_STORAGE_KEY).await.expect("load"), Some(token));

        storage.remove(TOKEN_STORAGE_KEY).await.expect("remove");
        assert!(!storage.path().exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn publishing_the_same_token_is_not_a_change() {
        let cell = AccessTokenCell::new(Some(AccessToken::new("a")));
        assert!(!cell.publish(Some(AccessToken::new("a"))));
        assert!(cell.publish(Some(AccessToken::new("b"))));
        assert!(cell.publish(None));
    }
}
