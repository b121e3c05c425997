//! Credential gate for the generation API.
//!
//! The host may or may not offer an interactive way to pick an API key.
//! When it does, the gate asks it whether a key is already selected and
//! can open the selection flow on demand. When it does not, the gate only
//! knows whether a key was provisioned ahead of time.

use crate::error::{Result, TryOnError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Mutex;

/// Shown when a login is requested on a host without interactive key selection.
pub const CREDENTIAL_UNAVAILABLE_MESSAGE: &str = "Interactive key selection is not available \
here. Provide a Gemini API key through GOOGLE_API_KEY (or API_KEY at build time) and start again.";

/// Host-provided interactive credential selection.
#[async_trait]
pub trait CredentialCapability: Send + Sync {
    /// Reports whether a usable key has already been selected.
    async fn has_selected_api_key(&self) -> Result<bool>;

    /// Runs the interactive selection flow. Errors mean the flow failed or
    /// the user cancelled it.
    async fn open_select_key(&self) -> Result<()>;
}

/// Shared slot holding the active API key.
///
/// Cloning yields a handle to the same slot, so a key selected through the
/// gate is seen by the provider on its next call.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl KeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a key.
    pub fn with_key(key: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(key);
        store
    }

    /// Replaces the active key. Blank keys clear the slot.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = (!key.is_empty()).then(|| key.to_string());
    }

    /// Returns the active key, if any.
    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns true if a key is present.
    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Result of a user-initiated login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A key was selected; the workspace is now usable.
    Selected,
    /// The selection flow failed or was cancelled.
    Failed(String),
    /// The host cannot select keys interactively; carries the explanation.
    Unavailable(&'static str),
}

/// Decides whether the rest of the workflow is usable.
pub struct KeyGate {
    capability: Option<Arc<dyn CredentialCapability>>,
    build_credential: bool,
    present: AtomicBool,
}

impl KeyGate {
    /// Creates a closed gate.
    ///
    /// `build_credential` reports whether a key was provisioned ahead of time;
    /// it is only consulted when no capability is available.
    pub fn new(capability: Option<Arc<dyn CredentialCapability>>, build_credential: bool) -> Self {
        Self {
            capability,
            build_credential,
            present: AtomicBool::new(false),
        }
    }

    /// Returns true if an interactive selection flow exists.
    pub fn has_capability(&self) -> bool {
        self.capability.is_some()
    }

    /// Returns the cached probe/login result.
    pub fn credential_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    /// Checks the host for a usable key and caches the answer.
    ///
    /// Never fails: a broken probe leaves the gate closed.
    pub async fn probe(&self) -> bool {
        let present = match &self.capability {
            Some(capability) => match capability.has_selected_api_key().await {
                Ok(selected) => selected,
                Err(e) => {
                    tracing::warn!(error = %e, "credential probe failed");
                    false
                }
            },
            None => self.build_credential,
        };
        tracing::debug!(present, capability = self.has_capability(), "credential probe");
        self.present.store(present, Ordering::SeqCst);
        present
    }

    /// Asks the user to select a key.
    pub async fn request_credential(&self) -> LoginOutcome {
        let Some(capability) = &self.capability else {
            tracing::warn!("login requested without interactive key selection");
            return LoginOutcome::Unavailable(CREDENTIAL_UNAVAILABLE_MESSAGE);
        };

        match capability.open_select_key().await {
            Ok(()) => {
                self.present.store(true, Ordering::SeqCst);
                tracing::info!("API key selected");
                LoginOutcome::Selected
            }
            Err(e) => {
                tracing::error!(error = %e, "login failed");
                LoginOutcome::Failed(e.to_string())
            }
        }
    }

    /// Re-runs key selection after the remote rejected the current key.
    ///
    /// Returns `None` when there is no capability to re-run.
    pub async fn reselect(&self) -> Option<Result<()>> {
        let capability = self.capability.as_ref()?;
        Some(capability.open_select_key().await)
    }
}

/// Terminal key selection: prompts on stderr and reads one line.
///
/// An empty line cancels the flow.
pub struct PromptKeySelector<R> {
    reader: Arc<Mutex<R>>,
    store: KeyStore,
}

impl<R> PromptKeySelector<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Creates a selector that stores the chosen key in `store`.
    pub fn new(reader: R, store: KeyStore) -> Self {
        Self::with_shared_reader(Arc::new(Mutex::new(reader)), store)
    }

    /// Creates a selector over a reader that other code also consumes,
    /// such as a command loop on the same terminal.
    pub fn with_shared_reader(reader: Arc<Mutex<R>>, store: KeyStore) -> Self {
        Self { reader, store }
    }
}

#[async_trait]
impl<R> CredentialCapability for PromptKeySelector<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn has_selected_api_key(&self) -> Result<bool> {
        Ok(self.store.is_set())
    }

    async fn open_select_key(&self) -> Result<()> {
        eprint!("Paste a Gemini API key from a billed Google Cloud project (empty to cancel): ");

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(TryOnError::Cancelled);
        }

        let key = line.trim();
        if key.is_empty() {
            return Err(TryOnError::Cancelled);
        }
        self.store.set(key);
        Ok(())
    }
}
