//! The try-on session: one garment, one set of options, one result.
//!
//! [`Session`] is the context object every front end drives. It owns the
//! credential gate, the uploaded image, the option selections and the
//! current generation state, and it is the only place a generation request
//! is issued from.

use crate::credential::{KeyGate, LoginOutcome};
use crate::error::{Result, TryOnError};
use crate::image::{GeneratedImage, TryOnProvider, TryOnRequest};
use crate::intake::{ClothingImage, ImageIntake, IntakeSource, PreviewRef};
use crate::options::{Ethnicity, GenerationOptions, OptionGroup, Scene, Vibe};
use crate::presenter::View;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shown when generation is triggered before anything was uploaded.
pub const MISSING_IMAGE_MESSAGE: &str = "Please upload a clothing photo first.";

/// Shown when the remote failed without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while generating. Please try again later.";

/// What the result area currently shows. Exactly one at a time.
#[derive(Debug, Clone, Default)]
pub enum GenerationState {
    /// Nothing requested yet, or the last result was invalidated.
    #[default]
    Empty,
    /// A request is in flight.
    Pending,
    /// The last request produced an image.
    Ready(GeneratedImage),
    /// The last action failed; carries the message to show.
    Failed(String),
}

impl GenerationState {
    /// Returns true while a request is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the generated image, if any.
    pub fn result(&self) -> Option<&GeneratedImage> {
        match self {
            Self::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Returns the failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// How a call to [`Session::generate`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerateOutcome {
    /// The gate is closed; nothing happened.
    Locked,
    /// No image uploaded; a validation message is now shown.
    MissingImage,
    /// Another request is in flight; nothing happened.
    Busy,
    /// A new image is shown.
    Completed,
    /// An error message is shown.
    Failed,
    /// The key was rejected and a new one selected; the user may retry.
    Reauthenticated,
    /// The key was rejected and re-selection failed or was cancelled.
    Abandoned,
    /// The garment was replaced while the request was in flight, so its
    /// result was dropped.
    Superseded,
}

/// Read-only copy of the workspace, for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Current selections.
    pub options: GenerationOptions,
    /// Preview of the uploaded garment.
    pub preview: Option<PreviewRef>,
    /// Result area state.
    pub state: GenerationState,
    /// Whether the generate control is enabled.
    pub can_generate: bool,
}

#[derive(Debug, Default)]
struct Workspace {
    image: Option<ClothingImage>,
    options: GenerationOptions,
    state: GenerationState,
    // Bumped on every upload so an in-flight result for an older garment is dropped.
    epoch: u64,
}

/// A single user's try-on session.
pub struct Session {
    gate: KeyGate,
    provider: Arc<dyn TryOnProvider>,
    intake: ImageIntake,
    workspace: Mutex<Workspace>,
}

impl Session {
    /// Creates a session. Call [`Session::bootstrap`] before use.
    pub fn new(gate: KeyGate, provider: Arc<dyn TryOnProvider>) -> Self {
        Self {
            gate,
            provider,
            intake: ImageIntake::new(),
            workspace: Mutex::new(Workspace::default()),
        }
    }

    /// Probes for an existing credential. Returns whether the gate is open.
    pub async fn bootstrap(&self) -> bool {
        self.gate.probe().await
    }

    /// Runs the interactive key selection.
    pub async fn login(&self) -> LoginOutcome {
        self.gate.request_credential().await
    }

    /// Returns true if the workspace is usable.
    pub fn is_unlocked(&self) -> bool {
        self.gate.credential_present()
    }

    /// Name of the generation backend.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// What the front end should show right now.
    pub fn view(&self) -> View {
        if self.is_unlocked() {
            View::Workspace(self.snapshot())
        } else {
            View::Login
        }
    }

    /// Copies the current workspace.
    pub fn snapshot(&self) -> SessionSnapshot {
        let ws = self.lock();
        SessionSnapshot {
            options: ws.options,
            preview: ws.image.as_ref().map(|i| i.preview.clone()),
            state: ws.state.clone(),
            can_generate: ws.image.is_some() && !ws.state.is_pending(),
        }
    }

    /// Current result area state.
    pub fn state(&self) -> GenerationState {
        self.lock().state.clone()
    }

    /// Current selections.
    pub fn options(&self) -> GenerationOptions {
        self.lock().options
    }

    /// Selects an ethnicity.
    pub fn set_ethnicity(&self, ethnicity: Ethnicity) {
        self.lock().options.set_ethnicity(ethnicity);
    }

    /// Selects a vibe.
    pub fn set_vibe(&self, vibe: Vibe) {
        self.lock().options.set_vibe(vibe);
    }

    /// Selects a scene.
    pub fn set_scene(&self, scene: Scene) {
        self.lock().options.set_scene(scene);
    }

    /// Reads an upload and makes it the current garment.
    ///
    /// A failed read keeps the previous garment and shows the failure.
    pub async fn upload(&self, source: IntakeSource) -> Result<()> {
        if !self.is_unlocked() {
            return Err(TryOnError::Auth("no API key selected".into()));
        }

        match self.intake.accept(source).await {
            Ok(image) => {
                self.on_image_selected(image);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "upload rejected");
                let mut ws = self.lock();
                if !ws.state.is_pending() {
                    ws.state = GenerationState::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Replaces the garment and invalidates any previous result or error.
    pub fn on_image_selected(&self, image: ClothingImage) {
        tracing::info!(format = ?image.format, bytes = image.size_hint(), "garment selected");
        let mut ws = self.lock();
        ws.image = Some(image);
        ws.epoch += 1;
        if !ws.state.is_pending() {
            ws.state = GenerationState::Empty;
        }
    }

    /// Submits the current garment and options.
    ///
    /// At most one request is in flight; calls made meanwhile return
    /// [`GenerateOutcome::Busy`] without touching the remote.
    pub async fn generate(&self) -> GenerateOutcome {
        if !self.is_unlocked() {
            return GenerateOutcome::Locked;
        }

        let (request, epoch) = {
            let mut ws = self.lock();
            if ws.state.is_pending() {
                return GenerateOutcome::Busy;
            }
            let Some(image) = ws.image.clone() else {
                ws.state = GenerationState::Failed(MISSING_IMAGE_MESSAGE.to_string());
                return GenerateOutcome::MissingImage;
            };
            ws.state = GenerationState::Pending;
            (TryOnRequest::new(image, ws.options), ws.epoch)
        };

        tracing::info!(
            provider = self.provider.name(),
            ethnicity = request.options.ethnicity.as_str(),
            vibe = request.options.vibe.as_str(),
            scene = request.options.scene.as_str(),
            "generating try-on image"
        );

        let result = self.provider.generate(&request).await;

        let superseded = self.lock().epoch != epoch;

        // A rejected key is re-selected even when the garment changed meanwhile.
        match result {
            Err(e) if e.is_entity_not_found() && self.gate.has_capability() => {
                tracing::warn!(error = %e, "API key rejected, asking for a new one");
                let outcome = match self.gate.reselect().await {
                    Some(Ok(())) => GenerateOutcome::Reauthenticated,
                    Some(Err(select_err)) => {
                        tracing::info!(error = %select_err, "key re-selection abandoned");
                        GenerateOutcome::Abandoned
                    }
                    None => GenerateOutcome::Abandoned,
                };
                self.finish(GenerationState::Empty);
                outcome
            }
            _ if superseded => {
                tracing::info!("garment replaced during generation, dropping result");
                self.finish(GenerationState::Empty);
                GenerateOutcome::Superseded
            }
            Ok(image) => {
                tracing::info!(bytes = image.size(), "try-on image ready");
                self.finish(GenerationState::Ready(image));
                GenerateOutcome::Completed
            }
            Err(e) => {
                tracing::error!(error = %e, "try-on generation failed");
                let message = e
                    .user_message()
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                self.finish(GenerationState::Failed(message));
                GenerateOutcome::Failed
            }
        }
    }

    fn finish(&self, state: GenerationState) {
        self.lock().state = state;
    }

    fn lock(&self) -> MutexGuard<'_, Workspace> {
        self.workspace.lock().unwrap_or_else(|e| e.into_inner())
    }
}
