//! Workflow controller: upload → submit → poll → render, driven by an explicit state.

use std::path::{Path, PathBuf};

use shared::error::ErrorReport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    error::StudioError,
    media::MediaSurface,
    polling::{poll_job, until_cancelled},
    types::SourceFile,
    GenerationBackend,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UiState {
    #[default]
    Idle,
    Uploading,
    Ready,
    Submitting,
    Queued,
    Processing { attempt: u32 },
    Complete,
    Error(ErrorReport),
}

impl UiState {
    pub fn status_label(&self) -> String {
        match self {
            UiState::Idle => "IDLE".to_string(),
            UiState::Uploading => "UPLOADING...".to_string(),
            UiState::Ready => "READY".to_string(),
            UiState::Submitting => "SUBMITTING JOB...".to_string(),
            UiState::Queued => "JOB QUEUED...".to_string(),
            UiState::Processing { attempt } => format!("PROCESSING... ({attempt})"),
            UiState::Complete => "COMPLETE".to_string(),
            UiState::Error(_) => "ERROR".to_string(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UiState::Uploading | UiState::Submitting | UiState::Queued | UiState::Processing { .. }
        )
    }
}

/// Everything a view needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub state: UiState,
    pub status_label: String,
    pub loading: bool,
    pub generate_enabled: bool,
    pub generate_label: String,
    pub preview_url: Option<String>,
    pub surface: MediaSurface,
    pub download_url: Option<String>,
    pub download_enabled: bool,
    pub download_label: String,
    pub notice: Option<String>,
}

pub trait View {
    fn render(&mut self, model: &ViewModel);
}

#[derive(Debug, Clone)]
struct UploadSession {
    url: String,
}

#[derive(Debug, Clone, Default)]
struct Screen {
    state: UiState,
    preview_url: Option<String>,
    surface: MediaSurface,
    download_url: Option<String>,
    downloading: bool,
    notice: Option<String>,
}

impl Screen {
    fn view_model(&self, has_source: bool) -> ViewModel {
        let state = self.state.clone();
        let status_label = state.status_label();
        let busy = state.is_busy();
        let generate_label = if busy {
            status_label.clone()
        } else if state == UiState::Complete {
            "GENERATE AGAIN".to_string()
        } else {
            "PROCESS SUBJECT".to_string()
        };
        let download_label = if self.downloading {
            "Downloading...".to_string()
        } else {
            "Download".to_string()
        };

        ViewModel {
            status_label,
            loading: busy,
            generate_enabled: has_source && !busy,
            generate_label,
            preview_url: self.preview_url.clone(),
            surface: self.surface.clone(),
            download_url: self.download_url.clone(),
            download_enabled: self.download_url.is_some() && !self.downloading,
            download_label,
            notice: self.notice.clone(),
            state,
        }
    }
}

fn render<V: View>(view: &mut V, screen: &Screen, session: &Option<UploadSession>) {
    view.render(&screen.view_model(session.is_some()));
}

pub struct WorkflowController<B, V> {
    backend: B,
    view: V,
    session: Option<UploadSession>,
    cancel: CancellationToken,
    screen: Screen,
}

impl<B: GenerationBackend, V: View> WorkflowController<B, V> {
    pub fn new(backend: B, view: V) -> Self {
        Self {
            backend,
            view,
            session: None,
            cancel: CancellationToken::new(),
            screen: Screen::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn state(&self) -> &UiState {
        &self.screen.state
    }

    /// URL of the current session: the uploaded source, or the result once generated.
    pub fn session_url(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.url.as_str())
    }

    pub fn view_model(&self) -> ViewModel {
        self.screen.view_model(self.session.is_some())
    }

    /// Token of the current session. Cancelling it makes in-flight work stale.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn render(&mut self) {
        render(&mut self.view, &self.screen, &self.session);
    }

    fn transition(&mut self, state: UiState) {
        debug!(status = %state.status_label(), "controller: transition");
        self.screen.state = state;
        self.render();
    }

    fn begin_session(&mut self) -> CancellationToken {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.cancel.clone()
    }

    fn fail(&mut self, err: StudioError, cancel: &CancellationToken) {
        if err.is_cancelled() || cancel.is_cancelled() {
            debug!("controller: dropping result of cancelled session");
            return;
        }
        error!(error = %err, kind = ?err.kind(), "controller: workflow step failed");
        self.screen.surface.reset();
        self.screen.notice = Some(format!("Error: {err}"));
        self.transition(UiState::Error(err.report()));
    }

    /// Uploads `file` and makes it the current session. Returns the public URL.
    pub async fn select_file(&mut self, file: SourceFile) -> Option<String> {
        let cancel = self.begin_session();
        self.session = None;
        self.screen.download_url = None;
        self.screen.notice = None;
        self.screen.surface.loading();
        self.transition(UiState::Uploading);

        match until_cancelled(&cancel, self.backend.upload_file(&file)).await {
            Ok(url) if !cancel.is_cancelled() => {
                info!(source_url = %url, "controller: upload ready");
                self.session = Some(UploadSession { url: url.clone() });
                self.screen.preview_url = Some(url.clone());
                self.screen.surface.reset();
                self.transition(UiState::Ready);
                Some(url)
            }
            Ok(_) => None,
            Err(err) => {
                if !cancel.is_cancelled() {
                    self.screen.preview_url = None;
                }
                self.fail(err, &cancel);
                None
            }
        }
    }

    /// Submits the current session's URL and waits for the result. No session, no request.
    pub async fn generate(&mut self) -> Option<String> {
        let Some(source_url) = self.session_url().map(str::to_string) else {
            debug!("controller: generate ignored without an uploaded source");
            return None;
        };
        let cancel = self.cancel.clone();

        self.screen.notice = None;
        self.screen.surface.loading();
        self.transition(UiState::Submitting);

        match self.run_generation(&source_url, &cancel).await {
            Ok(result_url) if !cancel.is_cancelled() => {
                info!(result_url = %result_url, "controller: generation complete");
                self.session = Some(UploadSession {
                    url: result_url.clone(),
                });
                self.screen.surface.show_result(&result_url);
                self.screen.download_url = Some(result_url.clone());
                self.transition(UiState::Complete);
                Some(result_url)
            }
            Ok(_) => None,
            Err(err) => {
                self.fail(err, &cancel);
                None
            }
        }
    }

    async fn run_generation(
        &mut self,
        source_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, StudioError> {
        let job = until_cancelled(cancel, self.backend.submit_job(source_url)).await?;
        if cancel.is_cancelled() {
            return Err(StudioError::Cancelled);
        }
        self.transition(UiState::Queued);

        let Self {
            backend,
            view,
            session,
            screen,
            ..
        } = self;
        let on_progress = |attempt| {
            if cancel.is_cancelled() {
                return;
            }
            screen.state = UiState::Processing { attempt };
            render(view, screen, session);
        };
        poll_job(&*backend, &job.job_id, cancel, on_progress).await
    }

    /// Clears the session and the result display. In-flight work of the old session is dropped.
    pub fn reset(&mut self) {
        self.begin_session();
        self.session = None;
        self.screen = Screen::default();
        info!("controller: reset");
        self.transition(UiState::Idle);
    }

    /// Downloads the displayed result into `dir`. Returns the saved path.
    pub async fn download(&mut self, dir: impl AsRef<Path>) -> Option<PathBuf> {
        let url = self.screen.download_url.clone()?;
        let cancel = self.cancel.clone();
        self.screen.downloading = true;
        self.screen.notice = None;
        self.render();

        let saved = match until_cancelled(&cancel, self.backend.download(&url)).await {
            Ok(media) => media.save_into(dir.as_ref()).await,
            Err(err) => Err(err),
        };
        self.screen.downloading = false;

        match saved {
            Ok(path) => {
                info!(path = %path.display(), "controller: result saved");
                self.render();
                Some(path)
            }
            Err(err) if err.is_cancelled() || cancel.is_cancelled() => None,
            Err(err) => {
                error!(error = %err, "controller: download failed");
                self.screen.notice = Some(err.to_string());
                self.render();
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
