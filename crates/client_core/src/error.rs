use reqwest::StatusCode;
use shared::error::{ErrorKind, ErrorReport};
use thiserror::Error;

pub const MANUAL_SAVE_NOTICE: &str = "Download failed due to access restrictions on the result host. \
Open the result URL and save the media manually.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("failed to {action}: {status}")]
    Http {
        action: &'static str,
        status: StatusCode,
    },
    #[error("{0}")]
    JobFailed(String),
    #[error("job timed out after {polls} polls")]
    Timeout { polls: u32 },
    #[error("no media URL in response")]
    MissingResultUrl,
    #[error("{}", MANUAL_SAVE_NOTICE)]
    DownloadUnavailable,
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StudioResult<T> = std::result::Result<T, StudioError>;

impl StudioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudioError::Http { .. } => ErrorKind::Http,
            StudioError::JobFailed(_) | StudioError::MissingResultUrl => ErrorKind::JobFailed,
            StudioError::Timeout { .. } => ErrorKind::Timeout,
            StudioError::DownloadUnavailable => ErrorKind::Download,
            StudioError::Cancelled => ErrorKind::Cancelled,
            StudioError::Transport(_) => ErrorKind::Transport,
            StudioError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), self.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StudioError::Cancelled)
    }
}

/// Maps a non-success response onto `StudioError::Http`.
pub(crate) fn check_status(
    response: reqwest::Response,
    action: &'static str,
) -> StudioResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StudioError::Http { action, status })
    }
}
