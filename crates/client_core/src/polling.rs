use std::future::Future;

use shared::domain::{JobId, JobStatus};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    error::{StudioError, StudioResult},
    GenerationBackend,
};

/// Runs `fut` unless `cancel` fires first.
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = StudioResult<T>>,
) -> StudioResult<T> {
    if cancel.is_cancelled() {
        return Err(StudioError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StudioError::Cancelled),
        result = fut => result,
    }
}

/// Polls the job until it completes, fails, or the attempt budget runs out.
///
/// `on_progress` receives the 1-based attempt number after each non-terminal
/// response. Sleeps use the backend's fixed interval with no backoff.
pub async fn poll_job<B>(
    backend: &B,
    job_id: &JobId,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(u32),
) -> StudioResult<String>
where
    B: GenerationBackend + ?Sized,
{
    let policy = backend.poll_policy();
    let mut polls = 0;

    while polls < policy.max_polls {
        let response = until_cancelled(cancel, backend.job_status(job_id)).await?;
        info!(
            job_id = job_id.as_str(),
            poll = polls + 1,
            status = response.status.as_str(),
            "poll: status"
        );

        if response.status == JobStatus::Completed {
            let url = response
                .result_url()
                .map(str::to_string)
                .ok_or(StudioError::MissingResultUrl)?;
            info!(job_id = job_id.as_str(), result_url = %url, "poll: job completed");
            return Ok(url);
        }

        if response.status.is_failure() {
            let message = response
                .error
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "job processing failed".to_string());
            warn!(job_id = job_id.as_str(), error = %message, "poll: job failed");
            return Err(StudioError::JobFailed(message));
        }

        on_progress(polls + 1);

        until_cancelled(cancel, async {
            tokio::time::sleep(policy.interval).await;
            Ok(())
        })
        .await?;
        polls += 1;
    }

    Err(StudioError::Timeout {
        polls: policy.max_polls,
    })
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
