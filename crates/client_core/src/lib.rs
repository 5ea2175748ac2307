use async_trait::async_trait;
use reqwest::{header, Client};
use shared::{
    domain::{EffectMode, JobId},
    protocol::{
        GenerationRequest, ImageGenRequest, JobStatusResponse, SubmitJobResponse, VideoGenRequest,
    },
};
use tracing::{info, warn};

pub mod config;
pub mod controller;
pub mod error;
pub mod media;
pub mod naming;
pub mod polling;
pub mod types;

pub use config::{load_settings, Settings};
pub use controller::{UiState, View, ViewModel, WorkflowController};
pub use error::{StudioError, StudioResult};
pub use polling::{poll_job, until_cancelled};
pub use types::{DownloadedMedia, PollPolicy, SourceFile};

use error::check_status;

const ACCEPT_ANY: &str = "application/json, text/plain, */*";

/// Remote generation service as seen by the workflow controller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Stores the file and returns its public read URL.
    async fn upload_file(&self, file: &SourceFile) -> StudioResult<String>;
    async fn submit_job(&self, source_url: &str) -> StudioResult<SubmitJobResponse>;
    async fn job_status(&self, job_id: &JobId) -> StudioResult<JobStatusResponse>;
    async fn download(&self, url: &str) -> StudioResult<DownloadedMedia>;
    fn poll_policy(&self) -> PollPolicy;
}

pub struct StudioClient {
    http: Client,
    settings: Settings,
}

impl StudioClient {
    pub fn new(settings: Settings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn generation_url(&self) -> String {
        format!(
            "{}/{}",
            self.settings.api_base_url,
            self.settings.mode.endpoint()
        )
    }

    pub fn generation_request(&self, source_url: &str) -> GenerationRequest {
        let settings = &self.settings;
        match settings.mode {
            EffectMode::Image => GenerationRequest::Image(ImageGenRequest {
                model: settings.model.clone(),
                tool_type: settings.tool_type.clone(),
                effect_id: settings.effect_id.clone(),
                image_url: source_url.to_string(),
                user_id: settings.user_id.clone(),
                remove_watermark: settings.remove_watermark,
                is_private: settings.is_private,
            }),
            EffectMode::Video => GenerationRequest::Video(VideoGenRequest {
                image_url: vec![source_url.to_string()],
                effect_id: settings.effect_id.clone(),
                user_id: settings.user_id.clone(),
                remove_watermark: settings.remove_watermark,
                model: settings.model.clone(),
                is_private: settings.is_private,
            }),
        }
    }

    async fn signed_upload_url(&self, file_name: &str) -> StudioResult<String> {
        let response = self
            .http
            .get(format!("{}/get-emd-upload-url", self.settings.api_base_url))
            .query(&[("fileName", file_name)])
            .send()
            .await?;
        let signed_url = check_status(response, "get signed URL")?.text().await?;
        Ok(signed_url.trim().to_string())
    }

    async fn fetch_media(
        &self,
        request: reqwest::RequestBuilder,
        source_url: &str,
        action: &'static str,
    ) -> StudioResult<DownloadedMedia> {
        let response = check_status(request.send().await?, action)?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok(DownloadedMedia::new(
            source_url,
            content_type.as_deref(),
            bytes.to_vec(),
        ))
    }
}

#[async_trait]
impl GenerationBackend for StudioClient {
    async fn upload_file(&self, file: &SourceFile) -> StudioResult<String> {
        let file_name = naming::upload_file_name(&file.file_name);
        let signed_url = self.signed_upload_url(&file_name).await?;
        info!(file_name = %file_name, "upload: received signed url");

        let response = self
            .http
            .put(&signed_url)
            .header(header::CONTENT_TYPE, file.resolved_content_type())
            .body(file.bytes.clone())
            .send()
            .await?;
        check_status(response, "upload file")?;

        let public_url = format!("{}/{file_name}", self.settings.content_base_url);
        info!(public_url = %public_url, bytes = file.bytes.len(), "upload: stored");
        Ok(public_url)
    }

    async fn submit_job(&self, source_url: &str) -> StudioResult<SubmitJobResponse> {
        let response = self
            .http
            .post(self.generation_url())
            .header(header::ACCEPT, ACCEPT_ANY)
            .json(&self.generation_request(source_url))
            .send()
            .await?;
        let submitted: SubmitJobResponse = check_status(response, "submit job")?.json().await?;
        info!(
            job_id = submitted.job_id.as_str(),
            status = submitted.status.as_str(),
            "submit: job accepted"
        );
        Ok(submitted)
    }

    async fn job_status(&self, job_id: &JobId) -> StudioResult<JobStatusResponse> {
        let response = self
            .http
            .get(format!(
                "{}/{}/{}/status",
                self.generation_url(),
                self.settings.user_id,
                job_id
            ))
            .header(header::ACCEPT, ACCEPT_ANY)
            .send()
            .await?;
        Ok(check_status(response, "check status")?.json().await?)
    }

    async fn download(&self, url: &str) -> StudioResult<DownloadedMedia> {
        let proxy = self
            .http
            .get(format!("{}/download-proxy", self.settings.api_base_url))
            .query(&[("url", url)]);
        let proxy_err = match self.fetch_media(proxy, url, "download via proxy").await {
            Ok(media) => return Ok(media),
            Err(err) => err,
        };
        warn!(error = %proxy_err, "download: proxy failed, trying direct fetch");

        let direct = self.http.get(naming::cache_busted(url));
        match self.fetch_media(direct, url, "download directly").await {
            Ok(media) => Ok(media),
            Err(err) => {
                warn!(error = %err, "download: direct fetch failed");
                Err(StudioError::DownloadUnavailable)
            }
        }
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.settings.poll_interval(),
            max_polls: self.settings.max_polls,
        }
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
mod fakes;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
