use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{JobId, JobStatus, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenRequest {
    pub model: String,
    pub tool_type: String,
    pub effect_id: String,
    pub image_url: String,
    pub user_id: UserId,
    pub remove_watermark: bool,
    pub is_private: bool,
}

/// The video branch takes the source as a one-element list and has no tool type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenRequest {
    pub image_url: Vec<String>,
    pub effect_id: String,
    pub user_id: UserId,
    pub remove_watermark: bool,
    pub model: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationRequest {
    Image(ImageGenRequest),
    Video(VideoGenRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    #[serde(default = "default_submitted_status")]
    pub status: JobStatus,
}

fn default_submitted_status() -> JobStatus {
    JobStatus::Queued
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub media_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub video: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
}

impl ResultItem {
    /// First non-empty of `mediaUrl`, `video`, `image`.
    pub fn media_url(&self) -> Option<&str> {
        [&self.media_url, &self.video, &self.image]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Many(Vec<ResultItem>),
    One(ResultItem),
    Unrecognized(Value),
}

impl JobResult {
    pub fn primary(&self) -> Option<&ResultItem> {
        match self {
            JobResult::Many(items) => items.first(),
            JobResult::One(item) => Some(item),
            JobResult::Unrecognized(_) => None,
        }
    }

    pub fn media_url(&self) -> Option<&str> {
        self.primary().and_then(ResultItem::media_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    /// Missing or non-string statuses decode as a non-terminal `Other("")`.
    #[serde(default = "unreported_status", deserialize_with = "lenient_status")]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(
        default,
        deserialize_with = "error_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

fn unreported_status() -> JobStatus {
    JobStatus::Other(String::new())
}

fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JobStatus, D::Error> {
    Ok(string_or_none(deserializer)?
        .map(JobStatus::from)
        .unwrap_or_else(unreported_status))
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

/// Strings pass through; objects yield their `message`, anything else its compact JSON.
fn error_message<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(message) => Some(message),
        Value::Object(fields) => {
            if let Some(Value::String(message)) = fields.get("message") {
                return Ok(Some(message.clone()));
            }
            Some(Value::Object(fields).to_string())
        }
        other => Some(other.to_string()),
    })
}

impl JobStatusResponse {
    pub fn result_url(&self) -> Option<&str> {
        self.result.as_ref().and_then(JobResult::media_url)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
