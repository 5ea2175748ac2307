use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;

use crate::{
    error::StudioResult,
    naming::{download_extension, download_file_name},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: Bytes::from(bytes),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> StudioResult<Self> {
        let path = path.as_ref();
        let bytes = Bytes::from(tokio::fs::read(path).await?);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Declared content type, else a guess from the file name.
    pub fn resolved_content_type(&self) -> String {
        self.content_type
            .clone()
            .or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_raw()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_polls: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub file_name: String,
}

impl DownloadedMedia {
    pub fn new(source_url: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let extension = download_extension(source_url, content_type);
        let file_name = download_file_name(&extension);
        Self {
            bytes,
            extension,
            file_name,
        }
    }

    pub async fn save_into(&self, dir: impl AsRef<Path>) -> StudioResult<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}
