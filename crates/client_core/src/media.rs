//! Result media classification and the surface that displays it.

use std::sync::OnceLock;

use regex::Regex;
use shared::domain::MediaKind;

use crate::naming::cache_busted;

fn video_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(mp4|webm)(\?.*)?$").expect("static video regex"))
}

pub fn classify_media(url: &str) -> MediaKind {
    if video_pattern().is_match(url) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoElement {
    pub src: String,
    pub visible: bool,
    pub controls: bool,
    pub autoplay: bool,
    pub looping: bool,
}

impl VideoElement {
    fn new() -> Self {
        Self {
            src: String::new(),
            visible: false,
            controls: true,
            autoplay: true,
            looping: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    pub src: String,
    pub visible: bool,
}

/// Result area: a placeholder, an image element and a lazily created video element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSurface {
    pub placeholder_visible: bool,
    pub image: ImageElement,
    pub video: Option<VideoElement>,
}

impl Default for MediaSurface {
    fn default() -> Self {
        Self {
            placeholder_visible: true,
            image: ImageElement {
                src: String::new(),
                visible: false,
            },
            video: None,
        }
    }
}

impl MediaSurface {
    pub fn show_result(&mut self, url: &str) {
        match classify_media(url) {
            MediaKind::Video => {
                self.image.visible = false;
                let video = self.video.get_or_insert_with(VideoElement::new);
                video.src = url.to_string();
                video.visible = true;
            }
            MediaKind::Image => {
                if let Some(video) = self.video.as_mut() {
                    video.visible = false;
                }
                self.image.visible = true;
                self.image.src = cache_busted(url);
            }
        }
        self.placeholder_visible = false;
    }

    /// Hides placeholder and results while a request is in flight.
    pub fn loading(&mut self) {
        self.placeholder_visible = false;
        self.image.visible = false;
        if let Some(video) = self.video.as_mut() {
            video.visible = false;
        }
    }

    /// Back to the placeholder. An existing video element is kept, hidden.
    pub fn reset(&mut self) {
        self.image.src.clear();
        self.image.visible = false;
        if let Some(video) = self.video.as_mut() {
            video.visible = false;
        }
        self.placeholder_visible = true;
    }

    pub fn visible_media(&self) -> Option<(MediaKind, &str)> {
        if let Some(video) = self.video.as_ref().filter(|video| video.visible) {
            return Some((MediaKind::Video, video.src.as_str()));
        }
        self.image
            .visible
            .then_some((MediaKind::Image, self.image.src.as_str()))
    }
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
