use client_core::{View, ViewModel};
use shared::domain::MediaKind;

/// Prints state changes and notices as they happen.
#[derive(Default)]
pub struct TerminalView {
    last_label: Option<String>,
    last_notice: Option<String>,
    last_media: Option<String>,
}

impl View for TerminalView {
    fn render(&mut self, model: &ViewModel) {
        if self.last_label.as_deref() != Some(model.status_label.as_str()) {
            println!("[{}]", model.status_label);
            self.last_label = Some(model.status_label.clone());
        }

        if model.notice != self.last_notice {
            if let Some(notice) = &model.notice {
                eprintln!("{notice}");
            }
            self.last_notice = model.notice.clone();
        }

        let media = model.surface.visible_media();
        if media.map(|(_, src)| src) != self.last_media.as_deref() {
            if let Some((kind, src)) = media {
                let kind = match kind {
                    MediaKind::Image => "image",
                    MediaKind::Video => "video",
                };
                println!("result {kind}: {src}");
            }
            self.last_media = media.map(|(_, src)| src.to_string());
        }
    }
}
