//! Input surface state: draft text, image attachments, preset questions and
//! the short-lived "copied" marker.

use crate::errors::ClientError;
use crate::proxy::{strip_data_uri, DEFAULT_IMAGE_MIME_TYPE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use std::time::{Duration, Instant};

pub const PRESET_QUESTIONS: [&str; 4] = [
    "Apa itu React?",
    "Jelaskan TCP/IP secara singkat",
    "Apa perbedaan HTTP dan HTTPS?",
    "Bagaimana cara kerja blockchain?",
];

pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Base64 payload without any data URI header.
    pub data: String,
    pub mime_type: String,
    /// Local reference shown in the chat; never sent to the proxy.
    pub preview: String,
}

impl Attachment {
    pub async fn from_file(path: &Path) -> Result<Attachment, ClientError> {
        let mime_type = mime_for_path(path).ok_or_else(|| {
            ClientError::Attachment(format!("{} is not a supported image", path.display()))
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Attachment(format!("{}: {}", path.display(), e)))?;

        Ok(Attachment {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
            preview: path.display().to_string(),
        })
    }

    pub fn from_data_url(url: &str, preview: &str) -> Attachment {
        let (data, mime) = strip_data_uri(url);
        Attachment {
            data: data.to_string(),
            mime_type: mime.unwrap_or(DEFAULT_IMAGE_MIME_TYPE).to_string(),
            preview: preview.to_string(),
        }
    }
}

/// What a send takes out of the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Submission {
    pub fn previews(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.preview.clone()).collect()
    }
}

#[derive(Debug)]
pub struct Composer {
    draft: String,
    attachments: Vec<Attachment>,
    loading: bool,
    show_presets: bool,
    copied: Option<(usize, Instant)>,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            draft: String::new(),
            attachments: vec![],
            loading: false,
            show_presets: true,
            copied: None,
        }
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && (!self.draft.trim().is_empty() || !self.attachments.is_empty())
    }

    /// Takes the draft (or `preset`, used verbatim) and the attachments,
    /// clearing both. `None` while loading or when there is nothing to send.
    pub fn take_submission(&mut self, preset: Option<&str>) -> Option<Submission> {
        if self.loading {
            return None;
        }

        let text = match preset {
            Some(preset) => preset.to_string(),
            None => self.draft.trim().to_string(),
        };
        if text.is_empty() && self.attachments.is_empty() {
            return None;
        }

        self.draft.clear();
        Some(Submission {
            text,
            attachments: std::mem::take(&mut self.attachments),
        })
    }

    /// Back to a blank composer, as after starting a new chat.
    pub fn reset(&mut self) {
        self.draft.clear();
        self.attachments.clear();
        self.show_presets = true;
    }

    pub fn presets_visible(&self) -> bool {
        self.show_presets
    }

    pub fn hide_presets(&mut self) {
        self.show_presets = false;
    }

    pub fn mark_copied(&mut self, index: usize, now: Instant) {
        self.copied = Some((index, now));
    }

    /// Index of the message copied less than [`COPY_FEEDBACK`] ago.
    pub fn copied_index(&self, now: Instant) -> Option<usize> {
        match self.copied {
            Some((index, at)) if now.saturating_duration_since(at) < COPY_FEEDBACK => Some(index),
            _ => None,
        }
    }
}
