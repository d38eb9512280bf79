//! Line-oriented rendering of session state.
//!
//! Everything here is a pure function of `App` (plus what was already
//! printed), so output can be checked without a terminal.

use completion_provider::{Message, ProviderProfile, Role};

use crate::app::App;
use crate::image::ImageUpload;

pub const HELP_TEXT: &str =
    "Commands: /help, /image <path> (PNG/JPEG design to code), /code (show code pane), /quit";
pub const PROCESSING_TEXT: &str = "Processing...";
pub const CODE_PANE_LABEL: &str = "AI-Generated Code Output:";

fn ansi_wrap(text: &str, prefix: &str, suffix: &str) -> String {
    format!("{prefix}{text}{suffix}")
}

pub fn dim(text: &str) -> String {
    ansi_wrap(text, "\x1b[2m", "\x1b[22m")
}

fn bold(text: &str) -> String {
    ansi_wrap(text, "\x1b[1m", "\x1b[22m")
}

fn cyan(text: &str) -> String {
    ansi_wrap(text, "\x1b[36m", "\x1b[39m")
}

fn green(text: &str) -> String {
    ansi_wrap(text, "\x1b[32m", "\x1b[39m")
}

pub fn yellow(text: &str) -> String {
    ansi_wrap(text, "\x1b[33m", "\x1b[39m")
}

fn red(text: &str) -> String {
    ansi_wrap(text, "\x1b[31m", "\x1b[39m")
}

fn italic(text: &str) -> String {
    ansi_wrap(text, "\x1b[3m", "\x1b[23m")
}

pub fn render_header(profile: &ProviderProfile) -> Vec<String> {
    vec![
        bold("AI Coding Assistant"),
        dim("Powered by a completion relay"),
        render_provider_metadata(profile),
        dim(HELP_TEXT),
    ]
}

fn render_provider_metadata(profile: &ProviderProfile) -> String {
    let provider_id = non_blank_or_unknown(&profile.provider_id);
    let model_id = non_blank_or_unknown(&profile.model_id);

    format!(
        "{} {} {} {} {}",
        dim("provider"),
        cyan(provider_id),
        dim("•"),
        dim("model"),
        cyan(model_id)
    )
}

fn non_blank_or_unknown(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "unknown"
    } else {
        trimmed
    }
}

/// Renders one transcript entry. System messages render as nothing.
pub fn render_message(message: &Message) -> Vec<String> {
    let label = match message.role {
        Role::System => return Vec::new(),
        Role::User => cyan(&bold("User:")),
        Role::Assistant => green(&bold("Assistant:")),
    };

    let mut lines = Vec::new();
    for (index, line) in message.content.split('\n').enumerate() {
        if index == 0 {
            lines.push(format!("{label} {line}"));
        } else {
            lines.push(format!("  {line}"));
        }
    }
    lines
}

pub fn render_code_pane(code: &str) -> Vec<String> {
    let mut lines = vec![bold(CODE_PANE_LABEL)];
    if code.is_empty() {
        lines.push(dim("  (empty)"));
        return lines;
    }

    lines.push(dim("  ```"));
    lines.extend(code.trim_end_matches('\n').split('\n').map(|line| format!("  {line}")));
    lines.push(dim("  ```"));
    lines
}

pub fn render_image_preview(upload: &ImageUpload) -> String {
    format!(
        "{} {} {}",
        dim("Image:"),
        upload.file_name,
        dim(&format!("({}, {} bytes)", upload.mime, upload.size()))
    )
}

pub fn render_image_status(status: &str) -> String {
    if status.starts_with("Error: ") {
        red(status)
    } else {
        italic(status)
    }
}

pub fn render_notice(notice: &str) -> String {
    yellow(notice)
}

/// Tracks what has been printed so only changes are rendered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TranscriptView {
    shown_messages: usize,
    shown_code: String,
    shown_image_status: Option<String>,
    shown_image_selections: u64,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines describing everything that changed in `app` since the last call.
    pub fn updates(&mut self, app: &App) -> Vec<String> {
        let mut lines = Vec::new();

        let messages = app.conversation().messages();
        for message in messages.iter().skip(self.shown_messages) {
            lines.extend(render_message(message));
        }
        self.shown_messages = messages.len();

        if app.image_selections() != self.shown_image_selections {
            if let Some(upload) = app.uploaded_image.as_ref() {
                lines.push(render_image_preview(upload));
            }
            self.shown_image_selections = app.image_selections();
        }

        if app.image_status != self.shown_image_status {
            if let Some(status) = app.image_status.as_deref() {
                lines.push(render_image_status(status));
            }
            self.shown_image_status = app.image_status.clone();
        }

        if app.code != self.shown_code {
            lines.extend(render_code_pane(&app.code));
            self.shown_code = app.code.clone();
        }

        if app.is_busy() {
            lines.push(dim(PROCESSING_TEXT));
        }

        lines
    }
}

pub fn strip_ansi(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == 0x1b && index + 1 < bytes.len() && bytes[index + 1] == b'[' {
            index += 2;
            while index < bytes.len() {
                let byte = bytes[index];
                index += 1;
                if (b'@'..=b'~').contains(&byte) {
                    break;
                }
            }
            continue;
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8(output).unwrap_or_default()
}
