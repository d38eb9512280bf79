//! Fenced code extraction from free-form model output.

use std::sync::OnceLock;

use regex::Regex;

/// How a response without a complete fenced block is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// No block yields an empty code pane.
    Chat,
    /// No block yields the whole response; image answers are often bare markup.
    Image,
}

fn fenced_block_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?s)```(?:[A-Za-z0-9_]*\n)?(.*?)```").expect("fence regex must compile")
    })
}

/// Returns the body of the first fenced code block in `text`, verbatim.
///
/// An optional language tag is accepted only when followed by a newline;
/// otherwise everything after the opening fence is body.
pub fn extract_code(text: &str, mode: ExtractMode) -> String {
    match fenced_block_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
    {
        Some(body) => body.as_str().to_string(),
        None => match mode {
            ExtractMode::Chat => String::new(),
            ExtractMode::Image => text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_block_body_is_returned_without_tag() {
        assert_eq!(
            extract_code("prefix ```js\ncode();\n``` suffix", ExtractMode::Chat),
            "code();\n"
        );
    }

    #[test]
    fn untagged_block_keeps_every_body_line() {
        assert_eq!(
            extract_code("```\nline1\nline2\n```", ExtractMode::Chat),
            "line1\nline2\n"
        );
    }

    #[test]
    fn only_the_first_block_counts() {
        let text = "```rust\nfn a() {}\n```\nthen\n```py\nb()\n```";
        assert_eq!(extract_code(text, ExtractMode::Chat), "fn a() {}\n");
    }

    #[test]
    fn tag_without_newline_stays_in_body() {
        assert_eq!(extract_code("```inline```", ExtractMode::Chat), "inline");
    }

    #[test]
    fn missing_block_differs_by_mode() {
        let text = "<div>no fences here</div>";
        assert_eq!(extract_code(text, ExtractMode::Chat), "");
        assert_eq!(extract_code(text, ExtractMode::Image), text);
    }

    #[test]
    fn unterminated_fence_counts_as_missing() {
        let text = "```html\n<div>";
        assert_eq!(extract_code(text, ExtractMode::Chat), "");
        assert_eq!(extract_code(text, ExtractMode::Image), text);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "a ```css\nbody {}\n``` b";
        assert_eq!(
            extract_code(text, ExtractMode::Image),
            extract_code(text, ExtractMode::Image)
        );
    }
}
