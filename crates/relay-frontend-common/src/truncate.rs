//! Platform-aware output truncation.
//!
//! Limits are counted in Unicode scalar values (`chars().count()`), never
//! bytes: platform caps are defined over characters, and byte slicing
//! could split a multi-byte sequence.

use std::fs;
use std::path::{Path, PathBuf};

/// Fixed filename the full output is persisted under. Overwritten on each
/// truncation, so the directory never accumulates files.
pub const FULL_OUTPUT_FILE: &str = "full_output.txt";

/// Maximum message length for a known platform, in characters.
///
/// Unknown platforms get `None`: no limit is applied rather than guessing
/// a wrong one.
#[must_use]
pub fn platform_limit(platform: &str) -> Option<usize> {
    match platform {
        "telegram" => Some(4_096),
        "discord" => Some(2_000),
        "slack" => Some(40_000),
        "whatsapp" => Some(65_536),
        _ => None,
    }
}

/// The outcome of bounding one piece of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedOutput {
    /// The text to send, guaranteed within the platform limit.
    pub text: String,
    /// Whether the original text was cut down.
    pub was_truncated: bool,
    /// Where the full text was written, when truncation happened and the
    /// write succeeded.
    pub saved_path: Option<PathBuf>,
}

impl BoundedOutput {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            was_truncated: false,
            saved_path: None,
        }
    }
}

/// Bound `text` to `platform`'s message limit, persisting the full text.
///
/// If the text fits (or the platform is unknown) it is returned unchanged.
/// Otherwise the full text is written to [`FULL_OUTPUT_FILE`] inside
/// `persist_dir` and a prefix is returned with a notice naming that file,
/// the whole message still within the limit.
///
/// A failed write is not an error: the bounded text is still produced,
/// with `saved_path` unset and a notice that omits the filename.
#[must_use]
pub fn bound_and_persist(text: &str, platform: &str, persist_dir: &Path) -> BoundedOutput {
    let Some(limit) = platform_limit(platform) else {
        return BoundedOutput::unchanged(text);
    };
    bound_to_limit(text, limit, persist_dir)
}

fn bound_to_limit(text: &str, limit: usize, persist_dir: &Path) -> BoundedOutput {
    let total_chars = text.chars().count();
    if total_chars <= limit {
        return BoundedOutput::unchanged(text);
    }

    let path = persist_dir.join(FULL_OUTPUT_FILE);
    let saved_path = match fs::write(&path, text) {
        Ok(()) => Some(path),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to persist full output");
            None
        }
    };

    let notice = if saved_path.is_some() {
        format!("\n\n[output truncated; full text saved to {FULL_OUTPUT_FILE}]")
    } else {
        "\n\n[output truncated]".to_string()
    };
    let keep = limit.saturating_sub(notice.chars().count());
    let prefix: String = text.chars().take(keep).collect();

    // A limit smaller than the notice leaves no room for a prefix; clamp
    // the assembled message so the limit holds unconditionally.
    let mut bounded = format!("{prefix}{notice}");
    if bounded.chars().count() > limit {
        bounded = bounded.chars().take(limit).collect();
    }

    tracing::debug!(
        limit,
        total_chars,
        kept = keep,
        "truncated oversized output"
    );

    BoundedOutput {
        text: bounded,
        was_truncated: true,
        saved_path,
    }
}
