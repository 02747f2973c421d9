//! Terminal output helpers

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use console::Emoji;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

pub static SUCCESS: Emoji = Emoji("✓ ", "√ ");
pub static INFO: Emoji = Emoji("ℹ ", "i ");
pub static WARN: Emoji = Emoji("⚠ ", "! ");
pub static MAIL: Emoji = Emoji("✉ ", "@ ");

/// Run `future` behind a spinner showing `message`
pub async fn with_spinner<T>(message: &str, future: impl Future<Output = T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Failed to set progress style")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message.to_string());

    let output = future.await;
    spinner.finish_and_clear();
    Ok(output)
}

/// Ask before a destructive action; `force` skips the prompt
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Cut `text` to `width` characters, marking the cut with `…`
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Short local time for an API timestamp, or the raw value
pub fn short_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

/// Horizontal rule
pub fn rule(width: usize) -> String {
    "─".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("much longer text", 8), "much lo…");
        assert_eq!(truncate("ünïcödé text", 5), "ünïc…");
    }

    #[test]
    fn test_short_time_keeps_unparseable_input() {
        assert_eq!(short_time("yesterday"), "yesterday");
        assert!(short_time("2025-01-02T03:04:05+00:00").starts_with("2025-01-0"));
    }

    #[test]
    fn test_forced_confirmation() {
        assert!(confirm("Delete?", true).unwrap());
    }
}
