//! Styling for the `shelf` front end
//!
//! Colour is only applied when stdout supports it, so piped output stays
//! plain text.

use owo_colors::{colors::css, OwoColorize};

/// Columns below which long titles and authors are shortened.
const NARROW_COLUMNS: u16 = 80;

fn colour_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// `true` when stdout is a terminal narrower than [`NARROW_COLUMNS`].
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < NARROW_COLUMNS)
}

/// Shortens `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// A book's shelf status, green when it can be borrowed.
pub fn availability(available: bool) -> String {
    if available {
        "available".success()
    } else {
        "borrowed".warning()
    }
}

#[derive(Clone, Copy)]
enum Tone {
    Success,
    Warning,
    Error,
    Dim,
}

fn paint(text: &str, tone: Tone) -> String {
    if !colour_enabled() {
        return text.to_string();
    }
    match tone {
        Tone::Success => text.fg::<css::Green>().to_string(),
        Tone::Warning => text.fg::<css::Orange>().to_string(),
        Tone::Error => text.fg::<css::Red>().to_string(),
        Tone::Dim => text.dimmed().to_string(),
    }
}

/// Message styles used across commands.
pub trait Colorize {
    /// Completed actions.
    fn success(&self) -> String;
    /// Skipped records and refused actions.
    fn warning(&self) -> String;
    /// Failures reported inside the interactive menu.
    fn error(&self) -> String;
    /// Headings and empty-result notes.
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Tone::Success)
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Tone::Warning)
    }

    fn error(&self) -> String {
        paint(self.as_ref(), Tone::Error)
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Tone::Dim)
    }
}
