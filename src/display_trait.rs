//! Display abstraction for the interpreter.
//!
//! Two logical regions: a status region redrawn every turn with the room
//! view, and a scrolling region for everything else. Input, the timed
//! pause and the save/restore file prompts also live here so the game
//! logic stays host-independent.

use std::fmt;
use std::path::PathBuf;

/// What a line read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Line(String),
    /// The window changed size mid-read; the caller should redraw the
    /// status region and read again (any partial input is retained).
    Resize,
    /// Input is exhausted; the caller should wind down cleanly.
    Eof,
}

pub trait GameDisplay {
    /// Print to the scrolling region.
    fn print(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Print to the status region. Without a split window this is the
    /// same as `print`.
    fn status_print(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Wipe the status region ahead of a redraw.
    fn clear_status(&mut self) -> Result<(), DisplayError>;

    /// Clear the scrolling region.
    fn clear_screen(&mut self) -> Result<(), DisplayError>;

    /// Read one line of player input.
    fn read_line(&mut self) -> Result<LineEvent, DisplayError>;

    /// Block for roughly `seconds` seconds.
    fn delay(&mut self, seconds: u64) -> Result<(), DisplayError>;

    /// Ask the player for a save/restore file. None means they declined.
    fn prompt_filename(&mut self, prompt: &str) -> Result<Option<PathBuf>, DisplayError>;
}

/// Display error type
#[derive(Debug, Clone)]
pub struct DisplayError {
    pub message: String,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Display error: {}", self.message)
    }
}

impl std::error::Error for DisplayError {}

impl From<std::io::Error> for DisplayError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {error}"))
    }
}
