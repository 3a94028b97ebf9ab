//! Chooses a display implementation for the current environment.

use log::debug;

use crate::display_headless::HeadlessDisplay;
use crate::display_terminal::TerminalDisplay;
use crate::display_trait::{DisplayError, GameDisplay};
use crate::options::Options;

/// Display mode selection
#[derive(Debug, Clone, Default)]
pub enum DisplayMode {
    /// Probe the environment and pick something sensible.
    #[default]
    Auto,
    /// Force the crossterm terminal display.
    Terminal,
    /// No real output (tests and CI).
    Headless,
}

/// Create a display for the given options and mode. The `DISPLAY_MODE`
/// environment variable overrides the requested mode.
pub fn create_display(options: &Options, mode: DisplayMode) -> Result<Box<dyn GameDisplay>, DisplayError> {
    let mode = match std::env::var("DISPLAY_MODE").as_deref() {
        Ok("headless") => DisplayMode::Headless,
        Ok("terminal") => DisplayMode::Terminal,
        _ => mode,
    };
    debug!("creating display, mode {mode:?}");

    match mode {
        DisplayMode::Headless => Ok(Box::new(HeadlessDisplay::new())),
        DisplayMode::Terminal => Ok(Box::new(TerminalDisplay::new(
            options.top_height(),
            options.split_screen,
        )?)),
        DisplayMode::Auto => {
            // A split status region only makes sense on a real terminal;
            // piped output still goes through the terminal display, just
            // unsplit.
            let interactive = atty::is(atty::Stream::Stdout);
            let split = options.split_screen && interactive;
            if !interactive {
                debug!("stdout is not a terminal, disabling the split window");
            }
            Ok(Box::new(TerminalDisplay::new(options.top_height(), split)?))
        }
    }
}
