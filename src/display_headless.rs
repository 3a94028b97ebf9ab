//! Headless display for tests and non-interactive environments.
//!
//! Output is collected instead of drawn, input comes from a script, and
//! the save prompt answers with a preset path. A shared transcript handle
//! lets tests inspect everything after the interpreter has consumed the
//! display.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use crate::display_trait::{DisplayError, GameDisplay, LineEvent};

#[derive(Debug, Default)]
pub struct Transcript {
    /// Scrolling region, verbatim.
    pub raw: String,
    /// Status region, one entry per drawn line.
    pub status: Vec<String>,
    pub delays: u64,
}

impl Transcript {
    /// Everything printed to the scrolling region.
    pub fn output(&self) -> &str {
        &self.raw
    }

    pub fn status_output(&self) -> String {
        self.status.join("\n")
    }
}

pub struct HeadlessDisplay {
    transcript: Rc<RefCell<Transcript>>,
    script: VecDeque<String>,
    save_path: Option<PathBuf>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::with_script(&[])
    }

    pub fn with_script(script: &[&str]) -> Self {
        HeadlessDisplay {
            transcript: Rc::new(RefCell::new(Transcript::default())),
            script: script.iter().map(|s| s.to_string()).collect(),
            save_path: None,
        }
    }

    /// Shared handle for inspecting output after the display is moved
    /// into the interpreter.
    pub fn transcript(&self) -> Rc<RefCell<Transcript>> {
        Rc::clone(&self.transcript)
    }

    pub fn set_save_path(&mut self, path: PathBuf) {
        self.save_path = Some(path);
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl GameDisplay for HeadlessDisplay {
    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        self.transcript.borrow_mut().raw.push_str(text);
        Ok(())
    }

    fn status_print(&mut self, text: &str) -> Result<(), DisplayError> {
        let mut t = self.transcript.borrow_mut();
        for line in text.split('\n') {
            t.status.push(line.to_string());
        }
        Ok(())
    }

    fn clear_status(&mut self) -> Result<(), DisplayError> {
        self.transcript.borrow_mut().status.clear();
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), DisplayError> {
        self.transcript.borrow_mut().raw.clear();
        Ok(())
    }

    fn read_line(&mut self) -> Result<LineEvent, DisplayError> {
        match self.script.pop_front() {
            Some(line) => Ok(LineEvent::Line(line)),
            None => Ok(LineEvent::Eof),
        }
    }

    fn delay(&mut self, seconds: u64) -> Result<(), DisplayError> {
        self.transcript.borrow_mut().delays += seconds;
        Ok(())
    }

    fn prompt_filename(&mut self, _prompt: &str) -> Result<Option<PathBuf>, DisplayError> {
        Ok(self.save_path.clone())
    }
}
