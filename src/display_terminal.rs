//! Terminal display built on crossterm.
//!
//! The status region occupies the top rows and is repainted in place with
//! absolute cursor moves; the scrolling region is ordinary terminal flow
//! below it. Raw mode is entered only while a line is being read, so
//! plain printing needs no newline translation and a panic elsewhere
//! leaves the terminal usable.

use crossterm::{
    cursor::{MoveTo, RestorePosition, SavePosition},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use log::debug;
use std::io::{self, BufRead, Stdout, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::display_trait::{DisplayError, GameDisplay, LineEvent};

pub struct TerminalDisplay {
    stdout: Stdout,
    /// Rows reserved for the status region; 0 disables the split.
    top_height: u16,
    /// Status region contents, one entry per drawn row.
    status_lines: Vec<String>,
    /// Partial input retained across a resize.
    input_buffer: String,
    in_raw_mode: bool,
}

impl TerminalDisplay {
    pub fn new(top_height: u16, split: bool) -> Result<Self, DisplayError> {
        let mut stdout = io::stdout();
        let top_height = if split { top_height } else { 0 };
        if top_height > 0 {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, top_height))?;
        }
        debug!("terminal display ready, status rows: {top_height}");
        Ok(TerminalDisplay {
            stdout,
            top_height,
            status_lines: Vec::new(),
            input_buffer: String::new(),
            in_raw_mode: false,
        })
    }

    fn repaint_status(&mut self) -> Result<(), DisplayError> {
        if self.top_height == 0 {
            return Ok(());
        }
        execute!(self.stdout, SavePosition)?;
        for row in 0..self.top_height {
            execute!(self.stdout, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
            if let Some(line) = self.status_lines.get(row as usize) {
                execute!(self.stdout, Print(line))?;
            }
        }
        execute!(self.stdout, RestorePosition)?;
        self.stdout.flush()?;
        Ok(())
    }

    fn enter_raw(&mut self) -> Result<(), DisplayError> {
        if !self.in_raw_mode {
            terminal::enable_raw_mode()?;
            self.in_raw_mode = true;
        }
        Ok(())
    }

    fn leave_raw(&mut self) {
        if self.in_raw_mode {
            let _ = terminal::disable_raw_mode();
            self.in_raw_mode = false;
        }
    }

    /// Blocking line read for piped or redirected stdin.
    fn read_line_standard(&mut self) -> Result<LineEvent, DisplayError> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Ok(LineEvent::Eof);
        }
        Ok(LineEvent::Line(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Event-driven line read with echo. Returns on Enter, end of input,
    /// or a resize (so the caller can repaint and resume; the partial
    /// line stays in the buffer).
    fn read_line_events(&mut self) -> Result<LineEvent, DisplayError> {
        self.enter_raw()?;
        loop {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                        continue;
                    }
                    match key.code {
                        KeyCode::Enter => {
                            self.leave_raw();
                            let line = std::mem::take(&mut self.input_buffer);
                            write!(self.stdout, "\n")?;
                            self.stdout.flush()?;
                            return Ok(LineEvent::Line(line));
                        }
                        KeyCode::Backspace => {
                            if self.input_buffer.pop().is_some() {
                                write!(self.stdout, "\x08 \x08")?;
                                self.stdout.flush()?;
                            }
                        }
                        KeyCode::Char(c)
                            if key.modifiers.contains(KeyModifiers::CONTROL)
                                && (c == 'd' || c == 'c') =>
                        {
                            self.leave_raw();
                            writeln!(self.stdout)?;
                            return Ok(LineEvent::Eof);
                        }
                        KeyCode::Char(c) => {
                            self.input_buffer.push(c);
                            write!(self.stdout, "{c}")?;
                            self.stdout.flush()?;
                        }
                        _ => {}
                    }
                }
                Event::Resize(w, h) => {
                    debug!("terminal resized to {w}x{h}");
                    self.leave_raw();
                    return Ok(LineEvent::Resize);
                }
                _ => {}
            }
        }
    }
}

impl GameDisplay for TerminalDisplay {
    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        write!(self.stdout, "{text}")?;
        self.stdout.flush()?;
        Ok(())
    }

    fn status_print(&mut self, text: &str) -> Result<(), DisplayError> {
        if self.top_height == 0 {
            return self.print(text);
        }
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            match self.status_lines.last_mut() {
                Some(open) => open.push_str(first),
                None => self.status_lines.push(first.to_string()),
            }
        }
        for line in lines {
            self.status_lines.push(line.to_string());
        }
        self.repaint_status()
    }

    fn clear_status(&mut self) -> Result<(), DisplayError> {
        if self.top_height > 0 {
            self.status_lines.clear();
            self.repaint_status()?;
        }
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), DisplayError> {
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, self.top_height))?;
        self.repaint_status()
    }

    fn read_line(&mut self) -> Result<LineEvent, DisplayError> {
        if !atty::is(atty::Stream::Stdin) {
            debug!("input is piped, using standard reads");
            return self.read_line_standard();
        }
        self.read_line_events()
    }

    fn delay(&mut self, seconds: u64) -> Result<(), DisplayError> {
        self.stdout.flush()?;
        thread::sleep(Duration::from_secs(seconds));
        Ok(())
    }

    fn prompt_filename(&mut self, prompt: &str) -> Result<Option<PathBuf>, DisplayError> {
        self.print(prompt)?;
        match self.read_line()? {
            LineEvent::Line(line) if !line.trim().is_empty() => {
                Ok(Some(PathBuf::from(line.trim())))
            }
            _ => Ok(None),
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        self.leave_raw();
    }
}
