//! ---
//! cz_section: "05-console"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "Cancellable line input backends."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::tty::IsTty;

use crate::error::ConsoleError;

/// Something the worker received from its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A completed line, without its terminator.
    Line(String),
    /// The user asked the host to stop (Ctrl-C).
    Interrupt,
    /// No more input will arrive.
    Eof,
}

/// Input backend polled by the console worker.
///
/// `poll_line` must return within roughly `timeout` so the worker can observe
/// a stop request.
pub trait LineSource: Send {
    fn poll_line(&mut self, timeout: Duration) -> io::Result<Option<LineEvent>>;

    /// Show a prompt before the next line.
    fn prompt(&mut self, _prompt: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Reads keystrokes from the controlling terminal.
///
/// The terminal stays in cooked mode: it echoes and edits the line itself and
/// crossterm reports the line feed as `Enter`.
#[derive(Debug, Default)]
pub struct TerminalLineSource {
    line: String,
}

impl TerminalLineSource {
    pub fn open() -> Result<Self, ConsoleError> {
        if !io::stdin().is_tty() {
            return Err(ConsoleError::NoTerminal);
        }
        Ok(Self::default())
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<LineEvent> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.line.clear();
                Some(LineEvent::Interrupt)
            }
            KeyCode::Char('d') if ctrl && self.line.is_empty() => Some(LineEvent::Eof),
            KeyCode::Char(c) => {
                self.line.push(c);
                None
            }
            KeyCode::Backspace => {
                self.line.pop();
                None
            }
            KeyCode::Enter => Some(LineEvent::Line(std::mem::take(&mut self.line))),
            _ => None,
        }
    }
}

impl LineSource for TerminalLineSource {
    fn poll_line(&mut self, timeout: Duration) -> io::Result<Option<LineEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(self.on_key(key)),
            Event::Paste(text) => {
                self.line.push_str(&text);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()
    }
}

/// Line source fed from a channel. Dropping the sender reads as end of input.
#[derive(Debug)]
pub struct ChannelLineSource {
    rx: Receiver<LineEvent>,
    prompts: Option<Sender<String>>,
}

impl ChannelLineSource {
    pub fn new() -> (Sender<LineEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx, prompts: None })
    }

    /// Also report every prompt shown on `prompts`.
    pub fn with_prompts(mut self, prompts: Sender<String>) -> Self {
        self.prompts = Some(prompts);
        self
    }
}

impl LineSource for ChannelLineSource {
    fn poll_line(&mut self, timeout: Duration) -> io::Result<Option<LineEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(Some(LineEvent::Eof)),
        }
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        if let Some(prompts) = &self.prompts {
            let _ = prompts.send(prompt.to_owned());
        }
        Ok(())
    }
}
