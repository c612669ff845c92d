use std::io;

use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use tracing::warn;

/// What a key press asks the jog loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Increase,
    Decrease,
    Quit,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        match event.code {
            // raw mode swallows SIGINT, so treat Ctrl-C like Esc
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Quit,
            KeyCode::Char('a') => Key::Increase,
            KeyCode::Char('s') => Key::Decrease,
            KeyCode::Esc => Key::Quit,
            _ => Key::Other,
        }
    }
}

#[async_trait(?Send)]
pub trait KeySource {
    /// Waits for a single key press.
    async fn next_key(&mut self) -> io::Result<Key>;
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<RawMode> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!("failed to restore terminal mode: {}", err);
        }
    }
}

/// Key presses from the controlling terminal. Raw mode is only held while a
/// read is pending, so regular output keeps its line discipline.
pub struct TerminalKeys {
    events: EventStream,
}

impl TerminalKeys {
    pub fn new() -> TerminalKeys {
        TerminalKeys {
            events: EventStream::new(),
        }
    }
}

impl Default for TerminalKeys {
    fn default() -> Self {
        TerminalKeys::new()
    }
}

#[async_trait(?Send)]
impl KeySource for TerminalKeys {
    async fn next_key(&mut self) -> io::Result<Key> {
        let _raw_mode = RawMode::enable()?;
        while let Some(event) = self.events.next().await {
            if let Event::Key(key) = event? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Key::from(key));
                }
            }
        }
        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "terminal event stream closed",
        ))
    }
}
