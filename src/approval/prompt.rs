// ABOUTME: Operator prompt for commands that need approval.
// ABOUTME: Reads a single keystroke in raw mode, falling back to line input when raw mode fails.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::config;

/// The response used when nothing usable was read.
pub const DEFAULT_RESPONSE: char = 'n';

/// Something that can ask the operator about a command.
pub trait Prompter: Send + Sync {
    /// Whether an operator can be asked at all.
    fn available(&self) -> bool;

    /// Show the command and return the operator's single-character answer.
    /// Read failures yield [`DEFAULT_RESPONSE`].
    fn ask(&self, command: &str) -> char;
}

/// Prompts on the agent's own terminal.
pub struct TerminalPrompter {
    binary: String,
    // One keyboard: concurrent prompts take turns.
    terminal: Mutex<()>,
}

impl TerminalPrompter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            terminal: Mutex::new(()),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn available(&self) -> bool {
        !config::ci_environment() && io::stdin().is_terminal()
    }

    fn ask(&self, command: &str) -> char {
        let _turn = self
            .terminal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut stdout = io::stdout();
        let _ = write!(
            stdout,
            "\n\u{1f535} Command approval required:\n\n   {} {}\n\n\
             Approve? (y/o)nce, (a)lways, anything else for no: ",
            self.binary, command
        );
        let _ = stdout.flush();

        let response = read_single_char();

        let _ = writeln!(stdout);
        let _ = stdout.flush();
        response
    }
}

/// Raw mode for as long as the guard lives.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Source of terminal events while raw mode is held.
trait KeySource {
    /// Drop everything typed before the prompt appeared.
    fn discard_pending(&mut self) -> io::Result<()>;

    /// Block until the next event arrives.
    fn next_event(&mut self) -> io::Result<Event>;
}

struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn discard_pending(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            event::read()?;
        }
        Ok(())
    }

    fn next_event(&mut self) -> io::Result<Event> {
        event::read()
    }
}

/// Read one keystroke, or one line when raw mode is unavailable.
fn read_single_char() -> char {
    match RawModeGuard::enter() {
        Ok(_guard) => read_key(&mut TerminalKeys),
        Err(_) => {
            print!("(Press Enter after choice) ");
            let _ = io::stdout().flush();
            read_line_char(&mut io::stdin().lock())
        }
    }
}

/// Answer from the next key press. A multi-byte key such as an arrow is a
/// single event, so it answers this prompt only.
fn read_key(keys: &mut impl KeySource) -> char {
    if keys.discard_pending().is_err() {
        return DEFAULT_RESPONSE;
    }
    loop {
        match keys.next_event() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return key_response(key),
            Ok(_) => continue,
            Err(_) => return DEFAULT_RESPONSE,
        }
    }
}

fn key_response(key: KeyEvent) -> char {
    let chorded = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Char(c) if !chorded => c,
        _ => DEFAULT_RESPONSE,
    }
}

/// First non-blank character of the next line; blank lines and errors mean no.
fn read_line_char(reader: &mut impl BufRead) -> char {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(_) => line.trim().chars().next().unwrap_or(DEFAULT_RESPONSE),
        Err(_) => DEFAULT_RESPONSE,
    }
}
