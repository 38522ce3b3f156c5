//! Helpers for running pipelines in a terminal.

use crate::core::error::ActorError;
use crate::core::message::{Message, Role};
use crate::core::step::Actor;
use regex::Regex;
use std::io::{self, BufRead, Write};
use std::sync::{LazyLock, Mutex, PoisonError};
use unicode_normalization::UnicodeNormalization;

// ANSI escapes first, so a lone ESC does not swallow only half a sequence
static UNSAFE_SEQUENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\[[0-9;]*[a-zA-Z]|[\x00-\x08\x0B-\x1F\x7F]")
        .expect("sanitizer pattern is valid")
});

/// Strips ANSI escape sequences and control characters from model output.
///
/// Tabs and newlines survive; with `remove_newlines`, newlines become spaces.
/// The result is in Unicode normalization form C.
pub fn sanitize_output(input: &str, remove_newlines: bool) -> String {
    let cleaned = UNSAFE_SEQUENCES.replace_all(input, "");
    cleaned
        .chars()
        .filter_map(|c| match c {
            '\n' if remove_newlines => Some(' '),
            '\n' => Some('\n'),
            c if c.is_control() && !c.is_whitespace() => None,
            c => Some(c),
        })
        .nfc()
        .collect()
}

/// Writes the sanitized form of `input` to `writer`.
pub fn write_sanitized<W: Write + ?Sized>(
    writer: &mut W,
    input: &str,
    remove_newlines: bool,
) -> io::Result<()> {
    writer.write_all(sanitize_output(input, remove_newlines).as_bytes())
}

/// An echo callback that prints `prefix` and the message content on one line.
///
/// Write errors are logged and otherwise ignored.
pub fn echoln<W>(writer: W, prefix: impl Into<String>) -> impl Fn(&Message) + Send + Sync + 'static
where
    W: Write + Send + 'static,
{
    let writer = Mutex::new(writer);
    let prefix = prefix.into();
    move |message: &Message| {
        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = write_sanitized(&mut *writer, &prefix, false)
            .and_then(|_| write_sanitized(&mut *writer, &message.content, false))
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        if let Err(err) = result {
            log::error!("echo failed: {}", err);
        }
    }
}

/// A user actor that reads one line from standard input per turn.
pub fn stdin_actor() -> Actor {
    Actor::new(Role::User, |_history, _store| async move {
        match tokio::task::spawn_blocking(read_line).await {
            Ok(line) => line,
            Err(err) => Err(Box::new(err) as ActorError),
        }
    })
}

fn read_line() -> Result<String, ActorError> {
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err("stdin closed".into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
