//! Interactive input.
//!
//! A command may prompt several times (password, then verification codes), so
//! one buffered reader is kept for its whole run. Lines already buffered from
//! piped input stay available to the next prompt.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::info;

use super::CommandError;

/// Reads one answer per line from a shared buffered reader.
pub struct Prompt<R> {
    lines: Mutex<Lines<R>>,
}

impl Prompt<BufReader<Stdin>> {
    /// Prompt reading from the process's stdin.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    /// Prompt reading from `reader`.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Read one non-empty line.
    ///
    /// # Errors
    ///
    /// `MissingInput` on a blank line or end of input, `Input` if reading
    /// fails.
    pub async fn read_line(&self, what: &'static str) -> Result<String, CommandError> {
        info!("Enter {what}:");
        let line = self.lines.lock().await.next_line().await?;
        match line {
            Some(line) if !line.trim().is_empty() => Ok(line.trim().to_string()),
            _ => Err(CommandError::MissingInput(what)),
        }
    }
}
