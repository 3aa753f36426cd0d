//! Interactive editing session.
//!
//! Reads one command per line from stdin while a ticker drives the
//! reconciliation loop at the configured cadence:
//!
//! ```text
//! L <n> <text>   replace line n
//! I <n> <text>   insert before line n
//! D <n>          delete line n
//! S              sync now
//! Q              quit
//! ```

use anyhow::{Context, Result};
use std::fmt::Write as _;
use sync_client::{DocumentStore, FileStore, SyncClient, TcpTransport, Transport};
use sync_core::{DocumentSnapshot, SyncSession};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::EditorConfig;

/// A change to one line of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    /// Replace line `line` with `text`.
    Replace {
        /// 1-indexed line number.
        line: usize,
        /// New content.
        text: String,
    },
    /// Insert `text` before line `line`; one past the end appends.
    Insert {
        /// 1-indexed line number.
        line: usize,
        /// Inserted content.
        text: String,
    },
    /// Delete line `line`.
    Delete {
        /// 1-indexed line number.
        line: usize,
    },
}

impl LineEdit {
    /// Apply the edit to `document`.
    pub fn apply(&self, document: &DocumentSnapshot) -> Result<DocumentSnapshot, CommandError> {
        let (line, edited) = match self {
            Self::Replace { line, text } => (*line, document.with_line_replaced(*line, text.as_str())),
            Self::Insert { line, text } => (*line, document.with_line_inserted(*line, text.as_str())),
            Self::Delete { line } => (*line, document.with_line_removed(*line)),
        };
        edited.ok_or(CommandError::OutOfRange {
            line,
            len: document.len(),
        })
    }
}

/// One editor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// Change the local document.
    Edit(LineEdit),
    /// Run a sync cycle now.
    Sync,
    /// Print the command summary.
    Help,
    /// Leave the editor.
    Quit,
}

/// Command parsing and application errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Blank input.
    #[error("empty command")]
    Empty,

    /// Unrecognised command letter.
    #[error("unknown command '{0}' (H for help)")]
    Unknown(String),

    /// An edit command without a line number.
    #[error("missing line number")]
    MissingLine,

    /// The line number is not a positive integer.
    #[error("invalid line number '{0}'")]
    InvalidLine(String),

    /// The line number does not exist in the document.
    #[error("line {line} is out of range (document has {len} lines)")]
    OutOfRange {
        /// Requested line.
        line: usize,
        /// Current document length.
        len: usize,
    },
}

impl EditCommand {
    /// Parse one input line. Text after the line number is kept verbatim.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim_end_matches(['\r', '\n']).trim_start();
        if input.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        match command.to_ascii_uppercase().as_str() {
            "L" => {
                let (line, text) = parse_line_and_text(rest)?;
                Ok(Self::Edit(LineEdit::Replace { line, text }))
            }
            "I" => {
                let (line, text) = parse_line_and_text(rest)?;
                Ok(Self::Edit(LineEdit::Insert { line, text }))
            }
            "D" => {
                let (line, _) = parse_line_and_text(rest)?;
                Ok(Self::Edit(LineEdit::Delete { line }))
            }
            "S" => Ok(Self::Sync),
            "H" | "?" => Ok(Self::Help),
            "Q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_line_and_text(rest: &str) -> Result<(usize, String), CommandError> {
    let rest = rest.trim_start();
    let (number, text) = rest.split_once(' ').unwrap_or((rest, ""));
    if number.is_empty() {
        return Err(CommandError::MissingLine);
    }
    match number.parse::<usize>() {
        Ok(line) if line > 0 => Ok((line, text.to_string())),
        _ => Err(CommandError::InvalidLine(number.to_string())),
    }
}

/// Numbered listing of `document`.
fn render(document: &DocumentSnapshot) -> String {
    let mut out = format!("--- {} line(s) ---\n", document.len());
    for (index, line) in document.lines().iter().enumerate() {
        let _ = writeln!(out, "{:>4} | {}", index + 1, line);
    }
    out
}

fn print_help() {
    println!("Commands:");
    println!("  L <n> <text>   replace line n");
    println!("  I <n> <text>   insert before line n");
    println!("  D <n>          delete line n");
    println!("  S              sync now");
    println!("  Q              quit");
}

/// Forward stdin lines from a blocking thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn sync<T: Transport>(
    client: &SyncClient<T>,
    session: &mut SyncSession,
    store: &dyn DocumentStore,
) {
    let report = client.run_cycle(session, Some(store)).await;
    if report.document_changed {
        print!("{}", render(session.current()));
    }
    if let Some(failure) = report.failure {
        tracing::debug!(%failure, "sync cycle incomplete");
    }
}

/// Run the edit command.
pub async fn run(config: &EditorConfig) -> Result<()> {
    if let Some(parent) = config.document_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = FileStore::new(&config.document_path);
    let document = store.load().await?;

    let sync_config = config.sync_config();
    let transport = TcpTransport::new(sync_config.source_id.clone(), sync_config.poll_timeout);
    let client = SyncClient::new(sync_config, transport);
    let mut session = SyncSession::new(document);

    println!(
        "Editing {} as {} (relay {})",
        config.document_path.display(),
        config.source_id,
        config.relay_address
    );
    print_help();
    print!("{}", render(session.current()));

    let mut input = spawn_stdin_reader();
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else { break };
                match EditCommand::parse(&line) {
                    Ok(EditCommand::Quit) => break,
                    Ok(EditCommand::Sync) => sync(&client, &mut session, &store).await,
                    Ok(EditCommand::Help) => print_help(),
                    Ok(EditCommand::Edit(edit)) => match edit.apply(session.current()) {
                        Ok(document) => {
                            session.edit(document);
                            print!("{}", render(session.current()));
                        }
                        Err(e) => println!("{e}"),
                    },
                    Err(CommandError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            _ = ticker.tick() => sync(&client, &mut session, &store).await,
        }
    }

    if session.has_unsent_changes() {
        sync(&client, &mut session, &store).await;
    }
    if let Err(e) = store.save(session.current()).await {
        tracing::warn!(error = %e, "failed to save document on exit");
    }
    if let Err(e) = client.disconnect().await {
        tracing::debug!(error = %e, "disconnect failed");
    }
    println!("Saved {}", config.document_path.display());
    Ok(())
}
