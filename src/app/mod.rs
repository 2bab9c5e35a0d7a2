//! Interactive reader session

pub mod command;
pub mod view;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::curriculum::Curriculum;
use crate::reader::Position;
use crate::sync::{ProgressSync, RestoreSource};
use command::{Command, ParseResult, parse_command};

/// Result of handling one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Show this text and keep reading
    Continue(String),
    /// Leave the reader
    Exit,
}

/// The reader application
pub struct App {
    /// Application configuration
    config: Config,

    /// The text being read
    curriculum: Curriculum,

    /// Current reading position
    position: Position,

    /// Whether the English translation is shown
    show_translation: bool,

    /// Progress persistence for this session
    sync: ProgressSync,
}

impl App {
    /// Create a reader, resuming from the stored position
    pub async fn start(config: Config, curriculum: Curriculum, sync: ProgressSync) -> Self {
        let restored = sync.restore(&curriculum).await;
        if restored.source == RestoreSource::Default {
            tracing::debug!("No stored progress, starting at the beginning");
        }

        Self { config, curriculum, position: restored.position, show_translation: true, sync }
    }

    /// Current reading position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Render the section at the current position
    pub fn render_current(&self) -> String {
        view::render_section(
            &self.curriculum,
            self.position,
            self.show_translation,
            self.config.wrap_width,
        )
    }

    /// Move to `next`, scheduling a progress write. `None` if nothing moved.
    fn move_to(&mut self, next: Position) -> Option<String> {
        if next == self.position {
            return None;
        }

        self.position = next;
        self.sync.record_position(next, &self.curriculum);
        Some(self.render_current())
    }

    /// Apply one parsed command
    pub fn handle_command(&mut self, command: Command) -> Outcome {
        let text = match command {
            Command::Next => {
                let next = self.position.advance(&self.curriculum);
                self.move_to(next).unwrap_or_else(|| "Already at the end".to_string())
            }
            Command::Prev => {
                let prev = self.position.retreat(&self.curriculum);
                self.move_to(prev).unwrap_or_else(|| "Already at the beginning".to_string())
            }
            Command::Goto(number) => {
                // Chapter numbers are 1-based; 0 falls through as out of range
                let index = number.checked_sub(1).unwrap_or(usize::MAX);
                match Position::jump_to_chapter(&self.curriculum, index) {
                    Ok(target) => self.move_to(target).unwrap_or_else(|| self.render_current()),
                    Err(e) => {
                        tracing::debug!("Rejected goto {}: {}", number, e);
                        format!(
                            "No chapter {} (chapters 1-{})",
                            number,
                            self.curriculum.chapter_count()
                        )
                    }
                }
            }
            Command::Toc => view::render_toc(&self.curriculum, self.position),
            Command::Status => view::render_status(
                &self.curriculum,
                self.position,
                self.sync.context().display_name(),
            ),
            Command::Translate => {
                self.show_translation = !self.show_translation;
                self.render_current()
            }
            Command::Help => command::help_text().to_string(),
            Command::Quit => return Outcome::Exit,
            Command::Nop => String::new(),
        };
        Outcome::Continue(text)
    }

    /// Parse and apply one line of input
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        match parse_command(line) {
            ParseResult::Ok(command) => self.handle_command(command),
            ParseResult::UnknownCommand(cmd) => {
                Outcome::Continue(format!("Unknown command: {} (try 'help')", cmd))
            }
            ParseResult::MissingArgument(cmd) => {
                Outcome::Continue(format!("'{}' needs an argument", cmd))
            }
            ParseResult::InvalidArgument(arg) => {
                Outcome::Continue(format!("Not a chapter number: {}", arg))
            }
        }
    }

    /// Run the reader loop until `quit` or end of input
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let greeting = format!(
            "{}\n{}\n\n{}\n",
            self.curriculum.book_title,
            view::render_status(&self.curriculum, self.position, self.sync.context().display_name()),
            self.render_current()
        );
        output.write_all(greeting.as_bytes()).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"\n> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match self.handle_line(&line) {
                Outcome::Exit => break,
                Outcome::Continue(text) if text.is_empty() => {}
                Outcome::Continue(text) => {
                    output.write_all(text.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
            }
        }

        output.flush().await?;
        Ok(())
    }

    /// End the session, handing the synchronizer its teardown
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
    }
}
