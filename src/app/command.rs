//! Command parsing for the reader prompt

/// Parsed reader command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Next section: next, n
    Next,
    /// Previous section: prev, p
    Prev,
    /// Jump to a chapter by its 1-based number: goto <n>
    Goto(usize),
    /// Show the table of contents: toc, t
    Toc,
    /// Show the current position and progress: status, s
    Status,
    /// Toggle the English translation: translate, tr
    Translate,
    /// Show help: help, h, ?
    Help,
    /// Leave the reader: quit, q
    Quit,
    /// Empty input
    Nop,
}

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum ParseResult {
    /// Successfully parsed command
    Ok(Command),
    /// Unknown command
    UnknownCommand(String),
    /// Command needs an argument
    MissingArgument(String),
    /// Argument could not be understood
    InvalidArgument(String),
}

/// Parse one line of reader input
pub fn parse_command(input: &str) -> ParseResult {
    let input = input.trim();

    if input.is_empty() {
        return ParseResult::Ok(Command::Nop);
    }

    let mut parts = input.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().map(|s| s.trim()).unwrap_or("");

    match cmd.to_lowercase().as_str() {
        "next" | "n" => ParseResult::Ok(Command::Next),
        "prev" | "p" | "back" => ParseResult::Ok(Command::Prev),
        "goto" | "g" | "chapter" => {
            if args.is_empty() {
                return ParseResult::MissingArgument("goto".to_string());
            }
            match args.parse::<usize>() {
                Ok(n) if n >= 1 => ParseResult::Ok(Command::Goto(n)),
                _ => ParseResult::InvalidArgument(args.to_string()),
            }
        }
        "toc" | "t" | "contents" => ParseResult::Ok(Command::Toc),
        "status" | "s" => ParseResult::Ok(Command::Status),
        "translate" | "tr" => ParseResult::Ok(Command::Translate),
        "help" | "h" | "?" => ParseResult::Ok(Command::Help),
        "quit" | "q" | "exit" => ParseResult::Ok(Command::Quit),
        _ => ParseResult::UnknownCommand(cmd.to_string()),
    }
}

/// Help text listing every command
pub fn help_text() -> &'static str {
    "Commands:\n  \
     n, next          next section\n  \
     p, prev          previous section\n  \
     g, goto <n>      jump to chapter n\n  \
     t, toc           table of contents\n  \
     s, status        position and progress\n  \
     tr, translate    show or hide the English translation\n  \
     h, help          this help\n  \
     q, quit          leave the reader"
}
