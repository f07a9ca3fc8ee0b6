//! Interactive search loop.
//!
//! ```text
//! Enter your query (or 'exit' to quit): how do lifetimes work
//! <screen cleared>
//! Results:
//! Result 1: ...
//! score: 0.87
//!
//! Press Enter to continue...
//! ```

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::theme::SimpleTheme;
use dialoguer::{BasicHistory, Input};

use super::{SemanticSearcher, format_results};
use crate::es::KnnBackend;
use crate::profiler::Profiler;

pub const QUERY_PROMPT: &str = "Enter your query (or 'exit' to quit)";
pub const PAUSE_PROMPT: &str = "Press Enter to continue...";

/// Source of queries and owner of the screen.
pub trait Terminal {
    /// Next query, or `None` at end of input.
    fn read_query(&mut self) -> Result<Option<String>>;

    /// Wait for the user before moving on.
    fn pause(&mut self) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

/// TTY frontend: line editing with in-session history, screen clearing.
/// The prompt renders as `Enter your query (or 'exit' to quit): `.
pub struct InteractiveTerminal {
    theme: SimpleTheme,
    history: BasicHistory,
}

impl Default for InteractiveTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractiveTerminal {
    pub fn new() -> Self {
        Self {
            theme: SimpleTheme,
            history: BasicHistory::new().max_entries(100).no_duplicates(true),
        }
    }
}

impl Terminal for InteractiveTerminal {
    fn read_query(&mut self) -> Result<Option<String>> {
        let input = Input::<String>::with_theme(&self.theme)
            .with_prompt(QUERY_PROMPT)
            .allow_empty(true)
            .history_with(&mut self.history)
            .interact_text();
        match input {
            Ok(query) => Ok(Some(query)),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn pause(&mut self) -> Result<()> {
        print!("{PAUSE_PROMPT}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }
}

/// Reads one query per line; never clears or pauses. Used for piped input.
pub struct ScriptedTerminal<R> {
    reader: R,
}

impl<R: BufRead> ScriptedTerminal<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Terminal for ScriptedTerminal<R> {
    fn read_query(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counters from one [`run_session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: usize,
    pub failures: usize,
}

fn is_exit(query: &str) -> bool {
    query.trim().eq_ignore_ascii_case("exit")
}

/// Run the query loop until `exit` or end of input.
///
/// A failed search is reported and the loop keeps going.
pub fn run_session<B, T, W>(
    searcher: &mut SemanticSearcher<'_, B>,
    terminal: &mut T,
    out: &mut W,
    top: usize,
    profiler: &Profiler,
) -> Result<SessionStats>
where
    B: KnnBackend + ?Sized,
    T: Terminal + ?Sized,
    W: Write,
{
    tracing::info!(index = searcher.index(), "running search");
    let mut stats = SessionStats::default();

    while let Some(query) = terminal.read_query()? {
        if is_exit(&query) {
            writeln!(out, "Exiting...")?;
            break;
        }
        let query = query.trim();
        if query.is_empty() {
            continue;
        }

        terminal.clear()?;
        stats.queries += 1;

        match profiler.run("perform_search", || searcher.search(query)) {
            Ok(hits) => {
                writeln!(out, "{}", "Results:".bold())?;
                for line in format_results(&hits, top) {
                    writeln!(out, "{line}")?;
                }
                writeln!(out)?;
            }
            Err(e) => {
                stats.failures += 1;
                crate::logging::log_error(&e);
                writeln!(out, "Search failed: {e:#}")?;
                writeln!(out)?;
            }
        }
        out.flush()?;

        terminal.pause()?;
        terminal.clear()?;
    }

    Ok(stats)
}
