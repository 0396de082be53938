//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use mythos_core::{Error, Result, RetrievedFragment};
use mythos_rag::{ArtifactManifest, BuildReport};

const PROMPT: &str = "mythos>";

/// Number of characters of each fragment shown when listing sources
pub const PREVIEW_CHARS: usize = 300;

/// Words that end the interactive session
pub const QUIT_TOKENS: [&str; 2] = ["exit", "quit"];

/// Whether `input` asks to leave the chat loop
pub fn is_quit(input: &str) -> bool {
    let lower = input.trim().to_lowercase();
    QUIT_TOKENS.contains(&lower.as_str())
}

/// Display startup banner
pub fn display_banner(manifest: &ArtifactManifest) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "mythos - ask your document corpus";
    println!(
        "{}{}{}",
        "│  ".blue(),
        title.blue().bold(),
        format!("{}│", " ".repeat(banner_width.saturating_sub(title.len() + 4))).blue()
    );
    println!("{}", empty_line.blue());

    let info_lines = vec![
        format!("Fragments: {}", manifest.count),
        format!("Embedding model: {}", manifest.embedding_model),
        format!("Metric: {} (dimension {})", manifest.metric, manifest.dimension),
        format!("Built: {}", manifest.created_at.format("%Y-%m-%d %H:%M UTC")),
    ];

    for line in info_lines {
        let padding = banner_width.saturating_sub(line.chars().count() + 4);
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: Ask a question in plain language, 'help' for commands, 'exit' to quit".dimmed()
    );
    println!();
}

/// Handle input with history navigation
pub fn handle_input_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    // Piped input: read a plain line, None at end of input
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_raw_line(history);
    disable_raw_mode()?;
    println!();
    result
}

fn redraw(input: &str) -> Result<()> {
    print!("\r\x1b[2K{} {}", PROMPT.green().bold(), input);
    io::stdout().flush()?;
    Ok(())
}

fn read_raw_line(history: &mut Vec<String>) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Enter => {
                let line = input.trim().to_string();
                if !line.is_empty() {
                    history.push(line.clone());
                }
                return Ok(Some(line));
            }
            KeyCode::Char('c') | KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Ok(None);
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            KeyCode::Up => {
                if !history.is_empty() {
                    let new_index = match history_index {
                        None => history.len() - 1,
                        Some(idx) if idx > 0 => idx - 1,
                        Some(idx) => idx,
                    };
                    history_index = Some(new_index);
                    input = history[new_index].clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            KeyCode::Esc => {
                input.clear();
                history_index = None;
                redraw(&input)?;
            }
            _ => {}
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the indexed documents", "<question>".green());
    println!("  {} - Toggle printing of retrieved fragments", "sources".green());
    println!("  {} - Show index statistics", "stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  Who won the battle of Marathon?");
    println!("  What role did the Oracle of Delphi play in Greek politics?");
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{} ...", head)
    } else {
        head
    }
}

/// Render ranked fragments the way the `search` command prints them
pub fn format_sources(sources: &[RetrievedFragment]) -> String {
    let mut out = String::new();
    for (rank, source) in sources.iter().enumerate() {
        out.push_str(&format!(
            "[{}] Distance: {:.4} (fragment {})\n{}\n\n",
            rank + 1,
            source.distance,
            source.fragment.index,
            preview(&source.fragment.text, PREVIEW_CHARS)
        ));
    }
    out
}

pub fn print_sources(sources: &[RetrievedFragment]) {
    if sources.is_empty() {
        println!("{}", "No fragments retrieved (the index is empty).".yellow());
        return;
    }
    println!("{}", format!("--- Top {} retrieved fragments ---", sources.len()).bold());
    print!("{}", format_sources(sources));
}

pub fn print_answer(answer: &str) {
    println!();
    println!("{}", "--- Answer ---".bold().green());
    println!("{}", answer);
}

pub fn print_build_report(report: &BuildReport, location: &str) {
    println!(
        "{} Indexed {} of {} fragments from {} documents",
        "✅".green(),
        report.indexed,
        report.fragments,
        report.documents
    );
    if !report.failures.is_empty() {
        println!(
            "{} {} fragments were skipped:",
            "⚠️".yellow(),
            report.failures.len()
        );
        for failure in &report.failures {
            println!(
                "  {} {} #{}: {}",
                "•".yellow(),
                failure.document,
                failure.position,
                failure.error
            );
        }
    }
    println!("{} Index saved to {}", "💾".blue(), location);
}

pub fn print_stats(stats: &serde_json::Value) {
    println!("{}", "📊 Index statistics:".bold());
    if let Some(map) = stats.as_object() {
        for (key, value) in map {
            println!("   {}: {}", key, value);
        }
    }
}

/// Headline for a failed question: remote outages are worth retrying, the rest are not
pub fn failure_label(err: &Error) -> &'static str {
    if err.is_remote() {
        "Service unavailable, try again shortly"
    } else {
        "Could not answer"
    }
}

pub fn print_error(context: &str, err: &dyn std::fmt::Display) {
    println!("{} {}: {}", "❌".red(), context, err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use mythos_core::Fragment;

    #[test]
    fn test_is_quit() {
        assert!(is_quit("exit"));
        assert!(is_quit("  QUIT "));
        assert!(!is_quit("exit now"));
        assert!(!is_quit(""));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("Hermes", 10), "Hermes");
        assert_eq!(preview("Hermes", 3), "Her ...");
        assert_eq!(preview("αβγ", 2), "αβ ...");
    }

    #[test]
    fn test_format_sources() {
        let sources = vec![
            RetrievedFragment {
                fragment: Fragment::new(4, "Pericles built the Parthenon."),
                distance: 0.5,
            },
            RetrievedFragment {
                fragment: Fragment::new(1, "Themistocles built the fleet."),
                distance: 2.25,
            },
        ];

        assert_snapshot!(format_sources(&sources).trim_end(), @r###"
        [1] Distance: 0.5000 (fragment 4)
        Pericles built the Parthenon.

        [2] Distance: 2.2500 (fragment 1)
        Themistocles built the fleet.
        "###);
    }

    #[test]
    fn test_format_sources_truncates_long_fragments() {
        let sources = vec![RetrievedFragment {
            fragment: Fragment::new(0, "x".repeat(301)),
            distance: 1.0,
        }];

        let text = format_sources(&sources);
        assert!(text.contains(&format!("{} ...", "x".repeat(300))));
        assert!(!text.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_failure_label() {
        assert_eq!(
            failure_label(&Error::GenerationUnavailable("503".to_string())),
            "Service unavailable, try again shortly"
        );
        assert_eq!(
            failure_label(&Error::EmbeddingUnavailable("timeout".to_string())),
            "Service unavailable, try again shortly"
        );
        assert_eq!(
            failure_label(&Error::InvalidArgument("query is empty".to_string())),
            "Could not answer"
        );
    }
}
