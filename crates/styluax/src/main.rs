use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::sync::mpsc;

use libstyluax::{
    config::{find_workspace_root, load_config},
    event_consumers, full_range, Document, Position, Range, Styluax, TextBuffer, VersionCheck,
};

#[derive(Parser)]
#[clap(name = "styluax")]
#[clap(version)]
#[clap(about = "Editor-host formatting bridge for the stylua Lua formatter", long_about = None)]
struct Cli {
    /// Increase output verbosity
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format Lua files in place
    Fmt {
        /// Files to format
        #[clap(required = true, value_parser)]
        files: Vec<PathBuf>,

        /// First line of the range to format (1-based)
        #[clap(long)]
        start_line: Option<usize>,

        /// Last line of the range to format (1-based, inclusive)
        #[clap(long)]
        end_line: Option<usize>,
    },
    /// Report whether the installed stylua matches the remote release
    Check,
    /// Install or reinstall the configured stylua release
    Install,
    /// Install the remote release if the installed one differs
    Update,
}

/// Convert 1-based line bounds into a document range.
fn line_range(document: &TextBuffer, start_line: Option<usize>, end_line: Option<usize>) -> Range {
    let full = full_range(document);
    let start = start_line
        .map(|line| Position::new(line.saturating_sub(1), 0))
        .unwrap_or(full.start);
    let end = end_line
        .map(|line| {
            let line = line.saturating_sub(1).min(document.line_count() - 1);
            Position::new(line, document.line(line).chars().count())
        })
        .unwrap_or(full.end);
    Range::new(start, end)
}

async fn run(cli: &Cli, styluax: &Styluax) -> Result<()> {
    match &cli.command {
        Commands::Fmt {
            files,
            start_line,
            end_line,
        } => {
            styluax.startup().await?;
            for file in files {
                let text = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let mut buffer = TextBuffer::new(text.clone());
                let range = line_range(&buffer, *start_line, *end_line);
                let path = file.canonicalize().unwrap_or_else(|_| file.clone());

                let edits = styluax.format_range(&buffer, Some(&path), range).await?;
                if edits.is_empty() {
                    println!("{} {}", "skipped".yellow(), file.display());
                    continue;
                }
                buffer.apply(&edits);
                if buffer.text() == text {
                    println!("{} {}", "unchanged".dimmed(), file.display());
                    continue;
                }
                std::fs::write(file, buffer.text())
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                println!("{} {}", "formatted".green(), file.display());
            }
            Ok(())
        }
        Commands::Check => {
            if !styluax.check_installed() {
                println!("{}", "stylua is not installed. Run `styluax install`.".red());
                return Ok(());
            }
            match styluax.check_version().await? {
                VersionCheck::CustomBinary => {
                    println!("using a custom stylua binary; updates are not managed")
                }
                VersionCheck::UpToDate => println!("{}", "stylua is up to date".green()),
                VersionCheck::Outdated { current, latest } => println!(
                    "{} current: {}, latest: {}",
                    "stylua is not latest.".yellow(),
                    current,
                    latest
                ),
            }
            Ok(())
        }
        Commands::Install => {
            let path = styluax.install().await?;
            println!("{} {}", "installed".green(), path.display());
            Ok(())
        }
        Commands::Update => {
            if !styluax.check_installed() {
                let path = styluax.install().await?;
                println!("{} {}", "installed".green(), path.display());
                return Ok(());
            }
            match styluax.check_version().await? {
                VersionCheck::Outdated { current, latest } => {
                    println!("updating stylua {} -> {}", current, latest);
                    let path = styluax.install().await?;
                    println!("{} {}", "installed".green(), path.display());
                }
                VersionCheck::UpToDate => println!("{}", "stylua is up to date".green()),
                VersionCheck::CustomBinary => {
                    println!("using a custom stylua binary; nothing to update")
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (sender, receiver) = mpsc::channel(100);
    let (kill_sender, kill_receiver) = mpsc::channel(1);
    let subscriber = event_consumers::create_tracing_subscriber(cli.verbose, sender.clone());
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    let event_task = if cli.verbose > 0 {
        tokio::spawn(event_consumers::output_logs(receiver, kill_receiver))
    } else {
        tokio::spawn(event_consumers::output_progress(receiver, kill_receiver))
    };

    let cwd = std::env::current_dir()?;
    let workspace_root = find_workspace_root(&cwd);
    let config = load_config(workspace_root.as_deref())?;
    let styluax = Styluax::new(config, Some(sender.clone()))?;

    let result = run(&cli, &styluax).await;

    let _ = kill_sender.send(()).await;
    let _ = event_task.await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_range_defaults_to_full_document() {
        let buffer = TextBuffer::new(indoc! {"
            local a = 1
            local b = 2
        "});
        assert_eq!(line_range(&buffer, None, None), full_range(&buffer));
    }

    #[test]
    fn test_line_range_bounds() {
        let buffer = TextBuffer::new(indoc! {"
            local a = 1
            local b = 2
            local c = 3
        "});
        let range = line_range(&buffer, Some(2), Some(3));
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(2, 11));
    }

    #[test]
    fn test_line_range_clamps_past_end() {
        let buffer = TextBuffer::new("local a = 1");
        let range = line_range(&buffer, Some(1), Some(99));
        assert_eq!(range, full_range(&buffer));
    }
}
