use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{Event, LogLevel};

const SPINNER_STRINGS: &[&str] = &["▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸"];

/// Discards all events without processing them
pub async fn discard_events(
    mut receiver: mpsc::Receiver<Event>,
    mut kill_signal: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = receiver.recv() => {}
            _ = kill_signal.recv() => break,
            else => break,
        }
    }
}

/// Creates a subscriber that sends all tracing events to an mpsc channel for processing.
pub fn create_tracing_subscriber(verbosity: u8, sender: mpsc::Sender<Event>) -> impl Subscriber {
    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    struct Writer {
        sender: mpsc::Sender<Event>,
    }

    impl std::io::Write for Writer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(s) = std::str::from_utf8(buf) {
                let _ = self
                    .sender
                    .try_send(Event::Log(LogLevel::Info, s.to_string()));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let make_writer = move || Writer {
        sender: sender.clone(),
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_span_events(FmtSpan::NONE)
        .without_time()
        .finish()
}

/// Output events in a text log format
pub async fn output_logs(mut receiver: mpsc::Receiver<Event>, mut kill_signal: mpsc::Receiver<()>) {
    loop {
        tokio::select! {
            Some(event) = receiver.recv() => {
                match event {
                    Event::Log(level, message) => {
                        let severity = match level {
                            LogLevel::Error => "error".red(),
                            LogLevel::Warn => "warn".yellow(),
                            LogLevel::Info => "info".green(),
                            LogLevel::Debug => "debug".cyan(),
                            LogLevel::Trace => "trace".magenta(),
                        };
                        println!("{}: {}", severity, message);
                    }
                    _ => {
                        let name = event.name().to_string();
                        let display = event.display();
                        if display.is_empty() {
                            println!("{}", name.blue());
                        } else {
                            println!("{}: {}", name.blue(), display);
                        }
                        if let Some(message) = event.user_message() {
                            println!("{}", message.yellow());
                        }
                    }
                }
            }
            _ = kill_signal.recv() => break,
            else => break,
        }
    }
}

/// Fancy event output, with a progress spinner for long-running operations
pub async fn output_progress(
    mut receiver: mpsc::Receiver<Event>,
    mut kill_signal: mpsc::Receiver<()>,
) {
    let spinner_style = ProgressStyle::with_template("{spinner:.green.bold} {msg}")
        .unwrap()
        .tick_strings(SPINNER_STRINGS);

    let mut current_spinner: Option<ProgressBar> = None;

    fn finish_spinner(spinner: &mut Option<ProgressBar>) {
        if let Some(s) = spinner.take() {
            s.finish_and_clear();
        }
    }

    fn start_new_spinner(
        current_spinner: &mut Option<ProgressBar>,
        style: &ProgressStyle,
        message: &str,
    ) {
        finish_spinner(current_spinner);
        let new_spinner = ProgressBar::new_spinner().with_style(style.clone());
        new_spinner.enable_steady_tick(Duration::from_millis(100));
        new_spinner.set_message(message.to_string());
        *current_spinner = Some(new_spinner);
    }

    loop {
        tokio::select! {
            Some(event) = receiver.recv() => {
                if let Some(progress_event) = event.progress_event() {
                    start_new_spinner(&mut current_spinner, &spinner_style, &progress_event);
                } else if event.ends_progress() {
                    finish_spinner(&mut current_spinner);
                }

                match &event {
                    Event::Fatal(message) => {
                        finish_spinner(&mut current_spinner);
                        println!("{}", format!("fatal: {}", message).red());
                    }
                    Event::Log(LogLevel::Error, message) => {
                        finish_spinner(&mut current_spinner);
                        println!("{}", message.red());
                    }
                    _ => {
                        if let Some(message) = event.user_message() {
                            println!("{}", message.yellow());
                        }
                    }
                }
            }
            _ = kill_signal.recv() => break,
            else => break,
        }
    }

    finish_spinner(&mut current_spinner);
}
