//! Terminal output for `rk`.
//!
//! Status lines go through [`status`]: successes and notes on stdout, errors
//! and warnings on stderr, each with a colored leading symbol when the stream
//! supports it.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Success,
  Info,
  Warning,
  Error,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => symbols::SUCCESS,
      Status::Info => symbols::INFO,
      Status::Warning => symbols::WARNING,
      Status::Error => symbols::ERROR,
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Success | Status::Info => Stream::Stdout,
      Status::Warning | Status::Error => Stream::Stderr,
    }
  }
}

/// The leading symbol for `kind`, colored when its stream supports it.
fn painted_symbol(kind: Status) -> String {
  let symbol = kind.symbol();
  symbol
    .if_supports_color(kind.stream(), |s| match kind {
      Status::Success => s.green().to_string(),
      Status::Info => s.blue().to_string(),
      Status::Warning => s.yellow().to_string(),
      Status::Error => s.red().to_string(),
    })
    .to_string()
}

/// Print one status line on the stream that belongs to `kind`.
pub fn status(kind: Status, message: &str) {
  let symbol = painted_symbol(kind);
  match kind {
    Status::Success | Status::Info => println!("{symbol} {message}"),
    Status::Warning => eprintln!("{symbol} {}", message.if_supports_color(Stream::Stderr, |m| m.yellow())),
    Status::Error => eprintln!("{symbol} {}", message.if_supports_color(Stream::Stderr, |m| m.red())),
  }
}

pub fn print_success(message: &str) {
  status(Status::Success, message);
}

pub fn print_info(message: &str) {
  status(Status::Info, message);
}

pub fn print_warning(message: &str) {
  status(Status::Warning, message);
}

pub fn print_error(message: &str) {
  status(Status::Error, message);
}

/// `  label: value` with a dimmed label, on stdout or (for failures) stderr.
pub fn print_stat_to(stream: Stream, label: &str, value: &str) {
  if matches!(stream, Stream::Stderr) {
    eprintln!("  {}: {value}", label.if_supports_color(Stream::Stderr, |l| l.dimmed()));
  } else {
    println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |l| l.dimmed()));
  }
}

pub fn print_stat(label: &str, value: &str) {
  print_stat_to(Stream::Stdout, label, value);
}

/// One indented `→ item` line under a stat.
pub fn print_item(item: &str) {
  println!(
    "    {} {item}",
    symbols::ARROW.if_supports_color(Stream::Stdout, |a| a.dimmed())
  );
}

/// First twelve characters of a hex digest.
pub fn truncate_hash(hash: &str) -> &str {
  &hash[..hash.len().min(12)]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    60.. => format!("{}m {}s", secs / 60, secs % 60),
    1.. => format!("{}.{:02}s", secs, duration.subsec_millis() / 10),
    0 => format!("{}ms", duration.subsec_millis()),
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}
