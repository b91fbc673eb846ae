use crate::config::Config;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
  /// Search and list only; never download or install.
  pub dry_run: bool,
  pub pause_on_exit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
  Run(RunOptions),
  ExitOk,
}

pub fn run_console_command(cfg: &Config, args: &[String]) -> anyhow::Result<ConsoleAction> {
  let args = skip_program_name(args);

  if args.iter().any(|a| a == "--help" || a == "-h") {
    print_help();
    return Ok(ConsoleAction::ExitOk);
  }

  let mut opts = RunOptions {
    dry_run: false,
    pause_on_exit: cfg.ui.pause_on_exit,
  };

  for arg in args {
    match arg.as_str() {
      "--dry-run" => opts.dry_run = true,
      "--no-pause" => opts.pause_on_exit = false,
      other => {
        tracing::warn!(argument = other, "ignoring unknown argument");
        eprintln!("Ignoring unknown argument `{other}` (see --help).");
      }
    }
  }

  Ok(ConsoleAction::Run(opts))
}

fn skip_program_name(args: &[String]) -> &[String] {
  args.get(1..).unwrap_or_default()
}

fn print_help() {
  println!("Auto Windows Update v{}", env!("CARGO_PKG_VERSION"));
  println!("Searches, downloads and installs pending Windows updates (requires Administrator).");
  println!("Options:");
  println!("  --dry-run   search and list updates without downloading or installing");
  println!("  --no-pause  exit without waiting for a key press");
  println!("  --version");
  println!("  --help");
}

/// Where the pipeline writes its status lines.
pub trait Terminal {
  fn info(&mut self, line: &str);

  /// Failure lines, rendered in the attention color.
  fn alert(&mut self, line: &str);

  fn wait_for_key(&mut self);
}

#[derive(Debug, Default)]
pub struct StdTerminal;

impl StdTerminal {
  pub fn new() -> Self {
    Self
  }
}

impl Terminal for StdTerminal {
  fn info(&mut self, line: &str) {
    println!("{line}");
  }

  fn alert(&mut self, line: &str) {
    let mut out = io::stdout();
    let res = crossterm::execute!(
      out,
      SetForegroundColor(Color::Red),
      Print(line),
      ResetColor,
      Print("\n")
    );
    if let Err(e) = res {
      tracing::debug!(error = ?e, "colored output unavailable");
      println!("{line}");
    }
  }

  fn wait_for_key(&mut self) {
    let _ = io::stdout().flush();
    if let Err(e) = read_single_key() {
      tracing::debug!(error = ?e, "raw key read unavailable; waiting for a line instead");
      let mut line = String::new();
      let _ = io::stdin().lock().read_line(&mut line);
    }
  }
}

fn read_single_key() -> io::Result<()> {
  enable_raw_mode()?;
  let res = loop {
    match event::read() {
      Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
      Ok(_) => continue,
      Err(e) => break Err(e),
    }
  };
  let _ = disable_raw_mode();
  res
}
