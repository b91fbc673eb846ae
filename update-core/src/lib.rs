pub mod config;
pub mod console;
pub mod host;
pub mod locale;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod privilege;
pub mod wua;

use locale::{Locale, Message};

pub fn run_console(args: &[String]) -> anyhow::Result<()> {
  let base = paths::base_dir()?;
  let cfg = config::load_or_default_readonly(&paths::config_path(&base))?;

  if let Err(e) = logging::init(&paths::logs_dir(&base), &cfg.logging) {
    eprintln!("Auto Windows Update: logging disabled: {e:#}");
  }

  let opts = match console::run_console_command(&cfg, args)? {
    console::ConsoleAction::ExitOk => return Ok(()),
    console::ConsoleAction::Run(opts) => opts,
  };

  let locale = Locale::detect(cfg.ui.locale.as_deref());
  if let Err(e) = install_interrupt_handler(locale) {
    tracing::warn!(error = ?e, "Ctrl+C handler not installed");
  }

  let run_id = uuid::Uuid::new_v4();
  let span = tracing::info_span!("update_run", run_id = %run_id);
  let _entered = span.enter();
  tracing::info!(
    version = env!("CARGO_PKG_VERSION"),
    locale = ?locale,
    dry_run = opts.dry_run,
    "starting Windows Update run"
  );

  let host = host::SystemHost::new(&cfg.session);
  let mut term = console::StdTerminal::new();

  // Every outcome, failures included, has already been shown to the user.
  if let Err(e) = pipeline::run(&host, &mut term, locale, &opts) {
    tracing::debug!(error = %e, "run ended without installing");
  }
  Ok(())
}

fn install_interrupt_handler(locale: Locale) -> anyhow::Result<()> {
  ctrlc::set_handler(move || {
    tracing::warn!("interrupted; any download or install already submitted is left to the update service");
    let _ = crossterm::terminal::disable_raw_mode();
    eprintln!("\n{}", locale.text(Message::Interrupted));
    std::process::exit(130);
  })?;
  Ok(())
}
