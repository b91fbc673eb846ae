//! Search → download → install, behind a single failure boundary.
//!
//! The run is a straight line: privilege check, session, search, download,
//! install, report. It stops early when nothing is found or nothing ended up
//! downloaded. Any failure inside search, download or install ends the run as
//! [`RunError::Pipeline`] and is reported once with its full error chain.

use crate::console::{RunOptions, Terminal};
use crate::locale::{Locale, Message};
use crate::wua::{
  InstallationResult, SearchResult, UpdateDescriptor, UpdateDownloader, UpdateInstaller,
  UpdateQueue, UpdateSearcher, UpdateSession, NOT_INSTALLED_CRITERIA,
};
use anyhow::Context;
use std::fmt;

/// What the run needs from the machine it runs on.
pub trait Host {
  type Session: UpdateSession;

  fn is_administrator(&self) -> bool;
  fn open_session(&self) -> anyhow::Result<Self::Session>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  NotStarted,
  PrivilegeChecked,
  Searched,
  Downloaded,
  Installed,
  Done,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::NotStarted => "not_started",
      Self::PrivilegeChecked => "privilege_checked",
      Self::Searched => "searched",
      Self::Downloaded => "downloaded",
      Self::Installed => "installed",
      Self::Done => "done",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  NoUpdatesFound,
  DryRun { found: usize },
  NothingToInstall,
  Installed(InstallationResult),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
  #[error("process is not running as Administrator")]
  Unauthorized,

  #[error("Windows Update session could not be created: {error:#}")]
  PlatformUnavailable { error: anyhow::Error },

  /// `stage` is the transition that was being attempted.
  #[error("update pipeline failed before reaching `{stage}`: {error:#}")]
  Pipeline { stage: Stage, error: anyhow::Error },
}

/// Runs the whole pipeline, reports the result on `term` and waits for the
/// exit keypress. The returned value is for logging; everything the user needs
/// has already been printed.
pub fn run<H: Host, T: Terminal>(
  host: &H,
  term: &mut T,
  locale: Locale,
  opts: &RunOptions,
) -> Result<Outcome, RunError> {
  let res = execute(host, term, locale, opts);

  match &res {
    Ok(outcome) => {
      tracing::info!(stage = %Stage::Done, outcome = ?outcome, "update run finished");
    }
    Err(RunError::Unauthorized) => {
      tracing::warn!("not running as Administrator; update pipeline not entered");
      term.alert(&locale.text(Message::RunAsAdmin));
    }
    Err(RunError::PlatformUnavailable { error }) => {
      tracing::error!(error = ?error, "Microsoft.Update.Session could not be created");
      term.info(&locale.text(Message::SessionCreateFail));
    }
    Err(RunError::Pipeline { stage, error }) => {
      tracing::error!(stage = %stage, error = ?error, "update pipeline failed");
      let detail = format!("{error:?}");
      term.alert(&locale.text(Message::ErrorOccurred(&detail)));
    }
  }

  if opts.pause_on_exit {
    let prompt = locale.text(Message::PressKeyToExit);
    if matches!(res, Err(RunError::Unauthorized)) {
      term.info(&prompt);
    } else {
      term.info(&format!("\n{prompt}"));
    }
    term.wait_for_key();
  }

  res
}

fn execute<H: Host, T: Terminal>(
  host: &H,
  term: &mut T,
  locale: Locale,
  opts: &RunOptions,
) -> Result<Outcome, RunError> {
  let mut stage = Stage::NotStarted;

  if !host.is_administrator() {
    return Err(RunError::Unauthorized);
  }
  advance(&mut stage, Stage::PrivilegeChecked);

  term.info(&locale.text(Message::CheckingUpdates));
  let session = host
    .open_session()
    .map_err(|error| RunError::PlatformUnavailable { error })?;

  let result = search(&session, term, locale).map_err(failed_at(Stage::Searched))?;
  advance(&mut stage, Stage::Searched);

  if result.is_empty() {
    term.info(&locale.text(Message::NoUpdatesFound));
    advance(&mut stage, Stage::Done);
    return Ok(Outcome::NoUpdatesFound);
  }

  if opts.dry_run {
    let queue = queue_all(&result, term, locale).map_err(failed_at(Stage::Searched))?;
    term.info(&locale.text(Message::DryRunSkipped));
    advance(&mut stage, Stage::Done);
    return Ok(Outcome::DryRun { found: queue.len() });
  }

  download(&session, &result, term, locale).map_err(failed_at(Stage::Downloaded))?;
  advance(&mut stage, Stage::Downloaded);

  let outcome = install(&session, &result, term, locale).map_err(failed_at(Stage::Installed))?;
  advance(&mut stage, Stage::Installed);
  advance(&mut stage, Stage::Done);

  Ok(outcome)
}

fn advance(stage: &mut Stage, next: Stage) {
  tracing::debug!(from = %stage, to = %next, "stage transition");
  *stage = next;
}

fn failed_at(stage: Stage) -> impl FnOnce(anyhow::Error) -> RunError {
  move |error| RunError::Pipeline { stage, error }
}

fn search<S: UpdateSession, T: Terminal>(
  session: &S,
  term: &mut T,
  locale: Locale,
) -> anyhow::Result<SearchResult<S::Update>> {
  let searcher = session.create_searcher()?;
  term.info(&locale.text(Message::SearchingUpdates));

  let result = searcher
    .search(NOT_INSTALLED_CRITERIA)
    .context("search for updates")?;

  tracing::info!(
    criteria = NOT_INSTALLED_CRITERIA,
    found = result.len(),
    result_code = result.result_code.0,
    result = result.result_code.label(),
    "search finished"
  );
  term.info(&locale.text(Message::UpdatesFound(result.len())));
  Ok(result)
}

/// Queues every found update in order, listing each one as it is added.
fn queue_all<'a, U: UpdateDescriptor, T: Terminal>(
  result: &'a SearchResult<U>,
  term: &mut T,
  locale: Locale,
) -> anyhow::Result<UpdateQueue<'a, U>> {
  let mut queue = UpdateQueue::new();
  for (i, update) in result.updates.iter().enumerate() {
    let index = i + 1;
    let title = update
      .title()
      .with_context(|| format!("read title of update {index}"))?;
    term.info(&locale.text(Message::UpdateListed {
      index,
      title: &title,
    }));
    queue.push(update);
  }
  Ok(queue)
}

fn download<S: UpdateSession, T: Terminal>(
  session: &S,
  result: &SearchResult<S::Update>,
  term: &mut T,
  locale: Locale,
) -> anyhow::Result<()> {
  let queue = queue_all(result, term, locale)?;

  term.info(&locale.text(Message::DownloadingUpdates));
  let downloader = session.create_downloader()?;
  let code = downloader.download(&queue).context("download updates")?;

  tracing::info!(
    queued = queue.len(),
    result_code = code.0,
    result = code.label(),
    "download finished"
  );
  term.info(&locale.text(Message::DownloadComplete));
  Ok(())
}

/// Updates whose downloaded flag is set right now, in search order.
pub fn downloaded_subset<U: UpdateDescriptor>(
  result: &SearchResult<U>,
) -> anyhow::Result<UpdateQueue<'_, U>> {
  let mut queue = UpdateQueue::new();
  for (i, update) in result.updates.iter().enumerate() {
    let downloaded = update
      .is_downloaded()
      .with_context(|| format!("read download state of update {}", i + 1))?;
    if downloaded {
      queue.push(update);
    }
  }
  Ok(queue)
}

fn install<S: UpdateSession, T: Terminal>(
  session: &S,
  result: &SearchResult<S::Update>,
  term: &mut T,
  locale: Locale,
) -> anyhow::Result<Outcome> {
  term.info(&locale.text(Message::InstallingUpdates));

  let queue = downloaded_subset(result)?;
  if queue.is_empty() {
    tracing::info!(found = result.len(), "no downloaded updates to install");
    term.info(&locale.text(Message::NoUpdatesToInstall));
    return Ok(Outcome::NothingToInstall);
  }

  let installer = session.create_installer()?;
  let installed = installer.install(&queue).context("install updates")?;

  tracing::info!(
    queued = queue.len(),
    skipped = result.len() - queue.len(),
    result_code = installed.result_code.0,
    result = installed.result_code.label(),
    reboot_required = installed.reboot_required,
    "install finished"
  );

  term.info(&locale.text(Message::InstallResult(installed.result_code.0)));
  term.info(&locale.text(Message::RebootRequired(installed.reboot_required)));
  if installed.reboot_required {
    term.info(&locale.text(Message::RebootNeeded));
  }

  Ok(Outcome::Installed(installed))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wua::ResultCode;
  use std::cell::RefCell;
  use std::rc::Rc;

  #[derive(Default)]
  struct Script {
    titles: Vec<&'static str>,
    /// Indices the download call marks as downloaded.
    downloads: Vec<usize>,
    fail_search: bool,
    fail_download: bool,
    fail_install: bool,
    reboot_required: bool,
  }

  struct State {
    script: Script,
    calls: RefCell<Vec<&'static str>>,
    downloaded: RefCell<Vec<bool>>,
    download_queue: RefCell<Vec<String>>,
    install_queue: RefCell<Vec<String>>,
  }

  #[derive(Clone)]
  struct FakeSession(Rc<State>);

  impl FakeSession {
    fn new(script: Script) -> Self {
      let n = script.titles.len();
      Self(Rc::new(State {
        script,
        calls: RefCell::new(Vec::new()),
        downloaded: RefCell::new(vec![false; n]),
        download_queue: RefCell::new(Vec::new()),
        install_queue: RefCell::new(Vec::new()),
      }))
    }

    fn calls(&self) -> Vec<&'static str> {
      self.0.calls.borrow().clone()
    }
  }

  struct FakeUpdate {
    index: usize,
    state: Rc<State>,
  }

  impl UpdateDescriptor for FakeUpdate {
    fn title(&self) -> anyhow::Result<String> {
      Ok(self.state.script.titles[self.index].to_string())
    }

    fn is_downloaded(&self) -> anyhow::Result<bool> {
      Ok(self.state.downloaded.borrow()[self.index])
    }
  }

  fn titles_of(queue: &UpdateQueue<'_, FakeUpdate>) -> Vec<String> {
    queue.iter().map(|u| u.title().unwrap()).collect()
  }

  impl UpdateSearcher for FakeSession {
    type Update = FakeUpdate;

    fn search(&self, criteria: &str) -> anyhow::Result<SearchResult<FakeUpdate>> {
      assert_eq!(criteria, "IsInstalled=0");
      self.0.calls.borrow_mut().push("search");
      if self.0.script.fail_search {
        return Err(anyhow::anyhow!("0x8024402C WU_E_PT_WINHTTP_NAME_NOT_RESOLVED"))
          .context("IUpdateSearcher::Search(\"IsInstalled=0\")");
      }
      let updates = (0..self.0.script.titles.len())
        .map(|index| FakeUpdate {
          index,
          state: Rc::clone(&self.0),
        })
        .collect();
      Ok(SearchResult {
        result_code: ResultCode::SUCCEEDED,
        updates,
      })
    }
  }

  impl UpdateDownloader for FakeSession {
    type Update = FakeUpdate;

    fn download(&self, updates: &UpdateQueue<'_, FakeUpdate>) -> anyhow::Result<ResultCode> {
      self.0.calls.borrow_mut().push("download");
      *self.0.download_queue.borrow_mut() = titles_of(updates);
      if self.0.script.fail_download {
        anyhow::bail!("0x80240438 WU_E_PT_ENDPOINT_UNREACHABLE");
      }
      let mut flags = self.0.downloaded.borrow_mut();
      for &i in &self.0.script.downloads {
        flags[i] = true;
      }
      Ok(ResultCode::SUCCEEDED)
    }
  }

  impl UpdateInstaller for FakeSession {
    type Update = FakeUpdate;

    fn install(&self, updates: &UpdateQueue<'_, FakeUpdate>) -> anyhow::Result<InstallationResult> {
      self.0.calls.borrow_mut().push("install");
      *self.0.install_queue.borrow_mut() = titles_of(updates);
      if self.0.script.fail_install {
        return Err(anyhow::anyhow!("0x80240022 WU_E_ALL_UPDATES_FAILED"))
          .context("IUpdateInstaller::Install");
      }
      Ok(InstallationResult {
        result_code: ResultCode::SUCCEEDED,
        reboot_required: self.0.script.reboot_required,
      })
    }
  }

  impl UpdateSession for FakeSession {
    type Update = FakeUpdate;
    type Searcher = FakeSession;
    type Downloader = FakeSession;
    type Installer = FakeSession;

    fn create_searcher(&self) -> anyhow::Result<FakeSession> {
      Ok(self.clone())
    }

    fn create_downloader(&self) -> anyhow::Result<FakeSession> {
      Ok(self.clone())
    }

    fn create_installer(&self) -> anyhow::Result<FakeSession> {
      Ok(self.clone())
    }
  }

  struct FakeHost {
    admin: bool,
    session: Option<FakeSession>,
  }

  impl Host for FakeHost {
    type Session = FakeSession;

    fn is_administrator(&self) -> bool {
      self.admin
    }

    fn open_session(&self) -> anyhow::Result<FakeSession> {
      self
        .session
        .clone()
        .ok_or_else(|| anyhow::anyhow!("REGDB_E_CLASSNOTREG"))
    }
  }

  #[derive(Debug, Clone, PartialEq, Eq)]
  enum Line {
    Info(String),
    Alert(String),
  }

  #[derive(Default)]
  struct RecordingTerminal {
    lines: Vec<Line>,
    key_waits: usize,
  }

  impl RecordingTerminal {
    fn alerts(&self) -> Vec<&str> {
      self
        .lines
        .iter()
        .filter_map(|l| match l {
          Line::Alert(s) => Some(s.as_str()),
          Line::Info(_) => None,
        })
        .collect()
    }

    fn has_info(&self, text: &str) -> bool {
      self.lines.contains(&Line::Info(text.to_string()))
    }
  }

  impl Terminal for RecordingTerminal {
    fn info(&mut self, line: &str) {
      self.lines.push(Line::Info(line.to_string()));
    }

    fn alert(&mut self, line: &str) {
      self.lines.push(Line::Alert(line.to_string()));
    }

    fn wait_for_key(&mut self) {
      self.key_waits += 1;
    }
  }

  const PAUSE: RunOptions = RunOptions {
    dry_run: false,
    pause_on_exit: true,
  };

  fn admin_host(script: Script) -> (FakeHost, FakeSession) {
    let session = FakeSession::new(script);
    let host = FakeHost {
      admin: true,
      session: Some(session.clone()),
    };
    (host, session)
  }

  fn run_with(
    host: &FakeHost,
    locale: Locale,
    opts: RunOptions,
  ) -> (Result<Outcome, RunError>, RecordingTerminal) {
    let mut term = RecordingTerminal::default();
    let res = run(host, &mut term, locale, &opts);
    (res, term)
  }

  fn text(msg: Message<'_>) -> String {
    Locale::Default.text(msg)
  }

  fn exit_prompt(locale: Locale) -> Line {
    Line::Info(format!("\n{}", locale.text(Message::PressKeyToExit)))
  }

  #[test]
  fn unelevated_run_never_enters_pipeline() {
    let session = FakeSession::new(Script {
      titles: vec!["KB1"],
      downloads: vec![0],
      ..Script::default()
    });
    let host = FakeHost {
      admin: false,
      session: Some(session.clone()),
    };

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(res, Err(RunError::Unauthorized)));
    assert!(session.calls().is_empty());
    assert_eq!(
      term.lines,
      vec![
        Line::Alert(text(Message::RunAsAdmin)),
        Line::Info(text(Message::PressKeyToExit)),
      ]
    );
    assert_eq!(term.key_waits, 1);
  }

  #[test]
  fn empty_search_stops_before_download() {
    let (host, session) = admin_host(Script::default());

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert_eq!(res.unwrap(), Outcome::NoUpdatesFound);
    assert_eq!(session.calls(), vec!["search"]);
    assert!(term.has_info(&text(Message::UpdatesFound(0))));
    assert!(term.has_info(&text(Message::NoUpdatesFound)));
    assert_eq!(term.lines.last(), Some(&exit_prompt(Locale::Default)));
    assert_eq!(term.key_waits, 1);
  }

  #[test]
  fn everything_found_is_downloaded_in_order() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1", "KB2", "KB3"],
      downloads: vec![0, 1, 2],
      ..Script::default()
    });

    let (_, term) = run_with(&host, Locale::Default, PAUSE);

    assert_eq!(*session.0.download_queue.borrow(), vec!["KB1", "KB2", "KB3"]);
    let listed: Vec<&Line> = term
      .lines
      .iter()
      .filter(|l| matches!(l, Line::Info(s) if s.starts_with('[')))
      .collect();
    assert_eq!(
      listed,
      vec![
        &Line::Info("[1] KB1".to_string()),
        &Line::Info("[2] KB2".to_string()),
        &Line::Info("[3] KB3".to_string()),
      ]
    );
  }

  #[test]
  fn install_queue_is_the_downloaded_subset() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1", "KB2", "KB3"],
      downloads: vec![0, 2],
      ..Script::default()
    });

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(res, Ok(Outcome::Installed(_))));
    assert_eq!(session.calls(), vec!["search", "download", "install"]);
    assert_eq!(*session.0.install_queue.borrow(), vec!["KB1", "KB3"]);
    assert!(term.alerts().is_empty());
  }

  #[test]
  fn downloaded_subset_reads_flags_at_filter_time() {
    let session = FakeSession::new(Script {
      titles: vec!["KB1", "KB2"],
      ..Script::default()
    });
    let result = session.search(NOT_INSTALLED_CRITERIA).unwrap();

    assert!(downloaded_subset(&result).unwrap().is_empty());

    session.0.downloaded.borrow_mut()[1] = true;
    let queue = downloaded_subset(&result).unwrap();
    assert_eq!(titles_of(&queue), vec!["KB2"]);
  }

  #[test]
  fn nothing_downloaded_skips_installer() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1", "KB2"],
      downloads: vec![],
      ..Script::default()
    });

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert_eq!(res.unwrap(), Outcome::NothingToInstall);
    assert_eq!(session.calls(), vec!["search", "download"]);
    assert!(term.has_info(&text(Message::NoUpdatesToInstall)));
    assert!(term.alerts().is_empty());
  }

  #[test]
  fn search_failure_is_reported_once_with_full_chain() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1"],
      fail_search: true,
      ..Script::default()
    });

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(
      res,
      Err(RunError::Pipeline {
        stage: Stage::Searched,
        ..
      })
    ));
    assert_eq!(session.calls(), vec!["search"]);

    let alerts = term.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("An error occurred: search for updates"));
    assert!(alerts[0].contains("IUpdateSearcher::Search"));
    assert!(alerts[0].contains("WU_E_PT_WINHTTP_NAME_NOT_RESOLVED"));

    assert_eq!(term.lines.last(), Some(&exit_prompt(Locale::Default)));
    assert_eq!(term.key_waits, 1);
  }

  #[test]
  fn download_failure_never_reaches_installer() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1"],
      downloads: vec![0],
      fail_download: true,
      ..Script::default()
    });

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(
      res,
      Err(RunError::Pipeline {
        stage: Stage::Downloaded,
        ..
      })
    ));
    assert_eq!(session.calls(), vec!["search", "download"]);
    assert_eq!(term.alerts().len(), 1);
    assert!(!term.has_info(&text(Message::DownloadComplete)));
  }

  #[test]
  fn install_failure_is_reported_once_without_result_lines() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1", "KB2"],
      downloads: vec![0, 1],
      fail_install: true,
      reboot_required: true,
      ..Script::default()
    });

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(
      res,
      Err(RunError::Pipeline {
        stage: Stage::Installed,
        ..
      })
    ));
    assert_eq!(session.calls(), vec!["search", "download", "install"]);
    assert_eq!(*session.0.install_queue.borrow(), vec!["KB1", "KB2"]);

    let alerts = term.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("An error occurred: install updates"));
    assert!(alerts[0].contains("IUpdateInstaller::Install"));
    assert!(alerts[0].contains("WU_E_ALL_UPDATES_FAILED"));

    assert!(!term.lines.iter().any(|l| matches!(
      l,
      Line::Info(s) if s.starts_with("\nInstallation Result") || s.starts_with("Reboot Required")
    )));
    assert!(!term.has_info(&text(Message::RebootNeeded)));

    assert_eq!(term.lines.last(), Some(&exit_prompt(Locale::Default)));
    assert_eq!(term.key_waits, 1);
  }

  #[test]
  fn reboot_message_only_when_required() {
    for reboot_required in [true, false] {
      let (host, _) = admin_host(Script {
        titles: vec!["KB1"],
        downloads: vec![0],
        reboot_required,
        ..Script::default()
      });

      let (res, term) = run_with(&host, Locale::Default, PAUSE);

      assert_eq!(
        res.unwrap(),
        Outcome::Installed(InstallationResult {
          result_code: ResultCode::SUCCEEDED,
          reboot_required,
        })
      );
      assert!(term.has_info(&text(Message::InstallResult(2))));
      assert!(term.has_info(&text(Message::RebootRequired(reboot_required))));
      assert_eq!(term.has_info(&text(Message::RebootNeeded)), reboot_required);
    }
  }

  #[test]
  fn missing_update_facility_is_reported_distinctly() {
    let host = FakeHost {
      admin: true,
      session: None,
    };

    let (res, term) = run_with(&host, Locale::Default, PAUSE);

    assert!(matches!(res, Err(RunError::PlatformUnavailable { .. })));
    assert_eq!(
      term.lines,
      vec![
        Line::Info(text(Message::CheckingUpdates)),
        Line::Info(text(Message::SessionCreateFail)),
        exit_prompt(Locale::Default),
      ]
    );
  }

  #[test]
  fn dry_run_lists_without_downloading() {
    let (host, session) = admin_host(Script {
      titles: vec!["KB1", "KB2"],
      downloads: vec![0, 1],
      ..Script::default()
    });
    let opts = RunOptions {
      dry_run: true,
      ..PAUSE
    };

    let (res, term) = run_with(&host, Locale::Default, opts);

    assert_eq!(res.unwrap(), Outcome::DryRun { found: 2 });
    assert_eq!(session.calls(), vec!["search"]);
    assert!(term.has_info("[1] KB1"));
    assert!(term.has_info("[2] KB2"));
    assert!(term.has_info(&text(Message::DryRunSkipped)));
  }

  #[test]
  fn no_pause_skips_exit_prompt() {
    let (host, _) = admin_host(Script::default());
    let opts = RunOptions {
      pause_on_exit: false,
      ..PAUSE
    };

    let (_, term) = run_with(&host, Locale::Default, opts);

    assert_eq!(term.key_waits, 0);
    assert!(!term
      .lines
      .iter()
      .any(|l| matches!(l, Line::Info(s) if s.contains("Press any key"))));
  }

  fn full_transcript(locale: Locale) -> Vec<Line> {
    vec![
      Line::Info(locale.text(Message::CheckingUpdates)),
      Line::Info(locale.text(Message::SearchingUpdates)),
      Line::Info(locale.text(Message::UpdatesFound(1))),
      Line::Info("[1] KB1".to_string()),
      Line::Info(locale.text(Message::DownloadingUpdates)),
      Line::Info(locale.text(Message::DownloadComplete)),
      Line::Info(locale.text(Message::InstallingUpdates)),
      Line::Info(locale.text(Message::InstallResult(2))),
      Line::Info(locale.text(Message::RebootRequired(false))),
      exit_prompt(locale),
    ]
  }

  #[test]
  fn one_locale_per_run() {
    for locale in [Locale::Japanese, Locale::Default] {
      let (host, _) = admin_host(Script {
        titles: vec!["KB1"],
        downloads: vec![0],
        ..Script::default()
      });

      let (_, term) = run_with(&host, locale, PAUSE);

      assert_eq!(term.lines, full_transcript(locale));

      let other = match locale {
        Locale::Japanese => Locale::Default,
        Locale::Default => Locale::Japanese,
      };
      let foreign = full_transcript(other);
      assert!(term
        .lines
        .iter()
        .filter(|l| !matches!(l, Line::Info(s) if s.starts_with('[')))
        .all(|l| !foreign.contains(l)));
    }
  }

  struct TerminalState {
    host: FakeHost,
    /// Last status line before the prompt; `None` for failures, which end in one error alert.
    status: Option<Message<'static>>,
  }

  fn terminal_states() -> Vec<TerminalState> {
    let unauthorized = FakeHost {
      admin: false,
      session: Some(FakeSession::new(Script::default())),
    };
    let unavailable = FakeHost {
      admin: true,
      session: None,
    };
    let (empty, _) = admin_host(Script::default());
    let (undownloaded, _) = admin_host(Script {
      titles: vec!["KB1"],
      ..Script::default()
    });
    let (search_fails, _) = admin_host(Script {
      titles: vec!["KB1"],
      fail_search: true,
      ..Script::default()
    });
    let (install_fails, _) = admin_host(Script {
      titles: vec!["KB1"],
      downloads: vec![0],
      fail_install: true,
      ..Script::default()
    });

    vec![
      TerminalState {
        host: unauthorized,
        status: Some(Message::RunAsAdmin),
      },
      TerminalState {
        host: unavailable,
        status: Some(Message::SessionCreateFail),
      },
      TerminalState {
        host: empty,
        status: Some(Message::NoUpdatesFound),
      },
      TerminalState {
        host: undownloaded,
        status: Some(Message::NoUpdatesToInstall),
      },
      TerminalState {
        host: search_fails,
        status: None,
      },
      TerminalState {
        host: install_fails,
        status: None,
      },
    ]
  }

  fn fixed_texts(locale: Locale) -> Vec<String> {
    [
      Message::RunAsAdmin,
      Message::PressKeyToExit,
      Message::CheckingUpdates,
      Message::SessionCreateFail,
      Message::NoUpdatesFound,
      Message::SearchingUpdates,
      Message::UpdatesFound(0),
      Message::UpdatesFound(1),
      Message::DownloadingUpdates,
      Message::DownloadComplete,
      Message::InstallingUpdates,
      Message::NoUpdatesToInstall,
      Message::RebootNeeded,
    ]
    .into_iter()
    .map(|msg| locale.text(msg).trim_start_matches('\n').to_string())
    .collect()
  }

  fn line_text(line: &Line) -> &str {
    match line {
      Line::Info(s) | Line::Alert(s) => s.trim_start_matches('\n'),
    }
  }

  #[test]
  fn every_terminal_state_speaks_one_locale() {
    for locale in [Locale::Japanese, Locale::Default] {
      let other = match locale {
        Locale::Japanese => Locale::Default,
        Locale::Default => Locale::Japanese,
      };
      let foreign = fixed_texts(other);
      let foreign_error = other.text(Message::ErrorOccurred(""));
      let error_prefix = locale.text(Message::ErrorOccurred(""));

      for state in terminal_states() {
        let (res, term) = run_with(&state.host, locale, PAUSE);

        match state.status {
          Some(Message::RunAsAdmin) => {
            assert!(matches!(res, Err(RunError::Unauthorized)));
            assert_eq!(
              term.lines,
              vec![
                Line::Alert(locale.text(Message::RunAsAdmin)),
                Line::Info(locale.text(Message::PressKeyToExit)),
              ]
            );
          }
          Some(status) => {
            let n = term.lines.len();
            assert!(n >= 2, "{:?}", term.lines);
            assert_eq!(term.lines[n - 2], Line::Info(locale.text(status)));
            assert_eq!(term.lines[n - 1], exit_prompt(locale));
            assert!(term.alerts().is_empty());
          }
          None => {
            assert!(matches!(res, Err(RunError::Pipeline { .. })));
            let alerts = term.alerts();
            assert_eq!(alerts.len(), 1);
            assert!(alerts[0].starts_with(&error_prefix), "{}", alerts[0]);
            assert_eq!(term.lines.last(), Some(&exit_prompt(locale)));
          }
        }
        assert_eq!(term.key_waits, 1);

        for line in &term.lines {
          let shown = line_text(line);
          assert!(!foreign.iter().any(|f| f == shown), "{locale:?}: {shown}");
          assert!(!shown.starts_with(&foreign_error), "{locale:?}: {shown}");
        }
      }
    }
  }
}
