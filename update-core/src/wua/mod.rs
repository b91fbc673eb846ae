//! Typed view of the Windows Update Agent automation objects.
//!
//! The agent's objects are late-bound in scripting languages. Here each one the
//! pipeline touches gets a trait: session, searcher, downloader, installer and
//! the update descriptor. The production binding lives in `com`, tests bind
//! fakes to the same traits.

use std::fmt;

#[cfg(windows)]
mod com;

/// Search criteria for every applicable update that is not installed yet.
pub const NOT_INSTALLED_CRITERIA: &str = "IsInstalled=0";

/// `OperationResultCode` as reported by searches, downloads and installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode(pub i32);

impl ResultCode {
  pub const NOT_STARTED: Self = Self(0);
  pub const IN_PROGRESS: Self = Self(1);
  pub const SUCCEEDED: Self = Self(2);
  pub const SUCCEEDED_WITH_ERRORS: Self = Self(3);
  pub const FAILED: Self = Self(4);
  pub const ABORTED: Self = Self(5);

  pub fn label(self) -> &'static str {
    match self {
      Self::NOT_STARTED => "not_started",
      Self::IN_PROGRESS => "in_progress",
      Self::SUCCEEDED => "succeeded",
      Self::SUCCEEDED_WITH_ERRORS => "succeeded_with_errors",
      Self::FAILED => "failed",
      Self::ABORTED => "aborted",
      _ => "unknown",
    }
  }
}

impl fmt::Display for ResultCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallationResult {
  pub result_code: ResultCode,
  pub reboot_required: bool,
}

pub struct SearchResult<U> {
  pub result_code: ResultCode,
  pub updates: Vec<U>,
}

impl<U> SearchResult<U> {
  pub fn len(&self) -> usize {
    self.updates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.updates.is_empty()
  }
}

/// Ordered, append-only list of updates handed to one download or install call.
pub struct UpdateQueue<'a, U> {
  items: Vec<&'a U>,
}

impl<'a, U> UpdateQueue<'a, U> {
  pub(crate) fn new() -> Self {
    Self { items: Vec::new() }
  }

  pub fn push(&mut self, update: &'a U) {
    self.items.push(update);
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &'a U> + '_ {
    self.items.iter().copied()
  }
}

pub trait UpdateDescriptor {
  fn title(&self) -> anyhow::Result<String>;

  /// Read live: the flag changes inside the service as downloads complete.
  fn is_downloaded(&self) -> anyhow::Result<bool>;
}

pub trait UpdateSearcher {
  type Update;

  fn search(&self, criteria: &str) -> anyhow::Result<SearchResult<Self::Update>>;
}

pub trait UpdateDownloader {
  type Update;

  /// Blocks until every queued update has been attempted.
  fn download(&self, updates: &UpdateQueue<'_, Self::Update>) -> anyhow::Result<ResultCode>;
}

pub trait UpdateInstaller {
  type Update;

  /// Blocks until every queued update has been attempted.
  fn install(&self, updates: &UpdateQueue<'_, Self::Update>) -> anyhow::Result<InstallationResult>;
}

pub trait UpdateSession {
  type Update: UpdateDescriptor;
  type Searcher: UpdateSearcher<Update = Self::Update>;
  type Downloader: UpdateDownloader<Update = Self::Update>;
  type Installer: UpdateInstaller<Update = Self::Update>;

  fn create_searcher(&self) -> anyhow::Result<Self::Searcher>;
  fn create_downloader(&self) -> anyhow::Result<Self::Downloader>;
  fn create_installer(&self) -> anyhow::Result<Self::Installer>;
}

#[cfg(windows)]
pub type PlatformSession = com::ComSession;

#[cfg(not(windows))]
pub type PlatformSession = Unsupported;

/// Instantiates `Microsoft.Update.Session` on the calling thread.
pub fn open_session(client_application_id: &str) -> anyhow::Result<PlatformSession> {
  #[cfg(windows)]
  {
    com::ComSession::open(client_application_id)
  }
  #[cfg(not(windows))]
  {
    let _ = client_application_id;
    Err(anyhow::anyhow!("Windows Update Agent is only available on Windows"))
  }
}

/// Stand-in for every agent object on hosts without the Windows Update Agent.
/// It has no values, so no method on it can ever run.
#[cfg(not(windows))]
#[derive(Debug)]
pub enum Unsupported {}

#[cfg(not(windows))]
impl UpdateDescriptor for Unsupported {
  fn title(&self) -> anyhow::Result<String> {
    match *self {}
  }

  fn is_downloaded(&self) -> anyhow::Result<bool> {
    match *self {}
  }
}

#[cfg(not(windows))]
impl UpdateSearcher for Unsupported {
  type Update = Unsupported;

  fn search(&self, _criteria: &str) -> anyhow::Result<SearchResult<Self::Update>> {
    match *self {}
  }
}

#[cfg(not(windows))]
impl UpdateDownloader for Unsupported {
  type Update = Unsupported;

  fn download(&self, _updates: &UpdateQueue<'_, Self::Update>) -> anyhow::Result<ResultCode> {
    match *self {}
  }
}

#[cfg(not(windows))]
impl UpdateInstaller for Unsupported {
  type Update = Unsupported;

  fn install(&self, _updates: &UpdateQueue<'_, Self::Update>) -> anyhow::Result<InstallationResult> {
    match *self {}
  }
}

#[cfg(not(windows))]
impl UpdateSession for Unsupported {
  type Update = Unsupported;
  type Searcher = Unsupported;
  type Downloader = Unsupported;
  type Installer = Unsupported;

  fn create_searcher(&self) -> anyhow::Result<Self::Searcher> {
    match *self {}
  }

  fn create_downloader(&self) -> anyhow::Result<Self::Downloader> {
    match *self {}
  }

  fn create_installer(&self) -> anyhow::Result<Self::Installer> {
    match *self {}
  }
}
