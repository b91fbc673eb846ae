use crate::config::SessionConfig;
use crate::pipeline::Host;
use crate::privilege;
use crate::wua::{self, PlatformSession};

/// The local machine: its process token and its Windows Update Agent.
pub struct SystemHost {
  client_application_id: String,
}

impl SystemHost {
  pub fn new(cfg: &SessionConfig) -> Self {
    Self {
      client_application_id: cfg.client_application_id.clone(),
    }
  }
}

impl Host for SystemHost {
  type Session = PlatformSession;

  fn is_administrator(&self) -> bool {
    privilege::is_administrator()
  }

  fn open_session(&self) -> anyhow::Result<PlatformSession> {
    wua::open_session(&self.client_application_id)
  }
}
