/// UI culture that selects the Japanese message set. Anything else gets English.
pub const JAPANESE_CULTURE: &str = "ja-JP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
  Japanese,
  Default,
}

/// User-facing status lines. Parameterized keys carry their values so the
/// sentence is formatted at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
  RunAsAdmin,
  PressKeyToExit,
  CheckingUpdates,
  SessionCreateFail,
  NoUpdatesFound,
  ErrorOccurred(&'a str),
  SearchingUpdates,
  UpdatesFound(usize),
  UpdateListed { index: usize, title: &'a str },
  DownloadingUpdates,
  DownloadComplete,
  InstallingUpdates,
  NoUpdatesToInstall,
  InstallResult(i32),
  RebootRequired(bool),
  RebootNeeded,
  DryRunSkipped,
  Interrupted,
}

impl Locale {
  pub fn from_culture_name(name: &str) -> Self {
    if name.trim().eq_ignore_ascii_case(JAPANESE_CULTURE) {
      Self::Japanese
    } else {
      Self::Default
    }
  }

  /// Resolves the locale once for the run. A configured culture name wins over
  /// the OS UI language.
  pub fn detect(configured: Option<&str>) -> Self {
    let name = configured
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_string)
      .or_else(ui_culture_name);

    let locale = name
      .as_deref()
      .map(Self::from_culture_name)
      .unwrap_or(Self::Default);

    tracing::debug!(
      culture = name.as_deref().unwrap_or(""),
      locale = ?locale,
      "UI locale resolved"
    );
    locale
  }

  pub fn text(self, msg: Message<'_>) -> String {
    match self {
      Self::Japanese => japanese(msg),
      Self::Default => english(msg),
    }
  }
}

fn english(msg: Message<'_>) -> String {
  match msg {
    Message::RunAsAdmin => "This application must be run as Administrator.".to_string(),
    Message::PressKeyToExit => "Press any key to exit...".to_string(),
    Message::CheckingUpdates => "Checking for Windows Updates...".to_string(),
    Message::SessionCreateFail => {
      "Failed to create Microsoft.Update.Session. Ensure you are on a Windows machine.".to_string()
    }
    Message::NoUpdatesFound => "No updates found.".to_string(),
    Message::ErrorOccurred(detail) => format!("An error occurred: {detail}"),
    Message::SearchingUpdates => "Searching for updates...".to_string(),
    Message::UpdatesFound(count) => format!("Found {count} updates."),
    Message::UpdateListed { index, title } => listing(index, title),
    Message::DownloadingUpdates => "\nDownloading updates...".to_string(),
    Message::DownloadComplete => "Download complete.".to_string(),
    Message::InstallingUpdates => "\nInstalling updates...".to_string(),
    Message::NoUpdatesToInstall => "No updates ready to install.".to_string(),
    Message::InstallResult(code) => format!("\nInstallation Result: code {code}"),
    Message::RebootRequired(required) => format!("Reboot Required: {}", flag_text(required)),
    Message::RebootNeeded => "A reboot is required to complete the installation.".to_string(),
    Message::DryRunSkipped => "Dry run: skipping download and installation.".to_string(),
    Message::Interrupted => {
      "Interrupted. Work already handed to Windows Update continues under the service's control."
        .to_string()
    }
  }
}

fn japanese(msg: Message<'_>) -> String {
  match msg {
    Message::RunAsAdmin => "このアプリケーションは管理者として実行する必要があります。".to_string(),
    Message::PressKeyToExit => "キーを押して終了してください...".to_string(),
    Message::CheckingUpdates => "Windows Updateを確認しています...".to_string(),
    Message::SessionCreateFail => {
      "Microsoft.Update.Sessionの作成に失敗しました。Windows環境であることを確認してください。"
        .to_string()
    }
    Message::NoUpdatesFound => "更新プログラムは見つかりませんでした。".to_string(),
    Message::ErrorOccurred(detail) => format!("エラーが発生しました: {detail}"),
    Message::SearchingUpdates => "更新プログラムを検索中...".to_string(),
    Message::UpdatesFound(count) => format!("{count} 個の更新プログラムが見つかりました。"),
    Message::UpdateListed { index, title } => listing(index, title),
    Message::DownloadingUpdates => "\n更新プログラムをダウンロード中...".to_string(),
    Message::DownloadComplete => "ダウンロードが完了しました。".to_string(),
    Message::InstallingUpdates => "\n更新プログラムをインストール中...".to_string(),
    Message::NoUpdatesToInstall => "インストール可能な更新プログラムがありません。".to_string(),
    Message::InstallResult(code) => format!("\nインストール結果: コード {code}"),
    Message::RebootRequired(required) => format!("再起動が必要: {}", flag_text(required)),
    Message::RebootNeeded => "インストールを完了するために再起動が必要です。".to_string(),
    Message::DryRunSkipped => "ドライラン: ダウンロードとインストールをスキップします。".to_string(),
    Message::Interrupted => {
      "中断されました。Windows Updateに渡された処理はサービス側で継続されます。".to_string()
    }
  }
}

fn flag_text(flag: bool) -> &'static str {
  if flag {
    "True"
  } else {
    "False"
  }
}

// Same in both languages.
fn listing(index: usize, title: &str) -> String {
  format!("[{index}] {title}")
}

#[cfg(windows)]
fn ui_culture_name() -> Option<String> {
  use windows::Win32::Globalization::{GetUserDefaultUILanguage, LCIDToLocaleName};

  const LOCALE_NAME_MAX_LENGTH: usize = 85;

  // SAFETY: both calls only read process/user settings; the output buffer is
  // sized to the documented maximum locale name length.
  let langid = unsafe { GetUserDefaultUILanguage() };
  let mut buf = [0u16; LOCALE_NAME_MAX_LENGTH];
  let written = unsafe { LCIDToLocaleName(u32::from(langid), Some(&mut buf), 0) };
  if written <= 1 {
    tracing::debug!(langid, "LCIDToLocaleName returned no name");
    return None;
  }

  // `written` includes the terminating NUL.
  let len = (written as usize - 1).min(buf.len());
  Some(String::from_utf16_lossy(&buf[..len]))
}

#[cfg(not(windows))]
fn ui_culture_name() -> Option<String> {
  None
}
