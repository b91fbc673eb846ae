use super::{
  InstallationResult, ResultCode, SearchResult, UpdateDescriptor, UpdateDownloader,
  UpdateInstaller, UpdateQueue, UpdateSearcher, UpdateSession,
};
use anyhow::Context;
use windows::core::BSTR;
use windows::Win32::Foundation::VARIANT_FALSE;
use windows::Win32::System::Com::{
  CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
};
use windows::Win32::System::UpdateAgent::{
  IUpdate, IUpdateCollection, IUpdateDownloader, IUpdateInstaller, IUpdateSearcher,
  IUpdateSession, UpdateCollection, UpdateSession as UpdateSessionClass,
};

// SAFETY (module-wide): the Windows Update Agent is exposed only through COM, and
// every generated interface method is `unsafe` in the bindings. Each call below
// goes through a live interface pointer owned by the wrapper it is called on.

pub struct ComSession {
  // Declaration order is drop order: interfaces go before COM is torn down.
  session: IUpdateSession,
  _com: ComGuard,
}

impl ComSession {
  pub fn open(client_application_id: &str) -> anyhow::Result<Self> {
    unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
      .ok()
      .map_err(|e| anyhow::anyhow!("COM unavailable: CoInitializeEx failed: {e:?}"))?;
    let com = ComGuard;

    let session: IUpdateSession =
      unsafe { CoCreateInstance(&UpdateSessionClass, None, CLSCTX_INPROC_SERVER) }
        .map_err(|e| anyhow::anyhow!("Microsoft.Update.Session unavailable: {e:?}"))?;

    unsafe { session.SetClientApplicationID(&BSTR::from(client_application_id)) }
      .context("IUpdateSession::put_ClientApplicationID")?;

    tracing::debug!(client_application_id, "update session created");
    Ok(Self { session, _com: com })
  }
}

impl UpdateSession for ComSession {
  type Update = ComUpdate;
  type Searcher = ComSearcher;
  type Downloader = ComDownloader;
  type Installer = ComInstaller;

  fn create_searcher(&self) -> anyhow::Result<ComSearcher> {
    let searcher =
      unsafe { self.session.CreateUpdateSearcher() }.context("IUpdateSession::CreateUpdateSearcher")?;
    Ok(ComSearcher(searcher))
  }

  fn create_downloader(&self) -> anyhow::Result<ComDownloader> {
    let downloader = unsafe { self.session.CreateUpdateDownloader() }
      .context("IUpdateSession::CreateUpdateDownloader")?;
    Ok(ComDownloader(downloader))
  }

  fn create_installer(&self) -> anyhow::Result<ComInstaller> {
    let installer = unsafe { self.session.CreateUpdateInstaller() }
      .context("IUpdateSession::CreateUpdateInstaller")?;
    Ok(ComInstaller(installer))
  }
}

pub struct ComUpdate(IUpdate);

impl UpdateDescriptor for ComUpdate {
  fn title(&self) -> anyhow::Result<String> {
    let title = unsafe { self.0.Title() }.context("IUpdate::Title")?;
    Ok(title.to_string())
  }

  fn is_downloaded(&self) -> anyhow::Result<bool> {
    let flag = unsafe { self.0.IsDownloaded() }.context("IUpdate::IsDownloaded")?;
    Ok(flag != VARIANT_FALSE)
  }
}

pub struct ComSearcher(IUpdateSearcher);

impl UpdateSearcher for ComSearcher {
  type Update = ComUpdate;

  fn search(&self, criteria: &str) -> anyhow::Result<SearchResult<ComUpdate>> {
    let result = unsafe { self.0.Search(&BSTR::from(criteria)) }
      .with_context(|| format!("IUpdateSearcher::Search(\"{criteria}\")"))?;
    let code = unsafe { result.ResultCode() }.context("ISearchResult::ResultCode")?;
    let found = unsafe { result.Updates() }.context("ISearchResult::Updates")?;
    let count = unsafe { found.Count() }.context("IUpdateCollection::Count")?;

    let mut updates = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    for i in 0..count {
      let update =
        unsafe { found.get_Item(i) }.with_context(|| format!("IUpdateCollection::Item({i})"))?;
      updates.push(ComUpdate(update));
    }

    Ok(SearchResult {
      result_code: ResultCode(code.0),
      updates,
    })
  }
}

pub struct ComDownloader(IUpdateDownloader);

impl UpdateDownloader for ComDownloader {
  type Update = ComUpdate;

  fn download(&self, updates: &UpdateQueue<'_, ComUpdate>) -> anyhow::Result<ResultCode> {
    let collection = to_collection(updates)?;
    unsafe { self.0.SetUpdates(&collection) }.context("IUpdateDownloader::put_Updates")?;
    let result = unsafe { self.0.Download() }.context("IUpdateDownloader::Download")?;
    let code = unsafe { result.ResultCode() }.context("IDownloadResult::ResultCode")?;
    Ok(ResultCode(code.0))
  }
}

pub struct ComInstaller(IUpdateInstaller);

impl UpdateInstaller for ComInstaller {
  type Update = ComUpdate;

  fn install(&self, updates: &UpdateQueue<'_, ComUpdate>) -> anyhow::Result<InstallationResult> {
    let collection = to_collection(updates)?;
    unsafe { self.0.SetUpdates(&collection) }.context("IUpdateInstaller::put_Updates")?;
    let result = unsafe { self.0.Install() }.context("IUpdateInstaller::Install")?;
    let code = unsafe { result.ResultCode() }.context("IInstallationResult::ResultCode")?;
    let reboot = unsafe { result.RebootRequired() }.context("IInstallationResult::RebootRequired")?;
    Ok(InstallationResult {
      result_code: ResultCode(code.0),
      reboot_required: reboot != VARIANT_FALSE,
    })
  }
}

/// Copies a queue into a fresh `Microsoft.Update.UpdateColl`, the argument type
/// the downloader and installer expect.
fn to_collection(updates: &UpdateQueue<'_, ComUpdate>) -> anyhow::Result<IUpdateCollection> {
  let collection: IUpdateCollection =
    unsafe { CoCreateInstance(&UpdateCollection, None, CLSCTX_INPROC_SERVER) }
      .context("create Microsoft.Update.UpdateColl")?;
  for update in updates.iter() {
    unsafe { collection.Add(&update.0) }.context("IUpdateCollection::Add")?;
  }
  Ok(collection)
}

struct ComGuard;

impl Drop for ComGuard {
  fn drop(&mut self) {
    unsafe { CoUninitialize() };
  }
}
