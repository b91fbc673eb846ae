/// True when the process token is an enabled member of BUILTIN\Administrators.
/// Under UAC this is false for a filtered (non-elevated) token.
pub fn is_administrator() -> bool {
  #[cfg(windows)]
  {
    match admin_membership() {
      Ok(is_member) => is_member,
      Err(e) => {
        tracing::warn!(error = ?e, "administrator membership check failed; treating as not elevated");
        false
      }
    }
  }
  #[cfg(not(windows))]
  {
    false
  }
}

#[cfg(windows)]
fn admin_membership() -> windows::core::Result<bool> {
  use windows::Win32::Foundation::{BOOL, HANDLE, PSID};
  use windows::Win32::Security::{
    AllocateAndInitializeSid, CheckTokenMembership, FreeSid, SECURITY_NT_AUTHORITY,
  };
  use windows::Win32::System::SystemServices::{DOMAIN_ALIAS_RID_ADMINS, SECURITY_BUILTIN_DOMAIN_RID};

  let mut admins = PSID::default();
  // SAFETY: `admins` receives a SID allocated by the system and is released with
  // `FreeSid` below on every path after a successful allocation.
  unsafe {
    AllocateAndInitializeSid(
      &SECURITY_NT_AUTHORITY,
      2,
      SECURITY_BUILTIN_DOMAIN_RID as u32,
      DOMAIN_ALIAS_RID_ADMINS as u32,
      0,
      0,
      0,
      0,
      0,
      0,
      &mut admins,
    )
  }?;

  let mut is_member = BOOL::default();
  // A null token handle checks the effective token of the calling thread.
  let checked = unsafe { CheckTokenMembership(HANDLE::default(), admins, &mut is_member) };
  unsafe { FreeSid(admins) };
  checked?;

  Ok(is_member.as_bool())
}
