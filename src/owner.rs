//! Owner and group name resolution against the host account databases.

use std::ffi::CString;
use std::io;

use crate::error::EnsureError;

/// Resolve a user name to its uid.
pub fn resolve_user(name: &str) -> Result<u32, EnsureError> {
    // A name with an interior NUL cannot exist in passwd.
    let key = CString::new(name).map_err(|_| EnsureError::OwnerNotFound(name.to_owned()))?;
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0u8; 1024];
    loop {
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwnam_r(
                key.as_ptr(),
                &mut pwd,
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(EnsureError::Lookup {
                name: name.to_owned(),
                source: io::Error::from_raw_os_error(rc),
            });
        }
        if result.is_null() {
            return Err(EnsureError::OwnerNotFound(name.to_owned()));
        }
        return Ok(pwd.pw_uid);
    }
}

/// Resolve a group name to its gid.
pub fn resolve_group(name: &str) -> Result<u32, EnsureError> {
    let key = CString::new(name).map_err(|_| EnsureError::GroupNotFound(name.to_owned()))?;
    let mut grp: libc::group = unsafe { std::mem::zeroed() };
    let mut buf = vec![0u8; 1024];
    loop {
        let mut result: *mut libc::group = std::ptr::null_mut();
        let rc = unsafe {
            libc::getgrnam_r(
                key.as_ptr(),
                &mut grp,
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(EnsureError::Lookup {
                name: name.to_owned(),
                source: io::Error::from_raw_os_error(rc),
            });
        }
        if result.is_null() {
            return Err(EnsureError::GroupNotFound(name.to_owned()));
        }
        return Ok(grp.gr_gid);
    }
}

/// Name of the effective user, for tests that must chown to themselves.
#[cfg(test)]
pub(crate) fn current_user_name() -> String {
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0u8; 1024];
    loop {
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwuid_r(
                libc::geteuid(),
                &mut pwd,
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        assert_eq!(rc, 0, "getpwuid_r failed");
        assert!(!result.is_null(), "effective uid has no passwd entry");
        let name = unsafe { std::ffi::CStr::from_ptr(pwd.pw_name) };
        return name.to_string_lossy().into_owned();
    }
}

/// Name of the effective group, for tests that must chown to themselves.
#[cfg(test)]
pub(crate) fn current_group_name() -> String {
    let mut grp: libc::group = unsafe { std::mem::zeroed() };
    let mut buf = vec![0u8; 1024];
    loop {
        let mut result: *mut libc::group = std::ptr::null_mut();
        let rc = unsafe {
            libc::getgrgid_r(
                libc::getegid(),
                &mut grp,
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        assert_eq!(rc, 0, "getgrgid_r failed");
        assert!(!result.is_null(), "effective gid has no group entry");
        let name = unsafe { std::ffi::CStr::from_ptr(grp.gr_name) };
        return name.to_string_lossy().into_owned();
    }
}
