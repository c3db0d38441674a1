//! The ensure operation: the minimal filesystem calls needed to bring a
//! directory to its specified owner, group, and mode.

use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt, chown};

use tracing::{debug, info};

use crate::error::EnsureError;
use crate::owner;
use crate::spec::DirectorySpec;

/// What a single invocation actually changed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EnsureReport {
    pub created: bool,
    pub owner_changed: bool,
    pub mode_changed: bool,
}

impl EnsureReport {
    pub fn changed(&self) -> bool {
        self.created || self.owner_changed || self.mode_changed
    }
}

/// Bring the directory described by `spec` into existence with the requested
/// ownership and permission bits.
///
/// Idempotent: a second run on an already-converged directory performs no
/// filesystem mutation and reports no changes. Owner and group names are
/// resolved before anything is touched, so an unknown name fails without side
/// effects; a chown or chmod failure after creation leaves the created
/// directory in place.
pub fn ensure(spec: &DirectorySpec) -> Result<EnsureReport, EnsureError> {
    info!(
        "ensuring directory {} ({}:{} mode {:04o})",
        spec.path(),
        spec.owner(),
        spec.group(),
        spec.mode()
    );

    let uid = owner::resolve_user(spec.owner())?;
    let gid = owner::resolve_group(spec.group())?;

    let path = spec.path();
    let mut report = EnsureReport::default();

    let metadata = match fs::metadata(path.as_std_path()) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(EnsureError::NotADirectory(path.to_owned()));
            }
            metadata
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("creating directory {}", path);
            fs::create_dir_all(path.as_std_path())
                .map_err(|err| EnsureError::from_io("creating", path, err))?;
            report.created = true;
            fs::metadata(path.as_std_path())
                .map_err(|err| EnsureError::from_io("inspecting", path, err))?
        }
        Err(err) => return Err(EnsureError::from_io("inspecting", path, err)),
    };

    if metadata.uid() != uid || metadata.gid() != gid {
        chown(path.as_std_path(), Some(uid), Some(gid))
            .map_err(|err| EnsureError::from_io("changing ownership of", path, err))?;
        report.owner_changed = true;
    } else {
        debug!("{} already owned by {}:{}", path, spec.owner(), spec.group());
    }

    if metadata.mode() & 0o7777 != spec.mode() {
        fs::set_permissions(path.as_std_path(), Permissions::from_mode(spec.mode()))
            .map_err(|err| EnsureError::from_io("setting mode on", path, err))?;
        report.mode_changed = true;
    } else {
        debug!("{} already has mode {:04o}", path, spec.mode());
    }

    Ok(report)
}
