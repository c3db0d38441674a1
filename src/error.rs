use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors from validating a directory spec or converging a directory.
///
/// Callers that only want to halt can bubble these through `anyhow`; the
/// variants stay distinguishable for callers that care which precondition
/// failed.
#[derive(Debug, Error)]
pub enum EnsureError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid mode `{0}`: expected octal permission bits")]
    InvalidMode(String),

    #[error("owner `{0}` not found on this host")]
    OwnerNotFound(String),

    #[error("group `{0}` not found on this host")]
    GroupNotFound(String),

    #[error("{0} exists and is not a directory")]
    NotADirectory(Utf8PathBuf),

    #[error("permission denied while {action} {path}")]
    PermissionDenied {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error while {action} {path}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("looking up `{name}` in the account database")]
    Lookup {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl EnsureError {
    /// Wrap a filesystem error, splitting out `PermissionDenied` so callers
    /// can tell an access failure from everything else.
    pub(crate) fn from_io(action: &'static str, path: &Utf8Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            EnsureError::PermissionDenied {
                action,
                path: path.to_owned(),
                source,
            }
        } else {
            EnsureError::Io {
                action,
                path: path.to_owned(),
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_failures_map_to_permission_denied() {
        let path = Utf8Path::new("/var/log/app");
        let err = EnsureError::from_io(
            "creating",
            path,
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, EnsureError::PermissionDenied { .. }));

        let err = EnsureError::from_io("creating", path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, EnsureError::Io { .. }));
    }
}
