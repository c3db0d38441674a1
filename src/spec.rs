use camino::{Utf8Path, Utf8PathBuf};

use crate::error::EnsureError;

pub const DEFAULT_OWNER: &str = "root";
pub const DEFAULT_GROUP: &str = "root";
/// `rw-r--r--`.
pub const DEFAULT_MODE: u32 = 0o644;

/// Permission bits plus setuid/setgid/sticky; anything above is rejected.
const MODE_MASK: u32 = 0o7777;

/// Desired state for a single directory: where it lives and who may touch it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectorySpec {
    path: Utf8PathBuf,
    owner: String,
    group: String,
    mode: u32,
}

impl DirectorySpec {
    /// Build a validated spec. Relative paths are anchored to the current
    /// working directory so the stored path is always absolute.
    pub fn new(
        path: impl AsRef<Utf8Path>,
        owner: impl Into<String>,
        group: impl Into<String>,
        mode: u32,
    ) -> Result<Self, EnsureError> {
        let path = path.as_ref();
        if path.as_str().is_empty() {
            return Err(EnsureError::InvalidPath(
                "path must not be empty".to_owned(),
            ));
        }
        if mode & !MODE_MASK != 0 {
            return Err(EnsureError::InvalidMode(format!("{mode:o}")));
        }

        let path = if path.is_absolute() {
            path.to_owned()
        } else {
            let cwd = std::env::current_dir().map_err(|err| {
                EnsureError::InvalidPath(format!("cannot resolve relative path {path}: {err}"))
            })?;
            let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|_| {
                EnsureError::InvalidPath("current directory is not valid UTF-8".to_owned())
            })?;
            cwd.join(path)
        };

        Ok(Self {
            path,
            owner: owner.into(),
            group: group.into(),
            mode,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }
}

/// Parse an octal mode string such as `644`, `0644`, or the cookbook-style
/// `00644`.
pub fn parse_mode(input: &str) -> Result<u32, EnsureError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EnsureError::InvalidMode(input.to_owned()));
    }
    let mode = u32::from_str_radix(trimmed, 8)
        .map_err(|_| EnsureError::InvalidMode(input.to_owned()))?;
    if mode & !MODE_MASK != 0 {
        return Err(EnsureError::InvalidMode(input.to_owned()));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_accepts_octal_forms() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("0644").unwrap(), 0o644);
        assert_eq!(parse_mode("00644").unwrap(), 0o644);
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
    }

    #[test]
    fn parse_mode_rejects_garbage() {
        assert!(matches!(parse_mode(""), Err(EnsureError::InvalidMode(_))));
        assert!(matches!(parse_mode("rw-"), Err(EnsureError::InvalidMode(_))));
        assert!(matches!(parse_mode("8"), Err(EnsureError::InvalidMode(_))));
        assert!(matches!(
            parse_mode("17777"),
            Err(EnsureError::InvalidMode(_))
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = DirectorySpec::new("", "root", "root", 0o644).unwrap_err();
        assert!(matches!(err, EnsureError::InvalidPath(_)));
    }

    #[test]
    fn out_of_range_mode_is_rejected() {
        let err = DirectorySpec::new("/var/log/app", "root", "root", 0o10644).unwrap_err();
        assert!(matches!(err, EnsureError::InvalidMode(_)));
    }

    #[test]
    fn relative_path_is_anchored_to_cwd() {
        let spec = DirectorySpec::new("logs", "root", "root", 0o644).unwrap();
        assert!(spec.path().is_absolute());
        assert!(spec.path().as_str().ends_with("logs"));
    }
}
