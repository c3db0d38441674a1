use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use serde::Deserialize;
use toml_edit::{DocumentMut, value};

use crate::spec;

/// Root configuration document, loaded from `.dirset/config.toml` by default.
#[derive(Debug, Default, Deserialize)]
pub struct ProvisionConfig {
    pub log_dir: Option<String>,
    pub defaults: Option<Defaults>,
}

/// Fallback ownership and mode, applied when the CLI does not override them.
/// Modes are octal strings so the file reads like the classic recipe form.
#[derive(Debug, Default, Deserialize)]
pub struct Defaults {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<String>,
}

const EXAMPLE_CONFIG: &str = r#"# dirset configuration.
#
# The directory ensured when `dirset ensure` is invoked without a path.
log_dir = "/var/log/app"

# Ownership and permission bits applied unless overridden on the command
# line. Mode is octal.
[defaults]
owner = "root"
group = "root"
mode = "0644"
"#;

/// Load a configuration file from disk and deserialize it.
pub fn load_from_path(path: &Utf8Path) -> Result<ProvisionConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path))
}

pub fn write_example_config(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }

    fs::write(path, EXAMPLE_CONFIG).with_context(|| format!("writing config {}", path))
}

/// Set `log_dir` in the config file, preserving existing formatting and
/// comments. Creates the file if it does not exist yet.
pub fn set_log_dir(path: &Utf8Path, log_dir: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }

    let mut doc: DocumentMut = if path.exists() {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        raw.parse()
            .with_context(|| format!("parsing config {}", path))?
    } else {
        DocumentMut::new()
    };

    doc["log_dir"] = value(log_dir);

    fs::write(path, doc.to_string()).with_context(|| format!("writing config {}", path))
}

pub fn format_summary(config: &ProvisionConfig) -> String {
    let mut out = String::new();
    let log_dir = config.log_dir.as_deref().unwrap_or("<unset>");
    let _ = writeln!(out, "Log directory: {}", log_dir);

    let defaults = config.defaults.as_ref();
    let owner = defaults
        .and_then(|d| d.owner.as_deref())
        .unwrap_or(spec::DEFAULT_OWNER);
    let group = defaults
        .and_then(|d| d.group.as_deref())
        .unwrap_or(spec::DEFAULT_GROUP);
    let mode = defaults
        .and_then(|d| d.mode.as_deref())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:04o}", spec::DEFAULT_MODE));
    let _ = writeln!(out, "Defaults: owner={}, group={}, mode={}", owner, group, mode);

    out
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use camino::Utf8PathBuf;

    use super::*;

    fn unique_temp_dir() -> Utf8PathBuf {
        let mut dir = std::env::temp_dir();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("dirset-test-{ts}"));
        Utf8PathBuf::from_path_buf(dir).unwrap()
    }

    #[test]
    fn example_config_parses() {
        let dir = unique_temp_dir();
        let path = dir.join("config.toml");
        write_example_config(&path, false).unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/app"));
        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.owner.as_deref(), Some("root"));
        assert_eq!(defaults.group.as_deref(), Some("root"));
        assert_eq!(defaults.mode.as_deref(), Some("0644"));
    }

    #[test]
    fn generate_refuses_to_overwrite_without_force() {
        let dir = unique_temp_dir();
        let path = dir.join("config.toml");
        write_example_config(&path, false).unwrap();
        assert!(write_example_config(&path, false).is_err());
        write_example_config(&path, true).unwrap();
    }

    #[test]
    fn set_log_dir_preserves_comments() {
        let dir = unique_temp_dir();
        let path = dir.join("config.toml");
        fs::create_dir_all(dir.as_std_path()).unwrap();
        fs::write(
            path.as_std_path(),
            "# keep me\nlog_dir = \"/old\"\n\n[defaults]\nowner = \"root\"\n",
        )
        .unwrap();

        set_log_dir(&path, "/var/log/django").unwrap();

        let raw = fs::read_to_string(path.as_std_path()).unwrap();
        assert!(raw.contains("# keep me"));
        assert!(raw.contains("log_dir = \"/var/log/django\""));
        assert!(raw.contains("[defaults]"));
    }

    #[test]
    fn set_log_dir_creates_missing_file() {
        let dir = unique_temp_dir();
        let path = dir.join("config.toml");
        set_log_dir(&path, "/var/log/app").unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/app"));
    }
}
