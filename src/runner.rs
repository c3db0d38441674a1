use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};

use crate::cli::{Cli, Command, ConfigCommand, EnsureArgs};
use crate::config::{self, ProvisionConfig};
use crate::ensure;
use crate::spec::{self, DirectorySpec};

const CONFIG_DIR: &str = ".dirset";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ConfigPathSource {
    Explicit,
    Discovered,
    HomeDefault,
}

impl ConfigPathSource {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigPathSource::Explicit => "explicit",
            ConfigPathSource::Discovered => "discovered",
            ConfigPathSource::HomeDefault => "home-default",
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfigPath {
    path: Utf8PathBuf,
    source: ConfigPathSource,
}

struct CliContext {
    config: Option<Utf8PathBuf>,
    dry_run: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = CliContext::new(&cli)?;
    match cli.command {
        Command::Ensure(args) => handle_ensure(&ctx, args),
        Command::Config { command } => handle_config(&ctx, command),
    }
}

impl CliContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Some(
                Utf8PathBuf::from_path_buf(path.clone())
                    .map_err(|_| anyhow!("config path must be valid UTF-8"))?,
            ),
            None => None,
        };
        Ok(Self {
            config,
            dry_run: cli.dry_run,
        })
    }

    /// Resolve the config file location: an explicit `--config` wins, then a
    /// `.dirset/config.toml` discovered walking up from the current
    /// directory, then the home-directory default.
    fn resolve_config_path(&self) -> Result<ResolvedConfigPath> {
        if let Some(path) = &self.config {
            return Ok(ResolvedConfigPath {
                path: path.clone(),
                source: ConfigPathSource::Explicit,
            });
        }

        let cwd = std::env::current_dir().context("determining current directory")?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| anyhow!("current directory is not valid UTF-8"))?;
        let mut current: Option<&Utf8Path> = Some(&cwd);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.exists() {
                return Ok(ResolvedConfigPath {
                    path: candidate,
                    source: ConfigPathSource::Discovered,
                });
            }
            current = dir.parent();
        }

        let home = dirs::home_dir().ok_or_else(|| anyhow!("unable to determine home directory"))?;
        let mut path = home;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|_| anyhow!("config path must be valid UTF-8"))?;
        Ok(ResolvedConfigPath {
            path,
            source: ConfigPathSource::HomeDefault,
        })
    }

    /// Load the resolved config. A missing discovered/home-default file is an
    /// empty config; a missing explicit file is an error.
    fn load_config(&self) -> Result<(ResolvedConfigPath, ProvisionConfig)> {
        let resolved = self.resolve_config_path()?;
        let config = if resolved.path.exists() {
            config::load_from_path(&resolved.path)?
        } else if resolved.source == ConfigPathSource::Explicit {
            bail!("config file {} does not exist", resolved.path);
        } else {
            ProvisionConfig::default()
        };
        Ok((resolved, config))
    }
}

fn handle_ensure(ctx: &CliContext, args: EnsureArgs) -> Result<()> {
    let (_, config) = ctx.load_config()?;
    let spec = build_spec(&args, &config)?;

    if ctx.dry_run {
        println!(
            "[dry-run] would ensure {} ({}:{} mode {:04o})",
            spec.path(),
            spec.owner(),
            spec.group(),
            spec.mode()
        );
        return Ok(());
    }

    let report =
        ensure::ensure(&spec).with_context(|| format!("ensuring directory {}", spec.path()))?;

    if report.created {
        println!("  created {}", spec.path());
    }
    if report.owner_changed {
        println!("  ownership set to {}:{}", spec.owner(), spec.group());
    }
    if report.mode_changed {
        println!("  mode set to {:04o}", spec.mode());
    }
    if !report.changed() {
        println!("  {} already up to date", spec.path());
    }
    Ok(())
}

/// Merge CLI flags over config values over built-in defaults into a spec.
fn build_spec(args: &EnsureArgs, config: &ProvisionConfig) -> Result<DirectorySpec> {
    let path = match (&args.path, &config.log_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(log_dir)) => Utf8PathBuf::from(log_dir),
        (None, None) => bail!("no target directory: pass a path or set `log_dir` in the config"),
    };

    let defaults = config.defaults.as_ref();
    let owner = args
        .owner
        .clone()
        .or_else(|| defaults.and_then(|d| d.owner.clone()))
        .unwrap_or_else(|| spec::DEFAULT_OWNER.to_owned());
    let group = args
        .group
        .clone()
        .or_else(|| defaults.and_then(|d| d.group.clone()))
        .unwrap_or_else(|| spec::DEFAULT_GROUP.to_owned());
    let mode = match args
        .mode
        .as_deref()
        .or_else(|| defaults.and_then(|d| d.mode.as_deref()))
    {
        Some(raw) => spec::parse_mode(raw)?,
        None => spec::DEFAULT_MODE,
    };

    Ok(DirectorySpec::new(path, owner, group, mode)?)
}

fn handle_config(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let (resolved, config) = ctx.load_config()?;
            println!("Config: {} ({})", resolved.path, resolved.source.as_str());
            print!("{}", config::format_summary(&config));
            Ok(())
        }
        ConfigCommand::Path => {
            let resolved = ctx.resolve_config_path()?;
            println!("{} ({})", resolved.path, resolved.source.as_str());
            Ok(())
        }
        ConfigCommand::Generate { path, force } => {
            let target = match path {
                Some(path) => Utf8PathBuf::from_path_buf(path)
                    .map_err(|_| anyhow!("config path must be valid UTF-8"))?,
                None => ctx.resolve_config_path()?.path,
            };
            config::write_example_config(&target, force)?;
            println!("  wrote {}", target);
            Ok(())
        }
        ConfigCommand::SetLogDir { path } => {
            let target = ctx.resolve_config_path()?.path;
            config::set_log_dir(&target, &path)?;
            println!("  log_dir = {} in {}", path, target);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::config::Defaults;

    fn unique_temp_dir() -> Utf8PathBuf {
        let mut dir = std::env::temp_dir();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("dirset-test-{ts}"));
        Utf8PathBuf::from_path_buf(dir).unwrap()
    }

    fn no_args() -> EnsureArgs {
        EnsureArgs {
            path: None,
            owner: None,
            group: None,
            mode: None,
        }
    }

    #[test]
    fn resolve_config_prefers_explicit_then_discovered() {
        let root = unique_temp_dir();
        let nested = root.join("a").join("b");
        fs::create_dir_all(nested.as_std_path()).unwrap();
        fs::create_dir_all(root.join(CONFIG_DIR).as_std_path()).unwrap();
        let cfg = root.join(CONFIG_DIR).join(CONFIG_FILE);
        fs::write(cfg.as_std_path(), "log_dir = '/var/log/app'\n").unwrap();

        let explicit = CliContext {
            config: Some(cfg.clone()),
            dry_run: false,
        };
        let resolved = explicit.resolve_config_path().unwrap();
        assert_eq!(resolved.source, ConfigPathSource::Explicit);
        assert_eq!(resolved.path, cfg);

        let old = std::env::current_dir().unwrap();
        std::env::set_current_dir(nested.as_std_path()).unwrap();

        let discovered = CliContext {
            config: None,
            dry_run: false,
        };
        let resolved = discovered.resolve_config_path().unwrap();
        assert_eq!(resolved.source, ConfigPathSource::Discovered);
        assert!(resolved.path.ends_with(".dirset/config.toml"));

        std::env::set_current_dir(old).unwrap();
    }

    #[test]
    fn build_spec_uses_builtin_defaults() {
        let config = ProvisionConfig {
            log_dir: Some("/var/log/django".to_owned()),
            defaults: None,
        };
        let spec = build_spec(&no_args(), &config).unwrap();
        assert_eq!(spec.path(), "/var/log/django");
        assert_eq!(spec.owner(), "root");
        assert_eq!(spec.group(), "root");
        assert_eq!(spec.mode(), 0o644);
    }

    #[test]
    fn build_spec_prefers_cli_over_config() {
        let config = ProvisionConfig {
            log_dir: Some("/var/log/django".to_owned()),
            defaults: Some(Defaults {
                owner: Some("root".to_owned()),
                group: Some("root".to_owned()),
                mode: Some("0644".to_owned()),
            }),
        };
        let args = EnsureArgs {
            path: Some(Utf8PathBuf::from("/srv/data")),
            owner: Some("daemon".to_owned()),
            group: None,
            mode: Some("0755".to_owned()),
        };
        let spec = build_spec(&args, &config).unwrap();
        assert_eq!(spec.path(), "/srv/data");
        assert_eq!(spec.owner(), "daemon");
        assert_eq!(spec.group(), "root");
        assert_eq!(spec.mode(), 0o755);
    }

    #[test]
    fn build_spec_requires_some_target() {
        let err = build_spec(&no_args(), &ProvisionConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no target directory"));
    }

    #[test]
    fn build_spec_rejects_bad_mode_from_config() {
        let config = ProvisionConfig {
            log_dir: Some("/var/log/django".to_owned()),
            defaults: Some(Defaults {
                owner: None,
                group: None,
                mode: Some("rw-r--r--".to_owned()),
            }),
        };
        assert!(build_spec(&no_args(), &config).is_err());
    }
}
