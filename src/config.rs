use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Seconds `stop` and `restart` wait for SIGTERM to take effect.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Seconds `stop` waits for SIGKILL to take effect.
pub const DEFAULT_KILL_TIMEOUT_SECS: u64 = 5;

/// Defaults read from `procmanager.toml`; command-line flags win.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    pub pid_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: u64,
    pub kill_timeout_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            pid_file: None,
            log_file: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            kill_timeout_secs: DEFAULT_KILL_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error: a PID file path is required for `{command}` (use --pid)")]
    MissingPidFile { command: &'static str },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl SupervisorConfig {
    /// Parse the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config for this invocation.
    ///
    /// An explicit path must exist. Without one, the per-user file is used
    /// when present and built-in defaults otherwise.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                log::debug!("using config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// PID file from the flag, falling back to the config file.
    pub fn pid_file(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.pid_file.clone())
    }

    /// Like [`Self::pid_file`] but fails for commands that cannot work without one.
    pub fn require_pid_file(
        &self,
        flag: Option<PathBuf>,
        command: &'static str,
    ) -> Result<PathBuf, ConfigError> {
        self.pid_file(flag)
            .ok_or(ConfigError::MissingPidFile { command })
    }

    pub fn log_file(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.log_file.clone())
    }

    pub fn timeout_secs(&self, flag: Option<u64>) -> u64 {
        flag.unwrap_or(self.timeout_secs)
    }
}

/// `<config_dir>/procmanager/procmanager.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("procmanager").join("procmanager.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("procmanager.toml");
        fs::write(&path, "").unwrap();

        let cfg = SupervisorConfig::load(&path).unwrap();

        assert_eq!(cfg, SupervisorConfig::default());
        assert_eq!(cfg.timeout_secs, 10);
        assert_eq!(cfg.kill_timeout_secs, 5);
    }

    #[test]
    fn file_values_are_defaults_that_flags_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("procmanager.toml");
        fs::write(
            &path,
            r#"
pid_file = "/run/app.pid"
log_file = "/var/log/app.log"
timeout_secs = 3
"#,
        )
        .unwrap();

        let cfg = SupervisorConfig::load(&path).unwrap();

        assert_eq!(cfg.pid_file(None), Some(PathBuf::from("/run/app.pid")));
        assert_eq!(
            cfg.pid_file(Some(PathBuf::from("/tmp/other.pid"))),
            Some(PathBuf::from("/tmp/other.pid"))
        );
        assert_eq!(cfg.log_file(None), Some(PathBuf::from("/var/log/app.log")));
        assert_eq!(cfg.timeout_secs(None), 3);
        assert_eq!(cfg.timeout_secs(Some(20)), 20);
        assert_eq!(cfg.kill_timeout_secs, DEFAULT_KILL_TIMEOUT_SECS);
    }

    #[test]
    fn missing_pid_file_is_a_config_error() {
        let err = SupervisorConfig::default()
            .require_pid_file(None, "status")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingPidFile { command: "status" }));
        assert!(err.to_string().contains("--pid"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("procmanager.toml");
        fs::write(&path, "pidfile = \"/run/app.pid\"\n").unwrap();

        let err = SupervisorConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = SupervisorConfig::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
