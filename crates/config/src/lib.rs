//! Layered configuration for bannr.
//!
//! Settings are resolved from, in increasing priority:
//! 1. built-in defaults,
//! 2. a `settings.toml` file,
//! 3. `BANNR_*` environment variables (e.g. `BANNR_API_KEY`).
//!
//! The file is the one given explicitly, else `<base_dir>/settings.toml` if
//! it exists, else `settings.toml` in the platform configuration directory.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "BANNR_";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://s-ul.eu/api/v1/upload";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the import/export folders, ledger and log file.
    pub base_dir: PathBuf,
    /// Google Drive folder ID (or full folder URL) to sync new files from.
    pub drive_id: Option<String>,
    /// s-ul.eu API key.
    pub api_key: Option<String>,
    pub enable_upload: bool,
    /// Mirror log output into [`log_file`](Self::log_file).
    pub enable_logging: bool,
    pub upload_endpoint: String,
    pub upload_timeout_secs: u64,
    pub import_folder: String,
    pub export_folder: String,
    pub ledger_file: String,
    pub log_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            drive_id: None,
            api_key: None,
            enable_upload: true,
            enable_logging: true,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            upload_timeout_secs: 60,
            import_folder: "Images import".to_string(),
            export_folder: "Images export".to_string(),
            ledger_file: "index.csv".to_string(),
            log_file: "script_activity.log".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from every layer. An explicit file must exist; the
    /// implicit candidates are skipped when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_file()?,
        };
        match &file {
            Some(path) => tracing::debug!(path = %path.display(), "loading settings file"),
            None => tracing::debug!("no settings file found; using defaults and environment"),
        }
        Self::from_figment(Self::figment(file.as_deref()))
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// First existing settings file among the implicit candidates.
    fn discover_file() -> Result<Option<PathBuf>> {
        // The base directory can itself come from the environment.
        let base_dir: PathBuf = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract_inner("base_dir")
            .or_raise(|| ErrorKind::Invalid)?;
        let platform = ProjectDirs::from("", "", "bannr").map(|dirs| dirs.config_dir().join(SETTINGS_FILE));
        Ok([Some(base_dir.join(SETTINGS_FILE)), platform].into_iter().flatten().find(|path| path.is_file()))
    }

    /// Check the base directory exists and make it absolute.
    pub fn validate(mut self) -> Result<Self> {
        if !self.base_dir.is_dir() {
            exn::bail!(ErrorKind::InvalidBaseDir(self.base_dir));
        }
        self.base_dir = std::path::absolute(&self.base_dir).or_raise(|| ErrorKind::InvalidBaseDir(self.base_dir.clone()))?;
        Ok(self)
    }

    /// The API key, if one is configured and not blank.
    pub fn credential(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// The remote folder ID, if one is configured and not blank.
    pub fn drive_folder(&self) -> Option<&str> {
        non_blank(self.drive_id.as_deref())
    }

    /// Uploading is enabled and there is a key to upload with.
    pub fn uploads_active(&self) -> bool {
        self.enable_upload && self.credential().is_some()
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn import_dir(&self) -> PathBuf {
        self.base_dir.join(&self.import_folder)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join(&self.export_folder)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.base_dir.join(&self.ledger_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join(&self.log_file)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    /// Keep the platform configuration directory inside the jail.
    fn isolate(jail: &mut Jail) {
        let home = jail.directory().join("home");
        jail.set_env("HOME", home.display());
        jail.set_env("XDG_CONFIG_HOME", home.join(".config").display());
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            isolate(jail);
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.ledger_path(), Path::new("./index.csv"));
            assert_eq!(settings.import_dir(), Path::new("./Images import"));
            assert_eq!(settings.upload_timeout(), Duration::from_secs(60));
            Ok(())
        });
    }

    #[test]
    fn test_base_dir_file_then_env() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file(
                "settings.toml",
                r#"
                    api_key = "from-file"
                    drive_id = "1AbCdEf"
                    enable_logging = false
                "#,
            )?;
            jail.set_env("BANNR_API_KEY", "from-env");
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings.credential(), Some("from-env"));
            assert_eq!(settings.drive_folder(), Some("1AbCdEf"));
            assert!(!settings.enable_logging);
            assert!(settings.enable_upload);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "upload_timeout_secs = 5\nexport_folder = \"out\"")?;
            let settings = Settings::load(Some(Path::new("custom.toml"))).unwrap();
            assert_eq!(settings.upload_timeout_secs, 5);
            assert_eq!(settings.export_dir(), Path::new("./out"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|_jail| {
            let err = Settings::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value() {
        Jail::expect_with(|jail| {
            isolate(jail);
            jail.create_file("settings.toml", "enable_upload = \"sometimes\"")?;
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid));
            Ok(())
        });
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let validated = settings.validate().unwrap();
        assert!(validated.base_dir.is_absolute());

        let missing = Settings {
            base_dir: dir.path().join("nope"),
            ..Settings::default()
        };
        let err = missing.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidBaseDir(_)));
    }

    #[rstest]
    #[case(None, true, false)]
    #[case(Some(""), true, false)]
    #[case(Some("   "), true, false)]
    #[case(Some("key"), false, false)]
    #[case(Some(" key "), true, true)]
    fn test_uploads_active(#[case] api_key: Option<&str>, #[case] enable_upload: bool, #[case] active: bool) {
        let settings = Settings {
            api_key: api_key.map(str::to_string),
            enable_upload,
            ..Settings::default()
        };
        assert_eq!(settings.uploads_active(), active);
        if active {
            assert_eq!(settings.credential(), Some("key"));
        }
    }
}
