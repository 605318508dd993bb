//! Settings loaded with figment.
//!
//! Precedence, highest first:
//! 1. `FLEET_`-prefixed environment variables
//! 2. `DATABASE_URL`
//! 3. the TOML file (`fleet-compliance.toml` unless `--config` is given)
//! 4. built-in defaults

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::{DEFAULT_RECENT_INFRACTIONS, DEFAULT_TOP_INVARIANTS};
use crate::paginate::DEFAULT_PAGE_SIZE;

pub const CONFIG_FILE_NAME: &str = "fleet-compliance.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub page_size: usize,
    pub top_invariants: usize,
    pub recent_infractions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            page_size: DEFAULT_PAGE_SIZE,
            top_invariants: DEFAULT_TOP_INVARIANTS,
            recent_infractions: DEFAULT_RECENT_INFRACTIONS,
        }
    }
}

impl Settings {
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = match config_path {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .merge(Env::prefixed("FLEET_"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Validation {
                message: "max_connections must be greater than 0".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Validation {
                message: "page_size must be greater than 0".to_string(),
            });
        }
        if self.top_invariants == 0 {
            return Err(ConfigError::Validation {
                message: "top_invariants must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.top_invariants, 5);
        assert!(matches!(
            settings.database_url(),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn rejects_zero_page_size() {
        let settings = Settings {
            page_size: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn file_then_environment_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
                    database_url = "postgres://file/fleet"
                    page_size = 20
                "#,
            )?;
            jail.set_env("DATABASE_URL", "postgres://env/fleet");
            jail.set_env("FLEET_TOP_INVARIANTS", "3");

            let settings = Settings::load_from(None).map_err(|err| err.to_string())?;
            assert_eq!(settings.page_size, 20);
            assert_eq!(settings.top_invariants, 3);
            assert_eq!(settings.database_url().ok(), Some("postgres://env/fleet"));
            Ok(())
        });
    }

    #[test]
    fn prefixed_url_wins_over_bare_url() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://bare/fleet");
            jail.set_env("FLEET_DATABASE_URL", "postgres://prefixed/fleet");

            let settings = Settings::load_from(None).map_err(|err| err.to_string())?;
            assert_eq!(
                settings.database_url().ok(),
                Some("postgres://prefixed/fleet")
            );
            Ok(())
        });
    }

    #[test]
    fn explicit_config_path_must_exist() {
        Jail::expect_with(|_jail| {
            let result = Settings::load_from(Some(Path::new("missing.toml")));
            assert!(matches!(
                result,
                Err(ConfigError::MissingFile { ref path }) if path == Path::new("missing.toml")
            ));

            let defaults = Settings::load_from(None).map_err(|err| err.to_string())?;
            assert_eq!(defaults.page_size, 10);
            Ok(())
        });
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "max_connections = 0")?;
            let result = Settings::load_from(Some(Path::new("custom.toml")));
            assert!(matches!(result, Err(ConfigError::Validation { .. })));
            Ok(())
        });
    }
}
