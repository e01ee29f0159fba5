use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{Credentials, ServerUrl};
use crate::error::XnatError;
use crate::transport::DEFAULT_TIMEOUT_SECS;

pub const CONFIG_FILE_NAME: &str = "xnat.json";
pub const ENV_SERVER: &str = "XNAT_SERVER";
pub const ENV_USER: &str = "XNAT_USER";
pub const ENV_PASSWORD: &str = "XNAT_PASSWORD";

/// Connection profile as written in `xnat.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Fills unset fields from `other`, keeping values already present.
    pub fn or(self, other: Config) -> Config {
        Config {
            server: self.server.or(other.server),
            user: self.user.or(other.user),
            password: self.password.or(other.password),
            timeout_secs: self.timeout_secs.or(other.timeout_secs),
        }
    }

    pub fn from_env() -> Config {
        Config {
            server: non_blank_env(ENV_SERVER),
            user: non_blank_env(ENV_USER),
            password: non_blank_env(ENV_PASSWORD),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server: ServerUrl,
    pub credentials: Credentials,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the profile file (explicit path, `./xnat.json`, then the user
    /// config dir) and layers `overrides` and the environment on top of it.
    ///
    /// A missing default file is not an error as long as every setting ends up
    /// provided some other way.
    pub fn resolve(path: Option<&str>, overrides: Config) -> Result<ResolvedConfig, XnatError> {
        Self::resolve_layers(path, overrides, Config::from_env())
    }

    /// [`ConfigLoader::resolve`] with the environment layer passed in.
    pub fn resolve_layers(
        path: Option<&str>,
        overrides: Config,
        env: Config,
    ) -> Result<ResolvedConfig, XnatError> {
        let layered = overrides.or(env);
        let file = match path {
            Some(path) => Some(Self::read(Utf8PathBuf::from(path))?),
            None => match Self::default_path() {
                Some(path) => Some(Self::read(path)?),
                None => None,
            },
        };

        match file {
            Some(file) => Self::resolve_config(layered.or(file)),
            None if layered.server.is_none() => Err(XnatError::MissingConfig),
            None => Self::resolve_config(layered),
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, XnatError> {
        let server = config
            .server
            .ok_or(XnatError::MissingSetting("server"))?
            .parse::<ServerUrl>()?;
        let user = config.user.ok_or(XnatError::MissingSetting("user"))?;
        let password = config
            .password
            .ok_or(XnatError::MissingSetting("password"))?;
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        Ok(ResolvedConfig {
            server,
            credentials: Credentials::new(user, password),
            timeout,
        })
    }

    pub fn default_path() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.config_dir().join("xnat-access").join(CONFIG_FILE_NAME))
                    .ok()
            })
            .filter(|path| path.exists())
    }

    fn read(path: Utf8PathBuf) -> Result<Config, XnatError> {
        let content = fs::read_to_string(&path)
            .map_err(|_| XnatError::ConfigRead(path.clone().into_std_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| XnatError::ConfigParse(err.to_string()))
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
