use serde::Deserialize;
use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename = "JamroomConfig", default)]
pub struct Config {
    /// Ignored when started with a socket in `LISTEN_FD`.
    pub listen: SocketAddr,
    /// Directory holding `index.html` and the wasm bundle.
    pub static_dir: Option<PathBuf>,
    /// sled database, currently only caching the search API token.
    pub database: PathBuf,
    pub token_url: String,
    pub search_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            static_dir: None,
            database: PathBuf::from("jamroom.db"),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            search_url: "https://api.spotify.com/v1/search".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error reading: {source}")]
    IO {
        #[from]
        source: io::Error,
    },
    #[error("error parsing: {source}")]
    Parse {
        #[from]
        source: ron::Error,
    },
}

impl Config {
    pub fn load(filename: &Path) -> Result<Config, ConfigError> {
        let file = File::open(filename)?;
        let config: Config = ron::de::from_reader(file)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means built-in defaults.
    pub fn load_or_default(filename: &Path) -> Result<Config, ConfigError> {
        match Config::load(filename) {
            Err(ConfigError::IO { source }) if source.kind() == io::ErrorKind::NotFound => {
                warn!(
                    message = "config file not found, using defaults",
                    path = %filename.display(),
                );
                Ok(Config::default())
            }
            result => result,
        }
    }
}
