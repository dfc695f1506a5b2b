use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::utils::{FromRadix, parse_int};

const RC_FILE_NAMES: [&str; 2] = [".uvccrc", ".uvccrc.json"];
const USER_CONFIG_FILE_NAME: &str = "config.json";

/// Numeric config entry: a JSON number or a hex/decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ConfigNumber {
    Number(u64),
    Text(String),
}

/// Contents of a JSON config file. Unrecognised keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFileContents {
    vendor: Option<ConfigNumber>,
    product: Option<ConfigNumber>,
    address: Option<ConfigNumber>,
    verbose: Option<bool>,
    strict_selector: Option<bool>,
}

/// Parsed and validated config file.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct ConfigFile {
    pub(crate) vendor: Option<u16>,
    pub(crate) product: Option<u16>,
    pub(crate) address: Option<u8>,
    pub(crate) verbose: Option<bool>,
    pub(crate) strict_selector: Option<bool>,
}

impl ConfigFile {
    /// Reads and validates a config file.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let contents: ConfigFileContents =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            vendor: config_number(path, "vendor", contents.vendor)?,
            product: config_number(path, "product", contents.product)?,
            address: config_number(path, "address", contents.address)?,
            verbose: contents.verbose,
            strict_selector: contents.strict_selector,
        })
    }

    /// Finds the config file to use.
    ///
    /// An explicit path wins. Otherwise the nearest `.uvccrc` or
    /// `.uvccrc.json` from `working_dir` upwards is used, then
    /// `user_config` when it exists.
    pub(crate) fn locate(
        explicit: Option<&Path>,
        working_dir: &Path,
        user_config: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let rc_file = working_dir.ancestors().find_map(|directory| {
            RC_FILE_NAMES
                .iter()
                .map(|name| directory.join(name))
                .find(|candidate| candidate.is_file())
        });
        if rc_file.is_some() {
            return rc_file;
        }

        user_config
            .filter(|path| path.is_file())
            .map(Path::to_path_buf)
    }
}

/// Default location of the per-user config file.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "uvcc")?;
    Some(project_dirs.config_dir().join(USER_CONFIG_FILE_NAME))
}

/// Locates and loads the config file, if any.
pub(crate) fn load_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<ConfigFile, ConfigError> {
    let user_config = user_config_path();
    match ConfigFile::locate(explicit, working_dir, user_config.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            ConfigFile::load(&path)
        }
        None => Ok(ConfigFile::default()),
    }
}

fn config_number<T: FromRadix>(
    path: &Path,
    key: &'static str,
    value: Option<ConfigNumber>,
) -> Result<Option<T>, ConfigError> {
    let text = match value {
        None => return Ok(None),
        Some(ConfigNumber::Number(number)) => number.to_string(),
        Some(ConfigNumber::Text(text)) => text,
    };
    parse_int(&text)
        .map(Some)
        .map_err(|_source| ConfigError::InvalidNumber {
            path: path.to_path_buf(),
            key,
            value: text,
        })
}
