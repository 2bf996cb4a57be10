use crate::Error;

use serde::{Deserialize, Serialize};

use std::fs;
use std::path::Path;

/// Runtime settings for the translator and CPU driver.
///
/// Policies that must be identical between the interpreter and the compiler, like overflow
/// trapping, are cargo features instead, see [`crate::IGNORE_OVERFLOW`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The maximum number of instructions in a translated block. A branch and its delay slot may
    /// exceed this by one.
    pub max_block_len: usize,
    /// Track registers holding known constants while compiling a block.
    pub fold_constants: bool,
    /// Keep translated blocks around keyed by their start address.
    pub cache_blocks: bool,
    /// Log the micro-operations of every translated block.
    pub trace_blocks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_block_len: 64,
            fold_constants: true,
            cache_blocks: true,
            trace_blocks: false,
        }
    }
}

impl Config {
    pub fn from_toml(src: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&src)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_block_len == 0 {
            return Err(Error::InvalidConfig("max_block_len must be at least 1"));
        }
        Ok(())
    }
}
