use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

pub const DEFAULT_COMPRESSED_SUFFIX: &str = ".gz";
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
pub const DEFAULT_BLOCK_COUNT: usize = 16;

/// Settings for opening and prefetching files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// File name suffix selecting gzip decompression (case-sensitive).
    pub compressed_suffix: String,
    pub block_size: usize,
    /// Blocks in flight for a plain file. Compressed files split them
    /// between the raw and the decompressed stage.
    pub block_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compressed_suffix: DEFAULT_COMPRESSED_SUFFIX.to_owned(),
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(StreamError::Config(
                "block_size must be positive".to_owned(),
            ));
        }
        if self.block_count == 0 {
            return Err(StreamError::Config(
                "block_count must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn is_compressed(&self, path: &Path) -> bool {
        !self.compressed_suffix.is_empty()
            && path
                .to_string_lossy()
                .ends_with(self.compressed_suffix.as_str())
    }

    /// Block count of the stage reading the raw compressed file.
    pub fn raw_block_count(&self) -> usize {
        (self.block_count / 2).max(1)
    }
}
