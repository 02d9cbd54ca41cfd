//! Writer configuration
//!
//! Tunables for match search, blanking and hunk packing. Every field has a
//! default that reproduces the classic queued-writer behavior.

use crate::error::{BpsError, BpsResult};
use serde::{Deserialize, Serialize};

/// Default match threshold: a match must be longer than this to become a copy
pub const DEFAULT_MATCH_THRESHOLD: usize = 3;

/// BPS writer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Matches found through reuse hints must be longer than this to be
    /// encoded as a source copy, unless they run to the end of the block
    pub match_threshold: usize,
    /// Byte written by blanking hunks
    pub fill_byte: u8,
    /// Run the merge pass again after gap filling
    pub merge_after_fill: bool,
    /// Refuse merges that would produce a hunk longer than this
    pub max_hunk_length: Option<usize>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            fill_byte: 0x00,
            merge_after_fill: false,
            max_hunk_length: None,
        }
    }
}

impl WriterConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the match threshold
    pub fn with_match_threshold(mut self, threshold: usize) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Set the blanking byte
    pub fn with_fill_byte(mut self, byte: u8) -> Self {
        self.fill_byte = byte;
        self
    }

    /// Merge filler hunks with their neighbors as well
    pub fn with_merge_after_fill(mut self, enabled: bool) -> Self {
        self.merge_after_fill = enabled;
        self
    }

    /// Cap merged hunk length
    pub fn with_max_hunk_length(mut self, max: usize) -> Self {
        self.max_hunk_length = Some(max);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> BpsResult<()> {
        if self.max_hunk_length == Some(0) {
            return Err(BpsError::InvalidConfig(
                "max_hunk_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
