use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Hard upper bound on chunk size in tokens; larger chunks are split
    pub max_chunk_tokens: usize,

    /// Heuristic blocks below this size keep accumulating into the next block
    pub min_chunk_tokens: usize,

    /// Target window size in tokens for the fixed-window fallback
    pub window_tokens: usize,

    /// Overlap between consecutive windows, percent of `window_tokens` (10-20)
    pub window_overlap_pct: u8,

    /// Length bound for synthesized parent-context headers, in chars
    pub max_parent_context_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 1024,
            min_chunk_tokens: 12,
            window_tokens: 400,
            window_overlap_pct: 15,
            max_parent_context_chars: 500,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_tokens == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_tokens must be > 0"));
        }
        if self.min_chunk_tokens >= self.max_chunk_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "min_chunk_tokens ({}) must be below max_chunk_tokens ({})",
                self.min_chunk_tokens, self.max_chunk_tokens
            )));
        }
        if self.window_tokens == 0 || self.window_tokens > self.max_chunk_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "window_tokens ({}) must be in 1..={}",
                self.window_tokens, self.max_chunk_tokens
            )));
        }
        if !(10..=20).contains(&self.window_overlap_pct) {
            return Err(ChunkerError::invalid_config(format!(
                "window_overlap_pct ({}) must be within 10-20",
                self.window_overlap_pct
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ChunkerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_bounds() {
        let mut config = ChunkerConfig {
            max_chunk_tokens: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_chunk_tokens = 100;
        config.min_chunk_tokens = 100;
        assert!(config.validate().is_err());

        config.min_chunk_tokens = 10;
        config.window_overlap_pct = 50;
        assert!(config.validate().is_err());
    }
}
