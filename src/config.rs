// ⚙️ Configuration - reader and writer settings
//
// Everything has a default, so a missing config file, or a file that only
// sets one field, is fine:
//
//   {
//     "reader": { "progress_granules": 20, "repair_links": false },
//     "writer": { "indent": 4 }
//   }

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// READER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Number of progress callbacks over the whole input (0 disables them)
    #[serde(default = "default_progress_granules")]
    pub progress_granules: u32,

    /// Add missing reverse link edges after a load
    #[serde(default = "default_true")]
    pub repair_links: bool,
}

fn default_progress_granules() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            progress_granules: default_progress_granules(),
            repair_links: true,
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Spaces per nesting level (0 writes everything on one line)
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Emit the `<?xml ...?>` declaration
    #[serde(default = "default_true")]
    pub declaration: bool,
}

fn default_indent() -> usize {
    2
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            indent: default_indent(),
            declaration: true,
        }
    }
}

// ============================================================================
// BOTH
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub writer: WriterConfig,
}

impl PersistConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(PersistConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PersistConfig::default();
        assert_eq!(config.reader.progress_granules, 100);
        assert!(config.reader.repair_links);
        assert_eq!(config.writer.indent, 2);
        assert!(config.writer.declaration);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PersistConfig::from_json_str(r#"{ "writer": { "indent": 0 } }"#).unwrap();
        assert_eq!(config.writer.indent, 0);
        assert!(config.writer.declaration);
        assert_eq!(config.reader, ReaderConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = PersistConfig::from_json_str("{ reader: 1 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "reader": {{ "progress_granules": 10 }} }}"#).unwrap();

        let config = PersistConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.reader.progress_granules, 10);
        assert!(config.reader.repair_links);

        let missing = PersistConfig::from_json_file("/nonexistent/trust-wallet.json");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
