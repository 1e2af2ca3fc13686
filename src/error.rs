use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No chords found in the score.")]
    NoChords,

    #[error("Failed to read file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<String> for ChartError {
    fn from(message: String) -> Self {
        ChartError::Parse(message)
    }
}
