use std::io;
use std::path::PathBuf;

use fieldrev_recon::{SubmissionPayload, SubmissionSink};

/// Writes the payload as pretty-printed JSON to a file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SubmissionSink for JsonFileSink {
    type Error = io::Error;

    fn submit(&mut self, payload: &SubmissionPayload) -> Result<(), Self::Error> {
        let json = serde_json::to_string_pretty(payload).map_err(io::Error::other)?;
        std::fs::write(&self.path, json)?;
        log::info!("wrote payload to {}", self.path.display());
        Ok(())
    }
}
