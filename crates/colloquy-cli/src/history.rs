use anyhow::{Context, Result};
use colloquy_llm::{Transcript, WireMessage};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file holding the transcript between runs
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved transcript; `None` if the file does not exist yet
    pub fn load(&self) -> Result<Option<Transcript>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history file {}", self.path.display()))?;
        let messages: Vec<WireMessage> = serde_json::from_str(&data)
            .with_context(|| format!("Invalid history file {}", self.path.display()))?;
        let transcript = Transcript::from_wire_format(messages)
            .with_context(|| format!("Invalid history file {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), turns = transcript.len(), "Loaded history");
        Ok(Some(transcript))
    }

    /// Write the transcript, replacing the previous file in one rename
    pub fn save(&self, transcript: &Transcript) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let data = serde_json::to_string_pretty(&transcript.to_wire_format())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), turns = transcript.len(), "Saved history");
        Ok(())
    }
}
