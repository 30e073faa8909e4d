#![allow(dead_code)]

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use hybridrag::{Config, IngestDocument};

pub struct TestHarness {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            config: Config::default(),
        })
    }

    /// Write `documents` as a JSONL corpus file and return its path
    pub fn write_corpus(&self, name: &str, documents: &[IngestDocument]) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        let mut file = std::fs::File::create(&path)?;
        for document in documents {
            writeln!(file, "{}", serde_json::to_string(document)?)?;
        }
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
