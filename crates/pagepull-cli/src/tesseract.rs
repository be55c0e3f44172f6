//! Optical text extraction through the tesseract CLI.

use std::fs;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use pagepull_engine::OpticalExtractor;
use tracing::debug;

/// Shells out to `tesseract` for header recognition. Only constructed
/// when the binary is actually on PATH.
pub struct TesseractExtractor;

impl TesseractExtractor {
    /// Probe for a working tesseract binary.
    pub fn detect() -> Option<Self> {
        let found = Command::new("tesseract")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success());
        if found {
            debug!("tesseract found on PATH");
        }
        found.then_some(Self)
    }
}

impl OpticalExtractor for TesseractExtractor {
    fn extract(&self, png: &[u8]) -> Result<String> {
        let dir = tempfile::tempdir().context("cannot create temp dir for OCR")?;
        let image_path = dir.path().join("header.png");
        fs::write(&image_path, png).context("cannot write header image")?;

        let output = Command::new("tesseract")
            .arg(&image_path)
            .arg("stdout")
            .stderr(Stdio::null())
            .output()
            .context("failed to run tesseract")?;
        if !output.status.success() {
            bail!("tesseract exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
