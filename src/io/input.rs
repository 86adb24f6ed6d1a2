use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Whether a path argument means stdin/stdout
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read a transcript from a file, or from stdin when the path is `-`
pub fn read_transcript(path: &Path) -> Result<String> {
    let content = if is_stdio(path) {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read transcript from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?
    };

    if content.trim().is_empty() {
        bail!("Input transcript is empty");
    }

    Ok(content)
}
