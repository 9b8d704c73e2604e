//! Command implementations

pub mod benchmark;
pub mod validate;

use anyhow::Result;

/// Write output to file or stdout
pub fn write_output(content: &str, output_path: &Option<std::path::PathBuf>) -> Result<()> {
    if let Some(path) = output_path {
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write output file: {}", e))
    } else {
        println!("{}", content);
        Ok(())
    }
}
