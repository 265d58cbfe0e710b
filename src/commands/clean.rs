//! Clean the output directory

use anyhow::Result;
use std::fs;

use crate::Site;

/// Remove the output directory if it exists
pub fn run(site: &Site) -> Result<()> {
    if site.output_dir.exists() {
        fs::remove_dir_all(&site.output_dir)?;
        tracing::info!("Deleted: {:?}", site.output_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_output() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        fs::create_dir_all(site.output_dir.join("public")).unwrap();
        fs::write(site.output_dir.join("index.html"), "x").unwrap();

        run(&site).unwrap();
        assert!(!site.output_dir.exists());

        // Nothing to clean is fine
        run(&site).unwrap();
    }
}
