//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::generator::{BuildReport, SiteBuilder};
use crate::Site;

/// Load the site and write every page to the output directory
pub fn run(site: &Site) -> Result<BuildReport> {
    let start = Instant::now();

    let loaded = site.load()?;
    let report = SiteBuilder::new(&loaded, &site.base_dir).build_all(&site.output_dir)?;

    tracing::info!(
        "Generated {} pages and copied {} assets in {:.2}s",
        report.routes.len(),
        report.assets,
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}
