use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use w2m::{
    config::Config,
    import::{ImportCoordinatorBuilder, MemoryHost},
};

/// Run a dry-run import of `path` into an in-memory host
pub fn import_export(
    config: Config,
    path: PathBuf,
    mapping: Option<PathBuf>,
    report: Option<PathBuf>,
    max_items: Option<usize>,
    quiet: bool,
) -> Result<()> {
    // Check file exists
    if !path.exists() {
        anyhow::bail!("Export file not found: {}", path.display());
    }

    let mut import_config = config.import;
    if mapping.is_some() {
        import_config.mapping_path = mapping;
    }
    if report.is_some() {
        import_config.report_path = report;
    }
    if max_items.is_some() {
        import_config.max_items_per_pass = max_items;
    }
    let quiet = quiet || import_config.quiet;

    if let Some(ref mapping_path) = import_config.mapping_path {
        // Ensure checkpoint directory exists
        if let Some(parent) = mapping_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create mapping directory: {}", parent.display())
            })?;
        }
    }

    info!("Importing from: {}", path.display());

    let coordinator = ImportCoordinatorBuilder::new()
        .with_config(import_config)
        .with_filters(config.filters)
        .with_quiet(quiet)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create import coordinator: {}", e))?;

    let mut host = MemoryHost::new();
    let report = coordinator
        .process_elements(&path, &mut host)
        .with_context(|| format!("Import of {} failed", path.display()))?;

    if !quiet {
        report.print_summary();
    }

    if !report.is_clean() {
        warn!(
            "Import finished with {} failed items and {} unresolved relations",
            report.total_failed(),
            report.unresolved.len()
        );
    }

    Ok(())
}
