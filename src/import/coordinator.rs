//! Import coordinator that orchestrates the passes over an export file

use super::filter::{FilterRegistry, FilterRule, MetaFilterList};
use super::host::ImportHost;
use super::id_mapper::{IdMapper, MappingCheckpoint};
use super::processor::{default_processors, ElementProcessor, ImportContext};
use super::progress::PassProgress;
use super::reader::XmlNodeReader;
use super::report::{PassReport, RunReport};
use super::resolver::AncestorResolver;
use super::sanitize::{ParameterSanitizer, TypeCastSanitizer};
use super::source::{ImportConfig, ImportError};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Import coordinator for a full export migration
pub struct ImportCoordinator {
    /// Import configuration
    config: ImportConfig,
    /// Shared origin → local id map
    mapper: Arc<IdMapper>,
    /// Custom field filter chains
    filters: Arc<dyn MetaFilterList>,
    /// Passes in dependency order
    processors: Vec<Box<dyn ElementProcessor>>,
    /// Quiet mode
    quiet: bool,
}

impl ImportCoordinator {
    /// Create a coordinator with the default parsers and no filters
    pub fn new(config: ImportConfig) -> Self {
        let mapper = Arc::new(IdMapper::new());
        let filters: Arc<dyn MetaFilterList> = Arc::new(FilterRegistry::new());
        let quiet = config.quiet;

        Self::assemble(config, mapper, filters, Arc::new(TypeCastSanitizer), quiet)
    }

    fn assemble(
        config: ImportConfig,
        mapper: Arc<IdMapper>,
        filters: Arc<dyn MetaFilterList>,
        sanitizer: Arc<dyn ParameterSanitizer>,
        quiet: bool,
    ) -> Self {
        mapper.on_register(|mapping| {
            debug!(
                "Mapped {} {} -> {}",
                mapping.entity_type, mapping.origin_id, mapping.local_id
            );
        });

        Self {
            config,
            mapper,
            filters,
            processors: default_processors(sanitizer),
            quiet,
        }
    }

    /// Set quiet mode (no progress output)
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The id map shared by all passes
    pub fn mapper(&self) -> &Arc<IdMapper> {
        &self.mapper
    }

    /// Run every pass over `path` against `host`
    ///
    /// Only an unreadable input file fails the run; everything else ends up
    /// in the returned report.
    pub fn process_elements(
        &self,
        path: impl AsRef<Path>,
        host: &mut dyn ImportHost,
    ) -> Result<RunReport, ImportError> {
        let path = path.as_ref();
        let start = Instant::now();

        // Fail fast on a missing or unreadable file
        let metadata = std::fs::metadata(path)?;
        std::fs::File::open(path)?;
        info!(
            "Starting import from: {} ({} MB)",
            path.display(),
            metadata.len() / 1_000_000
        );

        let mut resolver = AncestorResolver::new(self.mapper.clone());
        self.restore_mapping(&mut resolver)?;

        let mut report = RunReport::new(path);

        for processor in &self.processors {
            let entity_type = processor.entity_type();
            info!("Starting {} pass", entity_type);

            let progress = PassProgress::new(entity_type, self.quiet);
            let mut pass = match XmlNodeReader::open(path, processor.element()) {
                Ok(mut reader) => {
                    let mut ctx = ImportContext::new(
                        &mut *host,
                        &self.mapper,
                        &mut resolver,
                        self.filters.clone(),
                    )
                    .with_limit(self.config.max_items_per_pass)
                    .with_progress(&progress);

                    let pass = processor.process_all(&mut reader, &mut ctx);
                    debug!(
                        "{} pass read {} bytes",
                        entity_type,
                        reader.byte_position()
                    );
                    pass
                }
                Err(e) => {
                    warn!(
                        "Could not reopen {} for {} pass: {}",
                        path.display(),
                        entity_type,
                        e
                    );
                    let mut pass = PassReport::new(entity_type);
                    pass.stream_error = Some(e.to_string());
                    pass
                }
            };

            let flushed = resolver.flush_pending(&mut *host);
            for (relation, e) in flushed.failed {
                pass.warnings.push(format!("{} dropped: {}", relation, e));
            }
            progress.finish(&pass);

            info!(
                "Finished {} pass: {} imported, {} skipped, {} failed, {} deferred relations applied",
                entity_type,
                pass.imported,
                pass.skipped,
                pass.failed.len(),
                flushed.applied
            );
            report.passes.push(pass);

            self.save_mapping(path, &resolver);
        }

        // Final flush after the last pass
        let flushed = resolver.flush_pending(&mut *host);
        for (relation, e) in flushed.failed {
            report.warnings.push(format!("{} dropped: {}", relation, e));
        }
        self.save_mapping(path, &resolver);

        report.unresolved = resolver.take_unresolved();
        for relation in &report.unresolved {
            warn!("Unresolved relation: {}", relation);
        }

        report.elapsed_seconds = start.elapsed().as_secs_f64();
        info!(
            "Import finished: {} imported, {} failed, {} unresolved relations in {:.1}s",
            report.total_imported(),
            report.total_failed(),
            report.unresolved.len(),
            report.elapsed_seconds
        );

        if let Some(ref report_path) = self.config.report_path {
            match report.save(report_path) {
                Ok(()) => info!("Wrote run report to {}", report_path.display()),
                Err(e) => {
                    warn!("Failed to write run report to {}: {}", report_path.display(), e);
                    report.warnings.push(format!(
                        "run report not written to {}: {}",
                        report_path.display(),
                        e
                    ));
                }
            }
        }

        Ok(report)
    }

    /// Load the mapping checkpoint, if configured and present, and re-park
    /// its pending relations
    fn restore_mapping(&self, resolver: &mut AncestorResolver) -> Result<(), ImportError> {
        let Some(ref mapping_path) = self.config.mapping_path else {
            return Ok(());
        };
        if !mapping_path.exists() {
            debug!("No mapping checkpoint at {}", mapping_path.display());
            return Ok(());
        }

        let checkpoint = MappingCheckpoint::load(mapping_path)?;
        info!(
            "Resuming from mapping checkpoint of {} ({} mappings, {} pending relations)",
            checkpoint.timestamp,
            checkpoint.mappings.len(),
            checkpoint.pending.len()
        );
        self.mapper.restore(&checkpoint)?;
        resolver.restore_pending(&checkpoint.pending);
        Ok(())
    }

    /// Persist the mapping and pending relations; failures only warn
    fn save_mapping(&self, source_path: &Path, resolver: &AncestorResolver) {
        if let Some(ref mapping_path) = self.config.mapping_path {
            let checkpoint = self
                .mapper
                .checkpoint(source_path)
                .with_pending(resolver.pending());
            if let Err(e) = checkpoint.save(mapping_path) {
                warn!("Failed to save mapping checkpoint: {}", e);
            }
        }
    }
}

/// Builder for ImportCoordinator with sensible defaults
pub struct ImportCoordinatorBuilder {
    config: ImportConfig,
    rules: Vec<FilterRule>,
    filters: Option<Arc<dyn MetaFilterList>>,
    sanitizer: Arc<dyn ParameterSanitizer>,
    quiet: bool,
}

impl ImportCoordinatorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: ImportConfig::default(),
            rules: Vec::new(),
            filters: None,
            sanitizer: Arc::new(TypeCastSanitizer),
            quiet: false,
        }
    }

    /// Set import configuration
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.quiet = self.quiet || config.quiet;
        self.config = config;
        self
    }

    /// Configure meta filter rules
    pub fn with_filters(mut self, rules: Vec<FilterRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Use a custom filter source instead of configured rules
    pub fn with_filter_list(mut self, filters: Arc<dyn MetaFilterList>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Replace the attribute sanitizer used by all parsers
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn ParameterSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Set maximum items per pass
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.config.max_items_per_pass = max_items;
        self
    }

    /// Set mapping checkpoint path
    pub fn with_mapping(mut self, path: impl AsRef<Path>) -> Self {
        self.config.mapping_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set quiet mode
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Build the coordinator
    pub fn build(self) -> Result<ImportCoordinator, ImportError> {
        if self.config.max_items_per_pass == Some(0) {
            return Err(ImportError::Config(
                "max_items_per_pass must be greater than 0".into(),
            ));
        }

        let mapper = Arc::new(IdMapper::new());
        let filters = match self.filters {
            Some(filters) => filters,
            None => Arc::new(FilterRegistry::from_rules(&self.rules, mapper.clone())),
        };

        Ok(ImportCoordinator::assemble(
            self.config,
            mapper,
            filters,
            self.sanitizer,
            self.quiet,
        ))
    }
}

impl Default for ImportCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
