//! Per-entity-type processing passes
//!
//! A processor drives every record of one element kind through
//! parse → create → id registration → meta → translations → relations.
//! Failures are isolated per record: the pass records them and moves on.
//! Only a broken stream ends a pass early.

use super::entity::ImportEntity;
use super::filter::{MetaFilter, MetaFilterList};
use super::host::ImportHost;
use super::id_mapper::IdMapper;
use super::item::Item;
use super::parser::{EntityParser, WpCommentParser, WpPostParser, WpTermParser, WpUserParser};
use super::progress::PassProgress;
use super::reader::XmlNode;
use super::report::PassReport;
use super::resolver::AncestorResolver;
use super::sanitize::ParameterSanitizer;
use super::source::ImportError;
use crate::types::{EntityType, OriginId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared state a pass works against
pub struct ImportContext<'a> {
    pub host: &'a mut dyn ImportHost,
    pub mapper: &'a IdMapper,
    pub resolver: &'a mut AncestorResolver,
    pub filters: Arc<dyn MetaFilterList>,
    /// Stop after this many records
    pub limit: Option<usize>,
    pub progress: Option<&'a PassProgress>,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        host: &'a mut dyn ImportHost,
        mapper: &'a IdMapper,
        resolver: &'a mut AncestorResolver,
        filters: Arc<dyn MetaFilterList>,
    ) -> Self {
        Self {
            host,
            mapper,
            resolver,
            filters,
            limit: None,
            progress: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, progress: &'a PassProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// One entity-type pass over the export file
pub trait ElementProcessor {
    fn entity_type(&self) -> EntityType;

    /// Element name the pass reads
    fn element(&self) -> &'static str;

    /// Process every record the stream yields, in order
    fn process_all(
        &self,
        nodes: &mut dyn Iterator<Item = Result<XmlNode, ImportError>>,
        ctx: &mut ImportContext<'_>,
    ) -> PassReport;
}

/// What happened to a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Imported,
    Skipped,
}

/// Generic processor over an entity parser
#[derive(Debug, Clone, Default)]
pub struct EntityProcessor<P> {
    parser: P,
}

pub type UserProcessor = EntityProcessor<WpUserParser>;
pub type TermProcessor = EntityProcessor<WpTermParser>;
pub type PostProcessor = EntityProcessor<WpPostParser>;
pub type CommentProcessor = EntityProcessor<WpCommentParser>;

impl<P: EntityParser> EntityProcessor<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Import one record; on failure return the origin id if it was known
    fn process_item(
        &self,
        node: &XmlNode,
        ctx: &mut ImportContext<'_>,
        report: &mut PassReport,
    ) -> Result<ItemOutcome, (Option<OriginId>, ImportError)> {
        let entity_type = P::Entity::ENTITY_TYPE;

        let mut entity = self
            .parser
            .parse(&Item::new(node))
            .map_err(|e| (None, e))?;
        let origin_id = entity.origin_id();

        if ctx.mapper.is_restored(entity_type, origin_id) {
            debug!("Skipping {} {}: imported by a previous run", entity_type, origin_id);
            return Ok(ItemOutcome::Skipped);
        }

        if let Some(existing) = ctx.mapper.resolve(entity_type, origin_id) {
            return Err((
                Some(origin_id),
                ImportError::Duplicate {
                    entity_type,
                    origin_id,
                    existing,
                },
            ));
        }

        let local_id = entity.create_in(&mut *ctx.host).map_err(|source| {
            (
                Some(origin_id),
                ImportError::HostImport {
                    entity_type,
                    origin_id,
                    source,
                },
            )
        })?;

        ctx.mapper
            .assign(&mut entity, local_id)
            .map_err(|e| (Some(origin_id), e))?;
        debug!("Imported {} {} as {}", entity_type, origin_id, local_id);

        let meta_filter = MetaFilter::new(ctx.filters.clone(), entity_type);
        for meta in entity.meta() {
            let value = meta_filter.filter_value(meta, local_id);
            if let Err(e) = ctx.host.set_meta(entity_type, local_id, &meta.key, &value) {
                report.warnings.push(format!(
                    "{} {}: meta '{}' not stored: {}",
                    entity_type, origin_id, meta.key, e
                ));
            }
        }

        let relations = entity.locale_relations();
        if !relations.is_empty() {
            if let Err(e) = ctx.host.link_translations(entity_type, local_id, relations) {
                report.warnings.push(format!(
                    "{} {}: translations not linked: {}",
                    entity_type, origin_id, e
                ));
            }
        }

        for reference in entity.references() {
            if let Err(e) = ctx.resolver.resolve_or_defer(
                &mut *ctx.host,
                local_id,
                reference.origin_id,
                reference.kind,
            ) {
                report.warnings.push(format!(
                    "{} {}: {} to {} not applied: {}",
                    entity_type, origin_id, reference.kind, reference.origin_id, e
                ));
            }
        }

        Ok(ItemOutcome::Imported)
    }
}

impl<P: EntityParser> ElementProcessor for EntityProcessor<P> {
    fn entity_type(&self) -> EntityType {
        P::Entity::ENTITY_TYPE
    }

    fn element(&self) -> &'static str {
        self.parser.element()
    }

    fn process_all(
        &self,
        nodes: &mut dyn Iterator<Item = Result<XmlNode, ImportError>>,
        ctx: &mut ImportContext<'_>,
    ) -> PassReport {
        let entity_type = self.entity_type();
        let start = Instant::now();
        let mut report = PassReport::new(entity_type);

        loop {
            if let Some(limit) = ctx.limit {
                if report.processed >= limit {
                    info!("Reached {} limit of {} items", entity_type, limit);
                    break;
                }
            }

            let node = match nodes.next() {
                None => break,
                Some(Ok(node)) => node,
                Some(Err(e)) if e.is_stream_error() => {
                    warn!("{} pass stopped early: {}", entity_type, e);
                    report.stream_error = Some(e.to_string());
                    break;
                }
                Some(Err(e)) => {
                    report.processed += 1;
                    warn!("Error reading {} #{}: {}", entity_type, report.processed, e);
                    report.record_failure(report.processed, None, &e);
                    continue;
                }
            };

            report.processed += 1;
            let position = report.processed;

            match self.process_item(&node, ctx, &mut report) {
                Ok(ItemOutcome::Imported) => report.imported += 1,
                Ok(ItemOutcome::Skipped) => report.skipped += 1,
                Err((origin_id, e)) => {
                    match origin_id {
                        Some(id) => warn!(
                            "Failed {} #{} (origin {}): {}",
                            entity_type, position, id, e
                        ),
                        None => warn!("Failed {} #{}: {}", entity_type, position, e),
                    }
                    report.record_failure(position, origin_id, &e);
                }
            }

            if let Some(progress) = ctx.progress {
                progress.item_processed(&report);
            }
        }

        report.elapsed_seconds = start.elapsed().as_secs_f64();
        report
    }
}

/// The four passes in dependency order
pub fn default_processors(
    sanitizer: Arc<dyn ParameterSanitizer>,
) -> Vec<Box<dyn ElementProcessor>> {
    vec![
        Box::new(UserProcessor::new(WpUserParser::new(sanitizer.clone()))),
        Box::new(TermProcessor::new(WpTermParser::new(sanitizer.clone()))),
        Box::new(PostProcessor::new(WpPostParser::new(sanitizer.clone()))),
        Box::new(CommentProcessor::new(WpCommentParser::new(sanitizer))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::filter::FilterRegistry;
    use crate::import::host::MemoryHost;
    use crate::import::reader::XmlNodeReader;
    use crate::types::{LocalId, RelationKind};
    use std::io::Cursor;

    struct Fixture {
        host: MemoryHost,
        mapper: Arc<IdMapper>,
        resolver: AncestorResolver,
    }

    impl Fixture {
        fn new(host: MemoryHost) -> Self {
            let mapper = Arc::new(IdMapper::new());
            let resolver = AncestorResolver::new(mapper.clone());
            Self {
                host,
                mapper,
                resolver,
            }
        }

        fn run<P: EntityParser + Default>(
            &mut self,
            xml: &str,
            limit: Option<usize>,
        ) -> PassReport {
            let processor = EntityProcessor::new(P::default());
            let mut reader =
                XmlNodeReader::new(Cursor::new(xml.as_bytes().to_vec()), processor.element());
            let mut ctx = ImportContext::new(
                &mut self.host,
                &self.mapper,
                &mut self.resolver,
                Arc::new(FilterRegistry::new()),
            )
            .with_limit(limit);
            processor.process_all(&mut reader, &mut ctx)
        }
    }

    fn author(id: &str, login: &str) -> String {
        format!(
            "<wp:author><wp:author_id>{}</wp:author_id><wp:author_login>{}</wp:author_login></wp:author>",
            id, login
        )
    }

    #[test]
    fn test_created_id_is_assigned_and_registered() {
        let mut fixture = Fixture::new(MemoryHost::new().with_first_id(100));
        let xml = format!("<rss>{}{}</rss>", author("1", "a"), author("2", "b"));

        let report = fixture.run::<WpUserParser>(&xml, None);

        assert_eq!(report.imported, 2);
        assert!(report.failed.is_empty());
        assert_eq!(
            fixture.mapper.resolve(EntityType::User, OriginId(2)),
            Some(LocalId(101))
        );
    }

    #[test]
    fn test_malformed_item_does_not_abort_pass() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let xml = format!(
            "<rss>{}<wp:author><wp:author_login>no-id</wp:author_login></wp:author>{}</rss>",
            author("1", "a"),
            author("3", "c")
        );

        let report = fixture.run::<WpUserParser>(&xml, None);

        assert_eq!(report.processed, 3);
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].position, 2);
        assert_eq!(report.failed[0].origin_id, None);
    }

    #[test]
    fn test_host_failure_is_recorded_with_origin_id() {
        let mut fixture = Fixture::new(MemoryHost::new().reject(EntityType::User, OriginId(2)));
        let xml = format!("<rss>{}{}</rss>", author("1", "a"), author("2", "b"));

        let report = fixture.run::<WpUserParser>(&xml, None);

        assert_eq!(report.imported, 1);
        assert_eq!(report.failed[0].origin_id, Some(OriginId(2)));
        assert_eq!(fixture.mapper.resolve(EntityType::User, OriginId(2)), None);
    }

    #[test]
    fn test_duplicate_origin_id_is_not_created_twice() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let xml = "<rss>\
            <item><wp:post_id>1</wp:post_id><title>First</title></item>\
            <item><wp:post_id>1</wp:post_id><title>Again</title></item>\
            </rss>";

        let report = fixture.run::<WpPostParser>(xml, None);

        assert_eq!(report.imported, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].origin_id, Some(OriginId(1)));
        assert!(report.failed[0].error.contains("Duplicate post origin id 1"));
        assert_eq!(fixture.host.created_of(EntityType::Post).len(), report.imported);
    }

    #[test]
    fn test_stream_error_ends_pass_keeping_earlier_items() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let xml = format!("<rss>{}{}</oops>", author("1", "a"), author("2", "b"));

        let report = fixture.run::<WpUserParser>(&xml, None);

        assert_eq!(report.imported, 2);
        assert!(report.stream_error.is_some());
    }

    #[test]
    fn test_limit_stops_pass() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let xml = format!(
            "<rss>{}{}{}</rss>",
            author("1", "a"),
            author("2", "b"),
            author("3", "c")
        );

        let report = fixture.run::<WpUserParser>(&xml, Some(2));
        assert_eq!(report.processed, 2);
        assert_eq!(fixture.host.created().len(), 2);
    }

    #[test]
    fn test_forward_parent_is_deferred() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let xml = "<rss>\
            <item><wp:post_id>1</wp:post_id><wp:post_parent>2</wp:post_parent></item>\
            <item><wp:post_id>2</wp:post_id></item>\
            </rss>";

        let report = fixture.run::<WpPostParser>(xml, None);
        assert_eq!(report.imported, 2);
        assert_eq!(fixture.resolver.pending().len(), 1);

        assert_eq!(fixture.resolver.flush_pending(&mut fixture.host).applied, 1);
        assert_eq!(fixture.host.relations()[0].kind, RelationKind::PostParent);
    }

    #[test]
    fn test_translation_failure_is_a_warning() {
        let mut fixture = Fixture::new(MemoryHost::new().reject_translations());
        let xml = "<rss><wp:category><wp:term_id>4</wp:term_id>\
            <wp:translation><wp:locale>de_DE</wp:locale><wp:element_id>14</wp:element_id></wp:translation>\
            </wp:category></rss>";

        let report = fixture.run::<WpTermParser>(xml, None);
        assert_eq!(report.imported, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_restored_items_are_skipped() {
        let mut fixture = Fixture::new(MemoryHost::new());
        let checkpoint = crate::import::id_mapper::MappingCheckpoint {
            source_path: "export.xml".into(),
            timestamp: chrono::Utc::now(),
            mappings: vec![crate::import::id_mapper::IdMapping {
                entity_type: EntityType::User,
                origin_id: OriginId(1),
                local_id: LocalId(40),
            }],
            pending: Vec::new(),
        };
        fixture.mapper.restore(&checkpoint).unwrap();

        let xml = format!("<rss>{}{}</rss>", author("1", "a"), author("2", "b"));
        let report = fixture.run::<WpUserParser>(&xml, None);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.imported, 1);
        assert_eq!(fixture.host.created().len(), 1);
    }
}
