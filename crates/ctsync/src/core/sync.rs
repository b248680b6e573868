//! The reconciliation loop.

use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, field, info, warn, Span};

use ctsync_api::{ApiError, CurrentResource, Draft};

use super::batch::{batch_elements, chunk_keys_by_predicate_length, MAX_PREDICATE_LENGTH};
use super::cache::{ReferenceIdToKeyCache, ResolvedKeys};
use super::error::SyncError;
use super::options::SyncOptions;
use super::references::{collect_draft_ids, expand_all, rewrite_draft_references};
use super::service::{KeyLookup, ResourceKind, ResourceService};
use super::statistics::{BatchOutcome, SyncStatistics};
use super::validator::{BatchValidator, ValidationResult};

/// State scoped to one call of [`ResourceSync::sync`].
struct SyncRun {
    cache: ReferenceIdToKeyCache,
    statistics: Arc<SyncStatistics>,
}

/// Converges the target catalog to a sequence of drafts of one resource
/// kind.
///
/// Each call to [`sync`](Self::sync) is an independent run with its own
/// reference cache and statistics. Batches run with bounded parallelism;
/// the items of one batch are processed sequentially.
pub struct ResourceSync<R: ResourceKind> {
    service: Arc<dyn ResourceService<R>>,
    key_lookup: Arc<dyn KeyLookup>,
    options: SyncOptions<R>,
    cancellation: CancellationToken,
}

impl<R: ResourceKind> ResourceSync<R> {
    pub fn new(
        service: Arc<dyn ResourceService<R>>,
        key_lookup: Arc<dyn KeyLookup>,
        options: SyncOptions<R>,
    ) -> Self {
        Self {
            service,
            key_lookup,
            options,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &SyncOptions<R> {
        &self.options
    }

    /// Cancelling the token stops dispatching new batches. Batches already
    /// in flight run to completion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Synchronizes `drafts` and returns the statistics of this run.
    ///
    /// `None` items stand for absent drafts and are reported as failed.
    #[tracing::instrument(
        name = "ctsync.sync",
        skip_all,
        fields(
            resource = R::RESOURCE_NAME,
            sync.drafts = field::Empty,
            sync.processed = field::Empty,
            sync.created = field::Empty,
            sync.updated = field::Empty,
            sync.failed = field::Empty,
        )
    )]
    pub async fn sync<I>(&self, drafts: I) -> Arc<SyncStatistics>
    where
        I: IntoIterator,
        I::Item: Into<Option<R::Draft>>,
    {
        let drafts: Vec<Option<R::Draft>> = drafts.into_iter().map(Into::into).collect();
        Span::current().record("sync.drafts", drafts.len());

        let run = SyncRun {
            cache: ReferenceIdToKeyCache::new(self.options.cache_size, Arc::clone(&self.key_lookup)),
            statistics: Arc::new(SyncStatistics::new()),
        };

        info!(
            "[ResourceSync] Syncing {} {} draft(s) in batches of {} ({} in parallel)",
            drafts.len(),
            R::RESOURCE_NAME,
            self.options.batch_size,
            self.options.parallelism
        );

        let cancellation = &self.cancellation;
        stream::iter(batch_elements(drafts, self.options.batch_size))
            .take_while(|_| future::ready(!cancellation.is_cancelled()))
            .map(|batch| self.process_batch(&run, batch))
            .buffer_unordered(self.options.parallelism)
            .for_each(|_| future::ready(()))
            .await;

        if cancellation.is_cancelled() {
            warn!(
                "[ResourceSync] {} sync cancelled, remaining batches were not dispatched",
                R::RESOURCE_NAME
            );
        }

        let statistics = run.statistics;
        let snapshot = statistics.snapshot();
        let span = Span::current();
        span.record("sync.processed", snapshot.processed);
        span.record("sync.created", snapshot.created);
        span.record("sync.updated", snapshot.updated);
        span.record("sync.failed", snapshot.failed);

        info!(
            "[ResourceSync] {} sync finished in {:?}. {}",
            R::RESOURCE_NAME,
            statistics.processing_time(),
            snapshot
        );
        statistics
    }

    #[tracing::instrument(
        name = "ctsync.batch",
        skip_all,
        fields(
            resource = R::RESOURCE_NAME,
            batch.size = batch.len(),
            batch.created = field::Empty,
            batch.updated = field::Empty,
            batch.failed = field::Empty,
        )
    )]
    async fn process_batch(&self, run: &SyncRun, batch: Vec<Option<R::Draft>>) {
        let batch_size = batch.len() as u64;
        let outcomes = self.process_drafts(run, batch).await;

        let (mut created, mut updated, mut failed) = (0u64, 0u64, 0u64);
        for outcome in &outcomes {
            match outcome {
                BatchOutcome::Created => created += 1,
                BatchOutcome::Updated => updated += 1,
                BatchOutcome::Failed(_) => failed += 1,
                BatchOutcome::Unchanged => {}
            }
            run.statistics.record(outcome);
        }
        run.statistics.increment_processed(batch_size);

        let span = Span::current();
        span.record("batch.created", created);
        span.record("batch.updated", updated);
        span.record("batch.failed", failed);
        debug!(
            "[ResourceSync] Batch of {} done: {} created, {} updated, {} failed",
            batch_size, created, updated, failed
        );
    }

    /// One outcome per input item.
    async fn process_drafts(
        &self,
        run: &SyncRun,
        batch: Vec<Option<R::Draft>>,
    ) -> Vec<BatchOutcome> {
        let ids = collect_draft_ids(batch.iter().flatten());
        let resolved = match run.cache.fill_all(&ids).await {
            Ok(resolved) => resolved,
            Err(source) => return self.fail_resolution(&batch, source),
        };
        let batch: Vec<Option<R::Draft>> = batch
            .into_iter()
            .map(|draft| draft.map(|draft| self.resolve_draft_references(&resolved, draft)))
            .collect();

        let mut outcomes = Vec::with_capacity(batch.len());
        let ValidationResult {
            valid_drafts,
            referenced_keys,
        } = BatchValidator::<R>::validate(&batch, |error, draft| {
            outcomes.push(self.fail(&error, draft, None, &[]));
        });
        if valid_drafts.is_empty() {
            return outcomes;
        }
        debug!(
            "[ResourceSync] {} valid draft(s) referencing {} key(s)",
            valid_drafts.len(),
            referenced_keys.len()
        );

        let keys: HashSet<String> = valid_drafts
            .iter()
            .filter_map(|draft| draft.key())
            .map(str::to_string)
            .collect();
        let mut existing = match self.fetch_existing(&keys).await {
            Ok(existing) => existing,
            Err(error) => {
                outcomes.extend(
                    valid_drafts
                        .iter()
                        .map(|draft| self.fail(&error, Some(draft), None, &[])),
                );
                return outcomes;
            }
        };
        if let Err(source) = expand_all(&mut existing, &run.cache).await {
            let error = SyncError::reference_resolution(source);
            outcomes.extend(
                valid_drafts
                    .iter()
                    .map(|draft| self.fail(&error, Some(draft), None, &[])),
            );
            return outcomes;
        }

        let existing_by_key: HashMap<String, R::Current> = existing
            .into_iter()
            .filter_map(|current| Some((current.key()?.to_string(), current)))
            .collect();

        for draft in valid_drafts {
            let current = draft
                .key()
                .and_then(|key| existing_by_key.get(key))
                .cloned();
            let outcome = match current {
                Some(current) => self.update(run, draft, current).await,
                None => self.create(draft).await,
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Structurally invalid drafts keep their own error; the rest fail with
    /// the lookup error.
    fn fail_resolution(&self, batch: &[Option<R::Draft>], source: ApiError) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let ValidationResult { valid_drafts, .. } =
            BatchValidator::<R>::validate(batch, |error, draft| {
                outcomes.push(self.fail(&error, draft, None, &[]));
            });
        let error = SyncError::reference_resolution(source);
        outcomes.extend(
            valid_drafts
                .iter()
                .map(|draft| self.fail(&error, Some(draft), None, &[])),
        );
        outcomes
    }

    fn resolve_draft_references(&self, resolved: &ResolvedKeys, mut draft: R::Draft) -> R::Draft {
        for identifier in rewrite_draft_references(&mut draft, resolved) {
            let message = format!(
                "{} reference with id '{}' could not be resolved to a key",
                identifier.type_id,
                identifier.id.as_deref().unwrap_or_default()
            );
            self.warn(&message, Some(&draft), None);
        }
        draft
    }

    async fn fetch_existing(&self, keys: &HashSet<String>) -> Result<Vec<R::Current>, SyncError> {
        let mut existing = Vec::with_capacity(keys.len());
        for chunk in chunk_keys_by_predicate_length(keys, MAX_PREDICATE_LENGTH) {
            let chunk: HashSet<String> = chunk.into_iter().collect();
            let found = self
                .service
                .fetch_matching_by_keys(&chunk)
                .await
                .map_err(|source| {
                    let mut keys: Vec<String> = chunk.iter().cloned().collect();
                    keys.sort();
                    SyncError::FetchExisting { keys, source }
                })?;
            existing.extend(found);
        }
        Ok(existing)
    }

    async fn create(&self, draft: R::Draft) -> BatchOutcome {
        let Some(draft) = self.options.apply_before_create(draft) else {
            debug!("[ResourceSync] Creation cancelled by before-create hook");
            return BatchOutcome::Unchanged;
        };
        let key = draft.key().unwrap_or_default().to_string();

        match self.service.create(&draft).await {
            Ok(created) => {
                debug!(
                    "[ResourceSync] Created {} '{}' with id {}",
                    R::RESOURCE_NAME,
                    key,
                    created.id()
                );
                BatchOutcome::Created
            }
            Err(source) => {
                let error = SyncError::Create { key, source };
                self.fail(&error, Some(&draft), None, &[])
            }
        }
    }

    /// Builds and applies actions, re-fetching and rebuilding after each
    /// version conflict until `max_retries` is used up.
    async fn update(&self, run: &SyncRun, draft: R::Draft, mut current: R::Current) -> BatchOutcome {
        let key = draft.key().unwrap_or_default().to_string();
        let mut conflicts = 0usize;

        loop {
            let actions = R::build_actions(&current, &draft);
            if actions.is_empty() {
                return BatchOutcome::Unchanged;
            }
            let actions = self.options.apply_before_update(actions, &draft, &current);
            if actions.is_empty() {
                debug!("[ResourceSync] Update of '{}' cancelled by before-update hook", key);
                return BatchOutcome::Unchanged;
            }

            match self
                .service
                .update(current.id(), current.version(), &actions)
                .await
            {
                Ok(updated) => {
                    debug!(
                        "[ResourceSync] Updated {} '{}' with {} action(s), now at version {}",
                        R::RESOURCE_NAME,
                        key,
                        actions.len(),
                        updated.version()
                    );
                    return BatchOutcome::Updated;
                }
                Err(source) if source.is_concurrent_modification() => {
                    conflicts += 1;
                    if conflicts > self.options.max_retries {
                        let error = SyncError::RetriesExhausted {
                            key,
                            attempts: conflicts as u32,
                        };
                        return self.fail(&error, Some(&draft), Some(&current), &actions);
                    }
                    warn!(
                        "[ResourceSync] Version conflict on {} '{}' at version {}, re-fetching (retry {}/{})",
                        R::RESOURCE_NAME,
                        key,
                        current.version(),
                        conflicts,
                        self.options.max_retries
                    );
                    current = match self.refetch(run, &key).await {
                        Ok(Some(fresh)) => fresh,
                        Ok(None) => {
                            let error = SyncError::NotFoundOnRetry { key };
                            return self.fail(&error, Some(&draft), Some(&current), &actions);
                        }
                        Err(source) => {
                            let error = SyncError::RefetchFailed { key, source };
                            return self.fail(&error, Some(&draft), Some(&current), &actions);
                        }
                    };
                }
                Err(source) => {
                    let error = SyncError::Update { key, source };
                    return self.fail(&error, Some(&draft), Some(&current), &actions);
                }
            }
        }
    }

    async fn refetch(&self, run: &SyncRun, key: &str) -> Result<Option<R::Current>, ApiError> {
        let Some(mut fresh) = self.service.fetch_by_key(key).await? else {
            return Ok(None);
        };
        expand_all(std::slice::from_mut(&mut fresh), &run.cache).await?;
        Ok(Some(fresh))
    }

    fn fail(
        &self,
        error: &SyncError,
        draft: Option<&R::Draft>,
        current: Option<&R::Current>,
        actions: &[R::Action],
    ) -> BatchOutcome {
        let reason = match error.api_error() {
            Some(cause) => format!("{error}: {cause}"),
            None => error.to_string(),
        };
        error!("[ResourceSync] {} sync failed: {}", R::RESOURCE_NAME, reason);
        self.options
            .apply_error_callback(error, draft, current, actions);
        BatchOutcome::Failed(reason)
    }

    fn warn(&self, message: &str, draft: Option<&R::Draft>, current: Option<&R::Current>) {
        warn!("[ResourceSync] {}", message);
        self.options.apply_warning_callback(message, draft, current);
    }
}
