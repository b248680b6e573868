//! Knobs and caller hooks for a sync run.

use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::cache::DEFAULT_CACHE_SIZE;
use super::error::SyncError;
use super::service::ResourceKind;

pub const DEFAULT_BATCH_SIZE: usize = 30;
pub const DEFAULT_MAX_RETRIES: usize = 1;
pub const DEFAULT_PARALLELISM: usize = 1;

pub type ErrorCallback<R> = Arc<
    dyn Fn(
            &SyncError,
            Option<&<R as ResourceKind>::Draft>,
            Option<&<R as ResourceKind>::Current>,
            &[<R as ResourceKind>::Action],
        ) + Send
        + Sync,
>;

pub type WarningCallback<R> = Arc<
    dyn Fn(&str, Option<&<R as ResourceKind>::Draft>, Option<&<R as ResourceKind>::Current>)
        + Send
        + Sync,
>;

pub type BeforeCreateCallback<R> = Arc<
    dyn Fn(<R as ResourceKind>::Draft) -> Option<<R as ResourceKind>::Draft> + Send + Sync,
>;

pub type BeforeUpdateCallback<R> = Arc<
    dyn Fn(
            Vec<<R as ResourceKind>::Action>,
            &<R as ResourceKind>::Draft,
            &<R as ResourceKind>::Current,
        ) -> Vec<<R as ResourceKind>::Action>
        + Send
        + Sync,
>;

/// Configuration of one [`ResourceSync`](super::sync::ResourceSync).
pub struct SyncOptions<R: ResourceKind> {
    pub batch_size: usize,
    pub cache_size: usize,
    /// Extra attempts after a version conflict.
    pub max_retries: usize,
    /// Batches in flight at once.
    pub parallelism: usize,
    error_callback: Option<ErrorCallback<R>>,
    warning_callback: Option<WarningCallback<R>>,
    before_create: Option<BeforeCreateCallback<R>>,
    before_update: Option<BeforeUpdateCallback<R>>,
}

impl<R: ResourceKind> Clone for SyncOptions<R> {
    fn clone(&self) -> Self {
        Self {
            batch_size: self.batch_size,
            cache_size: self.cache_size,
            max_retries: self.max_retries,
            parallelism: self.parallelism,
            error_callback: self.error_callback.clone(),
            warning_callback: self.warning_callback.clone(),
            before_create: self.before_create.clone(),
            before_update: self.before_update.clone(),
        }
    }
}

impl<R: ResourceKind> fmt::Debug for SyncOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("resource", &R::RESOURCE_NAME)
            .field("batch_size", &self.batch_size)
            .field("cache_size", &self.cache_size)
            .field("max_retries", &self.max_retries)
            .field("parallelism", &self.parallelism)
            .field("error_callback", &self.error_callback.is_some())
            .field("warning_callback", &self.warning_callback.is_some())
            .field("before_create", &self.before_create.is_some())
            .field("before_update", &self.before_update.is_some())
            .finish()
    }
}

impl<R: ResourceKind> Default for SyncOptions<R> {
    fn default() -> Self {
        SyncOptionsBuilder::new().build()
    }
}

impl<R: ResourceKind> SyncOptions<R> {
    pub fn builder() -> SyncOptionsBuilder<R> {
        SyncOptionsBuilder::new()
    }

    pub fn apply_error_callback(
        &self,
        error: &SyncError,
        draft: Option<&R::Draft>,
        current: Option<&R::Current>,
        actions: &[R::Action],
    ) {
        if let Some(callback) = &self.error_callback {
            callback(error, draft, current, actions);
        }
    }

    pub fn apply_warning_callback(
        &self,
        message: &str,
        draft: Option<&R::Draft>,
        current: Option<&R::Current>,
    ) {
        if let Some(callback) = &self.warning_callback {
            callback(message, draft, current);
        }
    }

    /// `None` cancels the creation.
    pub fn apply_before_create(&self, draft: R::Draft) -> Option<R::Draft> {
        match &self.before_create {
            Some(callback) => callback(draft),
            None => Some(draft),
        }
    }

    /// Not invoked for an empty action list. An empty result cancels the
    /// update.
    pub fn apply_before_update(
        &self,
        actions: Vec<R::Action>,
        draft: &R::Draft,
        current: &R::Current,
    ) -> Vec<R::Action> {
        match &self.before_update {
            Some(callback) if !actions.is_empty() => callback(actions, draft, current),
            _ => actions,
        }
    }
}

/// Builder for [`SyncOptions`].
///
/// Numeric settings below 1 are ignored and the default is kept.
pub struct SyncOptionsBuilder<R: ResourceKind> {
    options: SyncOptions<R>,
}

impl<R: ResourceKind> Default for SyncOptionsBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn at_least_one(setting: &str, value: usize, current: usize) -> usize {
    if value < 1 {
        warn!(
            "[SyncOptions] Ignoring {} = {}, keeping {}",
            setting, value, current
        );
        current
    } else {
        value
    }
}

impl<R: ResourceKind> SyncOptionsBuilder<R> {
    pub fn new() -> Self {
        Self {
            options: SyncOptions {
                batch_size: DEFAULT_BATCH_SIZE,
                cache_size: DEFAULT_CACHE_SIZE,
                max_retries: DEFAULT_MAX_RETRIES,
                parallelism: DEFAULT_PARALLELISM,
                error_callback: None,
                warning_callback: None,
                before_create: None,
                before_update: None,
            },
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = at_least_one("batch_size", batch_size, self.options.batch_size);
        self
    }

    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.options.cache_size = at_least_one("cache_size", cache_size, self.options.cache_size);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.options.max_retries =
            at_least_one("max_retries", max_retries, self.options.max_retries);
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.options.parallelism =
            at_least_one("parallelism", parallelism, self.options.parallelism);
        self
    }

    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncError, Option<&R::Draft>, Option<&R::Current>, &[R::Action])
            + Send
            + Sync
            + 'static,
    {
        self.options.error_callback = Some(Arc::new(callback));
        self
    }

    pub fn warning_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Option<&R::Draft>, Option<&R::Current>) + Send + Sync + 'static,
    {
        self.options.warning_callback = Some(Arc::new(callback));
        self
    }

    pub fn before_create<F>(mut self, callback: F) -> Self
    where
        F: Fn(R::Draft) -> Option<R::Draft> + Send + Sync + 'static,
    {
        self.options.before_create = Some(Arc::new(callback));
        self
    }

    pub fn before_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(Vec<R::Action>, &R::Draft, &R::Current) -> Vec<R::Action> + Send + Sync + 'static,
    {
        self.options.before_update = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> SyncOptions<R> {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::TaxCategoryResource;
    use ctsync_api::tax_category::{TaxCategory, TaxCategoryDraft, TaxCategoryUpdateAction};
    use std::sync::Mutex;

    fn current() -> TaxCategory {
        TaxCategory {
            id: "id".into(),
            key: Some("k".into()),
            version: 1,
            name: "old".into(),
            description: None,
            rates: vec![],
        }
    }

    #[test]
    fn defaults() {
        let options = SyncOptions::<TaxCategoryResource>::default();
        assert_eq!(options.batch_size, 30);
        assert_eq!(options.cache_size, 10_000);
        assert_eq!(options.max_retries, 1);
        assert_eq!(options.parallelism, 1);
    }

    #[test]
    fn values_below_one_keep_defaults() {
        let options = SyncOptions::<TaxCategoryResource>::builder()
            .batch_size(0)
            .cache_size(0)
            .parallelism(0)
            .max_retries(3)
            .build();
        assert_eq!(options.batch_size, 30);
        assert_eq!(options.cache_size, 10_000);
        assert_eq!(options.parallelism, 1);
        assert_eq!(options.max_retries, 3);
    }

    #[test]
    fn before_update_skipped_for_empty_actions() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let options = SyncOptions::<TaxCategoryResource>::builder()
            .before_update(move |actions, _, _| {
                *counter.lock().unwrap() += 1;
                actions
            })
            .build();
        let draft = TaxCategoryDraft::new("k", "new");

        assert!(options.apply_before_update(vec![], &draft, &current()).is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);

        let actions = vec![TaxCategoryUpdateAction::ChangeName { name: "new".into() }];
        assert_eq!(
            options.apply_before_update(actions.clone(), &draft, &current()),
            actions
        );
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn before_create_can_cancel() {
        let options = SyncOptions::<TaxCategoryResource>::builder()
            .before_create(|draft| (draft.name != "skip").then_some(draft))
            .build();

        assert!(options.apply_before_create(TaxCategoryDraft::new("k", "skip")).is_none());
        assert!(options.apply_before_create(TaxCategoryDraft::new("k", "keep")).is_some());
    }
}
