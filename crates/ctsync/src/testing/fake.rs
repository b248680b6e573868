//! Fake catalog implementing the remote seams in memory.
//!
//! Behaves like the real API where the engine cares: versions are checked
//! on update, stale versions yield a concurrent modification error,
//! references come back as ids and keys are unique.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ctsync_api::category::{Category, CategoryUpdateAction};
use ctsync_api::product::{Price, PriceDraft, Product, ProductUpdateAction, ProductVariant};
use ctsync_api::tax_category::{TaxCategory, TaxCategoryUpdateAction, TaxRate};
use ctsync_api::{
    ApiError, CurrentResource, CustomFields, Draft, Reference, ReferenceTypeId,
    ResourceIdentifier,
};

use crate::core::service::{KeyLookup, ResourceKind, ResourceService};
use crate::resources::{CategoryResource, ProductResource, TaxCategoryResource};

/// Remote-side view handed to [`FakeResource`] implementations.
pub struct FakeRemote<'a> {
    references: &'a HashMap<String, (ReferenceTypeId, String)>,
    next_id: &'a mut u64,
}

impl FakeRemote<'_> {
    /// The id-only reference the remote would store for `identifier`.
    pub fn resolve(&self, identifier: &ResourceIdentifier) -> Reference {
        if let Some(id) = &identifier.id {
            return Reference::new(identifier.type_id, id.clone());
        }
        let key = identifier.key.clone().unwrap_or_default();
        let id = self
            .references
            .iter()
            .find(|(_, (type_id, k))| *type_id == identifier.type_id && *k == key)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| format!("unknown-{key}"));
        Reference::new(identifier.type_id, id)
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        *self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// Resource kinds the fake catalog can store and mutate.
pub trait FakeResource: ResourceKind {
    const TYPE_ID: ReferenceTypeId;

    fn materialize(draft: &Self::Draft, id: String, remote: &mut FakeRemote<'_>) -> Self::Current;

    fn apply(current: &mut Self::Current, action: &Self::Action, remote: &mut FakeRemote<'_>);

    fn set_version(current: &mut Self::Current, version: u64);
}

/// Call counters of a [`FakeCatalog`].
#[derive(Debug, Default)]
pub struct FakeCounters {
    key_lookups: AtomicUsize,
    fetches: AtomicUsize,
    fetches_by_key: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    conflicts: AtomicUsize,
}

impl FakeCounters {
    pub fn key_lookups(&self) -> usize {
        self.key_lookups.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetches_by_key(&self) -> usize {
        self.fetches_by_key.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeState<R: ResourceKind> {
    resources: BTreeMap<String, R::Current>,
    references: HashMap<String, (ReferenceTypeId, String)>,
    pending_conflicts: HashMap<String, usize>,
    failing_keys: HashSet<String>,
    lookup_failure: Option<ApiError>,
    fetch_failure: Option<ApiError>,
    vanish_on_conflict: bool,
    requested_ids: Vec<Vec<String>>,
    applied: Vec<(String, Vec<R::Action>)>,
    next_id: u64,
}

/// In-memory catalog of one resource kind. Clones share state.
pub struct FakeCatalog<R: ResourceKind> {
    state: Arc<Mutex<FakeState<R>>>,
    counters: Arc<FakeCounters>,
}

impl<R: ResourceKind> Clone for FakeCatalog<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<R: ResourceKind> Default for FakeCatalog<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ResourceKind> FakeCatalog<R> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                resources: BTreeMap::new(),
                references: HashMap::new(),
                pending_conflicts: HashMap::new(),
                failing_keys: HashSet::new(),
                lookup_failure: None,
                fetch_failure: None,
                vanish_on_conflict: false,
                requested_ids: Vec::new(),
                applied: Vec::new(),
                next_id: 0,
            })),
            counters: Arc::new(FakeCounters::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState<R>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn counters(&self) -> &FakeCounters {
        &self.counters
    }

    /// Makes `id` of `type_id` known to key lookups and key resolution.
    pub fn register_reference(&self, type_id: ReferenceTypeId, id: &str, key: &str) {
        self.state()
            .references
            .insert(id.to_string(), (type_id, key.to_string()));
    }

    /// The next `count` updates of `key` fail with a version conflict, as
    /// if someone else modified the resource just before.
    pub fn conflict_on_next_updates(&self, key: &str, count: usize) {
        self.state()
            .pending_conflicts
            .insert(key.to_string(), count);
    }

    /// Creates and updates of `key` fail with a server error.
    pub fn fail_writes_for(&self, key: &str) {
        self.state().failing_keys.insert(key.to_string());
    }

    pub fn fail_key_lookups(&self, error: ApiError) {
        self.state().lookup_failure = Some(error);
    }

    pub fn fail_fetches(&self, error: ApiError) {
        self.state().fetch_failure = Some(error);
    }

    /// A conflicting writer deletes the resource instead of updating it.
    pub fn vanish_on_conflict(&self) {
        self.state().vanish_on_conflict = true;
    }

    pub fn get(&self, key: &str) -> Option<R::Current> {
        self.state().resources.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id batches received by key lookups, in call order.
    pub fn requested_ids(&self) -> Vec<Vec<String>> {
        self.state().requested_ids.clone()
    }

    /// Action lists of successful updates, with the key they applied to.
    pub fn applied_updates(&self) -> Vec<(String, Vec<R::Action>)> {
        self.state().applied.clone()
    }
}

impl<R: FakeResource> FakeCatalog<R> {
    /// Stores `current` as if it already existed remotely.
    pub fn insert(&self, current: R::Current) {
        let mut state = self.state();
        if let Some(key) = current.key() {
            state
                .references
                .insert(current.id().to_string(), (R::TYPE_ID, key.to_string()));
            state.resources.insert(key.to_string(), current);
        }
    }
}

#[async_trait]
impl<R: FakeResource> ResourceService<R> for FakeCatalog<R> {
    async fn fetch_matching_by_keys(
        &self,
        keys: &HashSet<String>,
    ) -> Result<Vec<R::Current>, ApiError> {
        FakeCounters::bump(&self.counters.fetches);
        let state = self.state();
        if let Some(error) = &state.fetch_failure {
            return Err(error.clone());
        }
        Ok(keys
            .iter()
            .filter_map(|key| state.resources.get(key).cloned())
            .collect())
    }

    async fn fetch_by_key(&self, key: &str) -> Result<Option<R::Current>, ApiError> {
        FakeCounters::bump(&self.counters.fetches_by_key);
        let state = self.state();
        if let Some(error) = &state.fetch_failure {
            return Err(error.clone());
        }
        Ok(state.resources.get(key).cloned())
    }

    async fn create(&self, draft: &R::Draft) -> Result<R::Current, ApiError> {
        FakeCounters::bump(&self.counters.creates);
        let mut guard = self.state();
        let state = &mut *guard;
        let key = draft.key().unwrap_or_default().to_string();

        if state.failing_keys.contains(&key) {
            return Err(ApiError::http(500, format!("create of {key} failed")));
        }
        if state.resources.contains_key(&key) {
            return Err(ApiError::DuplicateKey { key });
        }

        let mut remote = FakeRemote {
            references: &state.references,
            next_id: &mut state.next_id,
        };
        let id = remote.next_id(R::TYPE_ID.as_str());
        let created = R::materialize(draft, id.clone(), &mut remote);
        state.references.insert(id, (R::TYPE_ID, key.clone()));
        state.resources.insert(key, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: &str,
        version: u64,
        actions: &[R::Action],
    ) -> Result<R::Current, ApiError> {
        FakeCounters::bump(&self.counters.updates);
        let mut guard = self.state();
        let state = &mut *guard;

        let key = state
            .resources
            .iter()
            .find(|(_, resource)| resource.id() == id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| ApiError::NotFound {
                resource: R::RESOURCE_NAME.to_string(),
                key: id.to_string(),
            })?;

        if state.failing_keys.contains(&key) {
            return Err(ApiError::http(500, format!("update of {key} failed")));
        }

        if let Some(pending) = state.pending_conflicts.get_mut(&key).filter(|n| **n > 0) {
            *pending -= 1;
            FakeCounters::bump(&self.counters.conflicts);
            if state.vanish_on_conflict {
                state.resources.remove(&key);
                return Err(ApiError::ConcurrentModification {
                    current_version: None,
                });
            }
            if let Some(resource) = state.resources.get_mut(&key) {
                let bumped = resource.version() + 1;
                R::set_version(resource, bumped);
                return Err(ApiError::ConcurrentModification {
                    current_version: Some(bumped),
                });
            }
        }

        let Some(resource) = state.resources.get_mut(&key) else {
            return Err(ApiError::NotFound {
                resource: R::RESOURCE_NAME.to_string(),
                key,
            });
        };
        if resource.version() != version {
            FakeCounters::bump(&self.counters.conflicts);
            return Err(ApiError::ConcurrentModification {
                current_version: Some(resource.version()),
            });
        }

        let mut remote = FakeRemote {
            references: &state.references,
            next_id: &mut state.next_id,
        };
        for action in actions {
            R::apply(resource, action, &mut remote);
        }
        let next_version = resource.version() + 1;
        R::set_version(resource, next_version);
        let updated = resource.clone();
        state.applied.push((key, actions.to_vec()));
        Ok(updated)
    }
}

#[async_trait]
impl<R: ResourceKind> KeyLookup for FakeCatalog<R> {
    async fn fetch_keys_by_ids(
        &self,
        type_id: ReferenceTypeId,
        ids: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        FakeCounters::bump(&self.counters.key_lookups);
        let mut state = self.state();
        state.requested_ids.push(ids.to_vec());
        if let Some(error) = &state.lookup_failure {
            return Err(error.clone());
        }
        Ok(ids
            .iter()
            .filter_map(|id| match state.references.get(id) {
                Some((known_type, key)) if *known_type == type_id => {
                    Some((id.clone(), key.clone()))
                }
                _ => None,
            })
            .collect())
    }
}

fn custom_from(
    type_ref: &ResourceIdentifier,
    fields: &ctsync_api::FieldContainer,
    remote: &FakeRemote<'_>,
) -> CustomFields {
    CustomFields {
        type_ref: remote.resolve(type_ref),
        fields: fields.clone(),
    }
}

fn set_field(custom: &mut Option<CustomFields>, name: &str, value: &Option<serde_json::Value>) {
    if let Some(custom) = custom {
        match value {
            Some(value) => {
                custom.fields.insert(name.to_string(), value.clone());
            }
            None => {
                custom.fields.remove(name);
            }
        }
    }
}

impl FakeResource for CategoryResource {
    const TYPE_ID: ReferenceTypeId = ReferenceTypeId::Category;

    fn materialize(
        draft: &Self::Draft,
        id: String,
        remote: &mut FakeRemote<'_>,
    ) -> Category {
        Category {
            id,
            key: draft.key.clone(),
            version: 1,
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
            parent: draft.parent.as_ref().map(|parent| remote.resolve(parent)),
            order_hint: draft.order_hint.clone(),
            external_id: draft.external_id.clone(),
            meta_title: draft.meta_title.clone(),
            meta_description: draft.meta_description.clone(),
            meta_keywords: draft.meta_keywords.clone(),
            custom: draft
                .custom
                .as_ref()
                .map(|custom| custom_from(&custom.type_ref, &custom.fields, remote)),
        }
    }

    fn apply(category: &mut Category, action: &CategoryUpdateAction, remote: &mut FakeRemote<'_>) {
        match action {
            CategoryUpdateAction::ChangeName { name } => category.name = name.clone(),
            CategoryUpdateAction::ChangeSlug { slug } => category.slug = slug.clone(),
            CategoryUpdateAction::SetDescription { description } => {
                category.description = description.clone()
            }
            CategoryUpdateAction::ChangeParent { parent } => {
                category.parent = Some(remote.resolve(parent))
            }
            CategoryUpdateAction::ChangeOrderHint { order_hint } => {
                category.order_hint = Some(order_hint.clone())
            }
            CategoryUpdateAction::SetExternalId { external_id } => {
                category.external_id = external_id.clone()
            }
            CategoryUpdateAction::SetMetaTitle { meta_title } => {
                category.meta_title = meta_title.clone()
            }
            CategoryUpdateAction::SetMetaDescription { meta_description } => {
                category.meta_description = meta_description.clone()
            }
            CategoryUpdateAction::SetMetaKeywords { meta_keywords } => {
                category.meta_keywords = meta_keywords.clone()
            }
            CategoryUpdateAction::SetCustomType { type_ref, fields } => {
                category.custom = Some(custom_from(type_ref, fields, remote))
            }
            CategoryUpdateAction::RemoveCustomType => category.custom = None,
            CategoryUpdateAction::SetCustomField { name, value } => {
                set_field(&mut category.custom, name, value)
            }
        }
    }

    fn set_version(category: &mut Category, version: u64) {
        category.version = version;
    }
}

impl FakeResource for TaxCategoryResource {
    const TYPE_ID: ReferenceTypeId = ReferenceTypeId::TaxCategory;

    fn materialize(
        draft: &Self::Draft,
        id: String,
        remote: &mut FakeRemote<'_>,
    ) -> TaxCategory {
        let mut category = TaxCategory {
            id,
            key: draft.key.clone(),
            version: 1,
            name: draft.name.clone(),
            description: draft.description.clone(),
            rates: Vec::new(),
        };
        for rate in &draft.rates {
            Self::apply(
                &mut category,
                &TaxCategoryUpdateAction::AddTaxRate {
                    tax_rate: rate.clone(),
                },
                remote,
            );
        }
        category
    }

    fn apply(
        category: &mut TaxCategory,
        action: &TaxCategoryUpdateAction,
        remote: &mut FakeRemote<'_>,
    ) {
        let to_rate = |id: String, draft: &ctsync_api::tax_category::TaxRateDraft| TaxRate {
            id,
            name: draft.name.clone(),
            amount: draft.amount.unwrap_or_default(),
            included_in_price: draft.included_in_price,
            country: draft.country.clone(),
            state: draft.state.clone(),
            sub_rates: draft.sub_rates.clone(),
        };
        match action {
            TaxCategoryUpdateAction::ChangeName { name } => category.name = name.clone(),
            TaxCategoryUpdateAction::SetDescription { description } => {
                category.description = description.clone()
            }
            TaxCategoryUpdateAction::AddTaxRate { tax_rate } => {
                let id = remote.next_id("rate");
                category.rates.push(to_rate(id, tax_rate));
            }
            TaxCategoryUpdateAction::ReplaceTaxRate {
                tax_rate_id,
                tax_rate,
            } => {
                let id = remote.next_id("rate");
                if let Some(slot) = category.rates.iter_mut().find(|r| r.id == *tax_rate_id) {
                    *slot = to_rate(id, tax_rate);
                }
            }
            TaxCategoryUpdateAction::RemoveTaxRate { tax_rate_id } => {
                category.rates.retain(|rate| rate.id != *tax_rate_id)
            }
        }
    }

    fn set_version(category: &mut TaxCategory, version: u64) {
        category.version = version;
    }
}

fn price_from(id: String, draft: &PriceDraft, remote: &FakeRemote<'_>) -> Price {
    Price {
        id,
        value: draft.value.clone(),
        country: draft.country.clone(),
        customer_group: draft.customer_group.as_ref().map(|g| remote.resolve(g)),
        channel: draft.channel.as_ref().map(|c| remote.resolve(c)),
        valid_from: draft.valid_from,
        valid_until: draft.valid_until,
        custom: draft
            .custom
            .as_ref()
            .map(|custom| custom_from(&custom.type_ref, &custom.fields, remote)),
    }
}

impl FakeResource for ProductResource {
    const TYPE_ID: ReferenceTypeId = ReferenceTypeId::Product;

    fn materialize(draft: &Self::Draft, id: String, remote: &mut FakeRemote<'_>) -> Product {
        let prices = draft
            .master_variant
            .prices
            .iter()
            .map(|price| {
                let id = remote.next_id("price");
                price_from(id, price, remote)
            })
            .collect();
        Product {
            id,
            key: draft.key.clone(),
            version: 1,
            product_type: remote.resolve(&draft.product_type),
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
            tax_category: draft.tax_category.as_ref().map(|t| remote.resolve(t)),
            master_variant: ProductVariant {
                id: 1,
                sku: draft.master_variant.sku.clone(),
                prices,
            },
        }
    }

    fn apply(product: &mut Product, action: &ProductUpdateAction, remote: &mut FakeRemote<'_>) {
        let prices = &mut product.master_variant.prices;
        match action {
            ProductUpdateAction::ChangeName { name } => product.name = name.clone(),
            ProductUpdateAction::ChangeSlug { slug } => product.slug = slug.clone(),
            ProductUpdateAction::SetDescription { description } => {
                product.description = description.clone()
            }
            ProductUpdateAction::SetTaxCategory { tax_category } => {
                product.tax_category = tax_category.as_ref().map(|t| remote.resolve(t))
            }
            ProductUpdateAction::SetSku { sku, .. } => product.master_variant.sku = sku.clone(),
            ProductUpdateAction::RemovePrice { price_id } => {
                prices.retain(|price| price.id != *price_id)
            }
            ProductUpdateAction::ChangePrice { price_id, price } => {
                if let Some(slot) = prices.iter_mut().find(|p| p.id == *price_id) {
                    let custom = slot.custom.take();
                    *slot = price_from(price_id.clone(), price, remote);
                    slot.custom = custom;
                }
            }
            ProductUpdateAction::AddPrice { price, .. } => {
                let id = remote.next_id("price");
                prices.push(price_from(id, price, remote));
            }
            ProductUpdateAction::SetProductPriceCustomType {
                price_id,
                type_ref,
                fields,
            } => {
                if let Some(slot) = prices.iter_mut().find(|p| p.id == *price_id) {
                    slot.custom = type_ref.as_ref().map(|type_ref| {
                        custom_from(type_ref, &fields.clone().unwrap_or_default(), remote)
                    });
                }
            }
            ProductUpdateAction::SetProductPriceCustomField {
                price_id,
                name,
                value,
            } => {
                if let Some(slot) = prices.iter_mut().find(|p| p.id == *price_id) {
                    set_field(&mut slot.custom, name, value);
                }
            }
        }
    }

    fn set_version(product: &mut Product, version: u64) {
        product.version = version;
    }
}
