//! Read-through cache of purchase aggregates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{PaymentId, PaymentMethodId, PurchaseId};
use domain::{
    NewPayment, NewPaymentMethod, NewPurchase, Payment, PaymentAggregate, PaymentMethod, Purchase,
    PurchaseAggregate,
};
use tokio::sync::RwLock;

use crate::Result;
use crate::store::{
    PaymentMethodQuery, PaymentMethodRepository, PaymentRepository, PurchaseQuery,
    PurchaseRepository,
};

/// Process-scoped cache of purchase aggregates keyed by purchase id.
///
/// Owned by a [`CachedStore`]; every write that touches a purchase or its
/// payment invalidates the entry. Each invalidation bumps the purchase's
/// epoch, and a read-through fill is dropped if the epoch moved while the
/// aggregate was being loaded.
#[derive(Debug, Default)]
pub struct PurchaseCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<PurchaseId, PurchaseAggregate>,
    epochs: HashMap<PurchaseId, u64>,
}

impl CacheState {
    fn epoch(&self, id: PurchaseId) -> u64 {
        self.epochs.get(&id).copied().unwrap_or(0)
    }
}

impl PurchaseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached aggregate, if present.
    pub async fn get(&self, id: PurchaseId) -> Option<PurchaseAggregate> {
        self.state.read().await.entries.get(&id).cloned()
    }

    /// Returns the current invalidation epoch of a purchase.
    pub async fn epoch(&self, id: PurchaseId) -> u64 {
        self.state.read().await.epoch(id)
    }

    /// Stores an aggregate loaded at `epoch`. Returns false, leaving the
    /// cache untouched, if the purchase was invalidated since.
    pub async fn insert_if_current(&self, aggregate: PurchaseAggregate, epoch: u64) -> bool {
        let mut state = self.state.write().await;
        let id = aggregate.purchase.id;
        if state.epoch(id) != epoch {
            tracing::debug!(purchase_id = %id, "discarding purchase loaded before invalidation");
            return false;
        }
        state.entries.insert(id, aggregate);
        true
    }

    /// Drops the entry for a purchase and advances its epoch.
    pub async fn invalidate(&self, id: PurchaseId) {
        let mut state = self.state.write().await;
        *state.epochs.entry(id).or_insert(0) += 1;
        if state.entries.remove(&id).is_some() {
            tracing::debug!(purchase_id = %id, "purchase cache entry invalidated");
        }
    }

    /// Drops every entry. Epochs are kept so in-flight fills stay checked.
    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
    }

    /// Returns the number of cached aggregates.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

/// Store decorator serving purchase lookups from a [`PurchaseCache`].
#[derive(Clone)]
pub struct CachedStore<S> {
    inner: S,
    cache: Arc<PurchaseCache>,
}

impl<S> CachedStore<S> {
    /// Wraps a store with an empty cache.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Arc::new(PurchaseCache::new()),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the cache, for explicit invalidation.
    pub fn cache(&self) -> &Arc<PurchaseCache> {
        &self.cache
    }
}

#[async_trait]
impl<S: PurchaseQuery> PurchaseQuery for CachedStore<S> {
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseAggregate>> {
        if let Some(aggregate) = self.cache.get(id).await {
            metrics::counter!("purchase_cache_hits_total").increment(1);
            return Ok(Some(aggregate));
        }

        metrics::counter!("purchase_cache_misses_total").increment(1);
        let epoch = self.cache.epoch(id).await;
        let aggregate = self.inner.get_purchase(id).await?;
        if let Some(ref aggregate) = aggregate {
            self.cache.insert_if_current(aggregate.clone(), epoch).await;
        }
        Ok(aggregate)
    }
}

#[async_trait]
impl<S: PurchaseRepository> PurchaseRepository for CachedStore<S> {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        self.inner.create_purchase(purchase).await
    }

    async fn update_purchase(
        &self,
        purchase: &Purchase,
        payment: Option<&Payment>,
    ) -> Result<Purchase> {
        // Invalidate even on failure: a conflict means the cached copy is stale
        let result = self.inner.update_purchase(purchase, payment).await;
        self.cache.invalidate(purchase.id).await;
        result
    }
}

#[async_trait]
impl<S: PaymentMethodQuery> PaymentMethodQuery for CachedStore<S> {
    async fn get_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        self.inner.get_payment_method(id).await
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.inner.list_payment_methods().await
    }
}

#[async_trait]
impl<S: PaymentMethodRepository> PaymentMethodRepository for CachedStore<S> {
    async fn create_payment_method(&self, method: NewPaymentMethod) -> Result<PaymentMethod> {
        self.inner.create_payment_method(method).await
    }
}

#[async_trait]
impl<S: PaymentRepository> PaymentRepository for CachedStore<S> {
    async fn create_payment(
        &self,
        payment: NewPayment,
        purchase: &Purchase,
    ) -> Result<PaymentAggregate> {
        let result = self.inner.create_payment(payment, purchase).await;
        self.cache.invalidate(purchase.id).await;
        result
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentAggregate>> {
        self.inner.get_payment(id).await
    }

    async fn update_payment(&self, payment: &Payment) -> Result<Payment> {
        let result = self.inner.update_payment(payment).await;
        self.cache.invalidate(payment.purchase_id).await;
        result
    }
}
