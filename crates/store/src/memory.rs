use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{PaymentId, PaymentMethodId, PurchaseId, Version};
use domain::{
    NewPayment, NewPaymentMethod, NewPurchase, Payment, PaymentAggregate, PaymentMethod, Purchase,
    PurchaseAggregate, PurchaseStatus,
};
use tokio::sync::RwLock;

use crate::store::{
    PaymentMethodQuery, PaymentMethodRepository, PaymentRepository, PurchaseQuery,
    PurchaseRepository, check_version,
};
use crate::{Result, StoreError};

#[derive(Debug, Clone)]
struct PurchaseRow {
    purchase: Purchase,
    payment_id: Option<PaymentId>,
}

#[derive(Debug, Default)]
struct Tables {
    purchases: BTreeMap<PurchaseId, PurchaseRow>,
    payments: BTreeMap<PaymentId, Payment>,
    payment_methods: BTreeMap<PaymentMethodId, PaymentMethod>,
    last_purchase_id: i64,
    last_payment_id: i64,
    last_payment_method_id: i64,
    writes: usize,
}

impl Tables {
    fn aggregate(&self, row: &PurchaseRow) -> PurchaseAggregate {
        PurchaseAggregate {
            purchase: row.purchase.clone(),
            payment: row.payment_id.and_then(|id| self.payments.get(&id).cloned()),
        }
    }
}

/// In-memory store implementation for testing and local runs.
///
/// This implementation keeps every table in memory and provides
/// the same interface as the PostgreSQL implementation, including
/// version checks and the one-active-payment rule.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful writes (creates and updates).
    pub async fn write_count(&self) -> usize {
        self.tables.read().await.writes
    }

    /// Returns the total number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl PurchaseQuery for InMemoryStore {
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseAggregate>> {
        let tables = self.tables.read().await;
        Ok(tables.purchases.get(&id).map(|row| tables.aggregate(row)))
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        let mut tables = self.tables.write().await;
        tables.last_purchase_id += 1;

        let now = Utc::now();
        let purchase = Purchase {
            id: PurchaseId::new(tables.last_purchase_id),
            client: purchase.client,
            selected_products: purchase.selected_products,
            status: PurchaseStatus::Creating,
            total: purchase.total,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };

        tables.purchases.insert(
            purchase.id,
            PurchaseRow {
                purchase: purchase.clone(),
                payment_id: None,
            },
        );
        tables.writes += 1;
        Ok(purchase)
    }

    async fn update_purchase(
        &self,
        purchase: &Purchase,
        payment: Option<&Payment>,
    ) -> Result<Purchase> {
        let mut tables = self.tables.write().await;

        if let Some(payment) = payment
            && !tables.payments.contains_key(&payment.id)
        {
            return Err(StoreError::NotFound {
                entity: "Payment",
                id: payment.id.as_i64(),
            });
        }

        let row = tables
            .purchases
            .get_mut(&purchase.id)
            .ok_or(StoreError::NotFound {
                entity: "Purchase",
                id: purchase.id.as_i64(),
            })?;
        check_version(
            "Purchase",
            purchase.id.as_i64(),
            purchase.version,
            row.purchase.version,
        )?;

        let mut updated = purchase.clone();
        updated.version = row.purchase.version.next();
        updated.created_at = row.purchase.created_at;
        updated.updated_at = Utc::now();

        row.purchase = updated.clone();
        if let Some(payment) = payment {
            row.payment_id = Some(payment.id);
        }
        tables.writes += 1;
        Ok(updated)
    }
}

#[async_trait]
impl PaymentMethodQuery for InMemoryStore {
    async fn get_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        Ok(self.tables.read().await.payment_methods.get(&id).cloned())
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        Ok(self
            .tables
            .read()
            .await
            .payment_methods
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentMethodRepository for InMemoryStore {
    async fn create_payment_method(&self, method: NewPaymentMethod) -> Result<PaymentMethod> {
        let mut tables = self.tables.write().await;
        tables.last_payment_method_id += 1;

        let method = PaymentMethod {
            id: PaymentMethodId::new(tables.last_payment_method_id),
            name: method.name,
            sys_name: method.sys_name,
            description: method.description,
            is_active: method.is_active,
        };
        tables.payment_methods.insert(method.id, method.clone());
        tables.writes += 1;
        Ok(method)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn create_payment(
        &self,
        payment: NewPayment,
        purchase: &Purchase,
    ) -> Result<PaymentAggregate> {
        let mut tables = self.tables.write().await;

        if !tables.purchases.contains_key(&purchase.id) {
            return Err(StoreError::NotFound {
                entity: "Purchase",
                id: purchase.id.as_i64(),
            });
        }

        // Unique index simulation: one non-cancelled payment per purchase
        if payment.status.is_active()
            && tables
                .payments
                .values()
                .any(|p| p.purchase_id == purchase.id && p.status.is_active())
        {
            return Err(StoreError::DuplicatePayment {
                purchase_id: purchase.id,
            });
        }

        tables.last_payment_id += 1;
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(tables.last_payment_id),
            payment_method: payment.payment_method,
            value: payment.value,
            status: payment.status,
            webhook_url: payment.webhook_url,
            purchase_id: purchase.id,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };
        tables.payments.insert(payment.id, payment.clone());
        tables.writes += 1;

        Ok(PaymentAggregate {
            payment,
            purchase: Some(purchase.clone()),
        })
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentAggregate>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).map(|payment| PaymentAggregate {
            payment: payment.clone(),
            purchase: tables
                .purchases
                .get(&payment.purchase_id)
                .map(|row| row.purchase.clone()),
        }))
    }

    async fn update_payment(&self, payment: &Payment) -> Result<Payment> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .payments
            .get_mut(&payment.id)
            .ok_or(StoreError::NotFound {
                entity: "Payment",
                id: payment.id.as_i64(),
            })?;
        check_version(
            "Payment",
            payment.id.as_i64(),
            payment.version,
            stored.version,
        )?;

        let mut updated = payment.clone();
        updated.purchase_id = stored.purchase_id;
        updated.version = stored.version.next();
        updated.created_at = stored.created_at;
        updated.updated_at = Utc::now();

        *stored = updated.clone();
        tables.writes += 1;
        Ok(updated)
    }
}
