use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PaymentId, PaymentMethodId, PurchaseId, Version};
use domain::{
    Currency, Money, NewPayment, NewPaymentMethod, NewPurchase, Payment, PaymentAggregate,
    PaymentMethod, PaymentStatus, Purchase, PurchaseAggregate, PurchaseStatus,
};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::store::{
    PaymentMethodQuery, PaymentMethodRepository, PaymentRepository, PurchaseQuery,
    PurchaseRepository, check_version,
};
use crate::{Result, StoreError};

const PURCHASE_COLUMNS: &str = "id, client, selected_products, status, total_cents, currency, \
                                payment_id, version, created_at, updated_at";

const PAYMENT_SELECT: &str = r#"
    SELECT p.id, p.purchase_id, p.value_cents, p.currency, p.status, p.webhook_url,
           p.version, p.created_at, p.updated_at,
           m.id AS method_id, m.name AS method_name, m.sys_name AS method_sys_name,
           m.description AS method_description, m.is_active AS method_is_active
    FROM payments p
    JOIN payment_methods m ON m.id = p.payment_method_id
"#;

/// Name of the partial unique index enforcing one active payment per purchase.
const ACTIVE_PAYMENT_INDEX: &str = "one_active_payment_per_purchase";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url` and wraps it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_purchase(row: &PgRow) -> Result<(Purchase, Option<PaymentId>)> {
        let status_code: i16 = row.try_get("status")?;
        let status = PurchaseStatus::from_code(status_code)
            .ok_or_else(|| StoreError::CorruptRow(format!("purchase status {status_code}")))?;
        let currency: Currency = serde_json::from_value(row.try_get("currency")?)?;

        let purchase = Purchase {
            id: PurchaseId::new(row.try_get("id")?),
            client: serde_json::from_value(row.try_get("client")?)?,
            selected_products: serde_json::from_value(row.try_get("selected_products")?)?,
            status,
            total: Money::from_cents(row.try_get("total_cents")?, currency),
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        };
        let payment_id = row
            .try_get::<Option<i64>, _>("payment_id")?
            .map(PaymentId::new);

        Ok((purchase, payment_id))
    }

    fn row_to_payment_method(row: &PgRow, prefix: &str) -> Result<PaymentMethod> {
        let column = |name: &str| format!("{prefix}{name}");
        Ok(PaymentMethod {
            id: PaymentMethodId::new(row.try_get(column("id").as_str())?),
            name: row.try_get(column("name").as_str())?,
            sys_name: row.try_get(column("sys_name").as_str())?,
            description: row.try_get(column("description").as_str())?,
            is_active: row.try_get(column("is_active").as_str())?,
        })
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        let status_code: i16 = row.try_get("status")?;
        let status = PaymentStatus::from_code(status_code)
            .ok_or_else(|| StoreError::CorruptRow(format!("payment status {status_code}")))?;
        let currency: Currency = serde_json::from_value(row.try_get("currency")?)?;

        Ok(Payment {
            id: PaymentId::new(row.try_get("id")?),
            payment_method: Self::row_to_payment_method(row, "method_")?,
            value: Money::from_cents(row.try_get("value_cents")?, currency),
            status,
            webhook_url: row.try_get("webhook_url")?,
            purchase_id: PurchaseId::new(row.try_get("purchase_id")?),
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    async fn fetch_purchase(
        &self,
        id: PurchaseId,
    ) -> Result<Option<(Purchase, Option<PaymentId>)>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_purchase).transpose()
    }

    async fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let sql = format!("{PAYMENT_SELECT} WHERE p.id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    /// Explains why a versioned update matched no row.
    async fn missed_update(
        &self,
        table: &'static str,
        entity: &'static str,
        id: i64,
        expected: Version,
    ) -> StoreError {
        let sql = format!("SELECT version FROM {table} WHERE id = $1");
        let current = sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match current {
            Ok(Some(actual)) => match check_version(entity, id, expected, Version::new(actual)) {
                Err(conflict) => conflict,
                // The row changed back between the update and this read
                Ok(()) => StoreError::ConcurrencyConflict {
                    entity,
                    id,
                    expected,
                    actual: Version::new(actual),
                },
            },
            Ok(None) => StoreError::NotFound { entity, id },
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl PurchaseQuery for PostgresStore {
    async fn get_purchase(&self, id: PurchaseId) -> Result<Option<PurchaseAggregate>> {
        let Some((purchase, payment_id)) = self.fetch_purchase(id).await? else {
            return Ok(None);
        };

        let payment = match payment_id {
            Some(payment_id) => self.fetch_payment(payment_id).await?,
            None => None,
        };

        Ok(Some(PurchaseAggregate { purchase, payment }))
    }
}

#[async_trait]
impl PurchaseRepository for PostgresStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        let sql = format!(
            r#"
            INSERT INTO purchases
                (client, selected_products, status, total_cents, currency, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PURCHASE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(serde_json::to_value(&purchase.client)?)
            .bind(serde_json::to_value(&purchase.selected_products)?)
            .bind(PurchaseStatus::Creating.code())
            .bind(purchase.total.cents())
            .bind(serde_json::to_value(purchase.total.currency())?)
            .bind(Version::first().as_i64())
            .fetch_one(&self.pool)
            .await?;

        Ok(Self::row_to_purchase(&row)?.0)
    }

    async fn update_purchase(
        &self,
        purchase: &Purchase,
        payment: Option<&Payment>,
    ) -> Result<Purchase> {
        let sql = format!(
            r#"
            UPDATE purchases
            SET status = $2, total_cents = $3, currency = $4, client = $5,
                selected_products = $6, payment_id = COALESCE($7, payment_id),
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $8
            RETURNING {PURCHASE_COLUMNS}
            "#
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(purchase.id.as_i64())
            .bind(purchase.status.code())
            .bind(purchase.total.cents())
            .bind(serde_json::to_value(purchase.total.currency())?)
            .bind(serde_json::to_value(&purchase.client)?)
            .bind(serde_json::to_value(&purchase.selected_products)?)
            .bind(payment.map(|p| p.id.as_i64()))
            .bind(purchase.version.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Self::row_to_purchase(&row)?.0),
            None => Err(self
                .missed_update("purchases", "Purchase", purchase.id.as_i64(), purchase.version)
                .await),
        }
    }
}

#[async_trait]
impl PaymentMethodQuery for PostgresStore {
    async fn get_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, name, sys_name, description, is_active
            FROM payment_methods
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(|row| Self::row_to_payment_method(row, ""))
            .transpose()
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, sys_name, description, is_active
            FROM payment_methods
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Self::row_to_payment_method(row, ""))
            .collect()
    }
}

#[async_trait]
impl PaymentMethodRepository for PostgresStore {
    async fn create_payment_method(&self, method: NewPaymentMethod) -> Result<PaymentMethod> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payment_methods (name, sys_name, description, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&method.name)
        .bind(&method.sys_name)
        .bind(&method.description)
        .bind(method.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaymentMethod {
            id: PaymentMethodId::new(id),
            name: method.name,
            sys_name: method.sys_name,
            description: method.description,
            is_active: method.is_active,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresStore {
    async fn create_payment(
        &self,
        payment: NewPayment,
        purchase: &Purchase,
    ) -> Result<PaymentAggregate> {
        let row = sqlx::query(
            r#"
            INSERT INTO payments
                (purchase_id, payment_method_id, value_cents, currency, status, webhook_url,
                 version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, version, created_at, updated_at
            "#,
        )
        .bind(purchase.id.as_i64())
        .bind(payment.payment_method.id.as_i64())
        .bind(payment.value.cents())
        .bind(serde_json::to_value(payment.value.currency())?)
        .bind(payment.status.code())
        .bind(&payment.webhook_url)
        .bind(Version::first().as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ACTIVE_PAYMENT_INDEX)
            {
                return StoreError::DuplicatePayment {
                    purchase_id: purchase.id,
                };
            }
            StoreError::Database(e)
        })?;

        let payment = Payment {
            id: PaymentId::new(row.try_get("id")?),
            payment_method: payment.payment_method,
            value: payment.value,
            status: payment.status,
            webhook_url: payment.webhook_url,
            purchase_id: purchase.id,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        };

        Ok(PaymentAggregate {
            payment,
            purchase: Some(purchase.clone()),
        })
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentAggregate>> {
        let Some(payment) = self.fetch_payment(id).await? else {
            return Ok(None);
        };
        let purchase = self
            .fetch_purchase(payment.purchase_id)
            .await?
            .map(|(purchase, _)| purchase);

        Ok(Some(PaymentAggregate { payment, purchase }))
    }

    async fn update_payment(&self, payment: &Payment) -> Result<Payment> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, value_cents = $3, currency = $4, webhook_url = $5,
                payment_method_id = $6, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $7
            RETURNING purchase_id, version, created_at, updated_at
            "#,
        )
        .bind(payment.id.as_i64())
        .bind(payment.status.code())
        .bind(payment.value.cents())
        .bind(serde_json::to_value(payment.value.currency())?)
        .bind(&payment.webhook_url)
        .bind(payment.payment_method.id.as_i64())
        .bind(payment.version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(self
                .missed_update("payments", "Payment", payment.id.as_i64(), payment.version)
                .await);
        };

        let mut updated = payment.clone();
        updated.purchase_id = PurchaseId::new(row.try_get("purchase_id")?);
        updated.version = Version::new(row.try_get("version")?);
        updated.created_at = row.try_get::<DateTime<Utc>, _>("created_at")?;
        updated.updated_at = row.try_get::<DateTime<Utc>, _>("updated_at")?;
        Ok(updated)
    }
}
