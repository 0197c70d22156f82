use crate::entities::TransactionState;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// A payment transaction owned by the host order workflow.
///
/// `custom_fields` is a JSONB document shared with other collaborators; the
/// reconciliation core only ever touches its three well-known keys and
/// always writes the document back whole.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub merchant_reference: String,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub state: TransactionState,
    pub custom_fields: serde_json::Value,
    pub notify_url: String,
    pub notify_success_at: Option<time::PrimitiveDateTime>,
    pub notify_retry_count: i32,
    pub notify_last_tried_at: Option<time::PrimitiveDateTime>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl TransactionRecord {
    /// The stored custom-field document as a JSON object map.
    ///
    /// A non-object value (never written by this system) is treated as an
    /// empty document.
    pub fn custom_fields_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match &self.custom_fields {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    transaction_id,
    merchant_reference,
    amount,
    currency,
    state,
    custom_fields,
    notify_url,
    notify_success_at,
    notify_retry_count,
    notify_last_tried_at,
    created_at,
    updated_at
"#;

/// Look up a transaction by its id.
#[derive(Debug, Clone)]
pub struct GetTransactionRecordById {
    pub transaction_id: Uuid,
}

impl Processor<GetTransactionRecordById> for DatabaseProcessor {
    type Output = Option<TransactionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTransactionRecordById")]
    async fn process(
        &self,
        query: GetTransactionRecordById,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM transaction_records WHERE transaction_id = $1"
        ))
        .bind(query.transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

/// Create a new transaction in the `Open` state.
#[derive(Debug, Clone)]
pub struct InsertTransactionRecord {
    pub merchant_reference: String,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub notify_url: String,
}

impl Processor<InsertTransactionRecord> for DatabaseProcessor {
    type Output = TransactionRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertTransactionRecord")]
    async fn process(
        &self,
        insert: InsertTransactionRecord,
    ) -> Result<TransactionRecord, sqlx::Error> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            r#"
            INSERT INTO transaction_records
                (transaction_id, merchant_reference, amount, currency, state, notify_url)
            VALUES ($1, $2, $3, $4, 'open', $5)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&insert.merchant_reference)
        .bind(insert.amount)
        .bind(&insert.currency)
        .bind(&insert.notify_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }
}

/// Move a transaction to a new state.
#[derive(Debug, Clone)]
pub struct UpdateTransactionState {
    pub transaction_id: Uuid,
    pub state: TransactionState,
}

impl Processor<UpdateTransactionState> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateTransactionState")]
    async fn process(&self, update: UpdateTransactionState) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE transaction_records
            SET state = $2, updated_at = now()
            WHERE transaction_id = $1
            "#,
        )
        .bind(update.transaction_id)
        .bind(update.state)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl TransactionRecord {
    /// Replace the whole custom-field document.
    ///
    /// The caller passes the already-merged document; there are no
    /// partial-field writes.
    pub async fn replace_custom_fields(
        pool: &sqlx::PgPool,
        transaction_id: Uuid,
        custom_fields: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE transaction_records
            SET custom_fields = $2, updated_at = now()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(custom_fields)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a successful notification delivery.
    pub async fn mark_notify_success(
        pool: &sqlx::PgPool,
        transaction_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE transaction_records
            SET notify_success_at = now(), notify_last_tried_at = now()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Bump the retry counter after a failed notification attempt.
    pub async fn increment_notify_retry_count(
        pool: &sqlx::PgPool,
        transaction_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE transaction_records
            SET notify_retry_count = notify_retry_count + 1, notify_last_tried_at = now()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transactions in a final state whose notification has not been
    /// delivered yet and whose exponential-backoff delay has elapsed.
    pub async fn get_for_notify_retry(
        pool: &sqlx::PgPool,
        max_retry_count: i32,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM transaction_records
            WHERE state IN ('paid', 'failed')
              AND notify_success_at IS NULL
              AND notify_retry_count > 0
              AND notify_retry_count <= $1
              AND (
                notify_last_tried_at IS NULL
                OR notify_last_tried_at
                   + make_interval(secs => power(2, notify_retry_count)) < now()
              )
            ORDER BY notify_last_tried_at ASC NULLS FIRST
            LIMIT $2
            "#
        ))
        .bind(max_retry_count)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }
}
