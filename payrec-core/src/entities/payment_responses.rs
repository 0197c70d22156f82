use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// A raw gateway response persisted verbatim.
///
/// Every inbound response is stored before reconciliation so the original
/// payload survives for diagnostics and replay, whatever the result code.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PaymentResponseRecord {
    pub id: i64,
    pub transaction_id: Uuid,
    pub result_code: String,
    pub raw_response: serde_json::Value,
    pub created_at: time::PrimitiveDateTime,
}

/// Store a raw gateway response for a transaction.
#[derive(Debug, Clone)]
pub struct InsertPaymentResponse {
    pub transaction_id: Uuid,
    pub result_code: String,
    pub raw_response: serde_json::Value,
}

impl Processor<InsertPaymentResponse> for DatabaseProcessor {
    type Output = PaymentResponseRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPaymentResponse")]
    async fn process(
        &self,
        insert: InsertPaymentResponse,
    ) -> Result<PaymentResponseRecord, sqlx::Error> {
        let record = sqlx::query_as::<_, PaymentResponseRecord>(
            r#"
            INSERT INTO payment_responses (transaction_id, result_code, raw_response)
            VALUES ($1, $2, $3)
            RETURNING id, transaction_id, result_code, raw_response, created_at
            "#,
        )
        .bind(insert.transaction_id)
        .bind(&insert.result_code)
        .bind(insert.raw_response)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }
}

/// The most recently stored response for a transaction, if any.
#[derive(Debug, Clone)]
pub struct GetLatestPaymentResponse {
    pub transaction_id: Uuid,
}

impl Processor<GetLatestPaymentResponse> for DatabaseProcessor {
    type Output = Option<PaymentResponseRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetLatestPaymentResponse")]
    async fn process(
        &self,
        query: GetLatestPaymentResponse,
    ) -> Result<Option<PaymentResponseRecord>, sqlx::Error> {
        let record = sqlx::query_as::<_, PaymentResponseRecord>(
            r#"
            SELECT id, transaction_id, result_code, raw_response, created_at
            FROM payment_responses
            WHERE transaction_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(query.transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
