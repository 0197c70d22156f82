use sqlx::PgPool;

/// Executes entity query messages (`kanau::processor::Processor` impls live
/// next to the entities) against the shared connection pool.
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
