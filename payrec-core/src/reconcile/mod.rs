//! Payment-result reconciliation.
//!
//! Control flow for one inbound gateway response:
//!
//! 1. [`classifier::normalize`] turns the raw payload into an immutable
//!    [`NormalizedResult`].
//! 2. [`TransactionReconciler::reconcile`] checks the idempotency guard,
//!    merges response metadata into the transaction's custom fields
//!    (first-writer-wins), and invokes at most one host state-machine
//!    transition.
//! 3. [`projector::project`] derives the caller-facing response,
//!    independent of reconciliation.
//!
//! The host order/transaction state machine and the custom-field storage
//! are consumed through the capability traits in [`state_machine`], so the
//! reconciler can run against in-memory fakes in tests and against
//! [`host::HostPlatform`] in production.

pub mod classifier;
pub mod custom_fields;
pub mod host;
pub mod projector;
pub mod reconciler;
pub mod state_machine;

pub use classifier::{NormalizedResult, normalize};
pub use custom_fields::AdditionalDataPolicy;
pub use host::{HostPlatform, TransactionLock};
pub use projector::project;
pub use reconciler::{
    HaltReason, InvokedTransition, ReconcileError, ReconcileOutcome, TransactionReconciler,
    is_already_handled,
};
pub use state_machine::{CustomFieldsStore, StoreError, TransactionTransitions, TransitionError};
