//! Transaction reconciliation.
//!
//! Applies one normalized gateway result to the host transaction state
//! machine exactly once per logical transition: idempotency guard, then
//! custom-field merge, then at most one transition dispatch.

use super::classifier::NormalizedResult;
use super::custom_fields::{AdditionalDataPolicy, stage_custom_fields};
use super::state_machine::{CustomFieldsStore, StoreError, TransactionTransitions, TransitionError};
use crate::entities::TransactionState;
use payrec_sdk::objects::ResultCode;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors propagated from the external collaborators.
///
/// The core never retries; retry and abort policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A state-machine transition failed.
    #[error("state transition failed: {0}")]
    Transition(#[from] TransitionError),

    /// Writing the merged custom fields failed.
    #[error("custom field write failed: {0}")]
    Store(#[from] StoreError),
}

/// The transition invoked during a reconciliation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokedTransition {
    Paid,
    Fail,
    Process,
}

/// Why a reconciliation halts the higher-level workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The gateway refused the payment.
    Refused,
    /// The gateway reported an error, or the result code is unhandled.
    ErrorOrUnhandled,
}

impl HaltReason {
    /// Human-readable reason handed to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            HaltReason::Refused => "payment refused",
            HaltReason::ErrorOrUnhandled => "payment error or unhandled result code",
        }
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one reconciliation call.
///
/// An explicit result type instead of exception-as-control-flow: callers
/// must handle the halted branch to cancel the surrounding order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A transition was invoked and the workflow continues.
    Applied { transition: InvokedTransition },
    /// The response has already been applied; nothing was done.
    AlreadyHandled,
    /// The caller must halt the workflow (cancel/fail the order).
    ///
    /// `transition` is `Some(Fail)` for Refused — the state transition
    /// succeeded *and* the caller is told to stop.
    Halted {
        transition: Option<InvokedTransition>,
        reason: HaltReason,
    },
}

impl ReconcileOutcome {
    /// Whether the caller must halt the higher-level workflow.
    pub fn is_failure(&self) -> bool {
        matches!(self, ReconcileOutcome::Halted { .. })
    }

    /// The halt reason, if any.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        match self {
            ReconcileOutcome::Halted { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Idempotency guard: has this result already been applied?
///
/// Only the three converging (code, state) pairs are guarded; repeated
/// deliveries of RedirectShopper / IdentifyShopper / ChallengeShopper /
/// Received / PresentToShopper always re-dispatch `process`. That gap is
/// deliberate upstream behavior — keep it until a product decision widens
/// the guard.
pub fn is_already_handled(result_code: ResultCode, current_state: TransactionState) -> bool {
    matches!(
        (result_code, current_state),
        (ResultCode::Authorised, TransactionState::Paid)
            | (ResultCode::Refused, TransactionState::Failed)
            | (ResultCode::Error, TransactionState::Failed)
            | (ResultCode::Canceled, TransactionState::Cancelled)
    )
}

/// Drives the host state machine forward from normalized gateway results.
///
/// Holds the two host capabilities; reconciliation for a given transaction
/// must be serialized by the caller (the HTTP layer takes a per-transaction
/// advisory lock), because the state read and the transition write are not
/// atomic.
pub struct TransactionReconciler<T, S> {
    transitions: T,
    fields: S,
    additional_data_policy: AdditionalDataPolicy,
}

impl<T, S> TransactionReconciler<T, S>
where
    T: TransactionTransitions,
    S: CustomFieldsStore,
{
    pub fn new(transitions: T, fields: S) -> Self {
        Self {
            transitions,
            fields,
            additional_data_policy: AdditionalDataPolicy::default(),
        }
    }

    /// Override the `additionalData` staging policy.
    pub fn with_additional_data_policy(mut self, policy: AdditionalDataPolicy) -> Self {
        self.additional_data_policy = policy;
        self
    }

    /// Apply one normalized result to the transaction.
    ///
    /// The custom-field merge is written before any transition is invoked,
    /// so the first-seen metadata is durable even when the transition call
    /// fails downstream. No atomicity across the two writes is assumed.
    pub async fn reconcile(
        &self,
        transaction_id: Uuid,
        normalized: &NormalizedResult,
        current_state: TransactionState,
        stored_custom_fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if is_already_handled(normalized.result_code, current_state) {
            debug!(
                transaction_id = %transaction_id,
                result_code = %normalized.result_code,
                state = %current_state,
                "Result already applied, skipping"
            );
            return Ok(ReconcileOutcome::AlreadyHandled);
        }

        if let Some(merged) = stage_custom_fields(
            normalized,
            stored_custom_fields,
            self.additional_data_policy,
        ) {
            self.fields
                .write_custom_fields(transaction_id, merged)
                .await?;
        }

        let outcome = match normalized.result_code {
            ResultCode::Authorised => {
                self.transitions.paid(transaction_id).await?;
                info!(transaction_id = %transaction_id, "Transaction marked paid");
                ReconcileOutcome::Applied {
                    transition: InvokedTransition::Paid,
                }
            }
            ResultCode::Refused => {
                self.transitions.fail(transaction_id).await?;
                warn!(
                    transaction_id = %transaction_id,
                    "Transaction failed: payment refused"
                );
                ReconcileOutcome::Halted {
                    transition: Some(InvokedTransition::Fail),
                    reason: HaltReason::Refused,
                }
            }
            ResultCode::RedirectShopper
            | ResultCode::IdentifyShopper
            | ResultCode::ChallengeShopper
            | ResultCode::Received
            | ResultCode::PresentToShopper => {
                self.transitions.process(transaction_id).await?;
                ReconcileOutcome::Applied {
                    transition: InvokedTransition::Process,
                }
            }
            ResultCode::Error | ResultCode::Canceled | ResultCode::Unsupported => {
                warn!(
                    transaction_id = %transaction_id,
                    result_code = %normalized.result_code,
                    "No transition for result code, halting workflow"
                );
                ReconcileOutcome::Halted {
                    transition: None,
                    reason: HaltReason::ErrorOrUnhandled,
                }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every transition invocation.
    #[derive(Default)]
    struct FakeTransitions {
        calls: Mutex<Vec<&'static str>>,
        fail_next: bool,
    }

    #[async_trait]
    impl TransactionTransitions for FakeTransitions {
        async fn paid(&self, _transaction_id: Uuid) -> Result<(), TransitionError> {
            if self.fail_next {
                return Err(TransitionError::Rejected("host is down".to_string()));
            }
            self.calls.lock().unwrap().push("paid");
            Ok(())
        }
        async fn fail(&self, _transaction_id: Uuid) -> Result<(), TransitionError> {
            self.calls.lock().unwrap().push("fail");
            Ok(())
        }
        async fn process(&self, _transaction_id: Uuid) -> Result<(), TransitionError> {
            self.calls.lock().unwrap().push("process");
            Ok(())
        }
    }

    /// Captures the last written custom-field document.
    #[derive(Default)]
    struct FakeStore {
        written: Mutex<Option<serde_json::Map<String, serde_json::Value>>>,
    }

    #[async_trait]
    impl CustomFieldsStore for FakeStore {
        async fn write_custom_fields(
            &self,
            _transaction_id: Uuid,
            custom_fields: serde_json::Map<String, serde_json::Value>,
        ) -> Result<(), StoreError> {
            *self.written.lock().unwrap() = Some(custom_fields);
            Ok(())
        }
    }

    fn normalized(result_code: ResultCode) -> NormalizedResult {
        NormalizedResult {
            result_code,
            psp_reference: "psp-1".to_string(),
            action: None,
            additional_data: None,
        }
    }

    fn reconciler() -> TransactionReconciler<FakeTransitions, FakeStore> {
        TransactionReconciler::new(FakeTransitions::default(), FakeStore::default())
    }

    fn transaction_id() -> Uuid {
        Uuid::from_u128(0x1234)
    }

    async fn run(
        reconciler: &TransactionReconciler<FakeTransitions, FakeStore>,
        code: ResultCode,
        state: TransactionState,
    ) -> ReconcileOutcome {
        reconciler
            .reconcile(
                transaction_id(),
                &normalized(code),
                state,
                &serde_json::Map::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_authorised_on_paid_is_a_no_op() {
        let reconciler = reconciler();
        let outcome = run(&reconciler, ResultCode::Authorised, TransactionState::Paid).await;
        assert_eq!(outcome, ReconcileOutcome::AlreadyHandled);
        assert!(reconciler.transitions.calls.lock().unwrap().is_empty());
        // The no-op path stages nothing either.
        assert!(reconciler.fields.written.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authorised_invokes_paid_from_any_other_state() {
        for state in [
            TransactionState::Open,
            TransactionState::InProgress,
            TransactionState::Failed,
            TransactionState::Cancelled,
        ] {
            let reconciler = reconciler();
            let outcome = run(&reconciler, ResultCode::Authorised, state).await;
            assert_eq!(
                outcome,
                ReconcileOutcome::Applied {
                    transition: InvokedTransition::Paid
                }
            );
            assert_eq!(*reconciler.transitions.calls.lock().unwrap(), vec!["paid"]);
        }
    }

    #[tokio::test]
    async fn test_refused_on_failed_is_a_no_op() {
        let reconciler = reconciler();
        let outcome = run(&reconciler, ResultCode::Refused, TransactionState::Failed).await;
        assert_eq!(outcome, ReconcileOutcome::AlreadyHandled);
        assert!(reconciler.transitions.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_invokes_fail_and_signals_failure() {
        let reconciler = reconciler();
        let outcome = run(&reconciler, ResultCode::Refused, TransactionState::Open).await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Halted {
                transition: Some(InvokedTransition::Fail),
                reason: HaltReason::Refused,
            }
        );
        assert!(outcome.is_failure());
        assert_eq!(
            outcome.halt_reason().unwrap().message(),
            "payment refused"
        );
        assert_eq!(*reconciler.transitions.calls.lock().unwrap(), vec!["fail"]);
    }

    #[tokio::test]
    async fn test_error_on_failed_is_a_no_op() {
        let reconciler = reconciler();
        let outcome = run(&reconciler, ResultCode::Error, TransactionState::Failed).await;
        assert_eq!(outcome, ReconcileOutcome::AlreadyHandled);
    }

    #[tokio::test]
    async fn test_canceled_on_cancelled_is_a_no_op() {
        let reconciler = reconciler();
        let outcome = run(&reconciler, ResultCode::Canceled, TransactionState::Cancelled).await;
        assert_eq!(outcome, ReconcileOutcome::AlreadyHandled);
    }

    #[tokio::test]
    async fn test_redirect_family_always_invokes_process() {
        // Repeated deliveries are never short-circuited: the guard only
        // covers the three converging codes.
        for code in [
            ResultCode::RedirectShopper,
            ResultCode::IdentifyShopper,
            ResultCode::ChallengeShopper,
            ResultCode::Received,
            ResultCode::PresentToShopper,
        ] {
            for state in [
                TransactionState::Open,
                TransactionState::InProgress,
                TransactionState::Paid,
                TransactionState::Failed,
                TransactionState::Cancelled,
            ] {
                let reconciler = reconciler();
                let outcome = run(&reconciler, code, state).await;
                assert_eq!(
                    outcome,
                    ReconcileOutcome::Applied {
                        transition: InvokedTransition::Process
                    },
                    "code {code}, state {state}"
                );
                assert!(!outcome.is_failure());
                assert_eq!(
                    *reconciler.transitions.calls.lock().unwrap(),
                    vec!["process"]
                );
            }
        }
    }

    #[tokio::test]
    async fn test_error_and_unsupported_halt_without_transition() {
        for code in [ResultCode::Error, ResultCode::Canceled, ResultCode::Unsupported] {
            let reconciler = reconciler();
            let outcome = run(&reconciler, code, TransactionState::Open).await;
            assert_eq!(
                outcome,
                ReconcileOutcome::Halted {
                    transition: None,
                    reason: HaltReason::ErrorOrUnhandled,
                }
            );
            assert_eq!(
                outcome.halt_reason().unwrap().message(),
                "payment error or unhandled result code"
            );
            assert!(
                reconciler.transitions.calls.lock().unwrap().is_empty(),
                "no transition may be invoked for {code}"
            );
        }
    }

    #[tokio::test]
    async fn test_custom_fields_written_before_transition_failure_surfaces() {
        let reconciler = TransactionReconciler::new(
            FakeTransitions {
                fail_next: true,
                ..FakeTransitions::default()
            },
            FakeStore::default(),
        );
        let err = reconciler
            .reconcile(
                transaction_id(),
                &normalized(ResultCode::Authorised),
                TransactionState::Open,
                &serde_json::Map::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Transition(_)));
        // The merge write happened before the transition blew up.
        let written = reconciler.fields.written.lock().unwrap();
        assert_eq!(written.as_ref().unwrap()["originalPspReference"], "psp-1");
    }

    #[tokio::test]
    async fn test_populated_fields_skip_the_store_write() {
        let reconciler = reconciler();
        let stored = match serde_json::json!({
            "originalPspReference": "first",
            "action": {"type": "redirect"},
            "additionalData": {"k": "v"}
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let outcome = reconciler
            .reconcile(
                transaction_id(),
                &normalized(ResultCode::Authorised),
                TransactionState::Open,
                &stored,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                transition: InvokedTransition::Paid
            }
        );
        assert!(reconciler.fields.written.lock().unwrap().is_none());
    }

    #[test]
    fn test_guard_matrix() {
        use TransactionState::*;
        assert!(is_already_handled(ResultCode::Authorised, Paid));
        assert!(is_already_handled(ResultCode::Refused, Failed));
        assert!(is_already_handled(ResultCode::Error, Failed));
        assert!(is_already_handled(ResultCode::Canceled, Cancelled));

        assert!(!is_already_handled(ResultCode::Authorised, Open));
        assert!(!is_already_handled(ResultCode::Refused, Paid));
        assert!(!is_already_handled(ResultCode::Canceled, Failed));
        // The in-flight codes are never guarded, whatever the state.
        for state in [Open, InProgress, Paid, Failed, Cancelled] {
            assert!(!is_already_handled(ResultCode::RedirectShopper, state));
            assert!(!is_already_handled(ResultCode::Received, state));
            assert!(!is_already_handled(ResultCode::PresentToShopper, state));
        }
    }
}
