//! Configurable provider for tests and local runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use domain::{Payment, Purchase};

use crate::error::ProviderError;
use crate::provider::PaymentProvider;

/// One of the four provider operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    Process,
    Initiate,
    Cancel,
    Finalize,
}

impl ProviderOperation {
    /// Returns the operation name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Initiate => "initiate",
            Self::Cancel => "cancel",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the in-memory provider answers for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderOutcome {
    #[default]
    Approve,
    Decline,
    Fail(ProviderError),
}

#[derive(Debug, Default)]
struct InMemoryProviderState {
    outcomes: HashMap<ProviderOperation, ProviderOutcome>,
    calls: HashMap<ProviderOperation, usize>,
}

/// In-memory payment provider.
///
/// Approves everything until told otherwise and counts every call, so tests
/// can assert that the provider was (or was not) reached.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProvider {
    state: Arc<Mutex<InMemoryProviderState>>,
}

impl InMemoryPaymentProvider {
    /// Creates a provider that approves every operation.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the answer for subsequent calls to `operation`.
    pub fn set_outcome(&self, operation: ProviderOperation, outcome: ProviderOutcome) {
        self.lock().outcomes.insert(operation, outcome);
    }

    /// Makes every operation decline.
    pub fn decline_all(&self) {
        let mut state = self.lock();
        for operation in [
            ProviderOperation::Process,
            ProviderOperation::Initiate,
            ProviderOperation::Cancel,
            ProviderOperation::Finalize,
        ] {
            state.outcomes.insert(operation, ProviderOutcome::Decline);
        }
    }

    /// Returns how many times `operation` was called.
    pub fn call_count(&self, operation: ProviderOperation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Returns the number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    fn answer(&self, operation: ProviderOperation) -> Result<bool, ProviderError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_default() += 1;

        match state.outcomes.get(&operation).cloned().unwrap_or_default() {
            ProviderOutcome::Approve => Ok(true),
            ProviderOutcome::Decline => Ok(false),
            ProviderOutcome::Fail(err) => Err(err),
        }
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn process_payment(&self, _purchase: &Purchase) -> Result<bool, ProviderError> {
        self.answer(ProviderOperation::Process)
    }

    async fn initiate_payment(&self, _purchase: &Purchase) -> Result<bool, ProviderError> {
        self.answer(ProviderOperation::Initiate)
    }

    async fn cancel_payment(&self, _payment: &Payment) -> Result<bool, ProviderError> {
        self.answer(ProviderOperation::Cancel)
    }

    async fn finalize_payment(&self, _payment: &Payment) -> Result<bool, ProviderError> {
        self.answer(ProviderOperation::Finalize)
    }
}
