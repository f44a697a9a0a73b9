//! Maps payment-method system names to providers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::provider::PaymentProvider;
use crate::providers::DefaultPaymentProvider;

/// Provider lookup keyed by `PaymentMethod::sys_name`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `default` provider.
    pub fn with_defaults() -> Self {
        Self::new().with_provider(DefaultPaymentProvider::SYS_NAME, DefaultPaymentProvider)
    }

    /// Registers `provider` under `sys_name`, replacing any previous one.
    pub fn register(
        &mut self,
        sys_name: impl Into<String>,
        provider: impl PaymentProvider + 'static,
    ) {
        self.providers.insert(sys_name.into(), Arc::new(provider));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(
        mut self,
        sys_name: impl Into<String>,
        provider: impl PaymentProvider + 'static,
    ) -> Self {
        self.register(sys_name, provider);
        self
    }

    /// Returns the provider registered under `sys_name`.
    pub fn resolve(&self, sys_name: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(sys_name).cloned()
    }

    /// Returns the registered system names, sorted.
    pub fn sys_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.sys_names())
            .finish()
    }
}
