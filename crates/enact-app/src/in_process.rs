//! Backend that enforces through the embedded engine on this host.

use crate::backend::{BlockOutcome, CodeBlockBackend, EnforcementBackend, EnforcementResult};
use crate::error::RunError;
use enact_engine::{Catalog, LocalStore, Providers, Resource, ResourceStore, Transaction};
use enact_types::{EnforcedResource, ParameterSet, ResourceRef, RunOptions};

pub struct InProcessBackend {
    store: Box<dyn ResourceStore>,
    providers: Providers,
    node_name: String,
}

impl InProcessBackend {
    /// Backend with the default providers, enforcing as `node_name`.
    pub fn new(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        Self {
            store: Box::new(LocalStore::new(node_name.clone(), Providers::with_defaults())),
            providers: Providers::with_defaults(),
            node_name,
        }
    }

    /// Backend over a caller-supplied store (single resources) and providers (code blocks).
    pub fn with_store(
        node_name: impl Into<String>,
        store: Box<dyn ResourceStore>,
        providers: Providers,
    ) -> Self {
        Self {
            store,
            providers,
            node_name: node_name.into(),
        }
    }
}

impl EnforcementBackend for InProcessBackend {
    fn enforce(
        &mut self,
        reference: &ResourceRef,
        parameters: &ParameterSet,
        options: &RunOptions,
    ) -> EnforcementResult {
        let enforced = EnforcedResource::new(reference.clone(), parameters.clone());
        let resource = Resource::new(reference.clone(), parameters.clone());

        let saved = match self.store.save(resource, &reference.storage_key()) {
            Ok(saved) => saved,
            Err(err) => return EnforcementResult::failure(enforced, err.to_string()),
        };
        if options.debug {
            tracing::debug!("{saved:#?}");
        }

        if saved.report.status(reference).is_none() {
            return EnforcementResult::failure(
                enforced,
                format!("No status was reported for {}", reference.display_ref()),
            );
        }

        let failures = saved.report.failure_messages();
        if failures.is_empty() {
            EnforcementResult::success(enforced)
        } else {
            let message = failures.join("; ");
            EnforcementResult::failure(enforced, message)
        }
    }
}

impl CodeBlockBackend for InProcessBackend {
    fn apply_block(&mut self, code: &str, options: &RunOptions) -> Result<BlockOutcome, RunError> {
        let mut catalog = Catalog::compile(&self.node_name, code)
            .map_err(|e| RunError::fault(e.to_string()))?
            .filter(|r| r.is_virtual);
        catalog
            .finalize()
            .map_err(|e| RunError::fault(e.to_string()))?;

        let mut transaction = Transaction::new(&catalog, &self.providers);
        let failure_message = match transaction.evaluate() {
            Ok(()) => {
                let report = transaction.report();
                if options.debug {
                    tracing::debug!("{report:#?}");
                }
                let failures = report.failure_messages();
                (!failures.is_empty()).then(|| failures.join("; "))
            }
            Err(err) => Some(err.to_string()),
        };

        let enforced = catalog
            .managed_resources()
            .map(|r| EnforcedResource::new(r.reference.clone(), r.parameters.clone()))
            .collect();

        Ok(BlockOutcome {
            enforced,
            failure_message,
        })
    }
}
