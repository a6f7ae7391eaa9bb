//! Resource persistence: enforce one resource, addressed by its storage key.

use crate::catalog::{Catalog, CompileError};
use crate::model::Resource;
use crate::providers::Providers;
use crate::report::TransactionReport;
use crate::transaction::{Transaction, TransactionError};
use enact_types::ParameterSet;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key {actual} does not match resource key {expected}")]
    KeyMismatch { expected: String, actual: String },
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// What a save hands back: the resource as enforced and the transaction report.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveResult {
    pub resource: Resource,
    pub report: TransactionReport,
}

pub trait ResourceStore {
    fn save(&mut self, resource: Resource, key: &str) -> Result<SaveResult, StoreError>;
}

/// Enforces resources on this host through a single-resource catalog.
#[derive(Debug)]
pub struct LocalStore {
    node: String,
    providers: Providers,
}

impl LocalStore {
    pub fn new(node: impl Into<String>, providers: Providers) -> Self {
        Self {
            node: node.into(),
            providers,
        }
    }
}

impl ResourceStore for LocalStore {
    fn save(&mut self, resource: Resource, key: &str) -> Result<SaveResult, StoreError> {
        let expected = resource.reference.storage_key();
        if key != expected {
            return Err(StoreError::KeyMismatch {
                expected,
                actual: key.to_string(),
            });
        }

        // Relationships cannot point outside a single-resource catalog.
        let mut single = resource.clone();
        for meta in [crate::model::META_REQUIRE, crate::model::META_BEFORE] {
            if single.parameters.contains_key(meta) {
                tracing::debug!(key, meta, "ignoring relationship on standalone resource");
                let kept: ParameterSet = single
                    .parameters
                    .iter()
                    .filter(|(k, _)| k.as_str() != meta)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                single.parameters = kept;
            }
        }

        let mut catalog = Catalog::from_resources(&self.node, vec![single]);
        catalog.finalize()?;
        let mut transaction = Transaction::new(&catalog, &self.providers);
        transaction.evaluate()?;

        Ok(SaveResult {
            resource,
            report: transaction.into_report(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enact_types::ResourceRef;
    use serde_json::json;

    #[test]
    fn save_reports_one_status_for_the_resource() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("saved");
        let reference = ResourceRef::new("file", path.to_string_lossy().to_string());
        let mut params = ParameterSet::new();
        params.insert("content", json!("x"));
        let resource = Resource::new(reference.clone(), params);

        let mut store = LocalStore::new("script", Providers::with_defaults());
        let result = store
            .save(resource.clone(), &reference.storage_key())
            .expect("save");

        assert_eq!(result.resource, resource);
        assert_eq!(result.report.host, "script");
        let status = result.report.status(&reference).expect("status");
        assert!(status.changed);
        assert!(!status.failed);
        assert!(path.exists());
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let resource = Resource::new(ResourceRef::new("notify", "a"), ParameterSet::new());
        let mut store = LocalStore::new("script", Providers::with_defaults());
        let err = store.save(resource, "notify/b").expect_err("mismatch");
        assert_eq!(
            err,
            StoreError::KeyMismatch {
                expected: "notify/a".to_string(),
                actual: "notify/b".to_string(),
            }
        );
    }

    #[test]
    fn relationships_are_dropped_for_standalone_saves() {
        let mut params = ParameterSet::new();
        params.insert("require", json!("File[/nowhere]"));
        let resource = Resource::new(ResourceRef::new("notify", "n"), params);
        let mut store = LocalStore::new("script", Providers::with_defaults());
        let result = store.save(resource, "notify/n").expect("save");
        assert!(!result.report.failed());
    }
}
