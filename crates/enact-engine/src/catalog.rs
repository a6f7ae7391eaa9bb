use crate::manifest::{ManifestError, parse_manifest};
use crate::model::Resource;
use enact_types::{ParameterSet, ResourceRef, ids};
use std::collections::BTreeSet;
use thiserror::Error;

/// `(type, title)` of the scaffolding every compiled catalog starts with.
///
/// Their display references are exactly [`ids::BUILTIN_RESOURCES`].
const SCAFFOLDING: &[(&str, &str)] = &[
    ("stage", "main"),
    ("class", "Settings"),
    ("class", "Main"),
    ("schedule", "puppet"),
    ("schedule", "hourly"),
    ("schedule", "daily"),
    ("schedule", "weekly"),
    ("schedule", "monthly"),
    ("schedule", "never"),
    ("filebucket", "puppet"),
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("could not parse code for node {node}: {source}")]
    Manifest {
        node: String,
        #[source]
        source: ManifestError,
    },
    #[error("duplicate declaration: {0} is already declared")]
    DuplicateDeclaration(String),
    #[error("{resource} references unknown resource {target}")]
    UnknownReference { resource: String, target: String },
}

/// A compiled set of resources for one node, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    node: String,
    resources: Vec<Resource>,
    finalized: bool,
}

impl Catalog {
    /// Compile manifest text. Scaffolding resources come first, then declarations in order.
    pub fn compile(node: &str, code: &str) -> Result<Catalog, CompileError> {
        let declared = parse_manifest(code).map_err(|source| CompileError::Manifest {
            node: node.to_string(),
            source,
        })?;

        let mut resources: Vec<Resource> = SCAFFOLDING
            .iter()
            .map(|(ty, title)| Resource::new(ResourceRef::new(*ty, *title), ParameterSet::new()))
            .collect();
        resources.extend(declared);

        tracing::debug!(node, resources = resources.len(), "compiled catalog");
        Ok(Catalog::from_resources(node, resources))
    }

    /// Catalog holding exactly the given resources (no scaffolding).
    pub fn from_resources(node: &str, resources: Vec<Resource>) -> Catalog {
        Catalog {
            node: node.to_string(),
            resources,
            finalized: false,
        }
    }

    /// Drop every resource matching `reject`.
    pub fn filter(mut self, reject: impl Fn(&Resource) -> bool) -> Catalog {
        self.resources.retain(|r| !reject(r));
        self
    }

    /// Validate declarations and freeze the catalog for evaluation.
    pub fn finalize(&mut self) -> Result<(), CompileError> {
        let mut seen = BTreeSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.display_ref()) {
                return Err(CompileError::DuplicateDeclaration(resource.display_ref()));
            }
        }

        for resource in &self.resources {
            for target in resource.requires().into_iter().chain(resource.before()) {
                let target = target.display_ref();
                if !seen.contains(&target) {
                    return Err(CompileError::UnknownReference {
                        resource: resource.display_ref(),
                        target,
                    });
                }
            }
        }

        self.finalized = true;
        Ok(())
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Resources that are not scaffolding, in catalog order.
    pub fn managed_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| !ids::is_builtin(&r.display_ref()))
    }
}
