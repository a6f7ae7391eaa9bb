use crate::catalog::Catalog;
use crate::model::Resource;
use crate::providers::Providers;
use crate::report::{Event, ResourceStatus, TransactionReport};
use enact_types::ids;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("catalog for {0} must be finalized before evaluation")]
    NotFinalized(String),
    #[error("found a dependency cycle between {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

/// Evaluates a finalized catalog in dependency order.
///
/// Scaffolding resources are never evaluated. Resources whose prerequisites failed (or were
/// skipped) are skipped, not failed.
pub struct Transaction<'a> {
    catalog: &'a Catalog,
    providers: &'a Providers,
    report: TransactionReport,
}

impl<'a> Transaction<'a> {
    pub fn new(catalog: &'a Catalog, providers: &'a Providers) -> Self {
        Self {
            catalog,
            providers,
            report: TransactionReport::new(catalog.node()),
        }
    }

    pub fn evaluate(&mut self) -> Result<(), TransactionError> {
        if !self.catalog.is_finalized() {
            return Err(TransactionError::NotFinalized(
                self.catalog.node().to_string(),
            ));
        }

        let resources: Vec<&Resource> = self.catalog.managed_resources().collect();
        let order = dependency_order(&resources)?;

        let mut unhealthy: BTreeSet<String> = BTreeSet::new();
        for index in order {
            let resource = resources[index];
            let display_ref = resource.display_ref();

            let blocked: Vec<String> = prerequisites(&resources, index)
                .into_iter()
                .map(|i| resources[i].display_ref())
                .filter(|r| unhealthy.contains(r))
                .collect();

            let status = if !blocked.is_empty() {
                tracing::warn!(resource = %display_ref, "skipping because of failed dependencies");
                ResourceStatus::skipped(
                    resource.reference.clone(),
                    format!(
                        "Skipping because of failed dependencies: {}",
                        blocked.join(", ")
                    ),
                )
            } else {
                let events = match self.providers.get(resource.type_name()) {
                    Some(provider) => provider.enforce(resource),
                    None => vec![Event::failure(
                        "ensure",
                        format!("Unknown resource type '{}'", resource.type_name()),
                    )],
                };
                ResourceStatus::from_events(resource.reference.clone(), events)
            };

            if status.failed || status.skipped {
                unhealthy.insert(display_ref);
            }
            self.report.resource_statuses.push(status);
        }

        Ok(())
    }

    pub fn report(&self) -> &TransactionReport {
        &self.report
    }

    pub fn into_report(self) -> TransactionReport {
        self.report
    }
}

/// Indices of resources that must run before `resources[index]`.
fn prerequisites(resources: &[&Resource], index: usize) -> Vec<usize> {
    let target = &resources[index].reference;
    let position = |r: &enact_types::ResourceRef| resources.iter().position(|c| &c.reference == r);

    let mut before: Vec<usize> = resources[index]
        .requires()
        .iter()
        .filter_map(position)
        .collect();
    for (i, other) in resources.iter().enumerate() {
        if other.before().iter().any(|r| r == target) {
            before.push(i);
        }
    }
    before.sort_unstable();
    before.dedup();
    before
}

/// Stable topological order: among ready resources, the earliest in catalog order goes first.
fn dependency_order(resources: &[&Resource]) -> Result<Vec<usize>, TransactionError> {
    let prereqs: Vec<Vec<usize>> = (0..resources.len())
        .map(|i| prerequisites(resources, i))
        .collect();

    let mut done = vec![false; resources.len()];
    let mut order = Vec::with_capacity(resources.len());
    while order.len() < resources.len() {
        let next = (0..resources.len())
            .find(|&i| !done[i] && prereqs[i].iter().all(|&p| done[p]));
        match next {
            Some(i) => {
                done[i] = true;
                order.push(i);
            }
            None => {
                let cycle = (0..resources.len())
                    .filter(|&i| !done[i])
                    .map(|i| resources[i].display_ref())
                    .collect();
                return Err(TransactionError::DependencyCycle(cycle));
            }
        }
    }

    // Builtins are filtered before this point; keep the invariant visible in debug builds.
    debug_assert!(
        order
            .iter()
            .all(|&i| !ids::is_builtin(&resources[i].display_ref()))
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the order it was called in; fails resources titled `fail*`.
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Provider for Recorder {
        fn enforce(&self, resource: &Resource) -> Vec<Event> {
            self.0.borrow_mut().push(resource.title().to_string());
            if resource.title().starts_with("fail") {
                vec![Event::failure("ensure", format!("{} broke", resource.title()))]
            } else {
                vec![Event::success("ensure", "done")]
            }
        }
    }

    fn run(code: &str) -> (Result<TransactionReport, TransactionError>, Vec<String>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut providers = Providers::empty();
        providers.register("task", Box::new(Recorder(Rc::clone(&calls))));

        let mut catalog = Catalog::compile("test", code).expect("compile");
        catalog.finalize().expect("finalize");
        let mut tx = Transaction::new(&catalog, &providers);
        let result = tx.evaluate().map(|()| tx.into_report());
        let calls = calls.borrow().clone();
        (result, calls)
    }

    #[test]
    fn evaluates_in_catalog_order_without_relationships() {
        let (report, calls) = run("task { 'a': }\ntask { 'b': }\ntask { 'c': }");
        let report = report.expect("evaluate");
        assert_eq!(calls, vec!["a", "b", "c"]);
        assert_eq!(report.resource_statuses.len(), 3);
        assert!(!report.failed());
    }

    #[test]
    fn require_and_before_reorder() {
        let (_, calls) = run(
            "task { 'a': require => Task['c'] }\ntask { 'b': before => Task['c'] }\ntask { 'c': }",
        );
        assert_eq!(calls, vec!["b", "c", "a"]);
    }

    #[test]
    fn dependents_of_failures_are_skipped() {
        let (report, calls) = run(
            "task { 'fail1': }\ntask { 'after': require => Task['fail1'] }\ntask { 'later': require => Task['after'] }\ntask { 'free': }",
        );
        let report = report.expect("evaluate");
        assert_eq!(calls, vec!["fail1", "free"]);
        assert!(report.failed());
        assert_eq!(report.failure_messages(), vec!["fail1 broke"]);

        let after = report
            .status(&enact_types::ResourceRef::new("task", "after"))
            .expect("status for after");
        assert!(after.skipped);
        assert!(!after.failed);
        let later = report
            .status(&enact_types::ResourceRef::new("task", "later"))
            .expect("status for later");
        assert!(later.skipped);
    }

    #[test]
    fn cycles_are_reported() {
        let (report, calls) = run(
            "task { 'a': require => Task['b'] }\ntask { 'b': require => Task['a'] }\ntask { 'c': }",
        );
        assert_eq!(
            report.expect_err("cycle"),
            TransactionError::DependencyCycle(vec!["Task[a]".to_string(), "Task[b]".to_string()])
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn unknown_types_fail_and_scaffolding_is_not_evaluated() {
        let mut catalog = Catalog::compile("test", "widget { 'w': }").expect("compile");
        catalog.finalize().expect("finalize");
        let providers = Providers::empty();
        let mut tx = Transaction::new(&catalog, &providers);
        tx.evaluate().expect("evaluate");
        let report = tx.report();
        assert_eq!(report.resource_statuses.len(), 1);
        assert_eq!(report.failure_messages(), vec!["Unknown resource type 'widget'"]);
    }

    #[test]
    fn unfinalized_catalogs_are_rejected() {
        let catalog = Catalog::compile("test", "").expect("compile");
        let providers = Providers::empty();
        let mut tx = Transaction::new(&catalog, &providers);
        assert_eq!(
            tx.evaluate(),
            Err(TransactionError::NotFinalized("test".to_string()))
        );
    }
}
