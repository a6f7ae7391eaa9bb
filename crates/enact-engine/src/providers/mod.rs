//! Resource providers: the code that actually changes the system.
//!
//! A provider inspects one resource and returns the events it produced. Failures are events too;
//! providers never return raw errors to the transaction.

mod exec;
mod file;
mod notify;

pub use exec::ExecProvider;
pub use file::FileProvider;
pub use notify::NotifyProvider;

use crate::model::Resource;
use crate::report::Event;
use std::collections::BTreeMap;

pub trait Provider {
    fn enforce(&self, resource: &Resource) -> Vec<Event>;
}

/// Registry of providers by resource type.
pub struct Providers {
    by_type: BTreeMap<String, Box<dyn Provider>>,
}

impl Providers {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            by_type: BTreeMap::new(),
        }
    }

    /// `file`, `exec`, and `notify`.
    pub fn with_defaults() -> Self {
        let mut providers = Self::empty();
        providers.register("file", Box::new(FileProvider));
        providers.register("exec", Box::new(ExecProvider));
        providers.register("notify", Box::new(NotifyProvider));
        providers
    }

    pub fn register(&mut self, type_name: &str, provider: Box<dyn Provider>) {
        self.by_type.insert(type_name.to_string(), provider);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn Provider> {
        self.by_type.get(type_name).map(|p| p.as_ref())
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.types()).finish()
    }
}
