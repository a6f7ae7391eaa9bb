//! Stable identifiers: builtin scaffolding references and backend names.

/// Display references of the scaffolding resources every compiled catalog carries.
///
/// These are never reported as script-managed.
pub const BUILTIN_RESOURCES: &[&str] = &[
    "Stage[main]",
    "Class[Settings]",
    "Class[Main]",
    "Schedule[puppet]",
    "Schedule[hourly]",
    "Schedule[daily]",
    "Schedule[weekly]",
    "Schedule[monthly]",
    "Schedule[never]",
    "Filebucket[puppet]",
];

pub fn is_builtin(display_ref: &str) -> bool {
    BUILTIN_RESOURCES.contains(&display_ref)
}

// Backends
pub const BACKEND_IN_PROCESS: &str = "in-process";
pub const BACKEND_DELEGATING: &str = "delegating";

/// Node identity used when compiling code blocks.
pub const DEFAULT_NODE_NAME: &str = "script";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_exact() {
        assert!(is_builtin("Stage[main]"));
        assert!(is_builtin("Filebucket[puppet]"));
        assert!(!is_builtin("Class[settings]"));
        assert!(!is_builtin("File[/tmp/a]"));
    }
}
