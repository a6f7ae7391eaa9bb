use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Run-wide options, resolved before script evaluation and read-only afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunOptions {
    /// Emit full debug dumps of enforcement results.
    pub debug: bool,
    /// Record individual enforcement failures and continue with the next statement.
    pub keep_going: bool,
    /// Announce each enforcement action before performing it.
    pub verbose: bool,
}
