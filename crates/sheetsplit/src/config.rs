use crate::extract::ExtractStrategy;
use crate::loader::LoadMode;
use serde::{Deserialize, Serialize};

/// What to do when one eligible sheet fails to process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole split on the first failing sheet; no archive is produced.
    #[default]
    FailFast,
    /// Leave the failing sheet out, report it, and archive the rest.
    SkipAndReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub load_mode: LoadMode,
    pub strategy: ExtractStrategy,
    pub failure_policy: FailurePolicy,
    /// Extension of each archive entry, without the dot.
    pub extension: String,
    /// Extract sheets on the rayon pool instead of one at a time.
    pub parallel: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self::fidelity()
    }
}

impl SplitConfig {
    /// Clone-and-prune extraction: workbook theme and styles survive intact.
    pub fn fidelity() -> Self {
        Self {
            load_mode: LoadMode::SinglePass,
            strategy: ExtractStrategy::CloneAndPrune,
            failure_policy: FailurePolicy::FailFast,
            extension: "xlsx".to_string(),
            parallel: false,
        }
    }

    /// Fresh-workbook extraction: cheaper per sheet, drops theme data.
    pub fn lightweight() -> Self {
        Self {
            strategy: ExtractStrategy::Fresh,
            ..Self::fidelity()
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_load_mode(mut self, mode: LoadMode) -> Self {
        self.load_mode = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
