use serde_json::json;

use crate::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Violation { current: usize, max: usize },
}

/// Equality passes, only a strictly greater total is a violation.
pub fn evaluate(total: usize, max_allowed: usize) -> Verdict {
    if total > max_allowed {
        Verdict::Violation {
            current: total,
            max: max_allowed,
        }
    } else {
        Verdict::Pass
    }
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn into_error(self) -> Option<RuleError> {
        match self {
            Verdict::Pass => None,
            Verdict::Violation { current, max } => Some(
                RuleError::new(
                    Vec::new(),
                    format!("Complexity of {current} is greater than max complexity of {max}"),
                )
                .with_extension("complexity", json!({ "current": current, "max": max })),
            ),
        }
    }
}
