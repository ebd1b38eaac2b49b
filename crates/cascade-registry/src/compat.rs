//! Chain compatibility between adjacent stages
//!
//! A mismatch here is not fatal at registry build time: the bridge rejects
//! it per cycle with `ShapeMismatch`. Tools use this report to warn early.

use crate::registry::StageRegistry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIssue {
    pub from_stage: usize,
    pub to_stage: usize,
    pub handoff_bytes: usize,
    pub input_bytes: usize,
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stage {} hands off {} bytes, stage {} expects {}",
            self.from_stage, self.handoff_bytes, self.to_stage, self.input_bytes
        )
    }
}

/// Adjacent pairs whose handoff cannot fill the next input exactly.
pub fn chain_issues(registry: &StageRegistry) -> Vec<ChainIssue> {
    let stages: Vec<_> = registry.iter().collect();
    stages
        .windows(2)
        .filter_map(|pair| {
            let handoff = pair[0].handoff()?;
            // every bridge conversion is one byte per int8 element
            let handoff_bytes = handoff.spec.element_count;
            let input_bytes = pair[1].input().byte_len();
            (handoff_bytes != input_bytes).then(|| ChainIssue {
                from_stage: pair[0].index(),
                to_stage: pair[1].index(),
                handoff_bytes,
                input_bytes,
            })
        })
        .collect()
}
