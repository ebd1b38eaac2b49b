//! Scenario files for the `cascade` binary
//!
//! A scenario bundles a [`CascadeConfig`], the simulated stages and how many
//! frames to run:
//!
//! ```yaml
//! cascade:
//!   entropy_threshold: 2.0
//! cycles: 50
//! stages:
//!   - name: tiny
//!     input: { element_type: int8, element_count: 9216 }
//!     logits: { classes: 8, entropy: 1.9 }
//!     handoff: { element_type: int8, element_count: 2304 }
//!   - name: large
//!     input: { element_type: int8, element_count: 2304 }
//!     logits: [0.1, 2.5, 0.0, 0.0]
//! ```

use anyhow::{bail, Context as _, Result};
use cascade_controller::{CascadeDevice, StatsSummary};
use cascade_core::{CascadeConfig, CycleReport, DetectionSink};
use cascade_registry::{chain_issues, ChainIssue, StageRegistry};
use cascade_sim::{SimEngine, SimStage, SyntheticCamera};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

fn default_cycles() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub cascade: CascadeConfig,
    pub stages: Vec<SimStage>,
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    /// 0-based frame numbers whose capture fails
    #[serde(default)]
    pub fail_frames: Vec<u64>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(yaml).context("invalid scenario file")?;
        if scenario.stages.is_empty() {
            bail!("scenario declares no stages");
        }
        scenario
            .cascade
            .validate()
            .context("invalid cascade configuration")?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn registry(&self) -> Result<StageRegistry> {
        let specs = self
            .stages
            .iter()
            .map(|stage| {
                stage
                    .spec()
                    .with_context(|| format!("stage {} has no valid model", stage.name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(StageRegistry::new(specs)?)
    }

    /// Handoff/input size disagreements between neighbouring stages.
    pub fn check(&self) -> Result<Vec<ChainIssue>> {
        Ok(chain_issues(&self.registry()?))
    }
}

/// Result of running a scenario to completion.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub summary: StatsSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<CycleReport>,
}

/// Run `cycles` frames (or the scenario's own count) through a simulated cascade.
pub fn run<D>(
    scenario: &Scenario,
    cycles: Option<u64>,
    keep_reports: bool,
    sink: &mut D,
) -> Result<RunOutcome>
where
    D: DetectionSink + ?Sized,
{
    let registry = scenario.registry()?;
    for issue in chain_issues(&registry) {
        warn!(%issue, "stage chain will fail at runtime");
    }

    let mut device = CascadeDevice::setup(SimEngine::new(), registry, scenario.cascade.clone())
        .context("cascade setup failed")?;
    let mut camera = SyntheticCamera::new().failing_on(scenario.fail_frames.iter().copied());

    let cycles = cycles.unwrap_or(scenario.cycles);
    info!(cycles, stages = scenario.stages.len(), "running scenario");
    let reports = device.run(cycles, &mut camera, sink);

    Ok(RunOutcome {
        summary: device.stats().summary(),
        reports: if keep_reports { reports } else { Vec::new() },
    })
}
