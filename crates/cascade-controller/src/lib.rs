//! Cascade Controller: runs stages in order until one is confident enough
//!
//! # Cycle state machine
//!
//! ```text
//! Uninitialized → StageBound → Inferred → Evaluated ─┬─ Continue → StageBound(next)
//!                                                    └─ Stop → Reported
//! any non-terminal state ── collaborator failure ──▶ Error
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cascade_controller::CascadeController;
//!
//! let mut controller = CascadeController::new(engine, registry, config)?;
//! let report = controller.run_cycle(&mut camera, &mut sink);
//! println!("exited at {:?}", report.exit_stage());
//! ```

pub mod context;
pub mod device;
pub mod policy;
pub mod runner;
pub mod stats;

pub use cascade_core::Phase;
pub use context::CascadeState;
pub use device::CascadeDevice;
pub use policy::ExitPolicy;
pub use runner::CascadeController;
pub use stats::{ExitStats, StatsSummary};
