//! The live processing graph.
//!
//! ```text
//! source → input gain → analysis tap → EQ 125 … EQ 4k → balance → output gain → sink
//! ```
//!
//! A chain is built once per session from the current [`ParameterSet`] and
//! split in two: [`SignalChain`] (kept by the session, hands out weak
//! references) and [`ChainProcessor`] (moved into the output callback).
//! Parameters travel between them through lock-free [`Param`] cells.
//!
//! [`ParameterSet`]: crate::params::ParameterSet

pub mod controls;
pub mod graph;
pub mod stage;
pub mod tap;

pub use controls::{ChainControls, ParameterPush};
pub use graph::{ChainError, ChainProcessor, SignalChain, MAX_SAMPLE_RATE};
pub use stage::{Param, StageId, StageKind};
pub use tap::AnalysisTap;
