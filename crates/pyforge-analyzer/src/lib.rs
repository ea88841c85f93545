//! The "Analyzers" share of the intelligence layer: static
//! passes that read a [`pyforge_ir::TypedModule`] and its prior analysis
//! reports and produce a typed report of their own, never mutating the IR
//! itself beyond each node's annotation bag.
//!
//! Each pass exposes one `analyze(ctx) -> Report` entry point returning a
//! concrete report struct rather than a loosely-typed value, run in a
//! fixed order: control-flow, bounds, call-graph, symbolic-execution.

pub mod bounds;
pub mod call_graph;
pub mod cfg;
pub mod symbolic;

pub use bounds::{BoundsChecker, BoundsFinding, BoundsReport, BoundsSafety};
pub use call_graph::{CallContext, CallGraphAnalyzer, CallGraphReport, CallSite};
pub use cfg::{ControlFlowAnalyzer, ControlFlowReport, FunctionCfg};
pub use symbolic::{FunctionSymbolicSummary, SymbolicExecReport, SymbolicExecutor, SymbolicValue};

use pyforge_annotations::AnalysisLevel;
use pyforge_ir::TypedModule;

/// The context every analyzer pass is handed:
/// the module to analyze and the depth knob from [`pyforge_ir`]'s caller.
/// This context carries no prior-pass state of its own; later passes in
/// this workspace (e.g. [`symbolic::SymbolicExecutor`]) read an earlier pass's report
/// directly rather than through this context, since `pyforge-core` owns
/// pass sequencing.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub module: &'a TypedModule,
    pub analysis_level: AnalysisLevel,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(module: &'a TypedModule, analysis_level: AnalysisLevel) -> Self {
        Self { module, analysis_level }
    }

    pub fn is_comprehensive(&self) -> bool {
        matches!(self.analysis_level, AnalysisLevel::Comprehensive)
    }
}
