//! `ControlFlowAnalyzer`: builds a per-function CFG, flags
//! unreachable blocks and used-before-definition/unused-definition
//! variables, and computes cyclomatic complexity.
//!
//! The CFG is an arena-allocated `petgraph` digraph with integer-index
//! nodes and edges, per the Design Notes' "never as owned-pointer graphs"
//! rule — the same shape [`crate::call_graph::CallGraphAnalyzer`] uses for
//! the interprocedural graph.

use crate::AnalysisContext;
use petgraph::graph::{DiGraph, NodeIndex};
use pyforge_ir::{AssignTarget, BoolOp, FunctionDecl, SourceLocation, Stmt, TypedExpr};
use std::collections::HashSet;

/// One basic block: a straight-line run of statements with no internal
/// branch. `label` is a human-readable tag (`"entry"`, `"if@4:1-then"`) used
/// in diagnostics; the block does not retain the statements themselves,
/// only how many it holds, since nothing downstream re-reads block bodies
/// through the CFG (it is a shape-only structure for reachability and
/// complexity, not a second copy of the IR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub label: String,
    pub statement_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCond {
    Unconditional,
    True,
    False,
}

#[derive(Debug, Clone)]
pub struct FunctionCfg {
    pub function: String,
    pub graph: DiGraph<BasicBlock, EdgeCond>,
    pub entry: NodeIndex,
    pub exit: NodeIndex,
    pub cyclomatic_complexity: u32,
    /// Node indices with no predecessor reachable from `entry`.
    pub unreachable_blocks: Vec<usize>,
}

impl FunctionCfg {
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlFlowReport {
    pub success: bool,
    pub confidence: f64,
    pub findings: Vec<String>,
    pub warnings: Vec<String>,
    pub functions: Vec<FunctionCfg>,
    /// `(function, variable, location)` for names read before any reaching
    /// definition in the same function body.
    pub used_before_definition: Vec<(String, String, SourceLocation)>,
    /// `(function, variable)` for locals assigned but never read.
    pub unused_definitions: Vec<(String, String)>,
}

pub struct ControlFlowAnalyzer;

impl ControlFlowAnalyzer {
    pub fn analyze(ctx: &AnalysisContext<'_>) -> ControlFlowReport {
        let mut report = ControlFlowReport { success: true, confidence: 1.0, ..Default::default() };
        for f in ctx.module.functions() {
            match build_cfg(f) {
                Ok(cfg) => {
                    if !cfg.unreachable_blocks.is_empty() {
                        report.warnings.push(format!(
                            "{}: {} unreachable block(s)",
                            f.name,
                            cfg.unreachable_blocks.len()
                        ));
                    }
                    report.functions.push(cfg);
                }
                Err(msg) => {
                    // Degrades to best-effort rather than failing the whole
                    // pass.
                    report.confidence = report.confidence.min(0.5);
                    report.warnings.push(format!("{}: {msg}", f.name));
                }
            }
            analyze_definitions(f, &mut report);
        }
        report
    }
}

fn build_cfg(f: &FunctionDecl) -> Result<FunctionCfg, String> {
    let mut graph = DiGraph::new();
    let entry = graph.add_node(BasicBlock { label: "entry".to_string(), statement_count: 0 });
    let exit = graph.add_node(BasicBlock { label: "exit".to_string(), statement_count: 0 });
    let mut builder = CfgBuilder { graph: &mut graph, exit };
    let end = builder.lower_block(&f.body, entry, None, None);
    if let Some(end) = end {
        builder.graph.add_edge(end, exit, EdgeCond::Unconditional);
    }
    let unreachable = find_unreachable(&graph, entry);
    let cyclomatic = cyclomatic_complexity(&f.body);
    Ok(FunctionCfg {
        function: f.name.clone(),
        graph,
        entry,
        exit,
        cyclomatic_complexity: cyclomatic,
        unreachable_blocks: unreachable,
    })
}

struct CfgBuilder<'g> {
    graph: &'g mut DiGraph<BasicBlock, EdgeCond>,
    exit: NodeIndex,
}

impl<'g> CfgBuilder<'g> {
    fn block(&mut self, label: impl Into<String>) -> NodeIndex {
        self.graph.add_node(BasicBlock { label: label.into(), statement_count: 0 })
    }

    /// Lowers `body` starting at `current`, returning the block control
    /// falls off the end into, or `None` if every path out of `body`
    /// terminates (`return`/`break`/`continue`). `loop_header`/`loop_exit`
    /// are the targets `continue`/`break` jump to, when `body` is nested
    /// inside a loop.
    fn lower_block(
        &mut self,
        body: &[Stmt],
        mut current: NodeIndex,
        loop_header: Option<NodeIndex>,
        loop_exit: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        for stmt in body {
            self.graph[current].statement_count += 1;
            match stmt {
                Stmt::If { then_body, else_body, loc, .. } => {
                    let then_entry = self.block(format!("if@{loc}-then"));
                    self.graph.add_edge(current, then_entry, EdgeCond::True);
                    let then_end = self.lower_block(then_body, then_entry, loop_header, loop_exit);

                    let else_end = if let Some(else_body) = else_body {
                        let else_entry = self.block(format!("if@{loc}-else"));
                        self.graph.add_edge(current, else_entry, EdgeCond::False);
                        self.lower_block(else_body, else_entry, loop_header, loop_exit)
                    } else {
                        Some(current)
                    };

                    match (then_end, else_end) {
                        (None, None) => return None,
                        (Some(a), None) => current = a,
                        (None, Some(b)) => current = b,
                        (Some(a), Some(b)) => {
                            let merge = self.block(format!("if@{loc}-merge"));
                            self.graph.add_edge(a, merge, EdgeCond::Unconditional);
                            if b != current || else_body.is_none() {
                                self.graph.add_edge(b, merge, EdgeCond::Unconditional);
                            }
                            current = merge;
                        }
                    }
                }
                Stmt::While { body: inner, loc, .. } => {
                    let header = self.block(format!("while@{loc}-header"));
                    self.graph.add_edge(current, header, EdgeCond::Unconditional);
                    let loop_body = self.block(format!("while@{loc}-body"));
                    self.graph.add_edge(header, loop_body, EdgeCond::True);
                    let after = self.block(format!("while@{loc}-after"));
                    self.graph.add_edge(header, after, EdgeCond::False);
                    if let Some(body_end) = self.lower_block(inner, loop_body, Some(header), Some(after)) {
                        self.graph.add_edge(body_end, header, EdgeCond::Unconditional);
                    }
                    current = after;
                }
                Stmt::ForRange { body: inner, loc, .. } | Stmt::ForContainer { body: inner, loc, .. } => {
                    let header = self.block(format!("for@{loc}-header"));
                    self.graph.add_edge(current, header, EdgeCond::Unconditional);
                    let loop_body = self.block(format!("for@{loc}-body"));
                    self.graph.add_edge(header, loop_body, EdgeCond::True);
                    let after = self.block(format!("for@{loc}-after"));
                    self.graph.add_edge(header, after, EdgeCond::False);
                    if let Some(body_end) = self.lower_block(inner, loop_body, Some(header), Some(after)) {
                        self.graph.add_edge(body_end, header, EdgeCond::Unconditional);
                    }
                    current = after;
                }
                Stmt::Return { .. } => {
                    self.graph.add_edge(current, self.exit, EdgeCond::Unconditional);
                    return None;
                }
                Stmt::Break(_) => {
                    if let Some(exit) = loop_exit {
                        self.graph.add_edge(current, exit, EdgeCond::Unconditional);
                    }
                    return None;
                }
                Stmt::Continue(_) => {
                    if let Some(header) = loop_header {
                        self.graph.add_edge(current, header, EdgeCond::Unconditional);
                    }
                    return None;
                }
                Stmt::Assign { .. }
                | Stmt::AugAssign { .. }
                | Stmt::ExprStmt { .. }
                | Stmt::Assert { .. }
                | Stmt::Pass(_) => {}
            }
        }
        Some(current)
    }
}

/// Iterative DFS (never recursive, per the Design Notes' cycle-detection
/// rule) from `entry`, returning every node index it never reaches.
fn find_unreachable(graph: &DiGraph<BasicBlock, EdgeCond>, entry: NodeIndex) -> Vec<usize> {
    let mut visited = HashSet::new();
    let mut stack = vec![entry];
    while let Some(node) = stack.pop() {
        if visited.insert(node) {
            stack.extend(graph.neighbors(node));
        }
    }
    graph
        .node_indices()
        .filter(|n| !visited.contains(n))
        .map(|n| n.index())
        .collect()
}

fn cyclomatic_complexity(body: &[Stmt]) -> u32 {
    1 + cyclomatic_body(body)
}

fn cyclomatic_body(body: &[Stmt]) -> u32 {
    body.iter().map(cyclomatic_stmt).sum()
}

fn cyclomatic_stmt(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::If { condition, then_body, else_body, .. } => {
            let mut c = 1 + cyclomatic_expr(condition) + cyclomatic_body(then_body);
            if let Some(else_body) = else_body {
                c += cyclomatic_body(else_body);
            }
            c
        }
        Stmt::While { condition, body, .. } => 1 + cyclomatic_expr(condition) + cyclomatic_body(body),
        Stmt::ForRange { body, .. } | Stmt::ForContainer { body, .. } => 1 + cyclomatic_body(body),
        Stmt::ExprStmt { value, .. } | Stmt::Assign { value, .. } => cyclomatic_expr(value),
        _ => 0,
    }
}

fn cyclomatic_expr(expr: &TypedExpr) -> u32 {
    match &expr.kind {
        pyforge_ir::ExprKind::BoolOp { op: BoolOp::And | BoolOp::Or, values } => {
            (values.len() as u32).saturating_sub(1) + values.iter().map(cyclomatic_expr).sum::<u32>()
        }
        _ => 0,
    }
}

/// Single forward scan per function tracking which names are defined so
/// far; a name read before it appears in this set is used-before-def, and
/// any name never read by the end is an unused definition. Deliberately a
/// flat per-function scope rather than a scope stack: branches in the
/// supported subset never partially shadow a name the way nested Python
/// closures could, so the coarser per-function approximation is sufficient
/// for "unused" checks.
fn analyze_definitions(f: &FunctionDecl, report: &mut ControlFlowReport) {
    let mut defined: HashSet<String> = f.params.iter().map(|p| p.name.clone()).collect();
    let mut read: HashSet<String> = HashSet::new();
    let mut declared_locals: Vec<String> = Vec::new();
    scan_block(&f.body, &mut defined, &mut read, &mut declared_locals, &f.name, report);
    for local in declared_locals {
        if !read.contains(&local) {
            report.unused_definitions.push((f.name.clone(), local));
        }
    }
}

fn scan_block(
    body: &[Stmt],
    defined: &mut HashSet<String>,
    read: &mut HashSet<String>,
    declared_locals: &mut Vec<String>,
    func: &str,
    report: &mut ControlFlowReport,
) {
    for stmt in body {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                scan_expr(value, defined, read, func, report);
                match target {
                    AssignTarget::Name(name) => {
                        if defined.insert(name.clone()) {
                            declared_locals.push(name.clone());
                        }
                    }
                    AssignTarget::Subscript { base, index } => {
                        scan_expr(base, defined, read, func, report);
                        scan_expr(index, defined, read, func, report);
                    }
                    AssignTarget::DictKey { base, key } => {
                        scan_expr(base, defined, read, func, report);
                        scan_expr(key, defined, read, func, report);
                    }
                }
            }
            Stmt::AugAssign { target, value, loc, .. } => {
                if !defined.contains(target) {
                    report.used_before_definition.push((func.to_string(), target.clone(), *loc));
                }
                read.insert(target.clone());
                scan_expr(value, defined, read, func, report);
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                scan_expr(condition, defined, read, func, report);
                scan_block(then_body, defined, read, declared_locals, func, report);
                if let Some(else_body) = else_body {
                    scan_block(else_body, defined, read, declared_locals, func, report);
                }
            }
            Stmt::While { condition, body, .. } => {
                scan_expr(condition, defined, read, func, report);
                scan_block(body, defined, read, declared_locals, func, report);
            }
            Stmt::ForRange { var, start, stop, step, body, .. } => {
                scan_expr(start, defined, read, func, report);
                scan_expr(stop, defined, read, func, report);
                scan_expr(step, defined, read, func, report);
                if defined.insert(var.clone()) {
                    declared_locals.push(var.clone());
                }
                scan_block(body, defined, read, declared_locals, func, report);
            }
            Stmt::ForContainer { var, iter, body, .. } => {
                scan_expr(iter, defined, read, func, report);
                if defined.insert(var.clone()) {
                    declared_locals.push(var.clone());
                }
                scan_block(body, defined, read, declared_locals, func, report);
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    scan_expr(v, defined, read, func, report);
                }
            }
            Stmt::ExprStmt { value, .. } => scan_expr(value, defined, read, func, report),
            Stmt::Assert { condition, message, .. } => {
                scan_expr(condition, defined, read, func, report);
                if let Some(m) = message {
                    scan_expr(m, defined, read, func, report);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
        }
    }
}

fn scan_expr(
    expr: &TypedExpr,
    defined: &HashSet<String>,
    read: &mut HashSet<String>,
    func: &str,
    report: &mut ControlFlowReport,
) {
    use pyforge_ir::ExprKind;
    match &expr.kind {
        ExprKind::Name(name) => {
            read.insert(name.clone());
            if !defined.contains(name) {
                report.used_before_definition.push((func.to_string(), name.clone(), expr.loc));
            }
        }
        ExprKind::Literal(_) => {}
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            scan_expr(left, defined, read, func, report);
            scan_expr(right, defined, read, func, report);
        }
        ExprKind::Unary { operand, .. } => scan_expr(operand, defined, read, func, report),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                scan_expr(v, defined, read, func, report);
            }
        }
        ExprKind::Subscript { base, index } => {
            scan_expr(base, defined, read, func, report);
            scan_expr(index, defined, read, func, report);
        }
        ExprKind::Slice { base, start, stop, step } => {
            scan_expr(base, defined, read, func, report);
            for s in [start, stop, step].into_iter().flatten() {
                scan_expr(s, defined, read, func, report);
            }
        }
        ExprKind::Attribute { value, .. } => scan_expr(value, defined, read, func, report),
        ExprKind::Call { args, .. } => {
            for a in args {
                scan_expr(a, defined, read, func, report);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            scan_expr(object, defined, read, func, report);
            for a in args {
                scan_expr(a, defined, read, func, report);
            }
        }
        ExprKind::Container(lit) => match lit {
            pyforge_ir::ContainerLiteral::List(elts) | pyforge_ir::ContainerLiteral::Set(elts) => {
                for e in elts {
                    scan_expr(e, defined, read, func, report);
                }
            }
            pyforge_ir::ContainerLiteral::Dict(entries) => {
                for (k, v) in entries {
                    scan_expr(k, defined, read, func, report);
                    scan_expr(v, defined, read, func, report);
                }
            }
        },
        ExprKind::Comprehension(_) => {
            // Never appears post-`IrBuilder` normalization; nothing to scan.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_annotations::AnalysisLevel;
    use pyforge_ir::{Decl, FunctionProperties, Param, Type};

    fn func(name: &str, body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body,
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: SourceLocation::synthetic(),
        }
    }

    fn module_with(f: FunctionDecl) -> pyforge_ir::TypedModule {
        pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] }
    }

    #[test]
    fn straight_line_function_has_complexity_one() {
        let f = func(
            "f",
            vec![Stmt::Return {
                value: Some(TypedExpr::new(
                    pyforge_ir::ExprKind::Name("n".to_string()),
                    Type::I64,
                    SourceLocation::synthetic(),
                )),
                loc: SourceLocation::synthetic(),
            }],
        );
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = ControlFlowAnalyzer::analyze(&ctx);
        assert_eq!(report.functions[0].cyclomatic_complexity, 1);
        assert!(report.functions[0].unreachable_blocks.is_empty());
    }

    #[test]
    fn if_statement_raises_complexity_and_is_reachable() {
        let loc = SourceLocation::synthetic();
        let cond = TypedExpr::new(pyforge_ir::ExprKind::Literal(pyforge_ir::Literal::Bool(true)), Type::Bool, loc);
        let f = func(
            "g",
            vec![Stmt::If {
                condition: cond,
                then_body: vec![Stmt::Return { value: None, loc }],
                else_body: Some(vec![Stmt::Return { value: None, loc }]),
                loc,
            }],
        );
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = ControlFlowAnalyzer::analyze(&ctx);
        assert_eq!(report.functions[0].cyclomatic_complexity, 2);
    }

    #[test]
    fn detects_unused_local() {
        let loc = SourceLocation::synthetic();
        let assign = Stmt::Assign {
            target: AssignTarget::Name("unused".to_string()),
            value: TypedExpr::new(pyforge_ir::ExprKind::Literal(pyforge_ir::Literal::Int(1)), Type::I64, loc),
            loc,
        };
        let ret = Stmt::Return {
            value: Some(TypedExpr::new(pyforge_ir::ExprKind::Name("n".to_string()), Type::I64, loc)),
            loc,
        };
        let f = func("h", vec![assign, ret]);
        let m = module_with(f);
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = ControlFlowAnalyzer::analyze(&ctx);
        assert_eq!(report.unused_definitions, vec![("h".to_string(), "unused".to_string())]);
    }
}
