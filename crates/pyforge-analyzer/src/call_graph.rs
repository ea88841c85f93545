//! `CallGraphAnalyzer`: builds the whole-module call graph,
//! classifies each call site, and detects recursion.
//!
//! Represented as a `petgraph` index arena per the Design Notes ("never as
//! owned-pointer graphs", "iterative DFS with visiting/visited color
//! marking — not recursion"): nodes are function names, edges are call
//! sites, and cycle detection walks the graph with an explicit stack
//! rather than recursive descent.

use crate::AnalysisContext;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use pyforge_ir::{ExprKind, FunctionDecl, SourceLocation, Stmt, TypedExpr};
use std::collections::HashMap;

/// Where in its caller a call site appears — distinguishes a call that can
/// shortcut control flow (tail position, a loop body) from one that can't,
/// which later feeds
/// `FunctionSpecializer`'s inlining heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    TailPosition,
    LoopBody,
    Conditional,
    Ordinary,
}

#[derive(Debug, Clone)]
pub struct CallSite {
    pub caller: String,
    pub callee: String,
    pub location: SourceLocation,
    pub context: CallContext,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraphReport {
    pub success: bool,
    pub confidence: f64,
    pub call_sites: Vec<CallSite>,
    pub warnings: Vec<String>,
    /// Functions that are their own callee, directly or through a cycle.
    pub recursive_functions: Vec<String>,
    /// Functions with no caller anywhere in the module.
    pub root_functions: Vec<String>,
    /// Functions that call nothing else in the module.
    pub leaf_functions: Vec<String>,
    /// `(function, fan_in, fan_out)` for every function in the module.
    pub fan: Vec<(String, usize, usize)>,
}

pub struct CallGraphAnalyzer {
    graph: DiGraph<String, SourceLocation>,
    index_of: HashMap<String, NodeIndex>,
}

impl CallGraphAnalyzer {
    pub fn analyze(ctx: &AnalysisContext<'_>) -> CallGraphReport {
        let mut analyzer = CallGraphAnalyzer { graph: DiGraph::new(), index_of: HashMap::new() };
        let mut report = CallGraphReport { success: true, confidence: 1.0, ..Default::default() };

        for f in ctx.module.functions() {
            analyzer.node_for(&f.name);
        }
        for f in ctx.module.functions() {
            collect_calls(f, &mut report.call_sites);
        }
        for site in &report.call_sites {
            let caller = analyzer.node_for(&site.caller);
            // Calls to functions outside this module (builtins, HPCL
            // intrinsics) are recorded in `call_sites` for `pyforge-core`'s
            // reporting but never get a graph node of their own, since the
            // graph only models this module's own functions.
            if let Some(&callee) = analyzer.index_of.get(&site.callee) {
                analyzer.graph.add_edge(caller, callee, site.location);
            }
        }

        report.recursive_functions = analyzer.find_recursive_functions();
        report.root_functions = analyzer.find_roots();
        report.leaf_functions = analyzer.find_leaves();
        report.fan = analyzer.fan_in_out();
        report
    }

    fn node_for(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index_of.insert(name.to_string(), idx);
        idx
    }

    fn find_roots(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.neighbors_directed(n, Direction::Incoming).next().is_none())
            .map(|n| self.graph[n].clone())
            .collect()
    }

    fn find_leaves(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.neighbors_directed(n, Direction::Outgoing).next().is_none())
            .map(|n| self.graph[n].clone())
            .collect()
    }

    fn fan_in_out(&self) -> Vec<(String, usize, usize)> {
        self.graph
            .node_indices()
            .map(|n| {
                let fan_in = self.graph.neighbors_directed(n, Direction::Incoming).count();
                let fan_out = self.graph.neighbors_directed(n, Direction::Outgoing).count();
                (self.graph[n].clone(), fan_in, fan_out)
            })
            .collect()
    }

    /// Tarjan-style iterative DFS: for each unvisited node, walk the graph
    /// with an explicit stack of `(node, child-iterator-position)` frames so
    /// there is no recursive call whose depth scales with the call chain.
    /// A node reached while still "on stack" marks every function on the
    /// stack between it and the top as recursive (covers both direct
    /// self-calls and mutual-recursion cycles).
    fn find_recursive_functions(&self) -> Vec<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut recursive = std::collections::HashSet::new();
        let mut path: Vec<NodeIndex> = Vec::new();

        for start in self.graph.node_indices() {
            if color[&start] != Color::White {
                continue;
            }
            let mut stack: Vec<(NodeIndex, std::vec::IntoIter<NodeIndex>)> =
                vec![(start, self.graph.neighbors(start).collect::<Vec<_>>().into_iter())];
            color.insert(start, Color::Gray);
            path.push(start);

            while let Some((node, iter)) = stack.last_mut() {
                let node = *node;
                match iter.next() {
                    Some(child) => match color[&child] {
                        Color::White => {
                            color.insert(child, Color::Gray);
                            path.push(child);
                            stack.push((child, self.graph.neighbors(child).collect::<Vec<_>>().into_iter()));
                        }
                        Color::Gray => {
                            // Back edge: mark every frame from `child` to
                            // the top of the path as part of this cycle.
                            if let Some(pos) = path.iter().position(|&n| n == child) {
                                for &n in &path[pos..] {
                                    recursive.insert(n);
                                }
                            }
                        }
                        Color::Black => {}
                    },
                    None => {
                        color.insert(node, Color::Black);
                        path.pop();
                        stack.pop();
                    }
                }
            }
        }

        recursive.into_iter().map(|n| self.graph[n].clone()).collect()
    }
}

fn collect_calls(f: &FunctionDecl, sites: &mut Vec<CallSite>) {
    collect_in_block(&f.name, &f.body, false, sites);
}

fn collect_in_block(caller: &str, body: &[Stmt], in_loop: bool, sites: &mut Vec<CallSite>) {
    let last = body.len().saturating_sub(1);
    for (i, stmt) in body.iter().enumerate() {
        let tail = i == last;
        match stmt {
            Stmt::Return { value: Some(v), .. } => collect_in_expr(caller, v, in_loop, tail, sites),
            Stmt::Return { value: None, .. } => {}
            Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
                collect_in_expr(caller, value, in_loop, false, sites);
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                collect_in_expr(caller, condition, in_loop, false, sites);
                collect_in_block(caller, then_body, in_loop, sites);
                if let Some(else_body) = else_body {
                    collect_in_block(caller, else_body, in_loop, sites);
                }
            }
            Stmt::While { condition, body, .. } => {
                collect_in_expr(caller, condition, in_loop, false, sites);
                collect_in_block(caller, body, true, sites);
            }
            Stmt::ForRange { start, stop, step, body, .. } => {
                collect_in_expr(caller, start, in_loop, false, sites);
                collect_in_expr(caller, stop, in_loop, false, sites);
                collect_in_expr(caller, step, in_loop, false, sites);
                collect_in_block(caller, body, true, sites);
            }
            Stmt::ForContainer { iter, body, .. } => {
                collect_in_expr(caller, iter, in_loop, false, sites);
                collect_in_block(caller, body, true, sites);
            }
            Stmt::Assert { condition, message, .. } => {
                collect_in_expr(caller, condition, in_loop, false, sites);
                if let Some(m) = message {
                    collect_in_expr(caller, m, in_loop, false, sites);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
        }
    }
}

fn collect_in_expr(caller: &str, expr: &TypedExpr, in_loop: bool, tail: bool, sites: &mut Vec<CallSite>) {
    match &expr.kind {
        ExprKind::Call { func, args } => {
            let context = if tail {
                CallContext::TailPosition
            } else if in_loop {
                CallContext::LoopBody
            } else {
                CallContext::Ordinary
            };
            sites.push(CallSite { caller: caller.to_string(), callee: func.clone(), location: expr.loc, context });
            for a in args {
                collect_in_expr(caller, a, in_loop, false, sites);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            collect_in_expr(caller, object, in_loop, false, sites);
            for a in args {
                collect_in_expr(caller, a, in_loop, false, sites);
            }
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            collect_in_expr(caller, left, in_loop, false, sites);
            collect_in_expr(caller, right, in_loop, false, sites);
        }
        ExprKind::Unary { operand, .. } => collect_in_expr(caller, operand, in_loop, false, sites),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                collect_in_expr(caller, v, in_loop, false, sites);
            }
        }
        ExprKind::Subscript { base, index } => {
            collect_in_expr(caller, base, in_loop, false, sites);
            collect_in_expr(caller, index, in_loop, false, sites);
        }
        ExprKind::Slice { base, start, stop, step } => {
            collect_in_expr(caller, base, in_loop, false, sites);
            for s in [start, stop, step].into_iter().flatten() {
                collect_in_expr(caller, s, in_loop, false, sites);
            }
        }
        ExprKind::Attribute { value, .. } => collect_in_expr(caller, value, in_loop, false, sites),
        ExprKind::Container(lit) => match lit {
            pyforge_ir::ContainerLiteral::List(elts) | pyforge_ir::ContainerLiteral::Set(elts) => {
                for e in elts {
                    collect_in_expr(caller, e, in_loop, false, sites);
                }
            }
            pyforge_ir::ContainerLiteral::Dict(entries) => {
                for (k, v) in entries {
                    collect_in_expr(caller, k, in_loop, false, sites);
                    collect_in_expr(caller, v, in_loop, false, sites);
                }
            }
        },
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Comprehension(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_annotations::AnalysisLevel;
    use pyforge_ir::{Decl, FunctionProperties, Param, Type};

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 0)
    }

    fn call(name: &str, args: Vec<TypedExpr>) -> TypedExpr {
        TypedExpr::new(ExprKind::Call { func: name.to_string(), args }, Type::I64, loc())
    }

    fn func(name: &str, body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: vec![Param { name: "n".to_string(), ty: Type::I64 }],
            ret_type: Type::I64,
            body,
            properties: FunctionProperties::default(),
            annotations: Default::default(),
            loc: loc(),
        }
    }

    #[test]
    fn direct_self_call_is_recursive() {
        let recurse = call("factorial", vec![]);
        let f = func("factorial", vec![Stmt::Return { value: Some(recurse), loc: loc() }]);
        let m = pyforge_ir::TypedModule { decls: vec![Decl::Function(f)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = CallGraphAnalyzer::analyze(&ctx);
        assert_eq!(report.recursive_functions, vec!["factorial".to_string()]);
    }

    #[test]
    fn non_recursive_chain_has_one_root_and_one_leaf() {
        let g_call = call("helper", vec![]);
        let f = func("main_fn", vec![Stmt::Return { value: Some(g_call), loc: loc() }]);
        let g = func("helper", vec![Stmt::Return { value: None, loc: loc() }]);
        let m = pyforge_ir::TypedModule { decls: vec![Decl::Function(f), Decl::Function(g)] };
        let ctx = AnalysisContext::new(&m, AnalysisLevel::Basic);
        let report = CallGraphAnalyzer::analyze(&ctx);
        assert!(report.recursive_functions.is_empty());
        assert_eq!(report.root_functions, vec!["main_fn".to_string()]);
        assert_eq!(report.leaf_functions, vec!["helper".to_string()]);
    }
}
