// Stage G: IR construction (spec.md §3.2 / §4.G).
//
// A structured, labeled three-address IR sitting between the flat,
// explicated Surface AST and x86 lowering. Unlike the Surface AST, every
// control-transfer here is explicit (`Jump`/`Branch`/`Return`) and every
// expression's operands are leaves (`IRTarget`) — invariant I2. Built in a
// single top-down walk (no fixed point: by stage G the input is already
// three-address and free of nested functions).

use crate::frontend::ast::{self, BinOp, CmpOp, Constant, Expr, LValue, Module, Stmt, UnaryOp};
use crate::temp::TempGen;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrTarget {
    Name(String, ValueKind),
    Const(i64, ValueKind),
}

impl IrTarget {
    pub fn name(&self) -> Option<&str> {
        match self {
            IrTarget::Name(n, _) => Some(n),
            IrTarget::Const(..) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    Target(IrTarget),
    Call(String, Vec<IrTarget>),
    UnaryOp(UnaryOp, IrTarget),
    BinOp(BinOp, IrTarget, IrTarget),
    /// Only the six ordering/equality comparators survive to IR; `Is` is
    /// explicated away into a native `Eq` over raw boxed words (see
    /// `passes::explicate::explicate_is`).
    Compare(CmpOp, IrTarget, IrTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    Assign(IrTarget, IrExpr),
    ExprStmt(IrExpr),
    Label(String),
    Jump(String),
    Branch(IrTarget, String, String),
    Return(Option<IrTarget>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Falls off the end, or every `Return` is bare: the function yields
    /// no usable value (only `main` is actually this shape, via its
    /// synthesized `Return 0`).
    Value,
}

#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<IrStmt>,
    pub return_kind: ReturnKind,
    pub variables: HashSet<String>,
}

impl IrFunction {
    fn recompute_variables(&mut self) {
        let mut vars: HashSet<String> = self.params.iter().cloned().collect();
        for stmt in &self.body {
            collect_vars_stmt(stmt, &mut vars);
        }
        self.variables = vars;
    }
}

#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
}

fn collect_vars_target(t: &IrTarget, out: &mut HashSet<String>) {
    if let IrTarget::Name(n, _) = t {
        out.insert(n.clone());
    }
}

fn collect_vars_expr(e: &IrExpr, out: &mut HashSet<String>) {
    match e {
        IrExpr::Target(t) => collect_vars_target(t, out),
        IrExpr::Call(_, args) => args.iter().for_each(|a| collect_vars_target(a, out)),
        IrExpr::UnaryOp(_, a) => collect_vars_target(a, out),
        IrExpr::BinOp(_, a, b) | IrExpr::Compare(_, a, b) => {
            collect_vars_target(a, out);
            collect_vars_target(b, out);
        }
    }
}

fn collect_vars_stmt(stmt: &IrStmt, out: &mut HashSet<String>) {
    match stmt {
        IrStmt::Assign(t, e) => {
            collect_vars_target(t, out);
            collect_vars_expr(e, out);
        }
        IrStmt::ExprStmt(e) => collect_vars_expr(e, out),
        IrStmt::Label(_) | IrStmt::Jump(_) => {}
        IrStmt::Branch(t, _, _) => collect_vars_target(t, out),
        IrStmt::Return(t) => {
            if let Some(t) = t {
                collect_vars_target(t, out);
            }
        }
    }
}

/// Invariant I1: every control-transfer statement (`Jump`/`Branch`/`Return`)
/// must be immediately followed by a `Label`, except a trailing one at the
/// very end of the function body (nothing falls through past it anyway).
pub fn check_label_after_control_transfer(f: &IrFunction) -> Result<(), crate::diagnostics::LoweringError> {
    for (i, stmt) in f.body.iter().enumerate() {
        let is_transfer = matches!(stmt, IrStmt::Jump(_) | IrStmt::Branch(..) | IrStmt::Return(_));
        if is_transfer && i + 1 < f.body.len() && !matches!(f.body[i + 1], IrStmt::Label(_)) {
            return Err(crate::diagnostics::LoweringError::InvariantViolation(format!(
                "control-transfer statement at index {i} in function `{}` is not immediately followed by a label",
                f.name
            )));
        }
    }
    Ok(())
}

struct LowerCtx<'a> {
    temp: &'a mut TempGen,
    /// (loop condition label, loop end label) — `Break` jumps to the end
    /// label of the innermost enclosing `while`.
    loop_stack: Vec<String>,
}

pub fn lower_module(module: &Module, temp: &mut TempGen) -> Result<IrModule, crate::diagnostics::LoweringError> {
    let mut ctx = LowerCtx { temp, loop_stack: Vec::new() };
    let mut functions = Vec::new();
    let mut main_body_src = Vec::new();

    for stmt in &module.body {
        match stmt {
            Stmt::FunctionDef { name, params, body, .. } => {
                let mut ir_body = Vec::new();
                for s in body {
                    lower_stmt(s, &mut ir_body, &mut ctx);
                }
                let mut f = IrFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: ir_body,
                    return_kind: ReturnKind::Value,
                    variables: HashSet::new(),
                };
                f.recompute_variables();
                functions.push(f);
            }
            other => main_body_src.push(other.clone()),
        }
    }

    let mut main_body = Vec::new();
    for stmt in &main_body_src {
        lower_stmt(stmt, &mut main_body, &mut ctx);
    }
    main_body.push(IrStmt::Return(Some(IrTarget::Const(0, ValueKind::Int))));

    let mut main = IrFunction {
        name: "main".to_string(),
        params: Vec::new(),
        body: main_body,
        return_kind: ReturnKind::Value,
        variables: HashSet::new(),
    };
    main.recompute_variables();

    for f in functions.iter().chain(std::iter::once(&main)) {
        check_label_after_control_transfer(f)?;
    }

    let mut all = functions;
    all.push(main);
    Ok(IrModule { functions: all })
}

fn as_target(e: &Expr) -> IrTarget {
    match e {
        Expr::Constant(Constant::Int(n), _) => IrTarget::Const(*n, ValueKind::Int),
        Expr::Constant(Constant::Bool(b), _) => IrTarget::Const(*b as i64, ValueKind::Bool),
        Expr::Name(n, _, _) => IrTarget::Name(n.clone(), ValueKind::Int),
        other => unreachable!("IR lowering requires a simple operand, found {other:?} — stage F should have flattened it"),
    }
}

fn as_expr(e: &Expr) -> IrExpr {
    match e {
        Expr::Constant(..) | Expr::Name(..) => IrExpr::Target(as_target(e)),
        Expr::UnaryOp { op, operand, .. } => IrExpr::UnaryOp(*op, as_target(operand)),
        Expr::BinOp { op, left, right, .. } => IrExpr::BinOp(*op, as_target(left), as_target(right)),
        Expr::Compare { left, ops, comparators, .. } => {
            assert_eq!(ops.len(), 1, "chained comparisons are eliminated before IR lowering");
            IrExpr::Compare(ops[0], as_target(left), as_target(&comparators[0]))
        }
        Expr::Call { callee, args, .. } => {
            let args = args.iter().map(as_target).collect();
            IrExpr::Call(callee.clone(), args)
        }
        other => unreachable!("IR lowering does not expect {other:?} — explication/flattening should have removed it"),
    }
}

fn lower_stmt(stmt: &Stmt, out: &mut Vec<IrStmt>, ctx: &mut LowerCtx) {
    match stmt {
        Stmt::Assign { target: LValue::Name(name, _), value, .. } => {
            let target = IrTarget::Name(name.clone(), ValueKind::Int);
            out.push(IrStmt::Assign(target, as_expr(value)));
        }
        Stmt::Assign { target: LValue::Subscript { .. }, .. } => {
            unreachable!("subscript stores are rewritten to `set_subscript` calls by stage E")
        }
        Stmt::Expr(e) => out.push(IrStmt::ExprStmt(as_expr(e))),
        Stmt::If { test, body, orelse, .. } => {
            let then_label = ctx.temp.fresh("then");
            let else_label = ctx.temp.fresh("else");
            let end_label = ctx.temp.fresh("endif");
            out.push(IrStmt::Branch(as_target(test), then_label.clone(), else_label.clone()));
            out.push(IrStmt::Label(then_label));
            for s in body {
                lower_stmt(s, out, ctx);
            }
            out.push(IrStmt::Jump(end_label.clone()));
            out.push(IrStmt::Label(else_label));
            for s in orelse {
                lower_stmt(s, out, ctx);
            }
            out.push(IrStmt::Jump(end_label.clone()));
            out.push(IrStmt::Label(end_label));
        }
        // Desugar (stage B) already rewrote every loop into
        // `while true { if test { body } else { break }; }`; lowering that
        // canonical shape directly keeps `Break` trivial (jump to the
        // label this `While` pushes onto `loop_stack`).
        Stmt::While { body, .. } => {
            let cond_label = ctx.temp.fresh("loop");
            let end_label = ctx.temp.fresh("loopend");
            out.push(IrStmt::Jump(cond_label.clone()));
            out.push(IrStmt::Label(cond_label.clone()));
            ctx.loop_stack.push(end_label.clone());
            for s in body {
                lower_stmt(s, out, ctx);
            }
            ctx.loop_stack.pop();
            out.push(IrStmt::Jump(cond_label));
            out.push(IrStmt::Label(end_label));
        }
        Stmt::Break(_) => {
            let end_label = ctx.loop_stack.last().cloned().expect("`break` outside a loop is rejected at stage A");
            out.push(IrStmt::Jump(end_label.clone()));
            out.push(IrStmt::Label(ctx.temp.fresh("afterbreak")));
        }
        Stmt::Return { value, .. } => {
            out.push(IrStmt::Return(value.as_ref().map(as_target)));
            out.push(IrStmt::Label(ctx.temp.fresh("afterreturn")));
        }
        Stmt::FunctionDef { .. } => {
            unreachable!("function defs are hoisted to module top level by stage D before IR lowering runs")
        }
    }
}

// Re-export so callers can write `ast::Module` without importing it too.
pub use ast::Module as SurfaceModule;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::passes;

    fn lower(src: &str) -> IrModule {
        let mut m = parse(src).unwrap();
        let mut temp = TempGen::new();
        passes::validate::validate_and_rename(&mut m, &mut temp).unwrap();
        passes::desugar_and_flatten_to_fixpoint(&mut m, &mut temp);
        passes::closure::convert_closures(&mut m);
        passes::explicate::explicate_module(&mut m, &mut temp);
        passes::flatten::flatten_module(&mut m, &mut temp);
        lower_module(&m, &mut temp).unwrap()
    }

    #[test]
    fn main_ends_with_return_zero() {
        let ir = lower("print(1);");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        assert!(matches!(main.body.last(), Some(IrStmt::Return(Some(IrTarget::Const(0, _))))));
    }

    #[test]
    fn every_control_transfer_has_a_following_label() {
        let ir = lower("if (x) { print(1); } else { print(2); }");
        for f in &ir.functions {
            check_label_after_control_transfer(f).unwrap();
        }
    }

    #[test]
    fn while_loop_lowers_break_to_a_jump() {
        let ir = lower("while (x) { break; }");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let jump_count = main.body.iter().filter(|s| matches!(s, IrStmt::Jump(_))).count();
        assert!(jump_count >= 2, "expected at least the loop-back jump and the break jump");
    }

    #[test]
    fn function_def_becomes_its_own_ir_function() {
        let ir = lower("def f(x) { return x; } print(f(1));");
        assert!(ir.functions.iter().any(|f| f.name == "_f"));
    }
}
