// Stage C (and its reuse as stage F, "re-flatten" after Explicate):
// three-address normalization. Every operand of a compound expression is
// forced to be a `Name` or `Constant`; `If`/`While` tests and `Return`
// values are forced simple outright, since later stages (IR lowering, in
// particular) assume it.
//
// One pattern is excluded on purpose: `eval(input())` is never pulled
// apart, because Explicate (stage E) pattern-matches that exact shape as a
// single primitive (`eval_input_pyobj`). Flattening the inner `input()`
// call into its own temporary would hide that shape from Explicate.

use crate::frontend::ast::*;
use crate::passes::body_stack::BodyStack;
use crate::temp::TempGen;

pub struct FlattenCtx<'a> {
    pub body: BodyStack,
    pub temp: &'a mut TempGen,
}

pub fn flatten_module(module: &mut Module, temp: &mut TempGen) {
    let mut ctx = FlattenCtx { body: BodyStack::new(), temp };
    ctx.body.enter();
    for stmt in std::mem::take(&mut module.body) {
        flatten_stmt(stmt, &mut ctx);
    }
    module.body = ctx.body.leave();
}

fn is_eval_input(e: &Expr) -> bool {
    matches!(e, Expr::Call { callee, args, .. }
        if callee == "eval"
        && args.len() == 1
        && matches!(&args[0], Expr::Call { callee, args, .. } if callee == "input" && args.is_empty()))
}

fn flatten_operand(e: Expr, ctx: &mut FlattenCtx) -> Expr {
    let e = flatten_children(e, ctx);
    if e.is_simple() {
        e
    } else {
        let tmp = ctx.temp.fresh("tmp");
        let span = e.span();
        ctx.body.push_stmt(Stmt::Assign { target: LValue::Name(tmp.clone(), span), value: e, span });
        Expr::Name(tmp, Ctx::Load, span)
    }
}

/// Flattens operands one level down without forcing `e` itself to be simple.
fn flatten_children(e: Expr, ctx: &mut FlattenCtx) -> Expr {
    match e {
        Expr::Constant(..) | Expr::Name(..) => e,
        Expr::UnaryOp { op, operand, span } => {
            Expr::UnaryOp { op, operand: Box::new(flatten_operand(*operand, ctx)), span }
        }
        Expr::BinOp { op, left, right, span } => Expr::BinOp {
            op,
            left: Box::new(flatten_operand(*left, ctx)),
            right: Box::new(flatten_operand(*right, ctx)),
            span,
        },
        Expr::Compare { left, ops, comparators, span } => Expr::Compare {
            left: Box::new(flatten_operand(*left, ctx)),
            ops,
            comparators: comparators.into_iter().map(|c| flatten_operand(c, ctx)).collect(),
            span,
        },
        Expr::Call { callee, args, span } => {
            if callee == "eval" && args.len() == 1 && is_input_call(&args[0]) {
                Expr::Call { callee, args, span }
            } else {
                Expr::Call { callee, args: args.into_iter().map(|a| flatten_operand(a, ctx)).collect(), span }
            }
        }
        Expr::List { elts, span } => {
            Expr::List { elts: elts.into_iter().map(|e| flatten_operand(e, ctx)).collect(), span }
        }
        Expr::Dict { keys, values, span } => Expr::Dict {
            keys: keys.into_iter().map(|e| flatten_operand(e, ctx)).collect(),
            values: values.into_iter().map(|e| flatten_operand(e, ctx)).collect(),
            span,
        },
        Expr::Subscript { value, index, ctx: sctx, span } => Expr::Subscript {
            value: Box::new(flatten_operand(*value, ctx)),
            index: Box::new(flatten_operand(*index, ctx)),
            ctx: sctx,
            span,
        },
        // BoolOp/IfExp/Lambda never survive stage B; if re-flatten (stage F)
        // sees them it is because Explicate just built one as a template
        // fragment, so fall back to the general operand recursion.
        Expr::BoolOp { op, values, span } => {
            Expr::BoolOp { op, values: values.into_iter().map(|v| flatten_operand(v, ctx)).collect(), span }
        }
        Expr::IfExp { test, body, orelse, span } => Expr::IfExp {
            test: Box::new(flatten_operand(*test, ctx)),
            body: Box::new(flatten_operand(*body, ctx)),
            orelse: Box::new(flatten_operand(*orelse, ctx)),
            span,
        },
        Expr::Lambda { .. } => e,
    }
}

fn is_input_call(e: &Expr) -> bool {
    matches!(e, Expr::Call { callee, args, .. } if callee == "input" && args.is_empty())
}

fn flatten_top(e: Expr, ctx: &mut FlattenCtx) -> Expr {
    if is_eval_input(&e) {
        return e;
    }
    flatten_children(e, ctx)
}

fn flatten_lvalue(lv: LValue, ctx: &mut FlattenCtx) -> LValue {
    match lv {
        LValue::Name(n, s) => LValue::Name(n, s),
        LValue::Subscript { value, index, span } => LValue::Subscript {
            value: Box::new(flatten_operand(*value, ctx)),
            index: Box::new(flatten_operand(*index, ctx)),
            span,
        },
    }
}

fn flatten_stmt(stmt: Stmt, ctx: &mut FlattenCtx) {
    match stmt {
        Stmt::Assign { target, value, span } => {
            let target = flatten_lvalue(target, ctx);
            let value = flatten_top(value, ctx);
            ctx.body.push_stmt(Stmt::Assign { target, value, span });
        }
        Stmt::Expr(e) => {
            let e = flatten_top(e, ctx);
            ctx.body.push_stmt(Stmt::Expr(e));
        }
        Stmt::If { test, body, orelse, span } => {
            let test = flatten_operand(test, ctx);
            ctx.body.enter();
            for s in body {
                flatten_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.enter();
            for s in orelse {
                flatten_stmt(s, ctx);
            }
            let orelse = ctx.body.leave();
            ctx.body.push_stmt(Stmt::If { test, body, orelse, span });
        }
        Stmt::While { test, body, span } => {
            let test = flatten_operand(test, ctx);
            ctx.body.enter();
            for s in body {
                flatten_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::While { test, body, span });
        }
        Stmt::Break(span) => ctx.body.push_stmt(Stmt::Break(span)),
        Stmt::Return { value, span } => {
            let value = value.map(|v| flatten_operand(v, ctx));
            ctx.body.push_stmt(Stmt::Return { value, span });
        }
        Stmt::FunctionDef { name, params, body, span } => {
            ctx.body.enter();
            for s in body {
                flatten_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::FunctionDef { name, params, body, span });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::frontend::unparse::unparse_module;

    #[test]
    fn flattens_nested_binop() {
        let mut m = parse("x = (1 + 2) + 3;").unwrap();
        let mut temp = TempGen::new();
        flatten_module(&mut m, &mut temp);
        // the inner `1 + 2` must have been hoisted to its own assignment
        assert_eq!(m.body.len(), 2);
    }

    #[test]
    fn flatten_is_idempotent() {
        let mut m = parse("x = (1 + 2) + 3;").unwrap();
        let mut temp = TempGen::new();
        flatten_module(&mut m, &mut temp);
        let once = unparse_module(&m);
        flatten_module(&mut m, &mut temp);
        let twice = unparse_module(&m);
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_eval_input_shape() {
        let mut m = parse("x = eval(input());").unwrap();
        let mut temp = TempGen::new();
        flatten_module(&mut m, &mut temp);
        assert_eq!(m.body.len(), 1);
        if let Stmt::Assign { value, .. } = &m.body[0] {
            assert!(is_eval_input(value));
        } else {
            panic!("expected assign");
        }
    }

    #[test]
    fn forces_while_test_to_a_name() {
        let mut m = parse("while (x < 10) { x = x + 1; }").unwrap();
        let mut temp = TempGen::new();
        flatten_module(&mut m, &mut temp);
        if let Stmt::While { test, .. } = &m.body[m.body.len() - 1] {
            assert!(matches!(test, Expr::Name(..)));
        } else {
            panic!("expected while as last top-level statement");
        }
    }
}
