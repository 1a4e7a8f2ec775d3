// Stage B: desugaring.
//
// Eliminates ternary (`IfExp`), `Lambda`, short-circuit `BoolOp`, and
// chained `Compare` nodes, rewriting each into plain `If` statements plus a
// result temporary. Runs to a fixed point together with Flatten (stage C) —
// see `passes::desugar_and_flatten_to_fixpoint`.

use crate::diagnostics::Span;
use crate::frontend::ast::*;
use crate::passes::body_stack::BodyStack;
use crate::temp::TempGen;

pub struct DesugarCtx<'a> {
    pub body: BodyStack,
    pub temp: &'a mut TempGen,
}

pub fn desugar_module(module: &mut Module, temp: &mut TempGen) {
    let mut ctx = DesugarCtx { body: BodyStack::new(), temp };
    ctx.body.enter();
    for stmt in std::mem::take(&mut module.body) {
        desugar_stmt(stmt, &mut ctx);
    }
    module.body = ctx.body.leave();
}

fn name_expr(name: &str, span: Span) -> Expr {
    Expr::Name(name.to_string(), Ctx::Load, span)
}

fn assign(name: &str, value: Expr, span: Span) -> Stmt {
    Stmt::Assign { target: LValue::Name(name.to_string(), span), value, span }
}

fn if_stmt(test: Expr, then: Vec<Stmt>, orelse: Vec<Stmt>, span: Span) -> Stmt {
    Stmt::If { test, body: then, orelse, span }
}

fn desugar_stmt(stmt: Stmt, ctx: &mut DesugarCtx) {
    match stmt {
        Stmt::Assign { target, value, span } => {
            let target = desugar_lvalue(target, ctx);
            let value = desugar_expr(value, ctx);
            ctx.body.push_stmt(Stmt::Assign { target, value, span });
        }
        Stmt::Expr(e) => {
            let e = desugar_expr(e, ctx);
            ctx.body.push_stmt(Stmt::Expr(e));
        }
        Stmt::If { test, body, orelse, span } => {
            let test = desugar_expr(test, ctx);
            ctx.body.enter();
            for s in body {
                desugar_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.enter();
            for s in orelse {
                desugar_stmt(s, ctx);
            }
            let orelse = ctx.body.leave();
            ctx.body.push_stmt(if_stmt(test, body, orelse, span));
        }
        // Already in canonical `while true { ...; if test {..} else {break}; }`
        // form (a fixed point of the rewrite below) — recurse without
        // rewriting again, or every further pass would wrap another
        // redundant `if true {...} else break` layer around the body.
        Stmt::While { test: test @ Expr::Constant(Constant::Bool(true), _), body, span } => {
            ctx.body.enter();
            for s in body {
                desugar_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::While { test, body, span });
        }
        Stmt::While { test, body, span } => {
            // Rewritten to the canonical `while true { <test eval>; if test
            // {body} else {break}; }` shape (SPEC_FULL §4.G) so a compound
            // condition's helper statements re-run every iteration instead
            // of being evaluated once before the loop and read stale from
            // then on.
            ctx.body.enter();
            let test = desugar_expr(test, ctx);
            ctx.body.enter();
            for s in body {
                desugar_stmt(s, ctx);
            }
            let then_body = ctx.body.leave();
            ctx.body.push_stmt(if_stmt(test, then_body, vec![Stmt::Break(span)], span));
            let loop_body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::While { test: Expr::Constant(Constant::Bool(true), span), body: loop_body, span });
        }
        Stmt::Break(span) => ctx.body.push_stmt(Stmt::Break(span)),
        Stmt::Return { value, span } => {
            let value = value.map(|v| desugar_expr(v, ctx));
            ctx.body.push_stmt(Stmt::Return { value, span });
        }
        Stmt::FunctionDef { name, params, body, span } => {
            ctx.body.enter();
            for s in body {
                desugar_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::FunctionDef { name, params, body, span });
        }
    }
}

fn desugar_lvalue(lv: LValue, ctx: &mut DesugarCtx) -> LValue {
    match lv {
        LValue::Name(n, s) => LValue::Name(n, s),
        LValue::Subscript { value, index, span } => LValue::Subscript {
            value: Box::new(desugar_expr(*value, ctx)),
            index: Box::new(desugar_expr(*index, ctx)),
            span,
        },
    }
}

fn desugar_expr(expr: Expr, ctx: &mut DesugarCtx) -> Expr {
    match expr {
        Expr::Constant(..) | Expr::Name(..) => expr,
        Expr::UnaryOp { op, operand, span } => {
            Expr::UnaryOp { op, operand: Box::new(desugar_expr(*operand, ctx)), span }
        }
        Expr::BinOp { op, left, right, span } => Expr::BinOp {
            op,
            left: Box::new(desugar_expr(*left, ctx)),
            right: Box::new(desugar_expr(*right, ctx)),
            span,
        },
        Expr::Subscript { value, index, ctx: sctx, span } => Expr::Subscript {
            value: Box::new(desugar_expr(*value, ctx)),
            index: Box::new(desugar_expr(*index, ctx)),
            ctx: sctx,
            span,
        },
        Expr::Call { callee, args, span } => {
            let args = args.into_iter().map(|a| desugar_expr(a, ctx)).collect();
            Expr::Call { callee, args, span }
        }
        Expr::List { elts, span } => {
            Expr::List { elts: elts.into_iter().map(|e| desugar_expr(e, ctx)).collect(), span }
        }
        Expr::Dict { keys, values, span } => Expr::Dict {
            keys: keys.into_iter().map(|e| desugar_expr(e, ctx)).collect(),
            values: values.into_iter().map(|e| desugar_expr(e, ctx)).collect(),
            span,
        },
        Expr::IfExp { test, body, orelse, span } => desugar_ifexp(*test, *body, *orelse, span, ctx),
        Expr::BoolOp { op, values, span } => desugar_boolop(op, values, span, ctx),
        Expr::Compare { left, ops, comparators, span } => desugar_compare(*left, ops, comparators, span, ctx),
        Expr::Lambda { params, body, span } => desugar_lambda(params, *body, span, ctx),
    }
}

fn desugar_ifexp(test: Expr, body: Expr, orelse: Expr, span: Span, ctx: &mut DesugarCtx) -> Expr {
    let test = desugar_expr(test, ctx);
    let tmp = ctx.temp.fresh("tern");

    ctx.body.enter();
    let body = desugar_expr(body, ctx);
    ctx.body.push_stmt(assign(&tmp, body, span));
    let then_body = ctx.body.leave();

    ctx.body.enter();
    let orelse = desugar_expr(orelse, ctx);
    ctx.body.push_stmt(assign(&tmp, orelse, span));
    let else_body = ctx.body.leave();

    ctx.body.push_stmt(if_stmt(test, then_body, else_body, span));
    name_expr(&tmp, span)
}

fn desugar_boolop(op: BoolOp, values: Vec<Expr>, span: Span, ctx: &mut DesugarCtx) -> Expr {
    let values: Vec<Expr> = values.into_iter().map(|v| desugar_expr(v, ctx)).collect();
    let tmp = ctx.temp.fresh("bool");

    ctx.body.push_stmt(assign(&tmp, Expr::Constant(Constant::Bool(false), span), span));

    // Build from the last value inward. The innermost level always tests
    // vn's own truthiness (spec.md §4.B: "if vn then ($tmp := vn) else
    // ($tmp := false)") — vn is never assigned unconditionally, since it may
    // itself be falsy. And assigns the value that decided truth at every
    // level, Or short-circuits on the first truthy value.
    let last = values.last().unwrap().clone();
    let mut chain: Vec<Stmt> = vec![if_stmt(
        last.clone(),
        vec![assign(&tmp, last, span)],
        vec![assign(&tmp, Expr::Constant(Constant::Bool(false), span), span)],
        span,
    )];
    for v in values[..values.len() - 1].iter().rev() {
        chain = match op {
            BoolOp::And => vec![if_stmt(v.clone(), chain, vec![assign(&tmp, Expr::Constant(Constant::Bool(false), span), span)], span)],
            BoolOp::Or => vec![if_stmt(v.clone(), vec![assign(&tmp, v.clone(), span)], chain, span)],
        };
    }
    ctx.body.push_stmt(chain.into_iter().next().unwrap());
    name_expr(&tmp, span)
}

fn desugar_compare(left: Expr, ops: Vec<CmpOp>, comparators: Vec<Expr>, span: Span, ctx: &mut DesugarCtx) -> Expr {
    let left = desugar_expr(left, ctx);
    let comparators: Vec<Expr> = comparators.into_iter().map(|c| desugar_expr(c, ctx)).collect();

    if ops.len() == 1 {
        return Expr::Compare { left: Box::new(left), ops, comparators, span };
    }

    let tmp = ctx.temp.fresh("cmp");
    ctx.body.push_stmt(assign(&tmp, Expr::Constant(Constant::Bool(false), span), span));

    let mut operands = vec![left];
    operands.extend(comparators);
    let pairs: Vec<(Expr, CmpOp, Expr)> =
        (0..ops.len()).map(|i| (operands[i].clone(), ops[i], operands[i + 1].clone())).collect();

    let mut chain = vec![assign(&tmp, Expr::Constant(Constant::Bool(true), span), span)];
    for (l, op, r) in pairs.into_iter().rev() {
        let test = Expr::Compare { left: Box::new(l), ops: vec![op], comparators: vec![r], span };
        chain = vec![if_stmt(test, chain, vec![assign(&tmp, Expr::Constant(Constant::Bool(false), span), span)], span)];
    }
    ctx.body.push_stmt(chain.into_iter().next().unwrap());
    name_expr(&tmp, span)
}

fn desugar_lambda(params: Vec<String>, body: Expr, span: Span, ctx: &mut DesugarCtx) -> Expr {
    let body = desugar_expr(body, ctx);
    let fn_name = ctx.temp.fresh("lambda");
    let def = Stmt::FunctionDef {
        name: fn_name.clone(),
        params,
        body: vec![Stmt::Return { value: Some(body), span }],
        span,
    };
    ctx.body.push_prelude(def);
    name_expr(&fn_name, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::frontend::unparse::unparse_module;

    #[test]
    fn desugars_ternary_into_if() {
        let mut m = parse("x = 1 if a else 2;").unwrap();
        let mut temp = TempGen::new();
        desugar_module(&mut m, &mut temp);
        assert!(m.body.iter().any(|s| matches!(s, Stmt::If { .. })));
    }

    #[test]
    fn desugars_lambda_into_hoisted_functiondef() {
        let mut m = parse("f = lambda x: x + 1;").unwrap();
        let mut temp = TempGen::new();
        desugar_module(&mut m, &mut temp);
        assert!(matches!(m.body[0], Stmt::FunctionDef { .. }));
    }

    #[test]
    fn rewrites_while_into_canonical_loop_with_break() {
        let mut m = parse("while (x < 10) { x = x + 1; }").unwrap();
        let mut temp = TempGen::new();
        desugar_module(&mut m, &mut temp);
        match &m.body[0] {
            Stmt::While { test, body, .. } => {
                assert!(matches!(test, Expr::Constant(Constant::Bool(true), _)));
                assert!(matches!(body.last(), Some(Stmt::If { .. })));
            }
            _ => panic!("expected a rewritten while loop"),
        }
    }

    #[test]
    fn desugar_is_idempotent_once_stable() {
        let mut m = parse("x = 1 + 2;").unwrap();
        let mut temp = TempGen::new();
        desugar_module(&mut m, &mut temp);
        let once = unparse_module(&m);
        desugar_module(&mut m, &mut temp);
        let twice = unparse_module(&m);
        assert_eq!(once, twice);
    }
}
