// Stage E: explicate.
//
// Replaces every polymorphic Source operator with a monomorphic dispatch
// tree over the runtime tag bits of its operands (SPEC_FULL §4.E / spec.md
// §4.E). Tag layout: `00=int`, `01=bool`, `11=big` (heap list/dict).
//
// This pass only *builds* template statement/expression trees — it does
// not itself force operands into `Name` form. Stage F (re-running
// `passes::flatten`) normalizes whatever this pass produces, exactly the
// way the teacher's multi-pass pipeline lets one stage hand an
// un-normalized fragment to the next.

use crate::diagnostics::Span;
use crate::frontend::ast::*;
use crate::passes::body_stack::BodyStack;
use crate::temp::TempGen;

pub struct ExplicateCtx<'a> {
    pub body: BodyStack,
    pub temp: &'a mut TempGen,
}

pub fn explicate_module(module: &mut Module, temp: &mut TempGen) {
    let mut ctx = ExplicateCtx { body: BodyStack::new(), temp };
    ctx.body.enter();
    for stmt in std::mem::take(&mut module.body) {
        explicate_stmt(stmt, &mut ctx);
    }
    module.body = ctx.body.leave();
}

#[derive(Clone, Copy)]
enum Tag {
    Int,
    Bool,
    Big,
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

fn call(name: &str, args: Vec<Expr>, span: Span) -> Expr {
    Expr::Call { callee: name.to_string(), args, span }
}

fn is_int(e: Expr, span: Span) -> Expr {
    call("is_int", vec![e], span)
}
fn is_bool(e: Expr, span: Span) -> Expr {
    call("is_bool", vec![e], span)
}
fn is_big(e: Expr, span: Span) -> Expr {
    call("is_big", vec![e], span)
}
fn is_true(e: Expr, span: Span) -> Expr {
    call("is_true", vec![e], span)
}
fn project_int(e: Expr, span: Span) -> Expr {
    call("project_int", vec![e], span)
}
fn project_bool(e: Expr, span: Span) -> Expr {
    call("project_bool", vec![e], span)
}
fn project_big(e: Expr, span: Span) -> Expr {
    call("project_big", vec![e], span)
}
fn inject_int(e: Expr, span: Span) -> Expr {
    call("inject_int", vec![e], span)
}
fn inject_bool(e: Expr, span: Span) -> Expr {
    call("inject_bool", vec![e], span)
}
fn inject_big(e: Expr, span: Span) -> Expr {
    call("inject_big", vec![e], span)
}
fn error_pyobj(span: Span) -> Expr {
    call("error_pyobj", vec![], span)
}
fn int_const(n: i64, span: Span) -> Expr {
    Expr::Constant(Constant::Int(n), span)
}
fn bool_const(b: bool, span: Span) -> Expr {
    Expr::Constant(Constant::Bool(b), span)
}
fn native_add(a: Expr, b: Expr, span: Span) -> Expr {
    Expr::BinOp { op: BinOp::Add, left: Box::new(a), right: Box::new(b), span }
}
fn native_cmp(op: CmpOp, a: Expr, b: Expr, span: Span) -> Expr {
    Expr::Compare { left: Box::new(a), ops: vec![op], comparators: vec![b], span }
}

/// Builds the 3x3 (int/bool/big) tag-test ladder for a binary operator:
/// tests `l`'s tag first, then `r`'s, assigning `leaf(tag_l, tag_r)` into
/// `tmp`. Mirrors "if-ladder matching the Cartesian product of operand
/// tags" (spec.md §4.E) directly — one nested `If` per tag, not a lookup
/// table, since tags are only ever inspected via the runtime predicates.
fn dispatch_tag_pair(ctx: &mut ExplicateCtx, span: Span, tmp: &str, l: &Expr, r: &Expr, leaf: impl Fn(Tag, Tag) -> Expr) {
    let r_branch = |tag_l: Tag| {
        vec![if_stmt(
            is_int(r.clone(), span),
            vec![assign(tmp, leaf(tag_l, Tag::Int), span)],
            vec![if_stmt(
                is_bool(r.clone(), span),
                vec![assign(tmp, leaf(tag_l, Tag::Bool), span)],
                vec![if_stmt(
                    is_big(r.clone(), span),
                    vec![assign(tmp, leaf(tag_l, Tag::Big), span)],
                    vec![assign(tmp, error_pyobj(span), span)],
                    span,
                )],
                span,
            )],
            span,
        )]
    };
    let chain = if_stmt(
        is_int(l.clone(), span),
        r_branch(Tag::Int),
        vec![if_stmt(
            is_bool(l.clone(), span),
            r_branch(Tag::Bool),
            vec![if_stmt(is_big(l.clone(), span), r_branch(Tag::Big), vec![assign(tmp, error_pyobj(span), span)], span)],
            span,
        )],
        span,
    );
    ctx.body.push_stmt(chain);
}

fn dispatch_tag_single(ctx: &mut ExplicateCtx, span: Span, tmp: &str, operand: &Expr, leaf: impl Fn(Tag) -> Expr) {
    let chain = if_stmt(
        is_int(operand.clone(), span),
        vec![assign(tmp, leaf(Tag::Int), span)],
        vec![if_stmt(
            is_bool(operand.clone(), span),
            vec![assign(tmp, leaf(Tag::Bool), span)],
            vec![if_stmt(is_big(operand.clone(), span), vec![assign(tmp, leaf(Tag::Big), span)], vec![assign(tmp, error_pyobj(span), span)], span)],
            span,
        )],
        span,
    );
    ctx.body.push_stmt(chain);
}

fn explicate_add(left: Expr, right: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let l = explicate_expr(left, ctx);
    let r = explicate_expr(right, ctx);
    let tmp = ctx.temp.fresh("add");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let scalar = |l: Expr, r: Expr| inject_int(native_add(l, r, span), span);
    let (l2, r2) = (l.clone(), r.clone());
    dispatch_tag_pair(ctx, span, &tmp, &l, &r, move |tl, tr| {
        let (l, r) = (l2.clone(), r2.clone());
        match (tl, tr) {
        (Tag::Int, Tag::Int) => scalar(project_int(l.clone(), span), project_int(r.clone(), span)),
        (Tag::Int, Tag::Bool) => scalar(project_int(l.clone(), span), project_bool(r.clone(), span)),
        (Tag::Bool, Tag::Int) => scalar(project_bool(l.clone(), span), project_int(r.clone(), span)),
        (Tag::Bool, Tag::Bool) => scalar(project_bool(l.clone(), span), project_bool(r.clone(), span)),
            (Tag::Big, Tag::Big) => inject_big(call("add", vec![project_big(l.clone(), span), project_big(r.clone(), span)], span), span),
            _ => error_pyobj(span),
        }
    });
    name_expr(&tmp, span)
}

fn explicate_unary(op: UnaryOp, operand: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let o = explicate_expr(operand, ctx);
    let tmp = ctx.temp.fresh("un");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let o2 = o.clone();
    match op {
        UnaryOp::USub => {
            dispatch_tag_single(ctx, span, &tmp, &o, move |t| {
                let o = o2.clone();
                match t {
                    Tag::Int => inject_int(Expr::UnaryOp { op: UnaryOp::USub, operand: Box::new(project_int(o.clone(), span)), span }, span),
                    Tag::Bool => inject_int(Expr::UnaryOp { op: UnaryOp::USub, operand: Box::new(project_bool(o.clone(), span)), span }, span),
                    Tag::Big => error_pyobj(span),
                }
            });
        }
        UnaryOp::Not => {
            dispatch_tag_single(ctx, span, &tmp, &o, move |t| {
                let o = o2.clone();
                match t {
                    Tag::Int => inject_bool(native_cmp(CmpOp::Eq, project_int(o.clone(), span), int_const(0, span), span), span),
                    Tag::Bool => inject_bool(Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(project_bool(o.clone(), span)), span }, span),
                    // Big values have no native negation; fall back to the
                    // runtime's truthiness test and flip it (spec.md §4.E).
                    Tag::Big => inject_bool(
                        native_cmp(
                            CmpOp::Eq,
                            Expr::BinOp { op: BinOp::BitXor, left: Box::new(is_true(o.clone(), span)), right: Box::new(int_const(1, span)), span },
                            int_const(1, span),
                            span,
                        ),
                        span,
                    ),
                }
            });
        }
    }
    name_expr(&tmp, span)
}

fn explicate_binop_xor(left: Expr, right: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    // Symmetric with Add: same tag ladder, a native `^` at the leaves
    // instead of `add`/the runtime `add` symbol, and no big/big case since
    // the runtime ABI exposes no heap-level xor.
    let l = explicate_expr(left, ctx);
    let r = explicate_expr(right, ctx);
    let tmp = ctx.temp.fresh("xor");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let scalar = |l: Expr, r: Expr| {
        inject_int(Expr::BinOp { op: BinOp::BitXor, left: Box::new(l), right: Box::new(r), span }, span)
    };
    let (l2, r2) = (l.clone(), r.clone());
    dispatch_tag_pair(ctx, span, &tmp, &l, &r, move |tl, tr| {
        let (l, r) = (l2.clone(), r2.clone());
        match (tl, tr) {
            (Tag::Int, Tag::Int) => scalar(project_int(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Int, Tag::Bool) => scalar(project_int(l.clone(), span), project_bool(r.clone(), span)),
            (Tag::Bool, Tag::Int) => scalar(project_bool(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Bool, Tag::Bool) => scalar(project_bool(l.clone(), span), project_bool(r.clone(), span)),
            _ => error_pyobj(span),
        }
    });
    name_expr(&tmp, span)
}

/// Shared by Eq/NotEq: same leaf values, NotEq just inverts every boolean
/// result at the very end, so the dispatch tree itself never duplicates.
fn explicate_eq(left: Expr, right: Expr, invert: bool, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let l = explicate_expr(left, ctx);
    let r = explicate_expr(right, ctx);
    let tmp = ctx.temp.fresh("eq");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let scalar_eq = |l: Expr, r: Expr| inject_bool(native_cmp(CmpOp::Eq, l, r, span), span);
    let (l2, r2) = (l.clone(), r.clone());
    dispatch_tag_pair(ctx, span, &tmp, &l, &r, move |tl, tr| {
        let (l, r) = (l2.clone(), r2.clone());
        match (tl, tr) {
            (Tag::Int, Tag::Int) => scalar_eq(project_int(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Int, Tag::Bool) => scalar_eq(project_int(l.clone(), span), project_bool(r.clone(), span)),
            (Tag::Bool, Tag::Int) => scalar_eq(project_bool(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Bool, Tag::Bool) => scalar_eq(project_bool(l.clone(), span), project_bool(r.clone(), span)),
            (Tag::Big, Tag::Big) => inject_bool(call("equal", vec![project_big(l.clone(), span), project_big(r.clone(), span)], span), span),
            // Mixed scalar/big: never equal under Eq (spec.md §4.E).
            _ => inject_bool(bool_const(false, span), span),
        }
    });
    let result = name_expr(&tmp, span);
    if invert {
        let inverted = ctx.temp.fresh("neq");
        ctx.body.push_stmt(assign(&inverted, inject_bool(Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(project_bool(result, span)), span }, span), span));
        name_expr(&inverted, span)
    } else {
        result
    }
}

/// Lt/LtE/Gt/GtE: only scalar/scalar pairs are defined; anything touching
/// `big` is a runtime type error (spec.md §4.E).
fn explicate_ordering(op: CmpOp, left: Expr, right: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let l = explicate_expr(left, ctx);
    let r = explicate_expr(right, ctx);
    let tmp = ctx.temp.fresh("cmp");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let scalar = |l: Expr, r: Expr| inject_bool(native_cmp(op, l, r, span), span);
    let (l2, r2) = (l.clone(), r.clone());
    dispatch_tag_pair(ctx, span, &tmp, &l, &r, move |tl, tr| {
        let (l, r) = (l2.clone(), r2.clone());
        match (tl, tr) {
            (Tag::Int, Tag::Int) => scalar(project_int(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Int, Tag::Bool) => scalar(project_int(l.clone(), span), project_bool(r.clone(), span)),
            (Tag::Bool, Tag::Int) => scalar(project_bool(l.clone(), span), project_int(r.clone(), span)),
            (Tag::Bool, Tag::Bool) => scalar(project_bool(l.clone(), span), project_bool(r.clone(), span)),
            _ => error_pyobj(span),
        }
    });
    name_expr(&tmp, span)
}

fn explicate_is(left: Expr, right: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let l = explicate_expr(left, ctx);
    let r = explicate_expr(right, ctx);
    inject_bool(native_cmp(CmpOp::Eq, l, r, span), span)
}

fn explicate_compare(left: Expr, ops: Vec<CmpOp>, comparators: Vec<Expr>, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    assert_eq!(ops.len(), 1, "chained comparisons are eliminated by stage B before explicate runs");
    let right = comparators.into_iter().next().unwrap();
    match ops[0] {
        CmpOp::Eq => explicate_eq(left, right, false, span, ctx),
        CmpOp::NotEq => explicate_eq(left, right, true, span, ctx),
        CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => explicate_ordering(ops[0], left, right, span, ctx),
        CmpOp::Is => explicate_is(left, right, span, ctx),
    }
}

fn explicate_list(elts: Vec<Expr>, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let elts: Vec<Expr> = elts.into_iter().map(|e| explicate_expr(e, ctx)).collect();
    let list_tmp = ctx.temp.fresh("list");
    let n = elts.len() as i64;
    let created = call("create_list", vec![inject_int(int_const(n, span), span)], span);
    ctx.body.push_stmt(assign(&list_tmp, inject_big(created, span), span));
    for (i, elt) in elts.into_iter().enumerate() {
        let set = call("set_subscript", vec![name_expr(&list_tmp, span), inject_int(int_const(i as i64, span), span), elt], span);
        ctx.body.push_stmt(Stmt::Expr(set));
    }
    name_expr(&list_tmp, span)
}

fn explicate_dict(keys: Vec<Expr>, values: Vec<Expr>, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let keys: Vec<Expr> = keys.into_iter().map(|e| explicate_expr(e, ctx)).collect();
    let values: Vec<Expr> = values.into_iter().map(|e| explicate_expr(e, ctx)).collect();
    let dict_tmp = ctx.temp.fresh("dict");
    let created = call("create_dict", vec![], span);
    ctx.body.push_stmt(assign(&dict_tmp, inject_big(created, span), span));
    for (k, v) in keys.into_iter().zip(values) {
        let set = call("set_subscript", vec![name_expr(&dict_tmp, span), k, v], span);
        ctx.body.push_stmt(Stmt::Expr(set));
    }
    name_expr(&dict_tmp, span)
}

fn explicate_int_builtin(arg: Expr, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    let a = explicate_expr(arg, ctx);
    let tmp = ctx.temp.fresh("int");
    ctx.body.push_stmt(assign(&tmp, error_pyobj(span), span));
    let a2 = a.clone();
    dispatch_tag_single(ctx, span, &tmp, &a, move |t| {
        let a = a2.clone();
        match t {
            Tag::Int => a.clone(),
            Tag::Bool => inject_int(project_bool(a.clone(), span), span),
            Tag::Big => error_pyobj(span),
        }
    });
    name_expr(&tmp, span)
}

fn explicate_call(callee: String, args: Vec<Expr>, span: Span, ctx: &mut ExplicateCtx) -> Expr {
    if callee == "eval" {
        // `args[0]` is always a bare `input()` here (enforced at stage A).
        return call("eval_input_pyobj", vec![], span);
    }
    if callee == "print" {
        let arg = explicate_expr(args.into_iter().next().expect("print takes exactly one argument"), ctx);
        return call("print_any", vec![arg], span);
    }
    if callee == "int" {
        return explicate_int_builtin(args.into_iter().next().expect("int() takes exactly one argument"), span, ctx);
    }
    let args = args.into_iter().map(|a| explicate_expr(a, ctx)).collect();
    call(&callee, args, span)
}

fn explicate_expr(expr: Expr, ctx: &mut ExplicateCtx) -> Expr {
    match expr {
        Expr::Constant(Constant::Int(n), span) => inject_int(int_const(n, span), span),
        Expr::Constant(Constant::Bool(b), span) => inject_bool(bool_const(b, span), span),
        Expr::Name(..) => expr,
        Expr::UnaryOp { op, operand, span } => explicate_unary(op, *operand, span, ctx),
        Expr::BinOp { op: BinOp::Add, left, right, span } => explicate_add(*left, *right, span, ctx),
        Expr::BinOp { op: BinOp::BitXor, left, right, span } => explicate_binop_xor(*left, *right, span, ctx),
        Expr::Compare { left, ops, comparators, span } => explicate_compare(*left, ops, comparators, span, ctx),
        Expr::Call { callee, args, span } => explicate_call(callee, args, span, ctx),
        Expr::List { elts, span } => explicate_list(elts, span, ctx),
        Expr::Dict { keys, values, span } => explicate_dict(keys, values, span, ctx),
        Expr::Subscript { value, index, ctx: Ctx::Load, span } => {
            let value = explicate_expr(*value, ctx);
            let index = explicate_expr(*index, ctx);
            call("get_subscript", vec![value, index], span)
        }
        Expr::Subscript { ctx: Ctx::Store, .. } => {
            unreachable!("a Store-context Subscript only ever appears as an LValue, handled in explicate_stmt")
        }
        Expr::BoolOp { .. } | Expr::IfExp { .. } | Expr::Lambda { .. } => {
            unreachable!("BoolOp/IfExp/Lambda are eliminated by stage B before explicate runs")
        }
    }
}

fn explicate_stmt(stmt: Stmt, ctx: &mut ExplicateCtx) {
    match stmt {
        Stmt::Assign { target: LValue::Name(name, nspan), value, span } => {
            let value = explicate_expr(value, ctx);
            ctx.body.push_stmt(Stmt::Assign { target: LValue::Name(name, nspan), value, span });
        }
        Stmt::Assign { target: LValue::Subscript { value: container, index, .. }, value, span } => {
            let container = explicate_expr(*container, ctx);
            let index = explicate_expr(*index, ctx);
            let value = explicate_expr(value, ctx);
            ctx.body.push_stmt(Stmt::Expr(call("set_subscript", vec![container, index, value], span)));
        }
        Stmt::Expr(e) => {
            let e = explicate_expr(e, ctx);
            ctx.body.push_stmt(Stmt::Expr(e));
        }
        Stmt::If { test, body, orelse, span } => {
            let test = explicate_expr(test, ctx);
            let test = is_true(test, span);
            ctx.body.enter();
            for s in body {
                explicate_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.enter();
            for s in orelse {
                explicate_stmt(s, ctx);
            }
            let orelse = ctx.body.leave();
            ctx.body.push_stmt(if_stmt(test, body, orelse, span));
        }
        Stmt::While { test, body, span } => {
            let test = explicate_expr(test, ctx);
            let test = is_true(test, span);
            ctx.body.enter();
            for s in body {
                explicate_stmt(s, ctx);
            }
            let body = ctx.body.leave();
            ctx.body.push_stmt(Stmt::While { test, body, span });
        }
        Stmt::Break(span) => ctx.body.push_stmt(Stmt::Break(span)),
        Stmt::Return { value, span } => {
            let value = value.map(|v| explicate_expr(v, ctx));
            ctx.body.push_stmt(Stmt::Return { value, span });
        }
        Stmt::FunctionDef { name, params, body, span } => {
            ctx.body.enter();
            for s in body {
                explicate_stmt(s, ctx);
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
    use crate::passes::desugar::desugar_module;
    use crate::passes::flatten::flatten_module;

    fn prepare(src: &str) -> Module {
        let mut m = parse(src).unwrap();
        let mut temp = TempGen::new();
        crate::passes::validate::validate_and_rename(&mut m, &mut temp).unwrap();
        loop {
            let before = crate::frontend::unparse::unparse_module(&m);
            desugar_module(&mut m, &mut temp);
            flatten_module(&mut m, &mut temp);
            if crate::frontend::unparse::unparse_module(&m) == before {
                break;
            }
        }
        m
    }

    fn calls_in(m: &Module) -> Vec<String> {
        fn walk_expr(e: &Expr, out: &mut Vec<String>) {
            if let Expr::Call { callee, args, .. } = e {
                out.push(callee.clone());
                args.iter().for_each(|a| walk_expr(a, out));
            }
        }
        fn walk_stmt(s: &Stmt, out: &mut Vec<String>) {
            match s {
                Stmt::Assign { value, .. } => walk_expr(value, out),
                Stmt::Expr(e) => walk_expr(e, out),
                Stmt::If { test, body, orelse, .. } => {
                    walk_expr(test, out);
                    body.iter().for_each(|s| walk_stmt(s, out));
                    orelse.iter().for_each(|s| walk_stmt(s, out));
                }
                Stmt::While { test, body, .. } => {
                    walk_expr(test, out);
                    body.iter().for_each(|s| walk_stmt(s, out));
                }
                Stmt::Break(_) => {}
                Stmt::Return { value, .. } => {
                    if let Some(v) = value {
                        walk_expr(v, out);
                    }
                }
                Stmt::FunctionDef { body, .. } => body.iter().for_each(|s| walk_stmt(s, out)),
            }
        }
        let mut out = Vec::new();
        m.body.iter().for_each(|s| walk_stmt(s, &mut out));
        out
    }

    #[test]
    fn constant_becomes_injected() {
        let mut m = prepare("x = 1;");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        assert!(calls_in(&m).contains(&"inject_int".to_string()));
    }

    #[test]
    fn add_dispatches_through_tag_predicates() {
        let mut m = prepare("z = x + y;");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        let calls = calls_in(&m);
        assert!(calls.contains(&"is_int".to_string()));
        assert!(calls.contains(&"is_big".to_string()));
    }

    #[test]
    fn print_becomes_print_any() {
        let mut m = prepare("print(x);");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        assert!(calls_in(&m).contains(&"print_any".to_string()));
    }

    #[test]
    fn eval_input_becomes_eval_input_pyobj() {
        let mut m = prepare("x = eval(input());");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        assert!(calls_in(&m).contains(&"eval_input_pyobj".to_string()));
    }

    #[test]
    fn if_test_is_wrapped_in_is_true() {
        let mut m = prepare("if (x) { y = 1; }");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        assert!(calls_in(&m).contains(&"is_true".to_string()));
    }

    #[test]
    fn list_literal_uses_create_list_and_set_subscript() {
        let mut m = prepare("xs = [1, 2, 3];");
        let mut temp = TempGen::new();
        explicate_module(&mut m, &mut temp);
        let calls = calls_in(&m);
        assert!(calls.contains(&"create_list".to_string()));
        assert!(calls.contains(&"set_subscript".to_string()));
    }
}
