// Stage D: closure conversion.
//
// Runs after the Desugar+Flatten fixed point, so every `FunctionDef` —
// whether written by the user or hoisted from a `lambda` — may still sit
// nested inside `If`/`While`/other `FunctionDef` bodies. This stage:
//
//   D.1 pulls every `FunctionDef` out to the top of the module, in
//       discovery order, leaving the rest of each statement list intact;
//   D.2 resolves "function aliases" — `f = <bare function name>` — so that
//       `f(...)` call sites are rewritten to call the real function
//       (Source's only approximation of functions-as-values, see
//       DESIGN.md);
//   D.3 computes free = used − (params ∪ assigned) per function and, for
//       every non-empty free set, prepends the free variables (sorted
//       lexicographically, SPEC_FULL §9 resolution 3) as leading
//       parameters, and prepends matching `Name` arguments at every call
//       site of that function anywhere in the program.
//
// After this stage, `free_vars(F) = ∅` for every F (P4) and no
// `FunctionDef` contains a nested `FunctionDef`.

use crate::frontend::ast::*;
use std::collections::{BTreeMap, BTreeSet};

pub fn convert_closures(module: &mut Module) {
    let (mut functions, mut top_level) = hoist_function_defs(std::mem::take(&mut module.body));

    let aliases = resolve_aliases(&functions, &top_level);
    if !aliases.is_empty() {
        for f in functions.iter_mut() {
            f.body.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, &aliases));
        }
        top_level.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, &aliases));
        top_level.retain(|s| !is_resolved_alias_assign(s, &aliases));
    }

    let free_vars: BTreeMap<String, Vec<String>> =
        functions.iter().filter_map(|f| {
            let free = compute_free_vars(f);
            if free.is_empty() { None } else { Some((f.name.clone(), free.into_iter().collect())) }
        }).collect();

    for f in functions.iter_mut() {
        if let Some(free) = free_vars.get(&f.name) {
            let mut params = free.clone();
            params.extend(f.params.drain(..));
            f.params = params;
        }
    }

    for f in functions.iter_mut() {
        f.body.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, &free_vars));
    }
    top_level.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, &free_vars));

    let mut body = Vec::with_capacity(functions.len() + top_level.len());
    body.extend(functions.into_iter().map(|f| f.into_stmt()));
    body.extend(top_level);
    module.body = body;
}

struct FnDef {
    name: String,
    params: Vec<String>,
    body: Vec<Stmt>,
    span: crate::diagnostics::Span,
}

impl FnDef {
    fn into_stmt(self) -> Stmt {
        Stmt::FunctionDef { name: self.name, params: self.params, body: self.body, span: self.span }
    }
}

fn hoist_function_defs(body: Vec<Stmt>) -> (Vec<FnDef>, Vec<Stmt>) {
    let mut functions = Vec::new();
    let mut rest = Vec::new();
    for stmt in body {
        hoist_stmt(stmt, &mut functions, &mut rest);
    }
    (functions, rest)
}

fn hoist_stmt(stmt: Stmt, functions: &mut Vec<FnDef>, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::FunctionDef { name, params, body, span } => {
            let (nested, mut own_body) = hoist_function_defs(body);
            functions.extend(nested);
            own_body.retain(|_| true); // body already stripped of nested defs
            functions.push(FnDef { name, params, body: own_body, span });
        }
        Stmt::If { test, body, orelse, span } => {
            let (fb, body) = hoist_function_defs(body);
            let (fo, orelse) = hoist_function_defs(orelse);
            functions.extend(fb);
            functions.extend(fo);
            out.push(Stmt::If { test, body, orelse, span });
        }
        Stmt::While { test, body, span } => {
            let (fb, body) = hoist_function_defs(body);
            functions.extend(fb);
            out.push(Stmt::While { test, body, span });
        }
        other => out.push(other),
    }
}

/// `name := Name(fn)` where `fn` is a known function: every `name(...)`
/// call site should really call `fn`. Resolved to a fixed point so chains
/// (`g = f; h = g;`) collapse to the ultimate function name.
fn resolve_aliases(functions: &[FnDef], top_level: &[Stmt]) -> BTreeMap<String, String> {
    let known: BTreeSet<String> = functions.iter().map(|f| f.name.clone()).collect();
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();

    let mut changed = true;
    while changed {
        changed = false;
        for stmt in functions.iter().flat_map(|f| f.body.iter()).chain(top_level.iter()) {
            if let Stmt::Assign { target: LValue::Name(n, _), value: Expr::Name(v, Ctx::Load, _), .. } = stmt {
                let resolved = aliases.get(v).cloned().unwrap_or_else(|| v.clone());
                if (known.contains(&resolved) || aliases.contains_key(&resolved)) && aliases.get(n) != Some(&resolved) {
                    aliases.insert(n.clone(), resolved);
                    changed = true;
                }
            }
        }
    }

    // Collapse any remaining indirection (`h -> g -> f`) to final targets.
    let keys: Vec<String> = aliases.keys().cloned().collect();
    for k in keys {
        let mut target = aliases[&k].clone();
        while let Some(next) = aliases.get(&target) {
            if *next == target {
                break;
            }
            target = next.clone();
        }
        aliases.insert(k, target);
    }
    aliases
}

fn is_resolved_alias_assign(stmt: &Stmt, aliases: &BTreeMap<String, String>) -> bool {
    matches!(stmt, Stmt::Assign { target: LValue::Name(n, _), value: Expr::Name(..), .. } if aliases.contains_key(n))
}

fn rewrite_calls_in_stmt(stmt: &mut Stmt, aliases: &BTreeMap<String, String>) {
    match stmt {
        Stmt::Assign { target, value, .. } => {
            if let LValue::Subscript { value: v, index, .. } = target {
                rewrite_calls_in_expr(v, aliases);
                rewrite_calls_in_expr(index, aliases);
            }
            rewrite_calls_in_expr(value, aliases);
        }
        Stmt::Expr(e) => rewrite_calls_in_expr(e, aliases),
        Stmt::If { test, body, orelse, .. } => {
            rewrite_calls_in_expr(test, aliases);
            body.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, aliases));
            orelse.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, aliases));
        }
        Stmt::While { test, body, .. } => {
            rewrite_calls_in_expr(test, aliases);
            body.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, aliases));
        }
        Stmt::Break(_) => {}
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                rewrite_calls_in_expr(v, aliases);
            }
        }
        Stmt::FunctionDef { body, .. } => body.iter_mut().for_each(|s| rewrite_calls_in_stmt(s, aliases)),
    }
}

fn rewrite_calls_in_expr(expr: &mut Expr, aliases: &BTreeMap<String, String>) {
    if let Expr::Call { callee, args, .. } = expr {
        if let Some(real) = aliases.get(callee) {
            *callee = real.clone();
        }
        args.iter_mut().for_each(|a| rewrite_calls_in_expr(a, aliases));
        return;
    }
    match expr {
        Expr::UnaryOp { operand, .. } => rewrite_calls_in_expr(operand, aliases),
        Expr::BinOp { left, right, .. } => {
            rewrite_calls_in_expr(left, aliases);
            rewrite_calls_in_expr(right, aliases);
        }
        Expr::BoolOp { values, .. } => values.iter_mut().for_each(|v| rewrite_calls_in_expr(v, aliases)),
        Expr::Compare { left, comparators, .. } => {
            rewrite_calls_in_expr(left, aliases);
            comparators.iter_mut().for_each(|c| rewrite_calls_in_expr(c, aliases));
        }
        Expr::IfExp { test, body, orelse, .. } => {
            rewrite_calls_in_expr(test, aliases);
            rewrite_calls_in_expr(body, aliases);
            rewrite_calls_in_expr(orelse, aliases);
        }
        Expr::List { elts, .. } => elts.iter_mut().for_each(|e| rewrite_calls_in_expr(e, aliases)),
        Expr::Dict { keys, values, .. } => {
            keys.iter_mut().for_each(|e| rewrite_calls_in_expr(e, aliases));
            values.iter_mut().for_each(|e| rewrite_calls_in_expr(e, aliases));
        }
        Expr::Subscript { value, index, .. } => {
            rewrite_calls_in_expr(value, aliases);
            rewrite_calls_in_expr(index, aliases);
        }
        Expr::Constant(..) | Expr::Name(..) | Expr::Lambda { .. } | Expr::Call { .. } => {}
    }
}

fn compute_free_vars(f: &FnDef) -> BTreeSet<String> {
    let mut defined: BTreeSet<String> = f.params.iter().cloned().collect();
    let mut used: BTreeSet<String> = BTreeSet::new();
    for s in &f.body {
        collect_names_stmt(s, &mut defined, &mut used);
    }
    used.difference(&defined).cloned().collect()
}

fn collect_names_stmt(stmt: &Stmt, defined: &mut BTreeSet<String>, used: &mut BTreeSet<String>) {
    match stmt {
        Stmt::Assign { target, value, .. } => {
            match target {
                LValue::Name(n, _) => {
                    defined.insert(n.clone());
                }
                LValue::Subscript { value: v, index, .. } => {
                    collect_names_expr(v, used);
                    collect_names_expr(index, used);
                }
            }
            collect_names_expr(value, used);
        }
        Stmt::Expr(e) => collect_names_expr(e, used),
        Stmt::If { test, body, orelse, .. } => {
            collect_names_expr(test, used);
            body.iter().for_each(|s| collect_names_stmt(s, defined, used));
            orelse.iter().for_each(|s| collect_names_stmt(s, defined, used));
        }
        Stmt::While { test, body, .. } => {
            collect_names_expr(test, used);
            body.iter().for_each(|s| collect_names_stmt(s, defined, used));
        }
        Stmt::Break(_) => {}
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_names_expr(v, used);
            }
        }
        Stmt::FunctionDef { .. } => unreachable!("function defs are hoisted before free-variable analysis runs"),
    }
}

fn collect_names_expr(expr: &Expr, used: &mut BTreeSet<String>) {
    match expr {
        Expr::Constant(..) => {}
        Expr::Name(n, Ctx::Load, _) => {
            used.insert(n.clone());
        }
        Expr::Name(_, Ctx::Store, _) => {}
        Expr::UnaryOp { operand, .. } => collect_names_expr(operand, used),
        Expr::BinOp { left, right, .. } => {
            collect_names_expr(left, used);
            collect_names_expr(right, used);
        }
        Expr::BoolOp { values, .. } => values.iter().for_each(|v| collect_names_expr(v, used)),
        Expr::Compare { left, comparators, .. } => {
            collect_names_expr(left, used);
            comparators.iter().for_each(|c| collect_names_expr(c, used));
        }
        Expr::IfExp { test, body, orelse, .. } => {
            collect_names_expr(test, used);
            collect_names_expr(body, used);
            collect_names_expr(orelse, used);
        }
        Expr::Call { args, .. } => args.iter().for_each(|a| collect_names_expr(a, used)),
        Expr::Lambda { .. } => unreachable!("lambdas are already hoisted into FunctionDefs by stage B"),
        Expr::List { elts, .. } => elts.iter().for_each(|e| collect_names_expr(e, used)),
        Expr::Dict { keys, values, .. } => {
            keys.iter().for_each(|e| collect_names_expr(e, used));
            values.iter().for_each(|e| collect_names_expr(e, used));
        }
        Expr::Subscript { value, index, .. } => {
            collect_names_expr(value, used);
            collect_names_expr(index, used);
        }
    }
}

fn prepend_free_args_in_stmt(stmt: &mut Stmt, free_vars: &BTreeMap<String, Vec<String>>) {
    match stmt {
        Stmt::Assign { target, value, .. } => {
            if let LValue::Subscript { value: v, index, .. } = target {
                prepend_free_args_in_expr(v, free_vars);
                prepend_free_args_in_expr(index, free_vars);
            }
            prepend_free_args_in_expr(value, free_vars);
        }
        Stmt::Expr(e) => prepend_free_args_in_expr(e, free_vars),
        Stmt::If { test, body, orelse, .. } => {
            prepend_free_args_in_expr(test, free_vars);
            body.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, free_vars));
            orelse.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, free_vars));
        }
        Stmt::While { test, body, .. } => {
            prepend_free_args_in_expr(test, free_vars);
            body.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, free_vars));
        }
        Stmt::Break(_) => {}
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                prepend_free_args_in_expr(v, free_vars);
            }
        }
        Stmt::FunctionDef { body, .. } => body.iter_mut().for_each(|s| prepend_free_args_in_stmt(s, free_vars)),
    }
}

fn prepend_free_args_in_expr(expr: &mut Expr, free_vars: &BTreeMap<String, Vec<String>>) {
    if let Expr::Call { callee, args, span } = expr {
        args.iter_mut().for_each(|a| prepend_free_args_in_expr(a, free_vars));
        if let Some(free) = free_vars.get(callee) {
            let mut new_args: Vec<Expr> =
                free.iter().map(|v| Expr::Name(v.clone(), Ctx::Load, *span)).collect();
            new_args.extend(args.drain(..));
            *args = new_args;
        }
        return;
    }
    match expr {
        Expr::UnaryOp { operand, .. } => prepend_free_args_in_expr(operand, free_vars),
        Expr::BinOp { left, right, .. } => {
            prepend_free_args_in_expr(left, free_vars);
            prepend_free_args_in_expr(right, free_vars);
        }
        Expr::BoolOp { values, .. } => values.iter_mut().for_each(|v| prepend_free_args_in_expr(v, free_vars)),
        Expr::Compare { left, comparators, .. } => {
            prepend_free_args_in_expr(left, free_vars);
            comparators.iter_mut().for_each(|c| prepend_free_args_in_expr(c, free_vars));
        }
        Expr::IfExp { test, body, orelse, .. } => {
            prepend_free_args_in_expr(test, free_vars);
            prepend_free_args_in_expr(body, free_vars);
            prepend_free_args_in_expr(orelse, free_vars);
        }
        Expr::List { elts, .. } => elts.iter_mut().for_each(|e| prepend_free_args_in_expr(e, free_vars)),
        Expr::Dict { keys, values, .. } => {
            keys.iter_mut().for_each(|e| prepend_free_args_in_expr(e, free_vars));
            values.iter_mut().for_each(|e| prepend_free_args_in_expr(e, free_vars));
        }
        Expr::Subscript { value, index, .. } => {
            prepend_free_args_in_expr(value, free_vars);
            prepend_free_args_in_expr(index, free_vars);
        }
        Expr::Constant(..) | Expr::Name(..) | Expr::Lambda { .. } | Expr::Call { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::passes::desugar::desugar_module;
    use crate::passes::flatten::flatten_module;
    use crate::temp::TempGen;

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

    #[test]
    fn hoists_nested_function_defs() {
        let mut m = prepare("if (True) { def f(x) { return x; } }");
        convert_closures(&mut m);
        assert!(matches!(m.body[0], Stmt::FunctionDef { .. }));
    }

    #[test]
    fn lambda_alias_calls_resolve_to_the_real_function() {
        let mut m = prepare("f = lambda x: x + 1; print(f(41));");
        convert_closures(&mut m);
        let has_alias_assign = m.body.iter().any(|s| matches!(s, Stmt::Assign { target: LValue::Name(n, _), .. } if n == "_f"));
        assert!(!has_alias_assign, "alias assignment should have been dropped");
    }

    #[test]
    fn closure_conversion_prepends_free_variables() {
        let mut m = prepare("y = 1; f = lambda x: x + y; print(f(1));");
        convert_closures(&mut m);
        let lambda = m.body.iter().find_map(|s| match s {
            Stmt::FunctionDef { params, .. } if params.len() == 2 => Some(params.clone()),
            _ => None,
        });
        assert!(lambda.is_some(), "expected the lifted lambda to gain a free-variable parameter");
    }
}
