// Stage A: validator & renamer.
//
// Single traversal that (1) rejects constructs outside the restricted
// language this compiler accepts and (2) renames every user-introduced
// identifier by prefixing it with `_`, so it can never collide with a
// builtin name or with a compiler-generated temporary (which always carries
// a `__` prefix, see temp.rs).

use crate::diagnostics::ValidationError;
use crate::frontend::ast::*;
use crate::temp::TempGen;

const BUILTINS: &[&str] = &["print", "eval", "input", "int"];

fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn renamed(name: &str) -> String {
    format!("_{name}")
}

#[derive(Default, Clone, Copy)]
struct Ctx {
    in_function: bool,
    in_loop: bool,
}

pub fn validate_and_rename(module: &mut Module, temp: &mut TempGen) -> Result<(), ValidationError> {
    let ctx = Ctx::default();
    for stmt in &mut module.body {
        validate_stmt(stmt, ctx, temp)?;
    }
    Ok(())
}

fn bind(name: &mut String, span: crate::diagnostics::Span, temp: &mut TempGen) -> Result<(), ValidationError> {
    if is_builtin(name) {
        return Err(ValidationError::AssignToBuiltin { name: name.clone(), span });
    }
    let new_name = renamed(name);
    temp.register_user(&new_name);
    *name = new_name;
    Ok(())
}

fn validate_stmt(stmt: &mut Stmt, ctx: Ctx, temp: &mut TempGen) -> Result<(), ValidationError> {
    match stmt {
        Stmt::Assign { target, value, .. } => {
            validate_expr(value, ctx, temp)?;
            match target {
                LValue::Name(name, span) => bind(name, *span, temp)?,
                LValue::Subscript { value, index, .. } => {
                    validate_expr(value, ctx, temp)?;
                    validate_expr(index, ctx, temp)?;
                }
            }
        }
        Stmt::Expr(e) => validate_expr(e, ctx, temp)?,
        Stmt::If { test, body, orelse, .. } => {
            validate_expr(test, ctx, temp)?;
            for s in body.iter_mut() {
                validate_stmt(s, ctx, temp)?;
            }
            for s in orelse.iter_mut() {
                validate_stmt(s, ctx, temp)?;
            }
        }
        Stmt::While { test, body, .. } => {
            validate_expr(test, ctx, temp)?;
            let inner = Ctx { in_loop: true, ..ctx };
            for s in body.iter_mut() {
                validate_stmt(s, inner, temp)?;
            }
        }
        Stmt::Break(span) => {
            if !ctx.in_loop {
                return Err(ValidationError::UnsupportedConstruct {
                    construct: "`break` outside a `while` loop",
                    span: *span,
                });
            }
        }
        Stmt::Return { value, span } => {
            if !ctx.in_function {
                return Err(ValidationError::UnsupportedConstruct {
                    construct: "`return` outside a function body",
                    span: *span,
                });
            }
            if let Some(v) = value {
                validate_expr(v, ctx, temp)?;
            }
        }
        Stmt::FunctionDef { name, params, body, span } => {
            bind(name, *span, temp)?;
            for p in params.iter_mut() {
                bind(p, *span, temp)?;
            }
            let inner = Ctx { in_function: true, in_loop: false };
            for s in body.iter_mut() {
                validate_stmt(s, inner, temp)?;
            }
        }
    }
    Ok(())
}

fn validate_expr(expr: &mut Expr, ctx: Ctx, temp: &mut TempGen) -> Result<(), ValidationError> {
    match expr {
        Expr::Constant(..) => {}
        Expr::Name(name, _, span) => {
            if is_builtin(name) {
                return Err(ValidationError::AssignToBuiltin { name: name.clone(), span: *span });
            }
            *name = renamed(name);
        }
        Expr::UnaryOp { operand, .. } => validate_expr(operand, ctx, temp)?,
        Expr::BinOp { left, right, .. } => {
            validate_expr(left, ctx, temp)?;
            validate_expr(right, ctx, temp)?;
        }
        Expr::BoolOp { values, .. } => {
            for v in values.iter_mut() {
                validate_expr(v, ctx, temp)?;
            }
        }
        Expr::Compare { left, comparators, .. } => {
            validate_expr(left, ctx, temp)?;
            for c in comparators.iter_mut() {
                validate_expr(c, ctx, temp)?;
            }
        }
        Expr::IfExp { test, body, orelse, .. } => {
            validate_expr(test, ctx, temp)?;
            validate_expr(body, ctx, temp)?;
            validate_expr(orelse, ctx, temp)?;
        }
        Expr::Call { callee, args, span } => {
            if callee == "eval" {
                let is_input_call = args.len() == 1
                    && matches!(&args[0], Expr::Call { callee, args, .. } if callee == "input" && args.is_empty());
                if !is_input_call {
                    return Err(ValidationError::UnsupportedConstruct {
                        construct: "`eval` is only supported wrapping a bare `input()` call",
                        span: *span,
                    });
                }
                // `input()`'s own (empty) argument list needs no further validation.
            } else if callee == "input" {
                return Err(ValidationError::MisplacedInput { span: *span });
            } else {
                if (callee == "print" || callee == "int") && args.len() != 1 {
                    return Err(ValidationError::UnsupportedConstruct {
                        construct: "`print`/`int` take exactly one argument",
                        span: *span,
                    });
                }
                if !is_builtin(callee) {
                    *callee = renamed(callee);
                }
                for a in args.iter_mut() {
                    validate_expr(a, ctx, temp)?;
                }
            }
        }
        Expr::Lambda { params, body, span } => {
            for p in params.iter_mut() {
                bind(p, *span, temp)?;
            }
            validate_expr(body, ctx, temp)?;
        }
        Expr::List { elts, .. } => {
            for e in elts.iter_mut() {
                validate_expr(e, ctx, temp)?;
            }
        }
        Expr::Dict { keys, values, .. } => {
            for k in keys.iter_mut() {
                validate_expr(k, ctx, temp)?;
            }
            for v in values.iter_mut() {
                validate_expr(v, ctx, temp)?;
            }
        }
        Expr::Subscript { value, index, .. } => {
            validate_expr(value, ctx, temp)?;
            validate_expr(index, ctx, temp)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;

    #[test]
    fn renames_user_identifiers() {
        let mut m = parse("x = 1; print(x);").unwrap();
        let mut temp = TempGen::new();
        validate_and_rename(&mut m, &mut temp).unwrap();
        match &m.body[0] {
            Stmt::Assign { target: LValue::Name(n, _), .. } => assert_eq!(n, "_x"),
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn rejects_break_outside_loop() {
        let mut m = parse("break;").unwrap();
        let mut temp = TempGen::new();
        let err = validate_and_rename(&mut m, &mut temp).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_return_outside_function() {
        let mut m = parse("return 1;").unwrap();
        let mut temp = TempGen::new();
        let err = validate_and_rename(&mut m, &mut temp).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_bare_input_outside_eval() {
        let mut m = parse("print(input());").unwrap();
        let mut temp = TempGen::new();
        let err = validate_and_rename(&mut m, &mut temp).unwrap_err();
        assert!(matches!(err, ValidationError::MisplacedInput { .. }));
    }

    #[test]
    fn rejects_assignment_to_builtin_name() {
        let mut m = parse("print = 1;").unwrap();
        let mut temp = TempGen::new();
        let err = validate_and_rename(&mut m, &mut temp).unwrap_err();
        assert!(matches!(err, ValidationError::AssignToBuiltin { .. }));
    }

    #[test]
    fn accepts_eval_input_pattern() {
        let mut m = parse("x = eval(input());").unwrap();
        let mut temp = TempGen::new();
        validate_and_rename(&mut m, &mut temp).unwrap();
    }

    #[test]
    fn rejects_wrong_print_arity() {
        let mut m = parse("print(1, 2);").unwrap();
        let mut temp = TempGen::new();
        let err = validate_and_rename(&mut m, &mut temp).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedConstruct { .. }));
    }
}
