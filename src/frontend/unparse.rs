// Deterministic pretty-printer for the Surface AST. Used for two things:
// the fixed-point comparison that drives the Desugar+Flatten loop (stage
// B/C) and the `.flatpy`/`.pyobjpy` debug artifacts (SPEC_FULL §6). Spans
// are never emitted, so textually-identical-but-differently-spanned trees
// compare equal, which is exactly the fixed-point condition P3 needs.

use super::ast::*;
use std::fmt::Write as _;

pub fn unparse_module(module: &Module) -> String {
    let mut out = String::new();
    for stmt in &module.body {
        unparse_stmt(stmt, 0, &mut out);
    }
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn unparse_block(body: &[Stmt], depth: usize, out: &mut String) {
    out.push_str("{\n");
    for s in body {
        unparse_stmt(s, depth + 1, out);
    }
    indent(depth, out);
    out.push('}');
}

fn unparse_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
    indent(depth, out);
    match stmt {
        Stmt::Assign { target, value, .. } => {
            unparse_lvalue(target, out);
            out.push_str(" = ");
            unparse_expr(value, out);
            out.push_str(";\n");
        }
        Stmt::Expr(e) => {
            unparse_expr(e, out);
            out.push_str(";\n");
        }
        Stmt::If { test, body, orelse, .. } => {
            out.push_str("if (");
            unparse_expr(test, out);
            out.push_str(") ");
            unparse_block(body, depth, out);
            if !orelse.is_empty() {
                out.push_str(" else ");
                unparse_block(orelse, depth, out);
            }
            out.push('\n');
        }
        Stmt::While { test, body, .. } => {
            out.push_str("while (");
            unparse_expr(test, out);
            out.push_str(") ");
            unparse_block(body, depth, out);
            out.push('\n');
        }
        Stmt::Break(_) => out.push_str("break;\n"),
        Stmt::Return { value, .. } => {
            out.push_str("return");
            if let Some(v) = value {
                out.push(' ');
                unparse_expr(v, out);
            }
            out.push_str(";\n");
        }
        Stmt::FunctionDef { name, params, body, .. } => {
            let _ = write!(out, "def {name}({}) ", params.join(", "));
            unparse_block(body, depth, out);
            out.push('\n');
        }
    }
}

fn unparse_lvalue(lv: &LValue, out: &mut String) {
    match lv {
        LValue::Name(n, _) => out.push_str(n),
        LValue::Subscript { value, index, .. } => {
            unparse_expr(value, out);
            out.push('[');
            unparse_expr(index, out);
            out.push(']');
        }
    }
}

fn cmp_sym(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "!=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
        CmpOp::Is => "is",
    }
}

fn unparse_expr(e: &Expr, out: &mut String) {
    match e {
        Expr::Constant(Constant::Int(n), _) => {
            let _ = write!(out, "{n}");
        }
        Expr::Constant(Constant::Bool(b), _) => {
            out.push_str(if *b { "True" } else { "False" });
        }
        Expr::Name(n, _, _) => out.push_str(n),
        Expr::UnaryOp { op, operand, .. } => {
            out.push_str(match op {
                UnaryOp::Not => "not ",
                UnaryOp::USub => "-",
            });
            out.push('(');
            unparse_expr(operand, out);
            out.push(')');
        }
        Expr::BinOp { op, left, right, .. } => {
            out.push('(');
            unparse_expr(left, out);
            out.push_str(match op {
                BinOp::Add => " + ",
                BinOp::BitXor => " ^ ",
            });
            unparse_expr(right, out);
            out.push(')');
        }
        Expr::BoolOp { op, values, .. } => {
            out.push('(');
            let sep = match op {
                BoolOp::And => " and ",
                BoolOp::Or => " or ",
            };
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                unparse_expr(v, out);
            }
            out.push(')');
        }
        Expr::Compare { left, ops, comparators, .. } => {
            out.push('(');
            unparse_expr(left, out);
            for (op, rhs) in ops.iter().zip(comparators.iter()) {
                let _ = write!(out, " {} ", cmp_sym(*op));
                unparse_expr(rhs, out);
            }
            out.push(')');
        }
        Expr::IfExp { test, body, orelse, .. } => {
            out.push('(');
            unparse_expr(body, out);
            out.push_str(" if ");
            unparse_expr(test, out);
            out.push_str(" else ");
            unparse_expr(orelse, out);
            out.push(')');
        }
        Expr::Call { callee, args, .. } => {
            out.push_str(callee);
            out.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                unparse_expr(a, out);
            }
            out.push(')');
        }
        Expr::Lambda { params, body, .. } => {
            let _ = write!(out, "lambda {}: ", params.join(", "));
            unparse_expr(body, out);
        }
        Expr::List { elts, .. } => {
            out.push('[');
            for (i, el) in elts.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                unparse_expr(el, out);
            }
            out.push(']');
        }
        Expr::Dict { keys, values, .. } => {
            out.push('{');
            for (i, (k, v)) in keys.iter().zip(values.iter()).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                unparse_expr(k, out);
                out.push_str(": ");
                unparse_expr(v, out);
            }
            out.push('}');
        }
        Expr::Subscript { value, index, .. } => {
            unparse_expr(value, out);
            out.push('[');
            unparse_expr(index, out);
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;

    #[test]
    fn unparse_is_deterministic_across_equivalent_spans() {
        let a = parse("x = 1 + 2;").unwrap();
        let b = parse("x   =   1+2  ;").unwrap();
        assert_eq!(unparse_module(&a), unparse_module(&b));
    }
}
