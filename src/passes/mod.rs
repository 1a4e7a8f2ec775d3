pub mod body_stack;
pub mod closure;
pub mod desugar;
pub mod explicate;
pub mod flatten;
pub mod fold;
pub mod validate;

use crate::frontend::ast::Module;
use crate::frontend::unparse::unparse_module;
use crate::temp::TempGen;

/// Stages B and C run to a fixed point: desugaring a `BoolOp` or chained
/// `Compare` produces a fresh `If` whose test may itself need flattening,
/// and flattening can expose a `lambda` nested inside a freshly hoisted
/// temp assignment. Re-running both until the unparsed text stops changing
/// is the simplest way to guarantee every sugar form is gone (P3).
pub fn desugar_and_flatten_to_fixpoint(module: &mut Module, temp: &mut TempGen) {
    loop {
        let before = unparse_module(module);
        desugar::desugar_module(module, temp);
        flatten::flatten_module(module, temp);
        if unparse_module(module) == before {
            break;
        }
    }
}
