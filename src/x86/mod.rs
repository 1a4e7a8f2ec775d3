pub mod emit;
pub mod instr;
pub mod lower;
pub mod operand;

use crate::diagnostics::CompileError;
use crate::ir::IrModule;

/// Stages H and I in one call: lower the IR module to legalized, framed
/// x86 instructions per function, then emit the whole thing as one
/// AT&T-syntax assembly string.
pub fn lower_and_emit(ir: &IrModule) -> Result<String, CompileError> {
    let functions = lower::lower_module(ir)?;
    emit::emit_module(&functions).map_err(CompileError::from)
}
