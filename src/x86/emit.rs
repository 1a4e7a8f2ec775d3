// Stage I: textual emission. Turns a legalized, framed `Vec<Instr>` per
// function into AT&T-syntax assembly text. A final legality assertion runs
// right before printing — `lower::lower_ir_function` already checked this,
// but emission is the last point this pipeline could ever silently hand out
// a broken `.s` file, so it checks again rather than trusting the caller.

use super::instr::Instr;
use crate::diagnostics::LoweringError;

fn mnemonic_line(mnemonic: &str, operands: &[String]) -> String {
    format!("    {mnemonic} {}", operands.join(", "))
}

fn emit_instr(instr: &Instr, out: &mut String) {
    match instr {
        Instr::Mov64(a, b) => out.push_str(&mnemonic_line("movq", &[a.text(), b.text()])),
        Instr::Movzbq(a, b) => out.push_str(&mnemonic_line("movzbq", &[a.text(), b.text()])),
        Instr::Add(a, b) => out.push_str(&mnemonic_line("addq", &[a.text(), b.text()])),
        Instr::Sub(a, b) => out.push_str(&mnemonic_line("subq", &[a.text(), b.text()])),
        Instr::Neg(a) => out.push_str(&mnemonic_line("negq", &[a.text()])),
        Instr::Xor(a, b) => out.push_str(&mnemonic_line("xorq", &[a.text(), b.text()])),
        Instr::Push(a) => out.push_str(&mnemonic_line("pushq", &[a.text()])),
        Instr::Pop(a) => out.push_str(&mnemonic_line("popq", &[a.text()])),
        Instr::Call(f) => out.push_str(&format!("    call {f}")),
        Instr::Ret => out.push_str("    ret"),
        Instr::Jmp(l) => out.push_str(&format!("    jmp {l}")),
        Instr::Je(l) => out.push_str(&format!("    je {l}")),
        Instr::Jne(l) => out.push_str(&format!("    jne {l}")),
        Instr::Jl(l) => out.push_str(&format!("    jl {l}")),
        Instr::Jle(l) => out.push_str(&format!("    jle {l}")),
        Instr::Jg(l) => out.push_str(&format!("    jg {l}")),
        Instr::Jge(l) => out.push_str(&format!("    jge {l}")),
        Instr::Cmp(a, b) => out.push_str(&mnemonic_line("cmpq", &[a.text(), b.text()])),
        Instr::SetE(a) => out.push_str(&mnemonic_line("sete", &[a.text()])),
        Instr::SetNE(a) => out.push_str(&mnemonic_line("setne", &[a.text()])),
        Instr::SetL(a) => out.push_str(&mnemonic_line("setl", &[a.text()])),
        Instr::SetLE(a) => out.push_str(&mnemonic_line("setle", &[a.text()])),
        Instr::SetG(a) => out.push_str(&mnemonic_line("setg", &[a.text()])),
        Instr::SetGE(a) => out.push_str(&mnemonic_line("setge", &[a.text()])),
        Instr::Label(name) => out.push_str(&format!("{name}:")),
        Instr::Directive(name, args) => out.push_str(&format!("    .{name} {args}")),
    }
    out.push('\n');
}

/// Emits one function's instructions. Labels and directives get no leading
/// indentation (they already format themselves); everything else is a
/// four-space-indented mnemonic line, matching the teacher's emitter
/// convention for hand-written assembly text.
pub fn emit_function(instrs: &[Instr]) -> Result<String, LoweringError> {
    let mut out = String::new();
    for instr in instrs {
        if !instr.is_legal() {
            return Err(LoweringError::IllegalInstruction(format!("{instr:?}")));
        }
        emit_instr(instr, &mut out);
    }
    Ok(out)
}

/// Emits a whole module: `.text` section header, then each function in
/// order, separated by a blank line for readability.
pub fn emit_module(functions: &[Vec<Instr>]) -> Result<String, LoweringError> {
    let mut out = String::from("    .text\n");
    for (i, f) in functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&emit_function(f)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::passes;
    use crate::temp::TempGen;
    use crate::x86::lower;

    fn emit(src: &str) -> String {
        let mut m = parse(src).unwrap();
        let mut temp = TempGen::new();
        passes::validate::validate_and_rename(&mut m, &mut temp).unwrap();
        passes::desugar_and_flatten_to_fixpoint(&mut m, &mut temp);
        passes::closure::convert_closures(&mut m);
        passes::explicate::explicate_module(&mut m, &mut temp);
        passes::flatten::flatten_module(&mut m, &mut temp);
        let ir = crate::ir::lower_module(&m, &mut temp).unwrap();
        let funcs = lower::lower_module(&ir).unwrap();
        emit_module(&funcs).unwrap()
    }

    #[test]
    fn emits_a_text_section_and_main_label() {
        let asm = emit("print(1);");
        assert!(asm.contains(".text"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("call print_any"));
    }

    #[test]
    fn every_function_is_framed() {
        let asm = emit("def f(x) { return x; } print(f(1));");
        assert!(asm.contains("pushq %rbp"));
        assert!(asm.contains("movq %rsp, %rbp"));
        assert!(asm.contains("popq %rbp"));
        assert!(asm.contains("ret"));
    }

    #[test]
    fn arithmetic_lowers_to_in_place_add() {
        let asm = emit("x = 1 + 2;");
        assert!(asm.contains("addq"));
    }
}
