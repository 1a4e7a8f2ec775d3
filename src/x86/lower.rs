// x86 lowering. Three sub-stages per IrFunction:
//
//   selection — translate each `IrStmt` into one or more `Instr`s over
//         `Var` placeholders (in-place arithmetic, call marshaling,
//         compare+setcc).
//   homing    — assign every variable a stack home (`-(i+1)*8(%rbp)`, a
//         naive stack-homes-for-all allocator), substitute `Var` operands,
//         then re-legalize: an instruction that now has two memory
//         operands gets its source routed through a scratch register
//         first.
//   framing   — prologue/epilogue, computing a 16-byte-aligned stack size
//         from the slot count.

use super::instr::Instr;
use super::operand::{Operand, Register, ARG_REGS, SCRATCH};
use crate::diagnostics::LoweringError;
use crate::frontend::ast::{BinOp, CmpOp, UnaryOp};
use crate::ir::{IrExpr, IrFunction, IrStmt, IrTarget};
use std::collections::BTreeMap;

fn target_operand(t: &IrTarget) -> Operand {
    match t {
        IrTarget::Name(n, _) => Operand::Var(n.clone()),
        IrTarget::Const(n, _) => Operand::Imm(*n),
    }
}

fn same_var(t: &IrTarget, o: &IrTarget) -> bool {
    matches!((t, o), (IrTarget::Name(a, _), IrTarget::Name(b, _)) if a == b)
}

fn binop_mnemonic(op: BinOp, src: Operand, dst: Operand) -> Instr {
    match op {
        BinOp::Add => Instr::Add(src, dst),
        BinOp::BitXor => Instr::Xor(src, dst),
    }
}

/// `Assign(t, BinOp(op, a, b))`: prefers an in-place form — emitting a
/// fresh `mov` only when neither operand already aliases the destination.
fn lower_binop(t: &IrTarget, op: BinOp, a: &IrTarget, b: &IrTarget) -> Vec<Instr> {
    let top = target_operand(t);
    let aop = target_operand(a);
    let bop = target_operand(b);
    if same_var(t, b) {
        vec![binop_mnemonic(op, aop, bop)]
    } else if same_var(t, a) {
        vec![binop_mnemonic(op, bop, aop)]
    } else {
        vec![Instr::Mov64(bop, top.clone()), binop_mnemonic(op, aop, top)]
    }
}

fn lower_unary(t: &IrTarget, op: UnaryOp, a: &IrTarget) -> Vec<Instr> {
    let top = target_operand(t);
    let aop = target_operand(a);
    match op {
        UnaryOp::USub => {
            if same_var(t, a) {
                vec![Instr::Neg(top)]
            } else {
                vec![Instr::Mov64(aop, top.clone()), Instr::Neg(top)]
            }
        }
        // Source booleans are native 0/1 words by the time explicate hands
        // them to IR lowering (`project_bool`); NOT is XOR with 1.
        UnaryOp::Not => {
            if same_var(t, a) {
                vec![Instr::Xor(Operand::Imm(1), top)]
            } else {
                vec![Instr::Mov64(aop, top.clone()), Instr::Xor(Operand::Imm(1), top)]
            }
        }
    }
}

fn setcc(op: CmpOp, dst: Operand) -> Instr {
    match op {
        CmpOp::Eq => Instr::SetE(dst),
        CmpOp::NotEq => Instr::SetNE(dst),
        CmpOp::Lt => Instr::SetL(dst),
        CmpOp::LtE => Instr::SetLE(dst),
        CmpOp::Gt => Instr::SetG(dst),
        CmpOp::GtE => Instr::SetGE(dst),
        CmpOp::Is => unreachable!("`is` is explicated into a native Eq before IR lowering"),
    }
}

fn lower_compare(t: &IrTarget, op: CmpOp, l: &IrTarget, r: &IrTarget) -> Vec<Instr> {
    let top = target_operand(t);
    let lop = target_operand(l);
    let rop = target_operand(r);
    let al = Operand::Reg(Register::Al);
    vec![
        Instr::Cmp(rop, lop),
        setcc(op, al.clone()),
        Instr::Movzbq(al, top),
    ]
}

/// `Assign(t, Call(f, args))` / `ExprStmt(Call(f, args))`: System-V AMD64
/// marshaling — first six arguments in `rdi,rsi,rdx,rcx,r8,r9`, the rest
/// pushed right-to-left, with a padding `sub` when an odd number of stack
/// arguments would otherwise misalign the call (P8).
fn lower_call(dst: Option<Operand>, callee: &str, args: &[IrTarget]) -> Vec<Instr> {
    let mut out = Vec::new();
    let reg_args: Vec<&IrTarget> = args.iter().take(6).collect();
    let stack_args: Vec<&IrTarget> = args.iter().skip(6).collect();
    let needs_pad = stack_args.len() % 2 == 1;

    if needs_pad {
        out.push(Instr::Sub(Operand::Imm(8), Operand::Reg(Register::Rsp)));
    }
    for arg in stack_args.iter().rev() {
        out.push(Instr::Push(target_operand(arg)));
    }
    for (i, arg) in reg_args.iter().enumerate() {
        out.push(Instr::Mov64(target_operand(arg), Operand::Reg(ARG_REGS[i])));
    }
    out.push(Instr::Call(callee.to_string()));

    let cleanup = stack_args.len() as i64 * 8 + if needs_pad { 8 } else { 0 };
    if cleanup > 0 {
        out.push(Instr::Add(Operand::Imm(cleanup), Operand::Reg(Register::Rsp)));
    }
    if let Some(d) = dst {
        out.push(Instr::Mov64(Operand::Reg(Register::Rax), d));
    }
    out
}

fn lower_expr(dst: Option<&IrTarget>, e: &IrExpr) -> Vec<Instr> {
    match (dst, e) {
        (Some(t), IrExpr::Target(s)) => vec![Instr::Mov64(target_operand(s), target_operand(t))],
        (Some(t), IrExpr::Call(f, args)) => lower_call(Some(target_operand(t)), f, args),
        (None, IrExpr::Call(f, args)) => lower_call(None, f, args),
        (Some(t), IrExpr::UnaryOp(op, a)) => lower_unary(t, *op, a),
        (Some(t), IrExpr::BinOp(op, a, b)) => lower_binop(t, *op, a, b),
        (Some(t), IrExpr::Compare(op, l, r)) => lower_compare(t, *op, l, r),
        (None, other) => unreachable!(
            "a bare expression statement only ever wraps a Call (flatten forces every other operand form into an assignment): {other:?}"
        ),
    }
}

/// Instruction selection: one top-down walk, no fixed point needed — every
/// IR form here already lowers to a template with no forbidden operand
/// shape of its own (memory-memory violations only arise once home
/// assignment turns `Var`s into `Mem`s, handled separately below).
fn lower_function_body(f: &IrFunction) -> Vec<Instr> {
    let mut out = Vec::new();
    for stmt in &f.body {
        match stmt {
            IrStmt::Assign(t, e) => out.extend(lower_expr(Some(t), e)),
            IrStmt::ExprStmt(e) => out.extend(lower_expr(None, e)),
            IrStmt::Label(name) => out.push(Instr::Label(name.clone())),
            IrStmt::Jump(name) => out.push(Instr::Jmp(name.clone())),
            IrStmt::Branch(c, _true_label, false_label) => {
                out.push(Instr::Cmp(Operand::Imm(0), target_operand(c)));
                out.push(Instr::Je(false_label.clone()));
                // Fall through into `_true_label`, which I1 guarantees is
                // the very next IR statement (a `Label`).
            }
            IrStmt::Return(value) => {
                if let Some(v) = value {
                    out.push(Instr::Mov64(target_operand(v), Operand::Reg(Register::Rax)));
                }
                out.push(Instr::Jmp(format!("end_{}", f.name)));
            }
        }
    }
    out
}

/// H.2: stack-homes-for-all. Slot order is the sorted variable name, so
/// home assignment — and therefore the final emitted text — is
/// deterministic (P9) independent of any `HashSet` iteration order.
fn assign_homes(f: &IrFunction) -> BTreeMap<String, Operand> {
    let mut names: Vec<&String> = f.variables.iter().collect();
    names.sort();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), Operand::Mem { base: Register::Rbp, offset: -((i as i32 + 1) * 8) }))
        .collect()
}

fn substitute(op: &Operand, homes: &BTreeMap<String, Operand>) -> Operand {
    match op {
        Operand::Var(name) => homes.get(name).cloned().expect("every IR variable has a home after stage H.2"),
        other => other.clone(),
    }
}

fn substitute_instr(instr: Instr, homes: &BTreeMap<String, Operand>) -> Instr {
    let s = |o: Operand| substitute(&o, homes);
    match instr {
        Instr::Mov64(a, b) => Instr::Mov64(s(a), s(b)),
        Instr::Movzbq(a, b) => Instr::Movzbq(s(a), s(b)),
        Instr::Add(a, b) => Instr::Add(s(a), s(b)),
        Instr::Sub(a, b) => Instr::Sub(s(a), s(b)),
        Instr::Neg(a) => Instr::Neg(s(a)),
        Instr::Xor(a, b) => Instr::Xor(s(a), s(b)),
        Instr::Push(a) => Instr::Push(s(a)),
        Instr::Pop(a) => Instr::Pop(s(a)),
        Instr::Cmp(a, b) => Instr::Cmp(s(a), s(b)),
        Instr::SetE(a) => Instr::SetE(s(a)),
        Instr::SetNE(a) => Instr::SetNE(s(a)),
        Instr::SetL(a) => Instr::SetL(s(a)),
        Instr::SetLE(a) => Instr::SetLE(s(a)),
        Instr::SetG(a) => Instr::SetG(s(a)),
        Instr::SetGE(a) => Instr::SetGE(s(a)),
        other => other,
    }
}

/// Second legalization walk (still H.2): after homing, an instruction that
/// now reads two memory operands is split by routing its source through
/// `SCRATCH` first.
fn relegalize_after_homing(instrs: Vec<Instr>) -> Vec<Instr> {
    let mut out = Vec::with_capacity(instrs.len());
    let scratch = Operand::Reg(SCRATCH);
    for instr in instrs {
        if instr.is_legal() {
            out.push(instr);
            continue;
        }
        match instr {
            Instr::Mov64(src, dst) => {
                out.push(Instr::Mov64(src, scratch.clone()));
                out.push(Instr::Mov64(scratch.clone(), dst));
            }
            Instr::Movzbq(src, dst) => {
                out.push(Instr::Movzbq(src, scratch.clone()));
                out.push(Instr::Mov64(scratch.clone(), dst));
            }
            Instr::Add(src, dst) => {
                out.push(Instr::Mov64(src, scratch.clone()));
                out.push(Instr::Add(scratch.clone(), dst));
            }
            Instr::Sub(src, dst) => {
                out.push(Instr::Mov64(src, scratch.clone()));
                out.push(Instr::Sub(scratch.clone(), dst));
            }
            Instr::Xor(src, dst) => {
                out.push(Instr::Mov64(src, scratch.clone()));
                out.push(Instr::Xor(scratch.clone(), dst));
            }
            Instr::Cmp(src, dst) => {
                // Two memory operands, or two immediates — either way,
                // the source moves through the scratch register first.
                out.push(Instr::Mov64(src, scratch.clone()));
                out.push(Instr::Cmp(scratch.clone(), dst));
            }
            illegal => unreachable!("instruction has no known legalization split: {illegal:?}"),
        }
    }
    out
}

fn round_up_16(n: i64) -> i64 {
    (n + 15) & !15
}

/// Prologue/epilogue framing. This allocator never hands a variable a
/// callee-saved register (see `operand::SCRATCH`'s doc comment), so no
/// callee-saved register needs saving here, and the stack size is just the
/// slot count rounded up to 16 bytes.
fn frame_function(name: &str, slot_count: usize, body: Vec<Instr>) -> Vec<Instr> {
    let stack_size = round_up_16(slot_count as i64 * 8);
    let mut out = Vec::new();
    out.push(Instr::Directive("globl".into(), name.to_string()));
    out.push(Instr::Directive("type".into(), format!("{name}, @function")));
    out.push(Instr::Label(name.to_string()));
    out.push(Instr::Push(Operand::Reg(Register::Rbp)));
    out.push(Instr::Mov64(Operand::Reg(Register::Rsp), Operand::Reg(Register::Rbp)));
    if stack_size > 0 {
        out.push(Instr::Sub(Operand::Imm(stack_size), Operand::Reg(Register::Rsp)));
    }
    out.extend(body);
    out.push(Instr::Label(format!("end_{name}")));
    out.push(Instr::Mov64(Operand::Reg(Register::Rbp), Operand::Reg(Register::Rsp)));
    out.push(Instr::Pop(Operand::Reg(Register::Rbp)));
    out.push(Instr::Ret);
    out.push(Instr::Directive("size".into(), format!("{name}, .-{name}")));
    out.push(Instr::Directive("align".into(), "16".to_string()));
    out
}

/// Moves each parameter from its System-V argument slot (register or, past
/// the sixth, the caller's stack frame) into its assigned home.
fn param_prologue(f: &IrFunction, homes: &BTreeMap<String, Operand>) -> Vec<Instr> {
    let mut out = Vec::new();
    for (i, name) in f.params.iter().enumerate() {
        let home = homes.get(name).expect("every parameter has a home").clone();
        let src = if i < 6 {
            Operand::Reg(ARG_REGS[i])
        } else {
            // Past `push rbp; mov rsp, rbp`: return address at +8, caller's
            // 7th argument at +16, each subsequent at +8 more.
            Operand::Mem { base: Register::Rbp, offset: 16 + (i as i32 - 6) * 8 }
        };
        out.push(Instr::Mov64(src, home));
    }
    out
}

pub fn lower_ir_function(f: &IrFunction) -> Result<Vec<Instr>, LoweringError> {
    let body = lower_function_body(f);
    let homes = assign_homes(f);
    let mut substituted: Vec<Instr> = param_prologue(f, &homes);
    substituted.extend(body.into_iter().map(|i| substitute_instr(i, &homes)));
    let legal = relegalize_after_homing(substituted);
    for instr in &legal {
        if !instr.is_legal() {
            return Err(LoweringError::IllegalInstruction(format!("{instr:?}")));
        }
    }
    Ok(frame_function(&f.name, f.variables.len(), legal))
}

pub fn lower_module(m: &crate::ir::IrModule) -> Result<Vec<Vec<Instr>>, LoweringError> {
    m.functions.iter().map(lower_ir_function).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;
    use crate::passes;
    use crate::temp::TempGen;

    fn lower(src: &str) -> Vec<Vec<Instr>> {
        let mut m = parse(src).unwrap();
        let mut temp = TempGen::new();
        passes::validate::validate_and_rename(&mut m, &mut temp).unwrap();
        passes::desugar_and_flatten_to_fixpoint(&mut m, &mut temp);
        passes::closure::convert_closures(&mut m);
        passes::explicate::explicate_module(&mut m, &mut temp);
        passes::flatten::flatten_module(&mut m, &mut temp);
        let ir = crate::ir::lower_module(&m, &mut temp).unwrap();
        lower_module(&ir).unwrap()
    }

    #[test]
    fn every_emitted_instruction_is_legal() {
        for f in lower("x = 1 + 2; print(x);") {
            for instr in &f {
                assert!(instr.is_legal(), "illegal instruction: {instr:?}");
            }
        }
    }

    #[test]
    fn function_ends_with_ret() {
        for f in lower("print(1);") {
            assert!(matches!(f.last(), Some(Instr::Ret)));
        }
    }

    #[test]
    fn stack_args_past_sixth_are_pushed() {
        // Closure conversion prepends free variables; seven of them forces
        // a call site past the six-register budget.
        let src = "a=1;b=1;c=1;d=1;e=1;f=1;g=1;
            def h(x) { return a+b+c+d+e+f+g+x; }
            print(h(1));";
        let fns = lower(src);
        let has_push = fns.iter().flatten().any(|i| matches!(i, Instr::Push(_)));
        assert!(has_push, "expected at least one stack-passed argument to be pushed");
    }
}
