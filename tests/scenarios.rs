//! End-to-end scenarios from spec.md §8. This repository never assembles,
//! links, or executes its output (the assembler and C runtime are external
//! collaborators per §1), so P1's byte-exact-stdout claim is checked
//! indirectly: each scenario asserts the emitted instruction sequence has
//! the shape a hand-traced execution of the lowering rules would produce
//! (which runtime call happens, how many times, in what order) rather than
//! by running the compiled binary.

use sourcec::frontend::parser::parse;
use sourcec::ir;
use sourcec::passes;
use sourcec::temp::TempGen;
use sourcec::x86::instr::Instr;
use sourcec::x86::lower;

fn lower_to_x86(src: &str) -> Vec<Vec<Instr>> {
    let mut m = parse(src).expect("parse");
    let mut temp = TempGen::new();
    passes::validate::validate_and_rename(&mut m, &mut temp).expect("validate");
    passes::desugar_and_flatten_to_fixpoint(&mut m, &mut temp);
    passes::closure::convert_closures(&mut m);
    passes::explicate::explicate_module(&mut m, &mut temp);
    passes::flatten::flatten_module(&mut m, &mut temp);
    let ir_module = ir::lower_module(&m, &mut temp).expect("ir lowering");
    lower::lower_module(&ir_module).expect("x86 lowering")
}

fn calls(funcs: &[Vec<Instr>], name: &str) -> usize {
    funcs.iter().flatten().filter(|i| matches!(i, Instr::Call(f) if f == name)).count()
}

/// P6: every emitted instruction passes its local legality predicate.
fn assert_all_legal(funcs: &[Vec<Instr>]) {
    for f in funcs {
        for i in f {
            assert!(i.is_legal(), "illegal instruction: {i:?}");
        }
    }
}

/// P5 (restated at the x86 level): no two `Call`s are adjacent without an
/// intervening stack-cleanup or argument-marshaling instruction tells us
/// nothing new here; the real P5 check lives in `ir::tests`. What this
/// repo's x86 output *can* check structurally is P8: scan each function's
/// instruction stream for a `Call` and confirm the running stack-depth
/// delta since function entry is a multiple of 16 at that point, counting
/// only instructions this pipeline itself pushes (`Push`/`Sub`/`Add` on
/// `%rsp`).
fn assert_call_sites_aligned(funcs: &[Vec<Instr>]) {
    use sourcec::x86::operand::{Operand, Register};
    for f in funcs {
        let mut depth: i64 = 0;
        for instr in f {
            match instr {
                Instr::Push(_) => depth += 8,
                Instr::Pop(_) => depth -= 8,
                Instr::Sub(Operand::Imm(n), Operand::Reg(Register::Rsp)) => depth += n,
                Instr::Add(Operand::Imm(n), Operand::Reg(Register::Rsp)) => depth -= n,
                Instr::Call(_) => {
                    assert_eq!(depth % 16, 0, "rsp not 16-byte aligned at call site (delta {depth})");
                }
                _ => {}
            }
        }
    }
}

#[test]
fn scenario_1_print_sum() {
    let funcs = lower_to_x86("print(1 + 2);");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "print_any"), 1);
    assert_eq!(calls(&funcs, "inject_int"), 1);
}

#[test]
fn scenario_2_eval_input_plus_one() {
    let funcs = lower_to_x86("x = eval(input()); print(x + 1);");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "eval_input_pyobj"), 1);
    assert_eq!(calls(&funcs, "print_any"), 1);
}

#[test]
fn scenario_3_chained_comparison() {
    let funcs = lower_to_x86("if (1 < 2 < 3) { print(1); } else { print(0); }");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "print_any"), 2);
}

#[test]
fn scenario_4_list_subscript_sum() {
    let funcs = lower_to_x86("xs = [10, 20, 30]; print(xs[1] + xs[2]);");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "create_list"), 1);
    assert_eq!(calls(&funcs, "set_subscript"), 3);
    assert_eq!(calls(&funcs, "get_subscript"), 2);
}

#[test]
fn scenario_5_lambda_closure_call() {
    let funcs = lower_to_x86("f = lambda x: x + 1; print(f(41));");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "print_any"), 1);
    // The lambda becomes its own top-level function, separate from `main`.
    assert!(funcs.len() >= 2);
}

#[test]
fn scenario_6_while_loop_counts_to_three() {
    let funcs = lower_to_x86("n = 0; while (n < 3) { print(n); n = n + 1; }");
    assert_all_legal(&funcs);
    assert_call_sites_aligned(&funcs);
    assert_eq!(calls(&funcs, "print_any"), 1);
    let jumps = funcs.iter().flatten().filter(|i| matches!(i, Instr::Jmp(_))).count();
    assert!(jumps >= 2, "expected at least the loop-back jump and the post-condition jump");
}
