// x86-64 operand and register model shared by instruction lowering and
// textual emission, narrowed to the System-V AMD64 registers this pipeline
// actually drives (no SSE/XMM — this compiler never handles floating
// point).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    /// 8-bit alias of `Rax` — the only register `set*` is ever allowed to
    /// target (legalization invariant I5).
    Al,
}

impl Register {
    pub fn text(self) -> &'static str {
        match self {
            Register::Rax => "%rax",
            Register::Rbx => "%rbx",
            Register::Rcx => "%rcx",
            Register::Rdx => "%rdx",
            Register::Rsi => "%rsi",
            Register::Rdi => "%rdi",
            Register::Rbp => "%rbp",
            Register::Rsp => "%rsp",
            Register::R8 => "%r8",
            Register::R9 => "%r9",
            Register::R10 => "%r10",
            Register::R11 => "%r11",
            Register::R12 => "%r12",
            Register::R13 => "%r13",
            Register::R14 => "%r14",
            Register::R15 => "%r15",
            Register::Al => "%al",
        }
    }

    pub fn is_caller_saved(self) -> bool {
        matches!(
            self,
            Register::Rax
                | Register::Rcx
                | Register::Rdx
                | Register::Rsi
                | Register::Rdi
                | Register::R8
                | Register::R9
                | Register::R10
                | Register::R11
        )
    }
}

/// System-V AMD64 integer argument registers, in order.
pub const ARG_REGS: [Register; 6] =
    [Register::Rdi, Register::Rsi, Register::Rdx, Register::Rcx, Register::R8, Register::R9];

/// Scratch register used by stage H.2's post-homing legalization pass to
/// split an instruction that ended up with two memory operands. Caller-saved
/// and never a home for a source variable (the baseline allocator only ever
/// hands out `Rbp`-relative memory homes — see `lower::assign_homes`), so it
/// never needs to be saved/restored around its use.
pub const SCRATCH: Register = Register::R10;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(Register),
    Mem { base: Register, offset: i32 },
    Imm(i64),
    /// Pre-home-assignment placeholder standing in for an `IrName`; every
    /// one of these is replaced by a `Mem` operand during stage H.2 and
    /// none may reach emission.
    Var(String),
}

impl Operand {
    pub fn is_mem(&self) -> bool {
        matches!(self, Operand::Mem { .. })
    }

    pub fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm(_))
    }

    pub fn text(&self) -> String {
        match self {
            Operand::Reg(r) => r.text().to_string(),
            Operand::Mem { base, offset } => format!("{offset}({})", base.text()),
            Operand::Imm(n) => format!("${n}"),
            Operand::Var(name) => unreachable!("home assignment did not resolve variable `{name}` before emission"),
        }
    }
}
