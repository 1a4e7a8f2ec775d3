// Error types and source spans shared across every pipeline stage.

use thiserror::Error;

/// Byte offset range into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const SYNTH: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start: start as u32, end: end as u32 }
    }

    pub fn join(self, other: Span) -> Span {
        Span { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("integer literal `{text}` does not fit in 64 bits")]
    IntegerOverflow { text: String, span: Span },

    #[error("unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: &'static str, span: Span },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported construct `{construct}` at {span:?}")]
    UnsupportedConstruct { construct: &'static str, span: Span },

    #[error("cannot assign to builtin name `{name}` at {span:?}")]
    AssignToBuiltin { name: String, span: Span },

    #[error("`input()` may only appear as the immediate argument of `eval(...)` (at {span:?})")]
    MisplacedInput { span: Span },
}

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("instruction failed legalization: {0}")]
    IllegalInstruction(String),
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lowering(#[from] LoweringError),
}
