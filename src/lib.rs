//! A compiler translating "Source" — a restricted dynamically-typed
//! scripting language — into x86-64 AT&T assembly text. All runtime values
//! are tagged 64-bit words (pyobjs) dispatched at runtime through a C ABI;
//! this crate owns desugaring, flattening, closure conversion, explication,
//! IR construction, and x86 code generation, ending at assembly text — it
//! never invokes an assembler or linker.

pub mod diagnostics;
pub mod frontend;
pub mod ir;
pub mod passes;
pub mod pipeline;
pub mod temp;
pub mod x86;
