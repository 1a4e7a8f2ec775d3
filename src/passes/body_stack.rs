// Shared resource described in SPEC_FULL §5 (CONCURRENCY & RESOURCE MODEL):
// a stack of statement lists that Desugar, Flatten and Explicate all push
// hoisted helper statements into. Each frame separates a `prelude` (hoisted
// FunctionDefs from lambda-lifting, which must come first so a lambda is
// visible to every statement in its enclosing scope) from the ordinarily
// ordered `stmts`.

use crate::frontend::ast::Stmt;

#[derive(Default)]
struct Frame {
    prelude: Vec<Stmt>,
    stmts: Vec<Stmt>,
}

#[derive(Default)]
pub struct BodyStack {
    frames: Vec<Frame>,
}

impl BodyStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn push_stmt(&mut self, stmt: Stmt) {
        self.frames.last_mut().expect("push_stmt with no open scope").stmts.push(stmt);
    }

    pub fn push_prelude(&mut self, stmt: Stmt) {
        self.frames.last_mut().expect("push_prelude with no open scope").prelude.push(stmt);
    }

    pub fn leave(&mut self) -> Vec<Stmt> {
        let frame = self.frames.pop().expect("leave with no open scope");
        let mut out = frame.prelude;
        out.extend(frame.stmts);
        out
    }
}
