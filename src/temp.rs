// Process-scoped fresh-name generation shared by every pass from Desugar
// through Explicate. Generated names use a `__` prefix: user identifiers are
// renamed (stage A) to carry a single leading underscore, so the two
// namespaces can never collide, and `__name0` still lexes as an ordinary
// Source identifier (kept valid so `.pyobjpy` dumps stay re-parsable).

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct TempGen {
    used: HashSet<String>,
    counters: HashMap<String, u32>,
}

impl TempGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.used.clear();
        self.counters.clear();
    }

    /// Records a name that came from the user's program so `fresh` never
    /// collides with it.
    pub fn register_user(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        loop {
            let n = self.counters.entry(prefix.to_string()).or_insert(0);
            let candidate = format!("__{prefix}{n}");
            *n += 1;
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_never_repeat() {
        let mut t = TempGen::new();
        let a = t.fresh("tmp");
        let b = t.fresh("tmp");
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_avoids_registered_user_names() {
        let mut t = TempGen::new();
        t.register_user("__tmp0");
        let a = t.fresh("tmp");
        assert_ne!(a, "__tmp0");
    }

    #[test]
    fn reset_clears_state() {
        let mut t = TempGen::new();
        let a = t.fresh("tmp");
        t.reset();
        let b = t.fresh("tmp");
        assert_eq!(a, b);
    }
}
