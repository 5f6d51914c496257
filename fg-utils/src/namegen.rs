use crate::Id;
use std::collections::HashMap;

/// Generates fresh, collision-free names by suffixing a counter onto a
/// prefix. Used when synthesizing declarations (the `_q` register for a DFF
/// slice, the per-entry fan-out wires of an array, escaped shadow names) so
/// that two passes asking for the same prefix never hand out the same name.
#[derive(Default)]
pub struct NameGenerator {
    next: HashMap<String, u64>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `prefix` unchanged the first time it's requested, and
    /// `prefix_N` (N starting at 0) on every subsequent request.
    pub fn gen_name<S: ToString>(&mut self, prefix: S) -> Id {
        let prefix = prefix.to_string();
        match self.next.get_mut(&prefix) {
            None => {
                self.next.insert(prefix.clone(), 0);
                Id::new(prefix)
            }
            Some(count) => {
                let name = format!("{prefix}_{count}");
                *count += 1;
                Id::new(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_unsuffixed() {
        let mut gen = NameGenerator::new();
        assert_eq!(gen.gen_name("r_q").to_string(), "r_q");
    }

    #[test]
    fn repeated_requests_are_unique() {
        let mut gen = NameGenerator::new();
        let a = gen.gen_name("r_q");
        let b = gen.gen_name("r_q");
        let c = gen.gen_name("r_q");
        assert_ne!(a, b);
        assert_ne!(b, c);
    }
}
