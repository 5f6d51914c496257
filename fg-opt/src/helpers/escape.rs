//! Deterministic, invertible name escaping (spec.md §4.J): a term name like
//! `top.mem[3]` isn't a legal Verilog identifier, so every character that
//! can't appear in one is replaced by a unique, reversible marker (`.` ->
//! `__DOT__`, `[` -> `__BRA__`, `]` -> `__KET__`, `:` -> `__COL__`). Escaped
//! names that would exceed 128 characters fall back to a 64-bit hash
//! instead, since nothing requires those to round-trip; the per-module
//! table below exists purely to catch and flag the rare hash collision.
use fg_utils::Id;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const MAX_ESCAPED_LEN: usize = 128;

/// Applied in order; `.` must come before any marker containing a literal
/// `.` would be introduced, which none of these do, so order only matters
/// for determinism, not correctness.
const SUBSTITUTIONS: &[(char, &str)] = &[('.', "__DOT__"), ('[', "__BRA__"), (']', "__KET__"), (':', "__COL__")];

fn is_legal_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn substitute(name: &str) -> String {
    let mut out = name.to_string();
    for &(ch, marker) in SUBSTITUTIONS {
        out = out.replace(ch, marker);
    }
    out
}

fn hash_name(name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    format!("sig_{:016x}", hasher.finish())
}

/// Per-module escaping state: detects the rare case where two distinct
/// over-length names hash to the same shadow name.
#[derive(Default)]
pub struct Escaper {
    hashed: HashMap<String, String>,
}

pub struct EscapeResult {
    pub name: Id,
    /// `Some(original)` when this name collided with a previously hashed
    /// name and had to be disambiguated.
    pub collision_with: Option<String>,
}

impl Escaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escape(&mut self, id: Id) -> EscapeResult {
        let raw = id.as_ref();
        if is_legal_identifier(raw) {
            return EscapeResult { name: id, collision_with: None };
        }

        let substituted = substitute(raw);
        if substituted.len() <= MAX_ESCAPED_LEN {
            return EscapeResult { name: Id::new(substituted), collision_with: None };
        }

        let mut shadow = hash_name(raw);
        let collision_with = match self.hashed.get(&shadow) {
            Some(prev) if prev != raw => {
                let flagged = Some(prev.clone());
                let mut disambiguator = 1u32;
                while self.hashed.contains_key(&shadow) {
                    shadow = format!("{}_{disambiguator}", hash_name(raw));
                    disambiguator += 1;
                }
                flagged
            }
            _ => None,
        };
        self.hashed.insert(shadow.clone(), raw.to_string());
        EscapeResult { name: Id::new(shadow), collision_with }
    }
}

/// Reverses [`substitute`]; only meaningful for names that took the
/// character-substitution path (a hashed shadow name cannot be inverted).
pub fn unescape(escaped: &str) -> String {
    let mut out = escaped.to_string();
    for &(ch, marker) in SUBSTITUTIONS.iter().rev() {
        out = out.replace(marker, &ch.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_identifier_passes_through() {
        let mut e = Escaper::new();
        let r = e.escape(Id::from("top_reg"));
        assert_eq!(r.name, Id::from("top_reg"));
        assert!(r.collision_with.is_none());
    }

    #[test]
    fn hierarchical_name_round_trips() {
        let mut e = Escaper::new();
        let r = e.escape(Id::from("top.mem[3]"));
        assert_eq!(r.name, Id::from("top__DOT__mem__BRA__3__KET__"));
        assert_eq!(unescape(r.name.as_ref()), "top.mem[3]");
    }

    #[test]
    fn overlong_name_falls_back_to_a_hash() {
        let mut e = Escaper::new();
        let long_name = format!("top.{}", "a".repeat(200));
        let r = e.escape(Id::from(long_name.clone()));
        assert!(r.name.as_ref().starts_with("sig_"));
        assert!(r.collision_with.is_none());
    }
}
