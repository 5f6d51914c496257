//! Per-bit DFF classification (spec.md §4.B Design Note "Bit-level
//! classification propagation"): each bit of a `reg` term is either known to
//! be a flip-flop output (driven only by nonblocking assigns), known to be
//! combinational-only (driven only by blocking assigns, i.e. a `reg` used as
//! a scratch variable), or unknown until a driver is seen. Classifying a bit
//! twice with conflicting results is a structural error
//! (`InconsistentClassification`, spec.md §7). Registration happens as the
//! importer discovers terms; classification happens once bindings have been
//! lowered, since only then is each write's exact bit range and assign type
//! known.
use fg_utils::{Error, FgResult, Id};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BitClass {
    Unknown,
    Dff,
    Comb,
}

/// The per-bit classification of every `reg`-kind term in one module.
#[derive(Debug, Default)]
pub struct TermTable {
    bits: HashMap<Id, Vec<BitClass>>,
}

impl TermTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, term: Id, width: u64) {
        self.bits
            .entry(term)
            .or_insert_with(|| vec![BitClass::Unknown; width as usize]);
    }

    /// Merges in a driver observation for `term[msb:lsb]`. Monotonic: once a
    /// bit is classified, a later observation must agree or the import fails
    /// (spec.md §7 `InconsistentClassification`).
    pub fn classify(&mut self, term: Id, msb: u64, lsb: u64, nonblocking: bool) -> FgResult<()> {
        let observed = if nonblocking { BitClass::Dff } else { BitClass::Comb };
        let Some(bits) = self.bits.get_mut(&term) else {
            return Err(Error::unresolved_term(term));
        };
        for bit in lsb..=msb {
            let slot = bits
                .get_mut(bit as usize)
                .ok_or_else(|| Error::width_mismatch(format!("bit {bit} out of range for `{term}'")))?;
            match *slot {
                BitClass::Unknown => *slot = observed,
                known if known == observed => {}
                _ => return Err(Error::inconsistent_classification(bit, term)),
            }
        }
        Ok(())
    }

    pub fn is_dff_bit(&self, term: Id, bit: u64) -> bool {
        self.bits
            .get(&term)
            .and_then(|bits| bits.get(bit as usize))
            .map(|c| *c == BitClass::Dff)
            .unwrap_or(false)
    }

    /// Whether every bit in `[msb:lsb]` is classified as a flip-flop
    /// output, the predicate the FlowGuard core's DFF-set membership test
    /// (spec.md §3 glossary "DFF slice") is built from.
    pub fn is_dff_slice(&self, term: Id, msb: u64, lsb: u64) -> bool {
        (lsb..=msb).all(|bit| self.is_dff_bit(term, bit))
    }
}
