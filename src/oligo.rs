//! Core types for **oligos**, **metrics** and **assays**.
//!
//! This module holds the data model used across the crate. Every stage of the
//! pipeline produces new records from the previous stage's output; nothing
//! here is mutated after construction.
//!
//! - [`OligoCandidate`]: one designed oligo as reported by the design engine.
//! - [`MetricSet`] / [`AnnotatedOligo`]: the same oligo plus secondary metrics.
//! - [`AssayCandidate`]: a forward/reverse/probe triple with cross-dimer metrics.
use core::fmt;

/// Function of an oligo within an assay.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Forward (left) primer.
    Forward,
    /// Reverse (right) primer.
    Reverse,
    /// Internal hybridization probe.
    Probe,
}

impl Role {
    /// All roles in assay order.
    pub const ALL: [Role; 3] = [Role::Forward, Role::Reverse, Role::Probe];

    /// Map a design-engine role token (`LEFT`, `RIGHT`, `INTERNAL`) to a role.
    pub fn from_engine_token(token: &str) -> Option<Role> {
        match token {
            "LEFT" => Some(Role::Forward),
            "RIGHT" => Some(Role::Reverse),
            "INTERNAL" => Some(Role::Probe),
            _ => None,
        }
    }

    /// Column suffix used in wide tables.
    pub fn suffix(self) -> &'static str {
        match self {
            Role::Forward => "fwd",
            Role::Reverse => "rev",
            Role::Probe => "probe",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Forward => "FORWARD",
            Role::Reverse => "REVERSE",
            Role::Probe => "PROBE",
        };
        f.write_str(s)
    }
}

/// A single designed oligo, one row of the normalized design output.
#[derive(Clone, Debug, PartialEq)]
pub struct OligoCandidate {
    /// Design-engine result index shared by the oligos of one assay.
    pub assay_id: String,
    pub role: Role,
    /// Uppercase 5'→3' sequence.
    pub sequence: String,
    /// Start coordinate as reported by the engine (for reverse primers this is the 3' end).
    pub position_start: i64,
    /// Length as reported by the engine's position tuple.
    pub length: usize,
    pub gc_percent: Option<f64>,
    /// Amplicon size of the pair this oligo belongs to.
    pub product_size: Option<i64>,
    /// Melting temperature as computed by the design engine itself.
    pub engine_tm: Option<f64>,
}

impl OligoCandidate {
    /// Oligo size taken from the sequence itself.
    pub fn oligo_size(&self) -> usize {
        self.sequence.len()
    }
}

/// Secondary metrics computed for one oligo.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSet {
    pub melting_temp_c: f64,
    pub homodimer_dg_kcal: f64,
    pub homodimer_tm_c: f64,
    /// `true` if any enzyme of the panel recognizes the sequence.
    pub restriction_hit: bool,
    /// Names of the enzymes that recognize the sequence, in panel order.
    pub restriction_enzymes: Vec<&'static str>,
    /// `true` if any base repeats four or more times in a row.
    pub homopolymer_run_hit: bool,
    /// G/C count among the last five 3' bases.
    pub terminal_gc_count: usize,
}

/// An oligo together with its metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedOligo {
    pub oligo: OligoCandidate,
    pub metrics: MetricSet,
}

/// Duplex stability between two different oligos of an assay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossDimerMetric {
    pub dg_kcal: f64,
    pub melting_temp_c: f64,
}

/// A complete forward/reverse/probe triple.
#[derive(Clone, Debug, PartialEq)]
pub struct AssayCandidate {
    pub assay_id: String,
    pub forward: AnnotatedOligo,
    pub reverse: AnnotatedOligo,
    pub probe: AnnotatedOligo,
    pub product_size: Option<i64>,
    pub fwd_rev_dimer: CrossDimerMetric,
    pub fwd_probe_dimer: CrossDimerMetric,
    pub probe_rev_dimer: CrossDimerMetric,
    /// OR of the three oligos' restriction hits.
    pub restriction_hit_all: bool,
    /// OR of the three oligos' homopolymer hits.
    pub homopolymer_hit_all: bool,
}

impl AssayCandidate {
    /// Borrow the oligo playing `role`.
    pub fn oligo(&self, role: Role) -> &AnnotatedOligo {
        match role {
            Role::Forward => &self.forward,
            Role::Reverse => &self.reverse,
            Role::Probe => &self.probe,
        }
    }

    /// The three cross-dimer metrics in (fwd×rev, fwd×probe, probe×rev) order.
    pub fn cross_dimers(&self) -> [CrossDimerMetric; 3] {
        [self.fwd_rev_dimer, self.fwd_probe_dimer, self.probe_rev_dimer]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_tokens_map_to_roles() {
        assert_eq!(Role::from_engine_token("LEFT"), Some(Role::Forward));
        assert_eq!(Role::from_engine_token("RIGHT"), Some(Role::Reverse));
        assert_eq!(Role::from_engine_token("INTERNAL"), Some(Role::Probe));
        assert_eq!(Role::from_engine_token("PAIR"), None);
    }

    #[test]
    fn roles_sort_in_assay_order() {
        let mut v = vec![Role::Probe, Role::Forward, Role::Reverse];
        v.sort();
        assert_eq!(v, Role::ALL.to_vec());
    }
}
