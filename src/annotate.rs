//! Per-oligo metric annotation.
//!
//! Every metric is a pure function of the oligo sequence and the fixed
//! [`ThermoParams`] / enzyme panel held by the [`Annotator`].
//!
//! # Examples
//! ```
//! use primersieve::annotate::{homopolymer_run_hit, terminal_gc_count};
//! assert!(homopolymer_run_hit("ACGGGGT", 4));
//! assert!(!homopolymer_run_hit("ACGGGT", 4));
//! assert_eq!(terminal_gc_count("AAAAAGCGCA", 5), 4);
//! ```

use crate::oligo::{AnnotatedOligo, MetricSet, OligoCandidate};
use crate::restriction::RestrictionPanel;
use crate::thermo::{self, ThermoParams};

/// Minimum run length flagged as a homopolymer.
pub const HOMOPOLYMER_MIN_RUN: usize = 4;
/// Number of 3' bases inspected for the GC clamp.
pub const TERMINAL_WINDOW: usize = 5;

/// `true` if any base repeats `min_run` or more times consecutively.
pub fn homopolymer_run_hit(seq: &str, min_run: usize) -> bool {
    let bytes = seq.as_bytes();
    if min_run <= 1 {
        return !bytes.is_empty();
    }
    let mut run = 1;
    for w in bytes.windows(2) {
        if w[0].eq_ignore_ascii_case(&w[1]) {
            run += 1;
            if run >= min_run {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// Number of G/C bases among the last `window` bases (all of them if shorter).
pub fn terminal_gc_count(seq: &str, window: usize) -> usize {
    let bytes = seq.as_bytes();
    let tail = &bytes[bytes.len().saturating_sub(window)..];
    tail.iter().filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C')).count()
}

/// Computes [`MetricSet`]s under one set of reaction conditions.
pub struct Annotator {
    params: ThermoParams,
    panel: RestrictionPanel,
}

impl Annotator {
    /// Annotate under `params`, scanning for the sites in `panel`.
    pub fn new(params: ThermoParams, panel: RestrictionPanel) -> Self {
        Self { params, panel }
    }

    /// Reaction conditions, also used for cross-dimers when joining.
    pub fn params(&self) -> &ThermoParams {
        &self.params
    }

    /// The restriction panel scanned by [`Annotator::metrics`].
    pub fn panel(&self) -> &RestrictionPanel {
        &self.panel
    }

    /// Metrics for a bare sequence.
    pub fn metrics(&self, seq: &str) -> MetricSet {
        let homo = thermo::homodimer(seq, &self.params);
        let restriction_enzymes = self.panel.scan(seq);
        MetricSet {
            melting_temp_c: thermo::melting_temp(seq, &self.params),
            homodimer_dg_kcal: homo.dg_kcal,
            homodimer_tm_c: homo.tm_c,
            restriction_hit: !restriction_enzymes.is_empty(),
            restriction_enzymes,
            homopolymer_run_hit: homopolymer_run_hit(seq, HOMOPOLYMER_MIN_RUN),
            terminal_gc_count: terminal_gc_count(seq, TERMINAL_WINDOW),
        }
    }

    /// Attach [`Annotator::metrics`] of the oligo's sequence.
    pub fn annotate(&self, oligo: OligoCandidate) -> AnnotatedOligo {
        let metrics = self.metrics(&oligo.sequence);
        AnnotatedOligo { oligo, metrics }
    }

    /// Annotate every oligo, keeping input order.
    pub fn annotate_all(&self, oligos: Vec<OligoCandidate>) -> Vec<AnnotatedOligo> {
        oligos.into_iter().map(|o| self.annotate(o)).collect()
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(ThermoParams::default(), RestrictionPanel::default_panel())
    }
}
