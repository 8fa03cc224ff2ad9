//! Candidate filtering and ranking.
//!
//! Elimination rules, applied in order:
//! 1. no restriction site in any oligo,
//! 2. every oligo has fewer than `max_terminal_gc` G/C among its last five bases,
//! 3. no homopolymer run in any oligo,
//! 4. every cross-dimer melts below `max_cross_dimer_tm_c`.
//!
//! Survivors are ranked shortest and coolest first.

use std::cmp::Ordering;

use crate::error::{PipelineError, Result};
use crate::oligo::{AssayCandidate, Role};

/// Elimination thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterThresholds {
    /// Cross-dimer melting temperatures must be strictly below this, °C.
    pub max_cross_dimer_tm_c: f64,
    /// Terminal G/C counts must be strictly below this.
    pub max_terminal_gc: usize,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self { max_cross_dimer_tm_c: 51.0, max_terminal_gc: 4 }
    }
}

impl FilterThresholds {
    /// The dimer limit must be finite; any G/C limit is accepted.
    pub fn validate(&self) -> Result<()> {
        if !self.max_cross_dimer_tm_c.is_finite() {
            return Err(PipelineError::config("max_dimer_tm", "must be a finite temperature"));
        }
        Ok(())
    }

    /// `true` if `assay` passes every elimination rule.
    pub fn passes(&self, assay: &AssayCandidate) -> bool {
        !assay.restriction_hit_all
            && Role::ALL.iter().all(|r| assay.oligo(*r).metrics.terminal_gc_count < self.max_terminal_gc)
            && !assay.homopolymer_hit_all
            && assay.cross_dimers().iter().all(|d| d.melting_temp_c < self.max_cross_dimer_tm_c)
    }
}

fn rank_key(a: &AssayCandidate) -> ([usize; 3], [f64; 3]) {
    (
        Role::ALL.map(|r| a.oligo(r).oligo.oligo_size()),
        Role::ALL.map(|r| a.oligo(r).metrics.melting_temp_c),
    )
}

fn compare(a: &AssayCandidate, b: &AssayCandidate) -> Ordering {
    let (la, ta) = rank_key(a);
    let (lb, tb) = rank_key(b);
    la.cmp(&lb)
        .then_with(|| ta.iter().zip(tb.iter()).map(|(x, y)| x.total_cmp(y)).find(|o| o.is_ne()).unwrap_or(Ordering::Equal))
}

/// Keep the assays passing `thresholds`, sorted by (forward, reverse, probe)
/// length then (forward, reverse, probe) melting temperature, ascending.
///
/// An empty result is a normal outcome.
pub fn filter_candidates(assays: &[AssayCandidate], thresholds: &FilterThresholds) -> Vec<AssayCandidate> {
    let mut kept: Vec<AssayCandidate> = assays.iter().filter(|a| thresholds.passes(a)).cloned().collect();
    // Stable sort: equal keys keep join order.
    kept.sort_by(compare);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oligo::{AnnotatedOligo, CrossDimerMetric, MetricSet, OligoCandidate};

    fn oligo(role: Role, len: usize, tm: f64) -> AnnotatedOligo {
        AnnotatedOligo {
            oligo: OligoCandidate {
                assay_id: "x".into(),
                role,
                sequence: "A".repeat(len),
                position_start: 0,
                length: len,
                gc_percent: None,
                product_size: None,
                engine_tm: None,
            },
            metrics: MetricSet {
                melting_temp_c: tm,
                homodimer_dg_kcal: 0.0,
                homodimer_tm_c: 0.0,
                restriction_hit: false,
                restriction_enzymes: vec![],
                homopolymer_run_hit: false,
                terminal_gc_count: 2,
            },
        }
    }

    fn assay(id: &str, dimer_tm: f64) -> AssayCandidate {
        let d = CrossDimerMetric { dg_kcal: -3.0, melting_temp_c: 10.0 };
        AssayCandidate {
            assay_id: id.into(),
            forward: oligo(Role::Forward, 20, 60.0),
            reverse: oligo(Role::Reverse, 20, 60.0),
            probe: oligo(Role::Probe, 25, 68.0),
            product_size: Some(95),
            fwd_rev_dimer: d,
            fwd_probe_dimer: CrossDimerMetric { dg_kcal: -5.0, melting_temp_c: dimer_tm },
            probe_rev_dimer: d,
            restriction_hit_all: false,
            homopolymer_hit_all: false,
        }
    }

    fn ids(v: &[AssayCandidate]) -> Vec<&str> {
        v.iter().map(|a| a.assay_id.as_str()).collect()
    }

    #[test]
    fn hot_cross_dimer_is_excluded() {
        let v = vec![assay("a", 40.0), assay("b", 52.0), assay("c", 45.0)];
        let kept = filter_candidates(&v, &FilterThresholds::default());
        assert_eq!(kept.len(), 2);
        assert!(!ids(&kept).contains(&"b"));
    }

    #[test]
    fn threshold_is_exclusive() {
        let v = vec![assay("a", 51.0)];
        assert!(filter_candidates(&v, &FilterThresholds::default()).is_empty());
    }

    #[test]
    fn each_rule_eliminates() {
        let t = FilterThresholds::default();
        let mut r = assay("r", 20.0);
        r.restriction_hit_all = true;
        assert!(!t.passes(&r));
        let mut h = assay("h", 20.0);
        h.homopolymer_hit_all = true;
        assert!(!t.passes(&h));
        let mut g = assay("g", 20.0);
        g.reverse.metrics.terminal_gc_count = 4;
        assert!(!t.passes(&g));
        g.reverse.metrics.terminal_gc_count = 3;
        assert!(t.passes(&g));
    }

    #[test]
    fn survivors_sort_short_then_cool() {
        let mut long = assay("long", 20.0);
        long.forward = oligo(Role::Forward, 22, 58.0);
        let mut warm = assay("warm", 20.0);
        warm.reverse.metrics.melting_temp_c = 61.0;
        let mut cool = assay("cool", 20.0);
        cool.forward.metrics.melting_temp_c = 59.5;
        let base = assay("base", 20.0);
        let kept = filter_candidates(&[long, warm, base, cool], &FilterThresholds::default());
        assert_eq!(ids(&kept), vec!["cool", "base", "warm", "long"]);
    }

    #[test]
    fn tightening_never_grows_the_set() {
        let v: Vec<_> = [30.0, 40.0, 45.0, 50.0, 52.0, 60.0].iter().enumerate().map(|(i, t)| assay(&i.to_string(), *t)).collect();
        let mut prev = usize::MAX;
        for limit in [70.0, 55.0, 51.0, 46.0, 41.0, 20.0] {
            let t = FilterThresholds { max_cross_dimer_tm_c: limit, ..FilterThresholds::default() };
            let n = filter_candidates(&v, &t).len();
            assert!(n <= prev);
            prev = n;
        }
        assert_eq!(prev, 0);
    }

    #[test]
    fn tightening_terminal_gc_never_grows_the_set() {
        let v: Vec<_> = (0..6)
            .map(|i| {
                let mut a = assay(&i.to_string(), 20.0);
                a.probe.metrics.terminal_gc_count = i;
                a
            })
            .collect();
        let mut prev = usize::MAX;
        for limit in (0..=7).rev() {
            let t = FilterThresholds { max_terminal_gc: limit, ..FilterThresholds::default() };
            let n = filter_candidates(&v, &t).len();
            assert!(n <= prev);
            // forward and reverse carry two terminal G/C each
            assert_eq!(n, if limit > 2 { limit.min(6) } else { 0 });
            prev = n;
        }
        assert_eq!(prev, 0);
    }

    #[test]
    fn filtering_is_idempotent() {
        let v = vec![assay("a", 40.0), assay("b", 52.0), assay("c", 45.0)];
        let t = FilterThresholds::default();
        let once = filter_candidates(&v, &t);
        assert_eq!(filter_candidates(&once, &t), once);
    }
}
