//! Assay joining: per-role oligo rows → one wide row per assay id.

use std::collections::BTreeMap;

use log::warn;

use crate::oligo::{AnnotatedOligo, AssayCandidate, CrossDimerMetric, Role};
use crate::thermo::{self, ThermoParams};

fn cross_dimer(a: &AnnotatedOligo, b: &AnnotatedOligo, params: &ThermoParams) -> CrossDimerMetric {
    let d = thermo::heterodimer(&a.oligo.sequence, &b.oligo.sequence, params);
    CrossDimerMetric { dg_kcal: d.dg_kcal, melting_temp_c: d.tm_c }
}

/// Group annotated oligos into complete forward/reverse/probe assays.
///
/// Ids lacking a role, or carrying a role twice, are dropped with a warning.
/// Output is ordered by numeric assay id (lexicographic for non-numeric ids).
pub fn join_assays(oligos: &[AnnotatedOligo], params: &ThermoParams) -> Vec<AssayCandidate> {
    let mut groups: BTreeMap<(Option<u64>, &str), Vec<&AnnotatedOligo>> = BTreeMap::new();
    for o in oligos {
        let id = o.oligo.assay_id.as_str();
        groups.entry((id.parse::<u64>().ok(), id)).or_default().push(o);
    }

    let mut out = Vec::with_capacity(groups.len());
    for ((_, id), members) in groups {
        let pick = |role: Role| {
            let mut it = members.iter().filter(|o| o.oligo.role == role);
            match (it.next(), it.next()) {
                (Some(o), None) => Some(*o),
                _ => None,
            }
        };
        let (Some(fwd), Some(rev), Some(probe)) = (pick(Role::Forward), pick(Role::Reverse), pick(Role::Probe))
        else {
            let roles: Vec<String> = members.iter().map(|o| o.oligo.role.to_string()).collect();
            warn!("dropping incomplete assay {id}: roles present [{}]", roles.join(", "));
            continue;
        };

        let product_size = [fwd, rev, probe].iter().find_map(|o| o.oligo.product_size);

        out.push(AssayCandidate {
            assay_id: id.to_string(),
            fwd_rev_dimer: cross_dimer(fwd, rev, params),
            fwd_probe_dimer: cross_dimer(fwd, probe, params),
            probe_rev_dimer: cross_dimer(probe, rev, params),
            restriction_hit_all: fwd.metrics.restriction_hit || rev.metrics.restriction_hit || probe.metrics.restriction_hit,
            homopolymer_hit_all: fwd.metrics.homopolymer_run_hit
                || rev.metrics.homopolymer_run_hit
                || probe.metrics.homopolymer_run_hit,
            product_size,
            forward: fwd.clone(),
            reverse: rev.clone(),
            probe: probe.clone(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Annotator;
    use crate::oligo::OligoCandidate;

    fn oligo(id: &str, role: Role, seq: &str) -> OligoCandidate {
        OligoCandidate {
            assay_id: id.into(),
            role,
            sequence: seq.into(),
            position_start: 0,
            length: seq.len(),
            gc_percent: None,
            product_size: Some(92),
            engine_tm: None,
        }
    }

    fn annotated() -> Vec<AnnotatedOligo> {
        let a = Annotator::default();
        a.annotate_all(vec![
            oligo("0", Role::Forward, "AGCTTAGGCTAACCGTTAGC"),
            oligo("0", Role::Reverse, "TTGGACCTTAGCAGTCAGCA"),
            oligo("0", Role::Probe, "CCAGTTAGCAGGTTCAGCTAGCA"),
            oligo("1", Role::Forward, "AGCATGAGGCTAACCGTTAG"),
            oligo("1", Role::Reverse, "TTGGACCTTAGCAGTCAGCA"),
            oligo("1", Role::Probe, "CCAGTTAGCAGGTTCAGCTAGCA"),
            oligo("2", Role::Forward, "AGCTTAGGCTAACCGTTAGC"),
            oligo("2", Role::Probe, "CCAGTTAGCAGGTTCAGCTAGCA"),
        ])
    }

    #[test]
    fn incomplete_assays_are_dropped() {
        let joined = join_assays(&annotated(), &ThermoParams::default());
        let ids: Vec<_> = joined.iter().map(|a| a.assay_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1"]);
        assert!(joined.iter().all(|a| a.forward.oligo.role == Role::Forward
            && a.reverse.oligo.role == Role::Reverse
            && a.probe.oligo.role == Role::Probe));
    }

    #[test]
    fn duplicated_role_drops_the_assay() {
        let mut v = annotated();
        let extra = v[0].clone();
        v.push(extra);
        let ids: Vec<_> = join_assays(&v, &ThermoParams::default()).into_iter().map(|a| a.assay_id).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn aggregates_are_ored() {
        let joined = join_assays(&annotated(), &ThermoParams::default());
        assert!(!joined[0].restriction_hit_all);
        assert!(joined[1].restriction_hit_all);
        assert_eq!(joined[0].product_size, Some(92));
    }

    #[test]
    fn joining_is_idempotent() {
        let v = annotated();
        let p = ThermoParams::default();
        assert_eq!(join_assays(&v, &p), join_assays(&v, &p));
    }

    #[test]
    fn numeric_ids_order_numerically() {
        let a = Annotator::default();
        let mut v = Vec::new();
        for id in ["10", "9"] {
            for role in Role::ALL {
                v.push(a.annotate(oligo(id, role, "ACGTTGCAAGG")));
            }
        }
        let ids: Vec<_> = join_assays(&v, &ThermoParams::default()).into_iter().map(|a| a.assay_id).collect();
        assert_eq!(ids, vec!["9", "10"]);
    }
}
