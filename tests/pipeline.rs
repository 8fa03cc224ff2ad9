//! End-to-end runs with a canned design engine.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use primersieve::design::{parse_boulder, DesignEngine, DesignOutput, DesignSettings, DesignTarget, IncludedRegion};
use primersieve::pipeline::{Pipeline, PipelineConfig};
use primersieve::seqio::{NeedletailReader, SequenceReader};
use primersieve::{PipelineError, Result};

/// Replays Primer3-style Boulder output per sequence id.
struct CannedEngine {
    outputs: HashMap<String, String>,
}

impl DesignEngine for CannedEngine {
    fn design(&self, target: &DesignTarget, _settings: &DesignSettings) -> Result<DesignOutput> {
        match self.outputs.get(&target.sequence_id) {
            Some(text) => parse_boulder(&target.sequence_id, text, &[]),
            None => Err(PipelineError::DesignEngine {
                sequence_id: target.sequence_id.clone(),
                reason: "no canned output".into(),
            }),
        }
    }
}

const RESTRICTED: &str = "\
SEQUENCE_ID=restricted
PRIMER_LEFT_NUM_RETURNED=1
PRIMER_LEFT_0_SEQUENCE=ATGCATGCAAGGTTCCAGTC
PRIMER_LEFT_0=0,20
PRIMER_LEFT_0_TM=58.1
PRIMER_LEFT_0_GC_PERCENT=50.0
PRIMER_RIGHT_0_SEQUENCE=TTGGACCTTAGCAGTCAGCA
PRIMER_RIGHT_0=94,20
PRIMER_INTERNAL_0_SEQUENCE=CCAGTTAGCAGGTTCAGCTAGCA
PRIMER_INTERNAL_0=30,23
PRIMER_PAIR_0_PRODUCT_SIZE=95
PRIMER_PAIR_0_PENALTY=0.25
=
";

const CLEAN: &str = "\
PRIMER_LEFT_0_SEQUENCE=AGCTTAGGCTAACCGTTAGC
PRIMER_LEFT_0=12,20
PRIMER_RIGHT_0_SEQUENCE=TTGGACCTTAGCAGTCAGCA
PRIMER_RIGHT_0=106,20
PRIMER_INTERNAL_0_SEQUENCE=CCAGTTAGCAGGTTCAGCTAGCA
PRIMER_INTERNAL_0=40,23
PRIMER_PAIR_0_PRODUCT_SIZE=95
PRIMER_LEFT_1_SEQUENCE=AGCTTAGGCTAACCGTTAGC
PRIMER_LEFT_1=12,20
PRIMER_INTERNAL_1_SEQUENCE=CCAGTTAGCAGGTTCAGCTAGCA
PRIMER_INTERNAL_1=40,23
PRIMER_PAIR_1_PRODUCT_SIZE=97
=
";

fn write_fasta(dir: &Path, records: &[(&str, &str)]) -> std::path::PathBuf {
    let path = dir.join("targets.fasta");
    let mut f = std::fs::File::create(&path).unwrap();
    for (id, seq) in records {
        writeln!(f, ">{id}\n{seq}").unwrap();
    }
    path
}

fn read_table(path: &Path) -> Vec<HashMap<String, String>> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    rdr.records()
        .map(|r| {
            let r = r.unwrap();
            headers.iter().map(String::from).zip(r.iter().map(String::from)).collect()
        })
        .collect()
}

fn engine() -> CannedEngine {
    CannedEngine {
        outputs: [("restricted", RESTRICTED), ("clean", CLEAN)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn template() -> String {
    format!("{}TTTTACGT", "ATGCATGCATGCATGCATGC".repeat(6))
}

#[test]
fn restriction_site_in_forward_primer_empties_the_shortlist() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_fasta(dir.path(), &[("restricted", template().as_str())]);
    let mut config = PipelineConfig::new(dir.path().join("out"));
    config.included_region = Some(IncludedRegion { start: 0, length: 120 });
    let engine = engine();
    let pipeline = Pipeline::new(&engine, config).unwrap();

    let summary = pipeline.run(NeedletailReader.records(&fasta).unwrap()).unwrap();
    assert_eq!(summary.records, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.no_candidates, 1);

    let raw = read_table(&dir.path().join("out/restricted_raw.tsv"));
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0]["restric_enz_hit_all"], "true");
    assert_eq!(raw[0]["restric_enz_hit_fwd"], "true");
    assert_eq!(raw[0]["restric_enz_fwd"], "CviAII,FatI,NlaIII");
    assert_eq!(raw[0]["product_size"], "95");
    assert_eq!(raw[0]["oligo_size_probe"], "23");

    let final_path = dir.path().join("out/restricted_final.tsv");
    assert!(read_table(&final_path).is_empty());
    let header = std::fs::read_to_string(&final_path).unwrap();
    assert!(header.starts_with("assay_id\toligo_fwd\toligo_rev\toligo_probe\ttm_fwd"));
}

#[test]
fn clean_assay_survives_and_incomplete_assay_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_fasta(dir.path(), &[("clean", template().as_str())]);
    let engine = engine();
    let pipeline = Pipeline::new(&engine, PipelineConfig::new(dir.path())).unwrap();

    let summary = pipeline.run(NeedletailReader.records(&fasta).unwrap()).unwrap();
    assert_eq!(summary.no_candidates, 0);

    let raw = read_table(&dir.path().join("clean_raw.tsv"));
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0]["assay_id"], "0");
    let fin = read_table(&dir.path().join("clean_final.tsv"));
    assert_eq!(fin.len(), 1);
    assert_eq!(fin[0]["oligo_fwd"], "AGCTTAGGCTAACCGTTAGC");
    assert_eq!(fin[0]["oligo_probe"], "CCAGTTAGCAGGTTCAGCTAGCA");
    assert_eq!(fin[0].len(), 10);
}

#[test]
fn failing_record_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let fasta = write_fasta(dir.path(), &[("unknown", "ACGTACGT"), ("clean", template().as_str())]);
    let engine = engine();
    let pipeline = Pipeline::new(&engine, PipelineConfig::new(dir.path())).unwrap();

    let summary = pipeline.run(NeedletailReader.records(&fasta).unwrap()).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.failed, 1);
    assert!(dir.path().join("clean_final.tsv").exists());
    assert!(!dir.path().join("unknown_raw.tsv").exists());
}

#[test]
fn parallel_run_matches_sequential_outputs() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let records = [("restricted", template()), ("clean", template())];
    let recs: Vec<(&str, &str)> = records.iter().map(|(a, b)| (*a, b.as_str())).collect();
    let engine = engine();

    for (dir, threads) in [(&seq_dir, 1), (&par_dir, 2)] {
        let fasta = write_fasta(dir.path(), &recs);
        let mut config = PipelineConfig::new(dir.path().join("out"));
        config.threads = threads;
        let summary = Pipeline::new(&engine, config).unwrap().run(NeedletailReader.records(&fasta).unwrap()).unwrap();
        assert_eq!(summary.records, 2);
    }
    for name in ["restricted_raw.tsv", "restricted_final.tsv", "clean_raw.tsv", "clean_final.tsv"] {
        let a = std::fs::read_to_string(seq_dir.path().join("out").join(name)).unwrap();
        let b = std::fs::read_to_string(par_dir.path().join("out").join(name)).unwrap();
        assert_eq!(a, b, "{name} differs");
    }
}

#[test]
fn ids_sanitizing_to_the_same_name_keep_separate_tables() {
    let mut engine = engine();
    engine.outputs.insert("a:b".into(), CLEAN.into());
    engine.outputs.insert("a|b".into(), "=\n".into());

    for threads in [1, 2] {
        let dir = tempfile::tempdir().unwrap();
        let fasta = write_fasta(dir.path(), &[("a:b", template().as_str()), ("a|b", template().as_str())]);
        let mut config = PipelineConfig::new(dir.path().join("out"));
        config.threads = threads;
        let summary = Pipeline::new(&engine, config).unwrap().run(NeedletailReader.records(&fasta).unwrap()).unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.no_candidates, 1);

        let out = dir.path().join("out");
        assert_eq!(read_table(&out.join("a_b_raw.tsv")).len(), 1);
        assert_eq!(read_table(&out.join("a_b_final.tsv")).len(), 1);
        assert!(read_table(&out.join("a_b_2_raw.tsv")).is_empty());
        assert!(out.join("a_b_2_final.tsv").exists());
    }
}
