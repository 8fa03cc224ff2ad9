//! Tabular output via Polars.
//!
//! Two tables are produced per record:
//! - **raw**: every joined assay with all oligo fields (suffixed `_fwd`,
//!   `_rev`, `_probe`), cross-dimer metrics and assay-level aggregates;
//! - **final**: filtered, ranked assays with sequences and melting temperatures.
//!
//! Both are written as tab-separated text with a header row; an empty table
//! still carries its header.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::annotate::Annotator;
use crate::error::Result;
use crate::oligo::{AssayCandidate, Role};

fn oligo_columns(assays: &[AssayCandidate], role: Role) -> Vec<Series> {
    let s = role.suffix();
    let o = |a: &AssayCandidate| a.oligo(role).clone();
    let all: Vec<_> = assays.iter().map(o).collect();
    vec![
        Series::new(&format!("oligo_{s}"), all.iter().map(|a| a.oligo.sequence.clone()).collect::<Vec<_>>()),
        Series::new(&format!("start_{s}"), all.iter().map(|a| a.oligo.position_start).collect::<Vec<_>>()),
        Series::new(&format!("oligo_size_{s}"), all.iter().map(|a| a.oligo.oligo_size() as u64).collect::<Vec<_>>()),
        Series::new(&format!("gc_pct_{s}"), all.iter().map(|a| a.oligo.gc_percent).collect::<Vec<_>>()),
        Series::new(&format!("engine_tm_{s}"), all.iter().map(|a| a.oligo.engine_tm).collect::<Vec<_>>()),
        Series::new(&format!("tm_{s}"), all.iter().map(|a| a.metrics.melting_temp_c).collect::<Vec<_>>()),
        Series::new(&format!("homodimer_dg_{s}"), all.iter().map(|a| a.metrics.homodimer_dg_kcal).collect::<Vec<_>>()),
        Series::new(&format!("homodimer_tm_{s}"), all.iter().map(|a| a.metrics.homodimer_tm_c).collect::<Vec<_>>()),
        Series::new(&format!("restric_enz_hit_{s}"), all.iter().map(|a| a.metrics.restriction_hit).collect::<Vec<_>>()),
        Series::new(
            &format!("restric_enz_{s}"),
            all.iter().map(|a| a.metrics.restriction_enzymes.join(",")).collect::<Vec<_>>(),
        ),
        Series::new(&format!("homopolymer_hit_{s}"), all.iter().map(|a| a.metrics.homopolymer_run_hit).collect::<Vec<_>>()),
        Series::new(&format!("terminal_gc_{s}"), all.iter().map(|a| a.metrics.terminal_gc_count as u64).collect::<Vec<_>>()),
    ]
}

/// All assays with full metrics.
pub fn raw_frame(assays: &[AssayCandidate]) -> PolarsResult<DataFrame> {
    let mut cols = vec![
        Series::new("assay_id", assays.iter().map(|a| a.assay_id.clone()).collect::<Vec<_>>()),
        Series::new("product_size", assays.iter().map(|a| a.product_size).collect::<Vec<_>>()),
    ];
    for role in Role::ALL {
        cols.extend(oligo_columns(assays, role));
    }
    let pairs: [(&str, fn(&AssayCandidate) -> f64, fn(&AssayCandidate) -> f64); 3] = [
        ("fwd_rev", |a| a.fwd_rev_dimer.dg_kcal, |a| a.fwd_rev_dimer.melting_temp_c),
        ("fwd_probe", |a| a.fwd_probe_dimer.dg_kcal, |a| a.fwd_probe_dimer.melting_temp_c),
        ("probe_rev", |a| a.probe_rev_dimer.dg_kcal, |a| a.probe_rev_dimer.melting_temp_c),
    ];
    for (name, dg, tm) in pairs {
        cols.push(Series::new(&format!("{name}_dimer_dg"), assays.iter().map(dg).collect::<Vec<_>>()));
        cols.push(Series::new(&format!("{name}_dimer_tm"), assays.iter().map(tm).collect::<Vec<_>>()));
    }
    cols.push(Series::new("restric_enz_hit_all", assays.iter().map(|a| a.restriction_hit_all).collect::<Vec<_>>()));
    cols.push(Series::new("homopolymer_hit_all", assays.iter().map(|a| a.homopolymer_hit_all).collect::<Vec<_>>()));
    DataFrame::new(cols)
}

/// Shortlist columns: id, sequences, melting and homodimer temperatures.
pub fn final_frame(assays: &[AssayCandidate]) -> PolarsResult<DataFrame> {
    let mut cols = vec![Series::new("assay_id", assays.iter().map(|a| a.assay_id.clone()).collect::<Vec<_>>())];
    for role in Role::ALL {
        cols.push(Series::new(
            &format!("oligo_{}", role.suffix()),
            assays.iter().map(|a| a.oligo(role).oligo.sequence.clone()).collect::<Vec<_>>(),
        ));
    }
    for role in Role::ALL {
        cols.push(Series::new(
            &format!("tm_{}", role.suffix()),
            assays.iter().map(|a| a.oligo(role).metrics.melting_temp_c).collect::<Vec<_>>(),
        ));
    }
    for role in Role::ALL {
        cols.push(Series::new(
            &format!("homodimer_tm_{}", role.suffix()),
            assays.iter().map(|a| a.oligo(role).metrics.homodimer_tm_c).collect::<Vec<_>>(),
        ));
    }
    DataFrame::new(cols)
}

/// Metrics for free-standing sequences, one row each.
pub fn metrics_frame(seqs: &[String], annotator: &Annotator) -> PolarsResult<DataFrame> {
    let m: Vec<_> = seqs.iter().map(|s| annotator.metrics(s)).collect();
    df!(
        "sequence"        => seqs.to_vec(),
        "length"          => seqs.iter().map(|s| s.len() as u64).collect::<Vec<_>>(),
        "tm"              => m.iter().map(|x| x.melting_temp_c).collect::<Vec<_>>(),
        "homodimer_dg"    => m.iter().map(|x| x.homodimer_dg_kcal).collect::<Vec<_>>(),
        "homodimer_tm"    => m.iter().map(|x| x.homodimer_tm_c).collect::<Vec<_>>(),
        "restric_enz"     => m.iter().map(|x| x.restriction_enzymes.join(",")).collect::<Vec<_>>(),
        "homopolymer_hit" => m.iter().map(|x| x.homopolymer_run_hit).collect::<Vec<_>>(),
        "terminal_gc"     => m.iter().map(|x| x.terminal_gc_count as u64).collect::<Vec<_>>(),
    )
}

/// Make a record id safe to use as a file name stem.
pub fn file_stem(record_id: &str) -> String {
    let s: String = record_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if s.is_empty() || s.chars().all(|c| c == '.') { "record".to_string() } else { s }
}

/// `<outdir>/<record>_<kind>.tsv`
pub fn table_path(outdir: &Path, record_id: &str, kind: &str) -> PathBuf {
    outdir.join(format!("{}_{kind}.tsv", file_stem(record_id)))
}

/// Write `df` as tab-separated text with a header.
pub fn write_tsv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    CsvWriter::new(file).include_header(true).with_separator(b'\t').finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frames_keep_their_columns() {
        let raw = raw_frame(&[]).unwrap();
        assert_eq!(raw.height(), 0);
        assert!(raw.get_column_names().contains(&"restric_enz_hit_all"));
        assert!(raw.get_column_names().contains(&"oligo_size_probe"));
        let fin = final_frame(&[]).unwrap();
        assert_eq!(fin.width(), 10);
        assert_eq!(fin.get_column_names()[0], "assay_id");
    }

    #[test]
    fn metrics_frame_has_a_row_per_sequence() {
        let seqs = vec!["ACGTTGCAAGGCTTACGATC".to_string(), "AACATGAATTTGGC".to_string()];
        let df = metrics_frame(&seqs, &Annotator::default()).unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn record_ids_become_safe_file_names() {
        assert_eq!(file_stem("chr1:100-200"), "chr1_100-200");
        assert_eq!(file_stem("gi|123|ref|NM_1.2|"), "gi_123_ref_NM_1.2_");
        assert_eq!(file_stem(".."), "record");
        assert_eq!(table_path(Path::new("/out"), "g1", "raw"), PathBuf::from("/out/g1_raw.tsv"));
    }
}
