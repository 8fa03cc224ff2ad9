//! Design engine interface and the Primer3 backend.
//!
//! The pipeline only sees the [`DesignEngine`] trait: a target sequence plus
//! [`DesignSettings`] go in, a flat key → value mapping ([`DesignOutput`])
//! comes out. [`Primer3Cli`] implements it by driving the `primer3_core`
//! executable over Boulder-IO (`TAG=VALUE` lines terminated by `=`).
//!
//! An engine that finds nothing returns an empty mapping; that is "zero
//! candidates", not an error.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One value of the engine's flat output.
#[derive(Clone, Debug, PartialEq)]
pub enum DesignValue {
    /// Anything that is neither a number nor a position (sequences, explain strings).
    Text(String),
    /// Scalar attribute such as `_TM`, `_GC_PERCENT` or `_PRODUCT_SIZE`.
    Number(f64),
    /// `(start, length)` position tuple.
    Interval(i64, i64),
}

impl DesignValue {
    /// Parse a raw Boulder-IO value: `start,length` tuples, numbers, else text.
    pub fn parse(raw: &str) -> DesignValue {
        let raw = raw.trim();
        if let Some((a, b)) = raw.split_once(',') {
            if let (Ok(a), Ok(b)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
                return DesignValue::Interval(a, b);
            }
        }
        match raw.parse::<f64>() {
            Ok(n) => DesignValue::Number(n),
            Err(_) => DesignValue::Text(raw.to_string()),
        }
    }
}

/// Flat engine output, keyed by `PRIMER_*` tag.
pub type DesignOutput = BTreeMap<String, DesignValue>;

/// Sub-region of the template that amplicons must fall within.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncludedRegion {
    pub start: usize,
    pub length: usize,
}

/// What to design against.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignTarget {
    pub sequence_id: String,
    pub template: String,
    pub included_region: Option<IncludedRegion>,
}

/// Primer/probe design constraints handed to the engine.
///
/// Defaults mirror a probe-based qPCR assay with a 90–100 bp amplicon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesignSettings {
    pub opt_size: u32,
    pub min_size: u32,
    pub max_size: u32,
    pub opt_tm: f64,
    pub min_tm: f64,
    pub max_tm: f64,
    pub min_gc: f64,
    pub max_gc: f64,
    pub max_poly_x: u32,
    pub internal_max_poly_x: u32,
    pub internal_max_self_end: f64,
    /// mM
    pub salt_monovalent: f64,
    /// mM
    pub salt_divalent: f64,
    /// mM
    pub dntp_conc: f64,
    /// nM
    pub dna_conc: f64,
    pub max_ns_accepted: u32,
    pub max_self_any: f64,
    pub max_self_end: f64,
    pub pair_max_compl_any: f64,
    pub pair_max_compl_end: f64,
    /// Inclusive `(min, max)` amplicon sizes.
    pub product_size_range: Vec<(u32, u32)>,
    pub num_return: u32,
    pub pick_internal_oligo: bool,
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            opt_size: 20,
            min_size: 17,
            max_size: 35,
            opt_tm: 60.0,
            min_tm: 55.0,
            max_tm: 65.0,
            min_gc: 20.0,
            max_gc: 80.0,
            max_poly_x: 100,
            internal_max_poly_x: 100,
            internal_max_self_end: 8.0,
            salt_monovalent: 50.0,
            salt_divalent: 1.5,
            dntp_conc: 0.6,
            dna_conc: 50.0,
            max_ns_accepted: 0,
            max_self_any: 12.0,
            max_self_end: 8.0,
            pair_max_compl_any: 12.0,
            pair_max_compl_end: 8.0,
            product_size_range: vec![(90, 100)],
            num_return: 5,
            pick_internal_oligo: true,
        }
    }
}

impl DesignSettings {
    /// Load overrides from a TOML file; omitted fields keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| PipelineError::config(&path.display().to_string(), e.to_string()))
    }

    /// Check size, Tm and GC ranges are ordered and the product range is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_size <= self.opt_size && self.opt_size <= self.max_size) {
            return Err(PipelineError::config("size", "expected min_size <= opt_size <= max_size"));
        }
        if !(self.min_tm <= self.opt_tm && self.opt_tm <= self.max_tm) {
            return Err(PipelineError::config("tm", "expected min_tm <= opt_tm <= max_tm"));
        }
        if !(0.0..=100.0).contains(&self.min_gc) || !(0.0..=100.0).contains(&self.max_gc) || self.min_gc > self.max_gc {
            return Err(PipelineError::config("gc", "expected 0 <= min_gc <= max_gc <= 100"));
        }
        if self.product_size_range.is_empty() {
            return Err(PipelineError::config("product_size_range", "at least one range is required"));
        }
        if let Some((lo, hi)) = self.product_size_range.iter().find(|(lo, hi)| lo > hi) {
            return Err(PipelineError::config("product_size_range", format!("empty range {lo}-{hi}")));
        }
        if self.num_return == 0 {
            return Err(PipelineError::config("num_return", "must be >= 1"));
        }
        if !(self.salt_monovalent > 0.0) || !(self.dna_conc > 0.0) {
            return Err(PipelineError::config("concentration", "monovalent salt and DNA concentration must be > 0"));
        }
        Ok(())
    }

    /// Settings as Boulder-IO `(tag, value)` pairs.
    pub fn boulder_tags(&self) -> Vec<(&'static str, String)> {
        let ranges = self
            .product_size_range
            .iter()
            .map(|(lo, hi)| format!("{lo}-{hi}"))
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            ("PRIMER_TASK", "generic".to_string()),
            ("PRIMER_PICK_LEFT_PRIMER", "1".to_string()),
            ("PRIMER_PICK_RIGHT_PRIMER", "1".to_string()),
            ("PRIMER_PICK_INTERNAL_OLIGO", u8::from(self.pick_internal_oligo).to_string()),
            ("PRIMER_OPT_SIZE", self.opt_size.to_string()),
            ("PRIMER_MIN_SIZE", self.min_size.to_string()),
            ("PRIMER_MAX_SIZE", self.max_size.to_string()),
            ("PRIMER_OPT_TM", self.opt_tm.to_string()),
            ("PRIMER_MIN_TM", self.min_tm.to_string()),
            ("PRIMER_MAX_TM", self.max_tm.to_string()),
            ("PRIMER_MIN_GC", self.min_gc.to_string()),
            ("PRIMER_MAX_GC", self.max_gc.to_string()),
            ("PRIMER_MAX_POLY_X", self.max_poly_x.to_string()),
            ("PRIMER_INTERNAL_MAX_POLY_X", self.internal_max_poly_x.to_string()),
            ("PRIMER_INTERNAL_MAX_SELF_END", self.internal_max_self_end.to_string()),
            ("PRIMER_SALT_MONOVALENT", self.salt_monovalent.to_string()),
            ("PRIMER_SALT_DIVALENT", self.salt_divalent.to_string()),
            ("PRIMER_DNTP_CONC", self.dntp_conc.to_string()),
            ("PRIMER_DNA_CONC", self.dna_conc.to_string()),
            ("PRIMER_MAX_NS_ACCEPTED", self.max_ns_accepted.to_string()),
            ("PRIMER_MAX_SELF_ANY", self.max_self_any.to_string()),
            ("PRIMER_MAX_SELF_END", self.max_self_end.to_string()),
            ("PRIMER_PAIR_MAX_COMPL_ANY", self.pair_max_compl_any.to_string()),
            ("PRIMER_PAIR_MAX_COMPL_END", self.pair_max_compl_end.to_string()),
            ("PRIMER_PRODUCT_SIZE_RANGE", ranges),
            ("PRIMER_NUM_RETURN", self.num_return.to_string()),
        ]
    }
}

/// A primer/probe design backend.
pub trait DesignEngine: Send + Sync {
    /// Design oligos for `target`. An empty mapping means no candidates.
    fn design(&self, target: &DesignTarget, settings: &DesignSettings) -> Result<DesignOutput>;
}

/// Render one Boulder-IO record (including the terminating `=`).
pub fn boulder_record(target: &DesignTarget, settings: &DesignSettings) -> String {
    let mut out = String::new();
    out.push_str(&format!("SEQUENCE_ID={}\n", target.sequence_id));
    out.push_str(&format!("SEQUENCE_TEMPLATE={}\n", target.template));
    if let Some(r) = target.included_region {
        out.push_str(&format!("SEQUENCE_INCLUDED_REGION={},{}\n", r.start, r.length));
    }
    for (tag, value) in settings.boulder_tags() {
        out.push_str(&format!("{tag}={value}\n"));
    }
    out.push_str("=\n");
    out
}

/// Parse the first Boulder-IO record of `text` into an output mapping.
///
/// Echoed input tags (`SEQUENCE_*` and anything in `sent`) are dropped.
/// `PRIMER_ERROR` becomes an error; `PRIMER_WARNING` is logged and dropped.
pub fn parse_boulder(sequence_id: &str, text: &str, sent: &[&str]) -> Result<DesignOutput> {
    let mut out = DesignOutput::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line == "=" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let Some((tag, value)) = line.split_once('=') else {
            return Err(PipelineError::DesignEngine {
                sequence_id: sequence_id.to_string(),
                reason: format!("malformed output line '{line}'"),
            });
        };
        match tag {
            "PRIMER_ERROR" => {
                return Err(PipelineError::DesignEngine {
                    sequence_id: sequence_id.to_string(),
                    reason: value.to_string(),
                })
            }
            "PRIMER_WARNING" => warn!("{sequence_id}: design engine warning: {value}"),
            t if t.starts_with("SEQUENCE_") || sent.contains(&t) => {}
            _ => {
                out.insert(tag.to_string(), DesignValue::parse(value));
            }
        }
    }
    Ok(out)
}

/// Runs the `primer3_core` executable once per target.
#[derive(Clone, Debug)]
pub struct Primer3Cli {
    executable: PathBuf,
}

impl Default for Primer3Cli {
    fn default() -> Self {
        Self { executable: PathBuf::from("primer3_core") }
    }
}

impl Primer3Cli {
    /// Use `executable` (a path, or a name looked up on `PATH`).
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }
}

impl DesignEngine for Primer3Cli {
    fn design(&self, target: &DesignTarget, settings: &DesignSettings) -> Result<DesignOutput> {
        let engine_err = |reason: String| PipelineError::DesignEngine { sequence_id: target.sequence_id.clone(), reason };
        let input = boulder_record(target, settings);
        debug!("{}: invoking {}", target.sequence_id, self.executable.display());

        let mut child = Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| engine_err(format!("failed to start {}: {e}", self.executable.display())))?;
        // Dropping stdin at the end of the match closes it so the engine sees EOF.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .map_err(|e| engine_err(format!("waiting for {}: {e}", self.executable.display())))?;
        if let Err(e) = written {
            return Err(engine_err(format!(
                "writing input to {} failed: {e}: {}",
                self.executable.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !output.status.success() {
            return Err(engine_err(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tags = settings.boulder_tags();
        let sent: Vec<&str> = tags.iter().map(|(t, _)| *t).collect();
        parse_boulder(&target.sequence_id, &String::from_utf8_lossy(&output.stdout), &sent)
    }
}
