//! Per-record driver: design → normalize → annotate → join → filter → write.
//!
//! Each FASTA record is independent. A failure (design engine error, schema
//! error, unwritable output) is logged and counted, and the run moves on to
//! the next record. With `threads > 1` records are processed on a dedicated
//! rayon pool.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::annotate::Annotator;
use crate::design::{DesignEngine, DesignSettings, DesignTarget, IncludedRegion};
use crate::error::{PipelineError, Result};
use crate::filter::{filter_candidates, FilterThresholds};
use crate::join::join_assays;
use crate::normalize::normalize;
use crate::oligo::AssayCandidate;
use crate::restriction::RestrictionPanel;
use crate::seqio::FastaRecord;
use crate::table;
use crate::thermo::ThermoParams;

/// Everything a run needs besides the engine and the records.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory receiving `<record>_raw.tsv` and `<record>_final.tsv`.
    pub outdir: PathBuf,
    pub included_region: Option<IncludedRegion>,
    pub settings: DesignSettings,
    pub thermo: ThermoParams,
    pub thresholds: FilterThresholds,
    /// Records processed concurrently; `0` = all cores.
    pub threads: usize,
}

impl PipelineConfig {
    /// Default settings, thermodynamics and thresholds, one thread.
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
            included_region: None,
            settings: DesignSettings::default(),
            thermo: ThermoParams::default(),
            thresholds: FilterThresholds::default(),
            threads: 1,
        }
    }

    /// Reject settings the engine or the thermodynamic model cannot use.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        self.thermo.validate()?;
        self.thresholds.validate()?;
        if let Some(r) = self.included_region {
            if r.length == 0 {
                return Err(PipelineError::config("included_region_length", "must be > 0"));
            }
        }
        Ok(())
    }
}

/// Result of evaluating one record in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordResult {
    pub record_id: String,
    /// All complete assays (the raw table).
    pub raw: Vec<AssayCandidate>,
    /// Filtered, ranked assays (the final table).
    pub shortlist: Vec<AssayCandidate>,
}

/// Totals for a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records read, including unreadable ones.
    pub records: usize,
    /// Unreadable records plus records whose design or output failed.
    pub failed: usize,
    /// Records whose final table is empty.
    pub no_candidates: usize,
}

/// Runs records through a [`DesignEngine`] and the post-processing stages.
pub struct Pipeline<'e, E: DesignEngine> {
    engine: &'e E,
    annotator: Annotator,
    config: PipelineConfig,
}

impl<'e, E: DesignEngine> Pipeline<'e, E> {
    /// Validate `config` and prepare matchers.
    pub fn new(engine: &'e E, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let annotator = Annotator::new(config.thermo.clone(), RestrictionPanel::default_panel());
        Ok(Self { engine, annotator, config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for one record without touching the filesystem.
    pub fn evaluate(&self, record: &FastaRecord) -> Result<RecordResult> {
        let target = DesignTarget {
            sequence_id: record.id.clone(),
            template: record.seq.clone(),
            included_region: self.config.included_region,
        };
        let output = self.engine.design(&target, &self.config.settings)?;
        let oligos = normalize(&output)?;
        if oligos.is_empty() {
            info!("{}: design engine returned no candidates", record.id);
        }
        let annotated = self.annotator.annotate_all(oligos);
        let raw = join_assays(&annotated, self.annotator.params());
        let shortlist = filter_candidates(&raw, &self.config.thresholds);
        Ok(RecordResult { record_id: record.id.clone(), raw, shortlist })
    }

    /// Evaluate one record and write its raw and final tables, named after
    /// [`table::file_stem`] of the record id.
    pub fn process_record(&self, record: &FastaRecord) -> Result<RecordResult> {
        self.write_record(record, &table::file_stem(&record.id))
    }

    fn write_record(&self, record: &FastaRecord, stem: &str) -> Result<RecordResult> {
        let result = self.evaluate(record)?;
        let raw_path = table::table_path(&self.config.outdir, stem, "raw");
        let final_path = table::table_path(&self.config.outdir, stem, "final");
        table::write_tsv(&mut table::raw_frame(&result.raw)?, &raw_path)?;
        table::write_tsv(&mut table::final_frame(&result.shortlist)?, &final_path)?;

        if result.shortlist.is_empty() {
            warn!("{}: no assay passed filtering ({} joined)", record.id, result.raw.len());
        } else {
            info!("{}: {} of {} assays passed filtering", record.id, result.shortlist.len(), result.raw.len());
        }
        Ok(result)
    }

    /// Process a stream of records, isolating per-record failures.
    ///
    /// Output stems are assigned in input order. A record whose id sanitizes
    /// to a stem already taken in this run gets the first free `<stem>_<n>`
    /// (n >= 2), so no record overwrites another's tables.
    pub fn run<I>(&self, records: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = anyhow::Result<FastaRecord>>,
    {
        std::fs::create_dir_all(&self.config.outdir)?;
        let seen = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let empty = AtomicUsize::new(0);

        let mut stems = HashSet::new();
        let named = records.into_iter().map(move |rec| {
            rec.map(|r| {
                let stem = claim_stem(&mut stems, &r.id);
                (r, stem)
            })
        });

        let handle = |rec: anyhow::Result<(FastaRecord, String)>| {
            seen.fetch_add(1, Ordering::Relaxed);
            let (rec, stem) = match rec {
                Ok(r) => r,
                Err(e) => {
                    error!("skipping unreadable record: {e:#}");
                    failed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };
            match self.write_record(&rec, &stem) {
                Ok(r) if r.shortlist.is_empty() => {
                    empty.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) => {}
                Err(e) => {
                    error!("{}: {e}", rec.id);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        if self.config.threads == 1 {
            named.for_each(handle);
        } else {
            let n = if self.config.threads == 0 { num_cpus::get() } else { self.config.threads }.max(1);
            let pool = ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| PipelineError::config("threads", e.to_string()))?;
            let buffered: Vec<_> = named.collect();
            pool.install(|| buffered.into_par_iter().for_each(handle));
        }

        Ok(RunSummary {
            records: seen.into_inner(),
            failed: failed.into_inner(),
            no_candidates: empty.into_inner(),
        })
    }
}

/// Reserve an output stem for `record_id`, suffixing `_2`, `_3`, ... on collision.
fn claim_stem(used: &mut HashSet<String>, record_id: &str) -> String {
    let base = table::file_stem(record_id);
    if used.insert(base.clone()) {
        return base;
    }
    let stem = (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|c| !used.contains(c))
        .unwrap_or_else(|| base.clone());
    warn!("{record_id}: output name '{base}' already used in this run; writing '{stem}' instead");
    used.insert(stem.clone());
    stem
}
