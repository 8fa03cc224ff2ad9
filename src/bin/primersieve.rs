use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use polars::prelude::*;

use primersieve::annotate::Annotator;
use primersieve::design::{DesignSettings, IncludedRegion, Primer3Cli};
use primersieve::pipeline::{Pipeline, PipelineConfig};
use primersieve::restriction::RestrictionPanel;
use primersieve::seqio::{NeedletailReader, SequenceReader};
use primersieve::thermo::ThermoParams;

/// primersieve CLI
#[derive(Parser)]
#[command(name = "primersieve")]
#[command(version)]
#[command(about = "qPCR primer/probe design, annotation and filtering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Design assays for every record of a FASTA file and write raw/final tables
    Design {
        /// Input FASTA (optionally gzipped)
        #[arg(long)]
        fasta: PathBuf,
        /// Start of the region amplicons must fall within (0-based)
        #[arg(long, requires = "included_region_length")]
        included_region_start: Option<usize>,
        /// Length of that region
        #[arg(long, requires = "included_region_start")]
        included_region_length: Option<usize>,
        /// Output directory
        #[arg(long, default_value = ".")]
        outdir: PathBuf,
        /// Number of assays requested from the design engine
        #[arg(long)]
        num_return: Option<u32>,
        /// Monovalent cation concentration (mM)
        #[arg(long)]
        mv_conc: Option<f64>,
        /// Divalent cation concentration (mM)
        #[arg(long)]
        dv_conc: Option<f64>,
        /// dNTP concentration (uM)
        #[arg(long)]
        dntp_conc: Option<f64>,
        /// DNA concentration (nM)
        #[arg(long)]
        dna_conc: Option<f64>,
        /// Temperature at which dimer free energies are reported (C)
        #[arg(long)]
        anneal_temp: Option<f64>,
        /// Cross-dimer melting temperatures must stay below this (C)
        #[arg(long, default_value_t = 51.0)]
        max_dimer_tm: f64,
        /// G/C count in the last five 3' bases must stay below this
        #[arg(long, default_value_t = 4)]
        max_terminal_gc: usize,
        /// Design-setting overrides (TOML)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// primer3_core executable
        #[arg(long, default_value = "primer3_core")]
        primer3: PathBuf,
        /// Records processed concurrently (0 = all cores)
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },

    /// Print metrics for one or more oligo sequences
    Annotate {
        /// Oligo sequences (5'->3')
        #[arg(required = true)]
        sequences: Vec<String>,
        /// Monovalent cation concentration (mM)
        #[arg(long)]
        mv_conc: Option<f64>,
        /// Divalent cation concentration (mM)
        #[arg(long)]
        dv_conc: Option<f64>,
        /// dNTP concentration (uM)
        #[arg(long)]
        dntp_conc: Option<f64>,
        /// DNA concentration (nM)
        #[arg(long)]
        dna_conc: Option<f64>,
        /// Temperature at which free energies are reported (C)
        #[arg(long)]
        anneal_temp: Option<f64>,
    },

    /// List the restriction-enzyme panel
    Enzymes,
}

struct ThermoOverrides {
    mv_conc: Option<f64>,
    dv_conc: Option<f64>,
    dntp_conc: Option<f64>,
    dna_conc: Option<f64>,
    anneal_temp: Option<f64>,
}

impl ThermoOverrides {
    fn apply(&self, p: &mut ThermoParams) {
        if let Some(v) = self.mv_conc { p.mv_conc_mm = v; }
        if let Some(v) = self.dv_conc { p.dv_conc_mm = v; }
        if let Some(v) = self.dntp_conc { p.dntp_conc_um = v; }
        if let Some(v) = self.dna_conc { p.dna_conc_nm = v; }
        if let Some(v) = self.anneal_temp { p.temp_c = v; }
    }

    /// Reaction conditions also constrain the engine's own Tm model.
    fn apply_design(&self, s: &mut DesignSettings) {
        if let Some(v) = self.mv_conc { s.salt_monovalent = v; }
        if let Some(v) = self.dv_conc { s.salt_divalent = v; }
        if let Some(v) = self.dntp_conc { s.dntp_conc = v / 1000.0; }
        if let Some(v) = self.dna_conc { s.dna_conc = v; }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Design {
            fasta,
            included_region_start,
            included_region_length,
            outdir,
            num_return,
            mv_conc,
            dv_conc,
            dntp_conc,
            dna_conc,
            anneal_temp,
            max_dimer_tm,
            max_terminal_gc,
            settings,
            primer3,
            threads,
        } => {
            let overrides = ThermoOverrides { mv_conc, dv_conc, dntp_conc, dna_conc, anneal_temp };

            let mut config = PipelineConfig::new(outdir);
            if let Some(path) = settings {
                config.settings = DesignSettings::from_toml_file(&path)
                    .with_context(|| format!("loading settings from {}", path.display()))?;
            }
            if let Some(n) = num_return {
                config.settings.num_return = n;
            }
            overrides.apply_design(&mut config.settings);
            overrides.apply(&mut config.thermo);
            config.thresholds.max_cross_dimer_tm_c = max_dimer_tm;
            config.thresholds.max_terminal_gc = max_terminal_gc;
            config.included_region = match (included_region_start, included_region_length) {
                (Some(start), Some(length)) => Some(IncludedRegion { start, length }),
                _ => None,
            };
            config.threads = threads;

            let engine = Primer3Cli::new(primer3);
            let pipeline = Pipeline::new(&engine, config)?;
            info!("primersieve {} | fasta={} | outdir={}", primersieve::VERSION, fasta.display(), pipeline.config().outdir.display());

            let records = NeedletailReader.records(&fasta)?;
            let summary = pipeline.run(records)?;
            info!(
                "processed {} record(s): {} failed, {} without candidates",
                summary.records, summary.failed, summary.no_candidates
            );
            if summary.failed > 0 {
                bail!("{} of {} record(s) failed", summary.failed, summary.records);
            }
        }

        Commands::Annotate { sequences, mv_conc, dv_conc, dntp_conc, dna_conc, anneal_temp } => {
            let mut params = ThermoParams::default();
            ThermoOverrides { mv_conc, dv_conc, dntp_conc, dna_conc, anneal_temp }.apply(&mut params);
            params.validate()?;
            let annotator = Annotator::new(params, RestrictionPanel::default_panel());
            let sequences: Vec<String> = sequences.iter().map(|s| s.to_ascii_uppercase()).collect();
            let df = primersieve::table::metrics_frame(&sequences, &annotator)?;
            print_frame(&df);
        }

        Commands::Enzymes => {
            let rows = primersieve::enzyme_rows();
            let df = df!(
                "enzyme" => rows.iter().map(|r| r.0.clone()).collect::<Vec<_>>(),
                "site"   => rows.iter().map(|r| r.1.clone()).collect::<Vec<_>>(),
            )?;
            print_frame(&df);
        }
    }

    Ok(())
}

fn print_frame(df: &DataFrame) {
    // Read by Polars' pretty-printer; show every row and column untruncated.
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    println!("{}", df);
}
