#![forbid(unsafe_code)]
//! # primersieve
//!
//! Post-processing for **qPCR primer/probe designs**. A design engine
//! (Primer3) proposes forward primers, reverse primers and internal probes for
//! each FASTA target; this crate reshapes the engine's flat `PRIMER_*` output
//! into oligo rows, annotates each oligo, joins the three roles into assays and
//! filters them to a ranked shortlist.
//!
//! ## Pipeline
//! 1. [`design`]: call the engine ([`design::DesignEngine`], [`design::Primer3Cli`]).
//! 2. [`normalize`]: flat mapping → one [`oligo::OligoCandidate`] per oligo.
//! 3. [`annotate`]: Tm, homodimer ΔG/Tm, restriction sites, homopolymer runs, 3' GC.
//! 4. [`join`]: forward/reverse/probe → [`oligo::AssayCandidate`] with cross-dimers.
//! 5. [`filter`]: elimination rules and ranking.
//! 6. [`table`]: `<record>_raw.tsv` and `<record>_final.tsv`.
//!
//! [`pipeline::Pipeline`] drives the stages per FASTA record; one record's
//! failure never stops the others.
//!
//! ## Examples
//! ```rust
//! use primersieve::annotate::Annotator;
//! let m = Annotator::default().metrics("AGCATGTTAGGCTAACGTTA");
//! assert!(m.restriction_hit);
//! assert_eq!(m.terminal_gc_count, 2);
//! ```

pub mod annotate;
pub mod design;
pub mod error;
pub mod filter;
pub mod join;
pub mod normalize;
pub mod oligo;
pub mod pipeline;
pub mod restriction;
pub mod seqio;
pub mod table;
pub mod thermo;
pub mod data {
    pub mod enzymes;
}

pub use error::{PipelineError, Result};

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return `(name, site)` rows for the built-in restriction-enzyme panel.
pub fn enzyme_rows() -> Vec<(String, String)> {
    data::enzymes::RESTRICTION_ENZYMES
        .iter()
        .map(|e| (e.name.to_string(), e.site.to_string()))
        .collect()
}
