//! FASTA input.
//!
//! ### Design
//! - Records are read through the [`SequenceReader`] trait so that tests (or
//!   other formats) can supply their own source.
//! - [`NeedletailReader`] parses FASTA / FASTA.GZ with `needletail`, one record
//!   at a time; the returned iterator is lazy and cannot be restarted.
//!
//! ### Errors
//! Parsing/IO errors are bubbled via `anyhow::Result` to the caller, per record.
//!
//! ### Example
//! ```no_run
//! use primersieve::seqio::{NeedletailReader, SequenceReader};
//! for rec in NeedletailReader.records("targets.fasta".as_ref()).unwrap() {
//!     let rec = rec.unwrap();
//!     println!("{} {}", rec.id, rec.seq.len());
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use needletail::{parse_fastx_file, FastxReader};

/// A normalized FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// First word of the header line.
    pub id: String,
    /// Uppercase bases.
    pub seq: String,
}

/// Lazy record stream.
pub type RecordIter = Box<dyn Iterator<Item = Result<FastaRecord>>>;

/// Source of target sequences.
pub trait SequenceReader {
    fn records(&self, path: &Path) -> Result<RecordIter>;
}

/// `needletail`-backed FASTA reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeedletailReader;

struct NeedletailIter {
    reader: Box<dyn FastxReader>,
}

impl Iterator for NeedletailIter {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.reader.next()?;
        Some(record.context("malformed FASTA record").map(|rec| {
            let header = String::from_utf8_lossy(rec.id()).to_string();
            let id = header.split_whitespace().next().unwrap_or_default().to_string();
            let seq = String::from_utf8_lossy(&rec.seq()).to_ascii_uppercase();
            FastaRecord { id, seq }
        }))
    }
}

impl SequenceReader for NeedletailReader {
    fn records(&self, path: &Path) -> Result<RecordIter> {
        let reader = parse_fastx_file(path).with_context(|| format!("cannot open FASTA {}", path.display()))?;
        Ok(Box::new(NeedletailIter { reader }))
    }
}
