//! Restriction-site screening.
//!
//! Exact recognition sites are located with a single Aho–Corasick automaton
//! over the whole panel; degenerate sites (`N` wildcards) are compiled to
//! regular expressions. Sites that are not their own reverse complement are
//! searched on both strands.
//!
//! # Examples
//! ```
//! use primersieve::restriction::RestrictionPanel;
//! let panel = RestrictionPanel::default_panel();
//! assert_eq!(panel.scan("AACATGAA"), vec!["CviAII", "FatI", "NlaIII"]);
//! assert!(panel.scan("TCAAAA").is_empty());
//! ```

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, AhoCorasickKind, MatchKind};
use bio::alphabets::dna;
use regex::Regex;

use crate::data::enzymes::{RestrictionEnzyme, RESTRICTION_ENZYMES};
use crate::error::{PipelineError, Result};

/// Prebuilt matchers for an enzyme panel; immutable and shareable across threads.
pub struct RestrictionPanel {
    enzymes: Vec<RestrictionEnzyme>,
    /// Exact patterns, each mapped back to its enzyme index.
    ac: AhoCorasick,
    ac_owner: Vec<usize>,
    /// Degenerate patterns as `(enzyme index, regex)`.
    patterns: Vec<(usize, Regex)>,
}

impl RestrictionPanel {
    /// Build matchers for `enzymes`.
    pub fn new(enzymes: &[RestrictionEnzyme]) -> Result<Self> {
        let mut exact: Vec<String> = Vec::new();
        let mut ac_owner = Vec::new();
        let mut patterns = Vec::new();

        for (i, e) in enzymes.iter().enumerate() {
            let site = e.site.to_ascii_uppercase();
            if site.is_empty() || !site.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
                return Err(PipelineError::config(e.name, format!("invalid recognition site '{}'", e.site)));
            }
            let rc = String::from_utf8(dna::revcomp(site.as_bytes()))
                .map_err(|err| PipelineError::config(e.name, err.to_string()))?;
            let mut strands = vec![site.clone()];
            if rc != site {
                strands.push(rc);
            }
            for s in strands {
                if e.is_degenerate() {
                    let re = Regex::new(&s.replace('N', "[ACGTN]"))
                        .map_err(|err| PipelineError::config(e.name, err.to_string()))?;
                    patterns.push((i, re));
                } else {
                    exact.push(s);
                    ac_owner.push(i);
                }
            }
        }

        let ac = AhoCorasickBuilder::new()
            .kind(Some(AhoCorasickKind::DFA))
            .match_kind(MatchKind::Standard)
            .build(&exact)
            .map_err(|err| PipelineError::config("restriction_panel", err.to_string()))?;

        Ok(Self { enzymes: enzymes.to_vec(), ac, ac_owner, patterns })
    }

    /// Matchers for [`RESTRICTION_ENZYMES`].
    pub fn default_panel() -> Self {
        // The built-in table only holds valid ACGTN sites.
        Self::new(RESTRICTION_ENZYMES).unwrap_or_else(|e| panic!("built-in enzyme panel: {e}"))
    }

    /// Enzymes in panel order; [`RestrictionPanel::scan`] reports hits in this order.
    pub fn enzymes(&self) -> &[RestrictionEnzyme] {
        &self.enzymes
    }

    /// Names of the enzymes recognizing `seq`, in panel order.
    pub fn scan(&self, seq: &str) -> Vec<&'static str> {
        let seq = seq.to_ascii_uppercase();
        let mut hit = vec![false; self.enzymes.len()];
        // Overlapping search so that e.g. CATG and GTAC sharing bases both report.
        for m in self.ac.find_overlapping_iter(seq.as_bytes()) {
            hit[self.ac_owner[m.pattern().as_usize()]] = true;
        }
        for (i, re) in &self.patterns {
            if !hit[*i] && re.is_match(&seq) {
                hit[*i] = true;
            }
        }
        self.enzymes
            .iter()
            .zip(hit)
            .filter(|(_, h)| *h)
            .map(|(e, _)| e.name)
            .collect()
    }

    /// `true` if any enzyme recognizes `seq`.
    pub fn any_hit(&self, seq: &str) -> bool {
        !self.scan(seq).is_empty()
    }
}
