//! Nearest-neighbour thermodynamics for oligo melting temperature and dimers.
//!
//! Uses the SantaLucia (1998) unified DNA/DNA stack parameters with the
//! SantaLucia entropy salt correction. Divalent cations are folded into a
//! monovalent-equivalent concentration (von Ahsen et al. 2001):
//! `[Na+]eq = [Mono] + 120 * sqrt([Mg2+] - [dNTP])`.
//!
//! Dimers are evaluated as the most stable ungapped antiparallel stretch of
//! consecutive Watson–Crick pairs between the two strands; mismatches and
//! loops terminate a stretch.
//!
//! # Examples
//! ```
//! use primersieve::thermo::{ThermoParams, melting_temp};
//! let p = ThermoParams::default();
//! let at = melting_temp("ATATATATATATATATATAT", &p);
//! let gc = melting_temp("GCGCGCGCGCGCGCGCGCGC", &p);
//! assert!(gc > at);
//! ```

use crate::error::{PipelineError, Result};

/// Gas constant, cal/(K·mol).
const R: f64 = 1.987;
const KELVIN: f64 = 273.15;

/// Stack parameters `(ΔH kcal/mol, ΔS cal/K/mol)` for a top-strand dinucleotide.
fn stack(a: u8, b: u8) -> Option<(f64, f64)> {
    let p = match (a, b) {
        (b'A', b'A') | (b'T', b'T') => (-7.9, -22.2),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        _ => return None,
    };
    Some(p)
}

/// Terminal initiation `(ΔH, ΔS)` for the base closing a duplex end.
fn initiation(base: u8) -> (f64, f64) {
    match base {
        b'G' | b'C' => (0.1, -2.8),
        _ => (2.3, 4.1),
    }
}

fn complement(b: u8) -> Option<u8> {
    match b {
        b'A' => Some(b'T'),
        b'T' => Some(b'A'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        _ => None,
    }
}

/// Reaction conditions for all thermodynamic calculations.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermoParams {
    /// Monovalent cation concentration, mM.
    pub mv_conc_mm: f64,
    /// Divalent cation concentration, mM.
    pub dv_conc_mm: f64,
    /// dNTP concentration, µM.
    pub dntp_conc_um: f64,
    /// Oligo (DNA) concentration, nM.
    pub dna_conc_nm: f64,
    /// Temperature at which free energies are reported, °C.
    pub temp_c: f64,
}

impl Default for ThermoParams {
    fn default() -> Self {
        Self { mv_conc_mm: 50.0, dv_conc_mm: 4.7, dntp_conc_um: 0.95, dna_conc_nm: 200.0, temp_c: 37.0 }
    }
}

impl ThermoParams {
    /// Monovalent salt and DNA concentrations must be positive, the others non-negative.
    pub fn validate(&self) -> Result<()> {
        if !(self.mv_conc_mm > 0.0) {
            return Err(PipelineError::config("mv_conc", "must be > 0 mM"));
        }
        if self.dv_conc_mm < 0.0 {
            return Err(PipelineError::config("dv_conc", "must be >= 0 mM"));
        }
        if self.dntp_conc_um < 0.0 {
            return Err(PipelineError::config("dntp_conc", "must be >= 0 uM"));
        }
        if !(self.dna_conc_nm > 0.0) {
            return Err(PipelineError::config("dna_conc", "must be > 0 nM"));
        }
        Ok(())
    }

    /// Monovalent-equivalent cation concentration, M.
    pub fn sodium_equivalent_m(&self) -> f64 {
        let free_mg = self.dv_conc_mm - self.dntp_conc_um / 1000.0;
        let eq_mm = if free_mg > 0.0 { self.mv_conc_mm + 120.0 * free_mg.sqrt() } else { self.mv_conc_mm };
        eq_mm / 1000.0
    }

    fn salt_entropy(&self, n_stacks: usize) -> f64 {
        0.368 * n_stacks as f64 * self.sodium_equivalent_m().ln()
    }
}

/// Result of a duplex evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuplexThermo {
    /// Free energy at [`ThermoParams::temp_c`], kcal/mol. `0.0` if no stable structure.
    pub dg_kcal: f64,
    /// Melting temperature of the structure, °C. `0.0` if no stable structure.
    pub tm_c: f64,
}

impl DuplexThermo {
    pub const NONE: DuplexThermo = DuplexThermo { dg_kcal: 0.0, tm_c: 0.0 };

    /// `false` for [`DuplexThermo::NONE`].
    pub fn found(&self) -> bool {
        self.dg_kcal < 0.0
    }
}

/// `(ΔH kcal/mol, ΔS cal/K/mol)` of a perfectly matched duplex over `top`, salt included.
fn duplex_enthalpy_entropy(top: &[u8], p: &ThermoParams) -> Option<(f64, f64)> {
    if top.len() < 2 {
        return None;
    }
    let (mut dh, mut ds) = (0.0, 0.0);
    let mut n_stacks = 0usize;
    for w in top.windows(2) {
        if let Some((h, s)) = stack(w[0], w[1]) {
            dh += h;
            ds += s;
            n_stacks += 1;
        }
    }
    if n_stacks == 0 {
        return None;
    }
    for end in [top[0], top[top.len() - 1]] {
        let (h, s) = initiation(end);
        dh += h;
        ds += s;
    }
    ds += p.salt_entropy(n_stacks);
    Some((dh, ds))
}

fn tm_from(dh: f64, ds: f64, strand_conc_m: f64) -> f64 {
    dh * 1000.0 / (ds + R * strand_conc_m.ln()) - KELVIN
}

/// Two-state melting temperature of `seq` against its perfect complement, °C.
///
/// Returns `0.0` for sequences shorter than two bases.
pub fn melting_temp(seq: &str, p: &ThermoParams) -> f64 {
    let top = seq.to_ascii_uppercase();
    match duplex_enthalpy_entropy(top.as_bytes(), p) {
        Some((dh, ds)) => tm_from(dh, ds, p.dna_conc_nm * 1e-9 / 4.0),
        None => 0.0,
    }
}

/// Most stable ungapped antiparallel duplex between `a` and `b` (both 5'→3').
fn best_duplex(a: &[u8], b: &[u8], p: &ThermoParams, strand_conc_m: f64) -> DuplexThermo {
    let t_k = p.temp_c + KELVIN;
    let rb: Vec<u8> = b.iter().rev().copied().collect();
    let (la, lb) = (a.len() as isize, rb.len() as isize);
    let mut best = DuplexThermo::NONE;

    let mut consider = |run: &[u8]| {
        if let Some((dh, ds)) = duplex_enthalpy_entropy(run, p) {
            let dg = dh - t_k * ds / 1000.0;
            if dg < best.dg_kcal {
                best = DuplexThermo { dg_kcal: dg, tm_c: tm_from(dh, ds, strand_conc_m).max(0.0) };
            }
        }
    };

    // a[i] sits opposite rb[i - shift].
    for shift in -(lb - 1)..la {
        let lo = shift.max(0);
        let hi = (lb + shift).min(la);
        let mut run_start: Option<isize> = None;
        for i in lo..=hi {
            let paired = i < hi && complement(a[i as usize]) == Some(rb[(i - shift) as usize]);
            match (paired, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    consider(&a[s as usize..i as usize]);
                    run_start = None;
                }
                _ => {}
            }
        }
    }
    best
}

/// Self-dimer of `seq` with a second copy of itself.
pub fn homodimer(seq: &str, p: &ThermoParams) -> DuplexThermo {
    let s = seq.to_ascii_uppercase();
    best_duplex(s.as_bytes(), s.as_bytes(), p, p.dna_conc_nm * 1e-9)
}

/// Cross-dimer between two different oligos.
pub fn heterodimer(a: &str, b: &str, p: &ThermoParams) -> DuplexThermo {
    let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
    best_duplex(a.as_bytes(), b.as_bytes(), p, p.dna_conc_nm * 1e-9 / 4.0)
}
