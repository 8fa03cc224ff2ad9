//! Restriction-enzyme recognition sites screened on every oligo.
//!
//! Sites are uppercase IUPAC strings; `N` matches any single base. Adding an
//! enzyme to the panel is a matter of appending a record to
//! [`RESTRICTION_ENZYMES`].
//!
//! Notes:
//! - CviAII, FatI and NlaIII are isoschizomers (`CATG`).
//! - CviQI and RsaI are isoschizomers (`GTAC`).
//! - Hpy188III carries a two-base wildcard (`TCNNGA`) and is matched as a pattern.

/// A named recognition sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RestrictionEnzyme {
    /// Enzyme name (e.g. `"NlaIII"`).
    pub name: &'static str,
    /// Recognition site, 5'→3', `N` = any base.
    pub site: &'static str,
}

impl RestrictionEnzyme {
    /// `true` if the site contains wildcard positions.
    pub fn is_degenerate(&self) -> bool {
        self.site.bytes().any(|b| b == b'N')
    }
}

/// The enzyme panel screened by default.
pub const RESTRICTION_ENZYMES: &[RestrictionEnzyme] = &[
    RestrictionEnzyme { name: "CviAII", site: "CATG" },
    RestrictionEnzyme { name: "FatI", site: "CATG" },
    RestrictionEnzyme { name: "Hpy188III", site: "TCNNGA" },
    RestrictionEnzyme { name: "NlaIII", site: "CATG" },
    RestrictionEnzyme { name: "CviQI", site: "GTAC" },
    RestrictionEnzyme { name: "RsaI", site: "GTAC" },
];
