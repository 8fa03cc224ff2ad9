//! Result normalization: flat design output → one row per oligo.
//!
//! Engine keys follow `PRIMER_<ROLE>_<INDEX>[_<ATTRIBUTE>]` for oligo-level
//! data and `PRIMER_PAIR_<INDEX>_<ATTRIBUTE>` for pair-level data. The index
//! becomes the assay id. A row exists for every `(role, index)` that has a
//! `SEQUENCE` key; pair-level attributes are copied onto every row with the
//! same index. Keys without a numeric index are run-level summaries
//! (`PRIMER_LEFT_NUM_RETURNED`, `PRIMER_PAIR_EXPLAIN`) and are skipped.

use std::collections::BTreeMap;

use log::debug;

use crate::design::{DesignOutput, DesignValue};
use crate::error::{PipelineError, Result};
use crate::oligo::{OligoCandidate, Role};

#[derive(Default)]
struct PartialOligo {
    sequence: Option<String>,
    position: Option<(i64, i64)>,
    gc_percent: Option<f64>,
    engine_tm: Option<f64>,
}

enum Scope {
    Oligo(Role),
    Pair,
}

fn as_number(key: &str, v: &DesignValue) -> Result<f64> {
    match v {
        DesignValue::Number(n) => Ok(*n),
        other => Err(PipelineError::schema(key, format!("expected a number, found {other:?}"))),
    }
}

/// Convert the flat engine mapping into oligo rows ordered by `(index, role)`.
///
/// # Errors
/// [`PipelineError::Schema`] if a key does not follow the `PRIMER_` token
/// pattern, names an unknown role, or carries a value of the wrong shape.
pub fn normalize(output: &DesignOutput) -> Result<Vec<OligoCandidate>> {
    let mut oligos: BTreeMap<(u32, Role), PartialOligo> = BTreeMap::new();
    let mut product_sizes: BTreeMap<u32, i64> = BTreeMap::new();

    for (key, value) in output {
        let tokens: Vec<&str> = key.split('_').collect();
        if tokens.len() < 3 || tokens[0] != "PRIMER" {
            return Err(PipelineError::schema(key, "expected PRIMER_<ROLE>_<INDEX>[_<ATTRIBUTE>]"));
        }
        let scope = match tokens[1] {
            "PAIR" => Scope::Pair,
            t => match Role::from_engine_token(t) {
                Some(role) => Scope::Oligo(role),
                None => return Err(PipelineError::schema(key, format!("unknown role '{t}'"))),
            },
        };
        let Ok(index) = tokens[2].parse::<u32>() else {
            debug!("skipping run-level key {key}");
            continue;
        };
        let attribute = tokens[3..].join("_");

        match scope {
            Scope::Pair => {
                if attribute == "PRODUCT_SIZE" {
                    product_sizes.insert(index, as_number(key, value)? as i64);
                }
            }
            Scope::Oligo(role) => {
                let row = oligos.entry((index, role)).or_default();
                match attribute.as_str() {
                    "" => match value {
                        DesignValue::Interval(s, l) => row.position = Some((*s, *l)),
                        other => {
                            return Err(PipelineError::schema(key, format!("expected start,length, found {other:?}")))
                        }
                    },
                    "SEQUENCE" => match value {
                        DesignValue::Text(s) => row.sequence = Some(s.to_ascii_uppercase()),
                        other => return Err(PipelineError::schema(key, format!("expected a sequence, found {other:?}"))),
                    },
                    "GC_PERCENT" => row.gc_percent = Some(as_number(key, value)?),
                    "TM" => row.engine_tm = Some(as_number(key, value)?),
                    _ => {}
                }
            }
        }
    }

    let rows = oligos
        .into_iter()
        .filter_map(|((index, role), p)| {
            let sequence = p.sequence?;
            let (position_start, length) = p.position.unwrap_or((-1, sequence.len() as i64));
            Some(OligoCandidate {
                assay_id: index.to_string(),
                role,
                position_start,
                length: length.max(0) as usize,
                gc_percent: p.gc_percent,
                product_size: product_sizes.get(&index).copied(),
                engine_tm: p.engine_tm,
                sequence,
            })
        })
        .collect();
    Ok(rows)
}
