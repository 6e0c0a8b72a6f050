//! Quantization ladder and its size/speed/quality tables.
//!
//! The six supported GGUF quantization levels form a fixed, ordered ladder.
//! Size, speed, and quality implications are held as immutable table data so
//! the estimators never re-derive them.
//!
//! | Quant | Bytes/param | Speed × | Quality penalty |
//! |-------|-------------|---------|-----------------|
//! | Q8_0  | 1.05        | 0.80    | 0               |
//! | Q6_K  | 0.80        | 0.95    | -1              |
//! | Q5_K_M| 0.68        | 1.00    | -2              |
//! | Q4_K_M| 0.58        | 1.15    | -5              |
//! | Q3_K  | 0.48        | 1.25    | -8              |
//! | Q2_K  | 0.37        | 1.35    | -12             |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A GGUF quantization level. `Ord` follows quality: `Q2_K` is the lowest,
/// `Q8_0` the highest.
#[allow(non_camel_case_types)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Quant {
    Q2_K,
    Q3_K,
    Q4_K_M,
    Q5_K_M,
    Q6_K,
    Q8_0,
}

impl Quant {
    /// The full ladder ordered best quality first. Candidate quant selection
    /// iterates this order.
    pub const LADDER: [Quant; 6] = [
        Quant::Q8_0,
        Quant::Q6_K,
        Quant::Q5_K_M,
        Quant::Q4_K_M,
        Quant::Q3_K,
        Quant::Q2_K,
    ];

    /// Approximate bytes per parameter at this quantization.
    pub fn bytes_per_param(&self) -> f64 {
        match self {
            Quant::Q8_0 => 1.05,
            Quant::Q6_K => 0.80,
            Quant::Q5_K_M => 0.68,
            Quant::Q4_K_M => 0.58,
            Quant::Q3_K => 0.48,
            Quant::Q2_K => 0.37,
        }
    }

    /// Throughput multiplier relative to Q5_K_M.
    pub fn speed_multiplier(&self) -> f64 {
        match self {
            Quant::Q8_0 => 0.8,
            Quant::Q6_K => 0.95,
            Quant::Q5_K_M => 1.0,
            Quant::Q4_K_M => 1.15,
            Quant::Q3_K => 1.25,
            Quant::Q2_K => 1.35,
        }
    }

    /// Quality-prior penalty applied by the scoring engine.
    pub fn quality_penalty(&self) -> f64 {
        match self {
            Quant::Q8_0 => 0.0,
            Quant::Q6_K => -1.0,
            Quant::Q5_K_M => -2.0,
            Quant::Q4_K_M => -5.0,
            Quant::Q3_K => -8.0,
            Quant::Q2_K => -12.0,
        }
    }

    /// All levels at or below this one in quality, best first. Used to
    /// extrapolate feasibility downward once any quant is known to exist.
    pub fn and_below(&self) -> Vec<Quant> {
        Quant::LADDER
            .iter()
            .copied()
            .filter(|q| q <= self)
            .collect()
    }

    /// Scan loose tag text (e.g. `7b-instruct-q4_K_M`) for a quant token.
    ///
    /// Matches are case-insensitive and tolerate bare prefixes (`q4` maps to
    /// `Q4_K_M`). The highest-quality match wins when several appear.
    pub fn from_tag_text(text: &str) -> Option<Quant> {
        let upper = text.to_uppercase();
        for quant in Quant::LADDER {
            if upper.contains(quant.as_str()) {
                return Some(quant);
            }
        }
        // Bare prefixes without the K-suffix
        for (needle, quant) in [
            ("Q8", Quant::Q8_0),
            ("Q6", Quant::Q6_K),
            ("Q5", Quant::Q5_K_M),
            ("Q4", Quant::Q4_K_M),
            ("Q3", Quant::Q3_K),
            ("Q2", Quant::Q2_K),
        ] {
            if upper.contains(needle) {
                return Some(quant);
            }
        }
        None
    }

    /// Canonical token for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quant::Q8_0 => "Q8_0",
            Quant::Q6_K => "Q6_K",
            Quant::Q5_K_M => "Q5_K_M",
            Quant::Q4_K_M => "Q4_K_M",
            Quant::Q3_K => "Q3_K",
            Quant::Q2_K => "Q2_K",
        }
    }
}

impl fmt::Display for Quant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quant {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "Q8_0" => Ok(Quant::Q8_0),
            "Q6_K" => Ok(Quant::Q6_K),
            "Q5_K_M" => Ok(Quant::Q5_K_M),
            "Q4_K_M" => Ok(Quant::Q4_K_M),
            "Q3_K" => Ok(Quant::Q3_K),
            "Q2_K" => Ok(Quant::Q2_K),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown quantization level: {}",
                other
            ))),
        }
    }
}
