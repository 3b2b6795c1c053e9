use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric type family of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    /// Signed 64-bit integers.
    I64,
    /// 64-bit floating point.
    F64,
}

/// Measured or aggregated value.
///
/// Integer measurements stay integers through aggregation; both families compare as reals on output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    I64(i64),
    F64(f64),
}

impl Number {
    /// Numeric family of this value.
    #[inline]
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::I64(_) => NumberKind::I64,
            Number::F64(_) => NumberKind::F64,
        }
    }

    /// Value as a real number.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::I64(v) => *v as f64,
            Number::F64(v) => *v,
        }
    }

    /// Returns `true` for `NaN` and infinities.
    #[inline]
    pub fn is_finite(&self) -> bool {
        match self {
            Number::I64(_) => true,
            Number::F64(v) => v.is_finite(),
        }
    }

    /// Returns `true` if the value is strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        match self {
            Number::I64(v) => *v < 0,
            Number::F64(v) => *v < 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(v) => write!(f, "{v}"),
            Number::F64(v) => write_float(f, *v),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::I64(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::F64(v)
    }
}

/// Writes a float the way the exposition format spells it.
pub(crate) fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v == f64::INFINITY {
        f.write_str("+Inf")
    } else if v == f64::NEG_INFINITY {
        f.write_str("-Inf")
    } else {
        write!(f, "{v}")
    }
}
