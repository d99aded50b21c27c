//! Fixed-width administrative codes (DIVIPOLA style: 2-digit department +
//! 3-digit municipality).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::grid::Cell;
use crate::value::Value;

pub const DEPARTMENT_WIDTH: usize = 2;
pub const MUNICIPALITY_WIDTH: usize = 3;
/// Municipality slot of a department-level code.
pub const DEPARTMENT_SUFFIX: &str = "000";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeoCode {
    Valid(String),
    Invalid,
}

impl GeoCode {
    pub fn is_valid(&self) -> bool {
        matches!(self, GeoCode::Valid(_))
    }

    /// Invalid codes render as the empty string.
    pub fn as_str(&self) -> &str {
        match self {
            GeoCode::Valid(s) => s,
            GeoCode::Invalid => "",
        }
    }
}

impl fmt::Display for GeoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GeoCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// A value usable as one segment of a composite code. Only non-negative
/// integers qualify.
pub trait CodePart {
    fn code_digits(&self) -> Option<u64>;
}

impl CodePart for u64 {
    fn code_digits(&self) -> Option<u64> {
        Some(*self)
    }
}

impl CodePart for u32 {
    fn code_digits(&self) -> Option<u64> {
        Some(u64::from(*self))
    }
}

impl CodePart for i64 {
    fn code_digits(&self) -> Option<u64> {
        u64::try_from(*self).ok()
    }
}

impl CodePart for i32 {
    fn code_digits(&self) -> Option<u64> {
        u64::try_from(*self).ok()
    }
}

impl CodePart for f64 {
    fn code_digits(&self) -> Option<u64> {
        if self.is_finite() && *self >= 0.0 && self.fract() == 0.0 && *self < 1e18 {
            Some(*self as u64)
        } else {
            None
        }
    }
}

impl CodePart for str {
    fn code_digits(&self) -> Option<u64> {
        let t = self.trim();
        if t.is_empty() {
            return None;
        }
        t.parse::<u64>()
            .ok()
            .or_else(|| t.parse::<f64>().ok().and_then(|f| f.code_digits()))
    }
}

impl CodePart for String {
    fn code_digits(&self) -> Option<u64> {
        self.as_str().code_digits()
    }
}

impl CodePart for Cell {
    fn code_digits(&self) -> Option<u64> {
        match self {
            Cell::Number(n) => n.code_digits(),
            Cell::Text(s) => s.code_digits(),
            _ => None,
        }
    }
}

impl CodePart for Value {
    fn code_digits(&self) -> Option<u64> {
        match self {
            Value::Integer(n) => n.code_digits(),
            Value::Real(f) => f.code_digits(),
            Value::Text(s) => s.code_digits(),
            Value::Null => None,
        }
    }
}

impl<T: CodePart> CodePart for Option<T> {
    fn code_digits(&self) -> Option<u64> {
        self.as_ref().and_then(|v| v.code_digits())
    }
}

impl<T: CodePart + ?Sized> CodePart for &T {
    fn code_digits(&self) -> Option<u64> {
        (**self).code_digits()
    }
}

/// Concatenate zero-padded parts. Any part that is not a non-negative
/// integer, or that needs more digits than its width, invalidates the code.
pub fn compose(parts: &[(&dyn CodePart, usize)]) -> GeoCode {
    let mut out = String::new();
    for (part, width) in parts {
        let Some(n) = part.code_digits() else {
            return GeoCode::Invalid;
        };
        let digits = n.to_string();
        if digits.len() > *width {
            return GeoCode::Invalid;
        }
        out.push_str(&format!("{:0>w$}", digits, w = *width));
    }
    GeoCode::Valid(out)
}

pub fn municipality_code(department: &dyn CodePart, municipality: &dyn CodePart) -> GeoCode {
    compose(&[(department, DEPARTMENT_WIDTH), (municipality, MUNICIPALITY_WIDTH)])
}

pub fn department_code(department: &dyn CodePart) -> GeoCode {
    match compose(&[(department, DEPARTMENT_WIDTH)]) {
        GeoCode::Valid(d) => GeoCode::Valid(format!("{d}{DEPARTMENT_SUFFIX}")),
        GeoCode::Invalid => GeoCode::Invalid,
    }
}
