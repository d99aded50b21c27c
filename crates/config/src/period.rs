// Reporting periods: Spanish month names, file-name detection, cutoff labels

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "MonthRepr")]
pub enum Month {
    Enero,
    Febrero,
    Marzo,
    Abril,
    Mayo,
    Junio,
    Julio,
    Agosto,
    Septiembre,
    Octubre,
    Noviembre,
    Diciembre,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Enero,
        Month::Febrero,
        Month::Marzo,
        Month::Abril,
        Month::Mayo,
        Month::Junio,
        Month::Julio,
        Month::Agosto,
        Month::Septiembre,
        Month::Octubre,
        Month::Noviembre,
        Month::Diciembre,
    ];

    /// Upper-case full name, as used in source file names.
    pub fn name(&self) -> &'static str {
        match self {
            Month::Enero => "ENERO",
            Month::Febrero => "FEBRERO",
            Month::Marzo => "MARZO",
            Month::Abril => "ABRIL",
            Month::Mayo => "MAYO",
            Month::Junio => "JUNIO",
            Month::Julio => "JULIO",
            Month::Agosto => "AGOSTO",
            Month::Septiembre => "SEPTIEMBRE",
            Month::Octubre => "OCTUBRE",
            Month::Noviembre => "NOVIEMBRE",
            Month::Diciembre => "DICIEMBRE",
        }
    }

    /// Three-letter abbreviation used in report file names.
    pub fn short(&self) -> &'static str {
        match self {
            Month::Enero => "Ene",
            Month::Febrero => "Feb",
            Month::Marzo => "Mar",
            Month::Abril => "Abr",
            Month::Mayo => "May",
            Month::Junio => "Jun",
            Month::Julio => "Jul",
            Month::Agosto => "Ago",
            Month::Septiembre => "Sep",
            Month::Octubre => "Oct",
            Month::Noviembre => "Nov",
            Month::Diciembre => "Dic",
        }
    }

    /// 1-based month number.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    /// "Septiembre"
    pub fn title(&self) -> String {
        let name = self.name();
        format!("{}{}", &name[..1], name[1..].to_lowercase())
    }

    pub fn from_number(n: u32) -> Option<Month> {
        Month::ALL.get((n as usize).checked_sub(1)?).copied()
    }

    /// Full name, abbreviation or number, case-insensitive.
    pub fn parse(s: &str) -> Option<Month> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Month::from_number(n);
        }
        let upper = s.to_uppercase();
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.name() == upper || m.short().to_uppercase() == upper)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::parse(s).ok_or_else(|| {
            let names: Vec<&str> = Month::ALL.iter().map(|m| m.name()).collect();
            ConfigError::Period(format!("invalid month '{s}', expected one of: {}", names.join(", ")))
        })
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MonthRepr {
    Number(u32),
    Name(String),
}

impl TryFrom<MonthRepr> for Month {
    type Error = ConfigError;

    fn try_from(repr: MonthRepr) -> Result<Self, Self::Error> {
        match repr {
            MonthRepr::Number(n) => Month::from_number(n)
                .ok_or_else(|| ConfigError::Period(format!("month number out of range: {n}"))),
            MonthRepr::Name(s) => s.parse(),
        }
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// First `20xx` in a file name, e.g. "Metas SENA 2025.xlsx".
pub fn year_from_file_name(name: &str) -> Result<i32, ConfigError> {
    let year_re = Regex::new(r"20\d{2}").map_err(|e| ConfigError::Period(e.to_string()))?;
    year_re
        .find(name)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(|| ConfigError::Period(format!("no year in '{name}'")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub month: Month,
    pub year: i32,
}

impl Period {
    pub fn new(month: Month, year: i32) -> Self {
        Self { month, year }
    }

    /// Month name and `20xx` year found anywhere in a file name, e.g.
    /// "PRIMER AVANCE EN APRENDICES SEPTIEMBRE 2025.xlsb". Months are tried
    /// in calendar order.
    pub fn from_file_name(name: &str) -> Result<Self, ConfigError> {
        let upper = name.trim().to_uppercase();
        let month = Month::ALL
            .iter()
            .copied()
            .find(|m| upper.contains(m.name()))
            .ok_or_else(|| ConfigError::Period(format!("no month name in '{name}'")))?;

        let year = year_from_file_name(name)?;
        Ok(Self { month, year })
    }

    pub fn last_day(&self) -> u32 {
        let next = if self.month == Month::Diciembre {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month.number() + 1, 1)
        };
        next.and_then(|d| d.pred_opt()).map(|d| d.day()).unwrap_or(31)
    }

    /// "30 de Septiembre 2025"
    pub fn cutoff_label(&self) -> String {
        format!("{} de {} {}", self.last_day(), self.month.title(), self.year)
    }

    /// "09-Septiembre", the monthly source folder.
    pub fn folder_name(&self) -> String {
        format!("{:02}-{}", self.month.number(), self.month.title())
    }

    /// "SENA Mensual Nacional Sep 2025", used for both file and sheet name.
    pub fn apprentices_report_name(&self) -> String {
        format!("SENA Mensual Nacional {} {}", self.month.short(), self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}
