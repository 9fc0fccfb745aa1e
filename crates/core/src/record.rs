//! Expenditure records and the categorical dimensions they can carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::fiscal_year::FiscalYear;
use crate::program::ProgramCode;

/// A categorical breakdown the provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Expenditure-nature group (GND).
    Nature,
    /// Funding source (fonte de recursos).
    Source,
    /// Executing budget unit (unidade orçamentária).
    Unit,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Nature, Dimension::Source, Dimension::Unit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Nature => "expenditure nature",
            Self::Source => "funding source",
            Self::Unit => "executing unit",
        }
    }

    /// How many groups a breakdown keeps by default (`None` = all).
    pub fn default_limit(self) -> Option<usize> {
        match self {
            Self::Nature => None,
            Self::Source | Self::Unit => Some(10),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nature" | "gnd" => Ok(Self::Nature),
            "source" | "fonte" => Ok(Self::Source),
            "unit" | "uo" => Ok(Self::Unit),
            other => Err(format!(
                "unknown dimension '{other}' (expected nature, source or unit)"
            )),
        }
    }
}

/// Which categorical breakdowns a provider call requests.
///
/// All flags off means program-level totals only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DetailLevel {
    #[serde(default)]
    pub nature: bool,
    #[serde(default)]
    pub source: bool,
    #[serde(default)]
    pub unit: bool,
}

impl DetailLevel {
    pub const NONE: DetailLevel = DetailLevel {
        nature: false,
        source: false,
        unit: false,
    };

    pub const FULL: DetailLevel = DetailLevel {
        nature: true,
        source: true,
        unit: true,
    };

    pub fn with(mut self, dimension: Dimension) -> Self {
        match dimension {
            Dimension::Nature => self.nature = true,
            Dimension::Source => self.source = true,
            Dimension::Unit => self.unit = true,
        }
        self
    }

    pub fn includes(self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Nature => self.nature,
            Dimension::Source => self.source,
            Dimension::Unit => self.unit,
        }
    }

    pub fn dimensions(self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.includes(*d))
            .collect()
    }

    /// Dimensions present in both levels.
    pub fn intersect(self, other: DetailLevel) -> DetailLevel {
        DetailLevel {
            nature: self.nature && other.nature,
            source: self.source && other.source,
            unit: self.unit && other.unit,
        }
    }

    pub fn is_program_total(self) -> bool {
        self == Self::NONE
    }
}

impl FromIterator<Dimension> for DetailLevel {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, DetailLevel::with)
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_program_total() {
            return f.write_str("program total");
        }
        let names: Vec<&str> = self
            .dimensions()
            .into_iter()
            .map(|d| match d {
                Dimension::Nature => "nature",
                Dimension::Source => "source",
                Dimension::Unit => "unit",
            })
            .collect();
        f.write_str(&names.join("+"))
    }
}

/// A code/description pair for one dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// One row of budget execution for a (year, program) slice.
///
/// Amounts are non-negative and share one currency (BRL). A record with no
/// category set is a program-level total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenditureRecord {
    pub year: FiscalYear,
    pub program: ProgramCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature: Option<Category>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Category>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Category>,

    /// Updated appropriation (initial budget law plus credits).
    #[serde(rename = "loa_mais_credito", default)]
    pub updated_appropriation: f64,

    #[serde(rename = "empenhado", default)]
    pub committed: f64,

    #[serde(rename = "liquidado", default)]
    pub settled: f64,

    #[serde(rename = "pago", default)]
    pub paid: f64,
}

impl ExpenditureRecord {
    /// A zero-valued program-level row; fill it with the `with_*` builders.
    pub fn new(year: FiscalYear, program: impl Into<ProgramCode>) -> Self {
        Self {
            year,
            program: program.into(),
            program_description: None,
            nature: None,
            source: None,
            unit: None,
            updated_appropriation: 0.0,
            committed: 0.0,
            settled: 0.0,
            paid: 0.0,
        }
    }

    pub fn with_category(mut self, dimension: Dimension, category: Category) -> Self {
        match dimension {
            Dimension::Nature => self.nature = Some(category),
            Dimension::Source => self.source = Some(category),
            Dimension::Unit => self.unit = Some(category),
        }
        self
    }

    pub fn with_amounts(mut self, updated_appropriation: f64, committed: f64, settled: f64, paid: f64) -> Self {
        self.updated_appropriation = updated_appropriation;
        self.committed = committed;
        self.settled = settled;
        self.paid = paid;
        self
    }

    pub fn category(&self, dimension: Dimension) -> Option<&Category> {
        match dimension {
            Dimension::Nature => self.nature.as_ref(),
            Dimension::Source => self.source.as_ref(),
            Dimension::Unit => self.unit.as_ref(),
        }
    }

    /// The level of detail this row actually carries.
    pub fn detail(&self) -> DetailLevel {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.category(*d).is_some())
            .collect()
    }
}

/// The rows returned for one (year, program, detail level) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub detail: DetailLevel,
    pub rows: Vec<ExpenditureRecord>,
}

impl Dataset {
    pub fn new(detail: DetailLevel, rows: Vec<ExpenditureRecord>) -> Self {
        Self { detail, rows }
    }

    /// "No data for this slice" at the given detail level.
    pub fn empty(detail: DetailLevel) -> Self {
        Self::new(detail, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
