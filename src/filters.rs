// Filter criteria for the dashboard and their local validation.
use crate::error::{DateField, ValidationError};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_YEAR: i32 = 2020;
pub const MAX_YEAR: i32 = 2025;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

/// Query parameters in the order the API expects them.
pub type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub categoria: Option<String>,
    pub urgencia: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

impl FilterCriteria {
    /// Build criteria from raw form values; blank strings count as unset.
    pub fn from_form(
        categoria: Option<String>,
        urgencia: Option<String>,
        fecha_inicio: Option<String>,
        fecha_fin: Option<String>,
    ) -> Self {
        Self {
            categoria: non_blank(categoria),
            urgencia: non_blank(urgencia),
            fecha_inicio: non_blank(fecha_inicio),
            fecha_fin: non_blank(fecha_fin),
        }
    }

    pub fn is_active(&self) -> bool {
        [&self.categoria, &self.urgencia, &self.fecha_inicio, &self.fecha_fin]
            .iter()
            .any(|f| f.as_deref().is_some_and(|s| !s.is_empty()))
    }

    /// Check the date fields. Stops at the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let start = self.fecha_inicio.as_deref().filter(|s| !s.is_empty());
        let end = self.fecha_fin.as_deref().filter(|s| !s.is_empty());
        if start.is_none() && end.is_none() {
            return Ok(());
        }

        let start = start.map(|s| parse_date(s, DateField::Start)).transpose()?;
        let end = end.map(|s| parse_date(s, DateField::End)).transpose()?;

        for (date, field) in [(start, DateField::Start), (end, DateField::End)] {
            if let Some(d) = date {
                let year = d.year();
                if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                    return Err(ValidationError::YearOutOfRange(field, year));
                }
            }
        }

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ValidationError::InvertedRange);
            }
        }
        Ok(())
    }

    /// Query pairs for the present fields only.
    pub fn query(&self) -> Query {
        let mut q = Query::new();
        let fields = [
            ("categoria", &self.categoria),
            ("urgencia", &self.urgencia),
            ("fecha_inicio", &self.fecha_inicio),
            ("fecha_fin", &self.fecha_fin),
        ];
        for (name, value) in fields {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                q.push((name, v.to_string()));
            }
        }
        q
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// Both the literal shape and a real calendar date are required.
fn parse_date(s: &str, field: DateField) -> Result<NaiveDate, ValidationError> {
    if !DATE_PATTERN.is_match(s) {
        return Err(ValidationError::BadFormat(field));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::BadFormat(field))
}
