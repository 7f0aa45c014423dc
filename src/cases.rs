// Priority case presentation: badge classification, the short summary list
// and the full table.
use crate::types::PriorityCase;
use crate::util::{plain_number, truthy};
use serde::Serialize;
use tabled::Tabled;

/// Entries shown in the summary list; the table shows everything.
pub const SUMMARY_LIMIT: usize = 10;

const URGENT_LABEL: &str = "Urgente";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityClass {
    High,
    Medium,
    Low,
}

impl PriorityClass {
    /// `[80, ∞)` high, `[60, 80)` medium, everything else low.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PriorityClass::High
        } else if score >= 60.0 {
            PriorityClass::Medium
        } else {
            PriorityClass::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityClass::High => "high",
            PriorityClass::Medium => "medium",
            PriorityClass::Low => "low",
        }
    }
}

/// One line of the summary list.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSummary {
    pub id: String,
    pub city: String,
    pub category: String,
    pub score: String,
    pub class: PriorityClass,
    pub urgent: bool,
}

/// Display row of the full table. Cells carry the badges shown on screen.
#[derive(Debug, Tabled, Clone, PartialEq)]
pub struct PriorityTableRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Ciudad")]
    pub city: String,
    #[tabled(rename = "Categoría")]
    pub category: String,
    #[tabled(rename = "Urgencia")]
    pub urgency: String,
    #[tabled(rename = "Prioridad")]
    pub priority: String,
    #[tabled(rename = "Zona")]
    pub zone: String,
    #[tabled(rename = "Internet")]
    pub internet: String,
}

/// One CSV line of the priority-case export: raw values, no badges.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CaseExportRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Ciudad")]
    pub city: String,
    #[serde(rename = "Categoría")]
    pub category: String,
    #[serde(rename = "Urgencia")]
    pub urgency: String,
    #[serde(rename = "Prioridad")]
    pub priority: f64,
    #[serde(rename = "Clase")]
    pub class: &'static str,
    #[serde(rename = "Rural")]
    pub rural: bool,
    #[serde(rename = "Internet")]
    pub internet: bool,
}

fn is_urgent(case: &PriorityCase) -> bool {
    case.urgency == URGENT_LABEL
}

fn score_text(case: &PriorityCase) -> String {
    format!("{}/100", plain_number(case.priority))
}

pub fn summarize(cases: &[PriorityCase]) -> Vec<CaseSummary> {
    cases
        .iter()
        .take(SUMMARY_LIMIT)
        .map(|c| CaseSummary {
            id: c.id.clone(),
            city: c.city.clone(),
            category: c.category.clone(),
            score: score_text(c),
            class: PriorityClass::from_score(c.priority),
            urgent: is_urgent(c),
        })
        .collect()
}

pub fn table_rows(cases: &[PriorityCase]) -> Vec<PriorityTableRow> {
    cases
        .iter()
        .map(|c| {
            let class = PriorityClass::from_score(c.priority);
            let urgency_mark = if is_urgent(c) { "⚠" } else { "✓" };
            let (zone_mark, zone) = if truthy(&c.rural) {
                ("📍", "Rural")
            } else {
                ("🏙", "Urbana")
            };
            let internet = if truthy(&c.internet) { "📶 Sí" } else { "✗ No" };
            PriorityTableRow {
                id: c.id.clone(),
                city: c.city.clone(),
                category: c.category.clone(),
                urgency: format!("{} {}", urgency_mark, c.urgency),
                priority: format!("{} [{}]", score_text(c), class.as_str()),
                zone: format!("{} {}", zone_mark, zone),
                internet: internet.to_string(),
            }
        })
        .collect()
}

/// Rows for the CSV export, in server order.
pub fn export_rows(cases: &[PriorityCase]) -> Vec<CaseExportRow> {
    cases
        .iter()
        .map(|c| CaseExportRow {
            id: c.id.clone(),
            city: c.city.clone(),
            category: c.category.clone(),
            urgency: c.urgency.clone(),
            priority: c.priority,
            class: PriorityClass::from_score(c.priority).as_str(),
            // The server sends these flags as 0/1, "1" or booleans.
            rural: truthy(&c.rural),
            internet: truthy(&c.internet),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case(id: u32, priority: f64) -> PriorityCase {
        PriorityCase {
            id: id.to_string(),
            city: "Bogotá".into(),
            category: "Salud".into(),
            urgency: if priority >= 80.0 { "Urgente".into() } else { "No urgente".into() },
            priority,
            rural: json!(1),
            internet: json!(0),
        }
    }

    #[test]
    fn classification_thresholds_are_inclusive_lower_bounds() {
        assert_eq!(PriorityClass::from_score(80.0), PriorityClass::High);
        assert_eq!(PriorityClass::from_score(79.0), PriorityClass::Medium);
        assert_eq!(PriorityClass::from_score(60.0), PriorityClass::Medium);
        assert_eq!(PriorityClass::from_score(59.0), PriorityClass::Low);
        assert_eq!(PriorityClass::High.as_str(), "high");
    }

    #[test]
    fn summary_keeps_first_ten_in_server_order() {
        let cases: Vec<_> = (0..15).map(|i| case(i, 100.0 - i as f64)).collect();
        let summary = summarize(&cases);
        assert_eq!(summary.len(), SUMMARY_LIMIT);
        assert_eq!(summary[0].id, "0");
        assert_eq!(summary[9].id, "9");
        assert!(summary[0].urgent);
        assert_eq!(summary[0].score, "100/100");
    }

    #[test]
    fn table_shows_every_case_with_flags() {
        let cases: Vec<_> = (0..15).map(|i| case(i, 50.0 + i as f64 * 3.0)).collect();
        let rows = table_rows(&cases);
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].priority, "50/100 [low]");
        assert!(rows[0].zone.ends_with("Rural"));
        assert!(rows[0].internet.ends_with("No"));
    }

    #[test]
    fn export_rows_keep_raw_values() {
        let rows = export_rows(&[case(7, 85.5), case(8, 40.0)]);
        assert_eq!(
            rows[0],
            CaseExportRow {
                id: "7".into(),
                city: "Bogotá".into(),
                category: "Salud".into(),
                urgency: "Urgente".into(),
                priority: 85.5,
                class: "high",
                rural: true,
                internet: false,
            }
        );
        assert_eq!(rows[1].class, "low");
        assert_eq!(rows[1].urgency, "No urgente");
    }
}
