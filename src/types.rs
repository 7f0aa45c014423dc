use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Aggregate metrics for the dashboard and for a custom analysis.
///
/// Every field is optional: the server omits what it did not compute and the
/// screen renders absence as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub total_casos: Option<f64>,
    pub casos_urgentes: Option<f64>,
    pub porcentaje_urgentes: Option<f64>,
    pub zona_rural: Option<f64>,
    pub porcentaje_rural: Option<f64>,
    pub sin_internet: Option<f64>,
    pub porcentaje_sin_internet: Option<f64>,
    pub calidad_datos: Option<f64>,
    pub completitud: Option<f64>,
    pub casos_positivos: Option<f64>,
    pub casos_negativos: Option<f64>,
    pub alta_prioridad: Option<f64>,
    pub media_prioridad: Option<f64>,
    pub baja_prioridad: Option<f64>,
    pub categorias_detectadas: Option<f64>,
    pub ai_accuracy: Option<f64>,
}

impl MetricsSnapshot {
    /// Share of high-priority cases, rounded; 0 when there are no cases.
    pub fn high_priority_percentage(&self) -> f64 {
        let total = self.total_casos.unwrap_or(0.0);
        let high = self.alta_prioridad.unwrap_or(0.0);
        if total <= 0.0 {
            return 0.0;
        }
        let pct = (high / total * 100.0).round();
        if pct.is_finite() {
            pct
        } else {
            0.0
        }
    }
}

/// One chart series. Temporal endpoints send `{months, counts}`, the others
/// `{labels, values}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDataset {
    #[serde(alias = "months")]
    pub labels: Vec<String>,
    #[serde(alias = "counts")]
    pub values: Vec<f64>,
}

impl ChartDataset {
    pub fn new<L: Into<String>>(pairs: impl IntoIterator<Item = (L, f64)>) -> Self {
        let (labels, values) = pairs.into_iter().map(|(l, v)| (l.into(), v)).unzip();
        Self { labels, values }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// A ranked case as returned by the priority endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityCase {
    #[serde(rename = "ID", default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "Ciudad", default)]
    pub city: String,
    #[serde(rename = "Categoría del problema", default)]
    pub category: String,
    #[serde(rename = "Nivel de urgencia", default)]
    pub urgency: String,
    #[serde(rename = "Prioridad", default)]
    pub priority: f64,
    #[serde(rename = "Zona rural", default)]
    pub rural: Value,
    #[serde(rename = "Acceso a internet", default)]
    pub internet: Value,
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyAnalysis {
    pub urgent_cases: Option<f64>,
    pub urgency_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentAnalysis {
    pub positive_cases: Option<f64>,
    pub negative_cases: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityAnalysis {
    pub high_priority: Option<f64>,
    pub medium_priority: Option<f64>,
    pub low_priority: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesAnalysis {
    pub total_categories: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataQuality {
    pub quality_score: Option<f64>,
    pub completeness: Option<f64>,
}

/// Result of uploading a dataset for a custom analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadedAnalysis {
    pub analysis_id: String,
    pub total_records: Option<f64>,
    pub ai_accuracy: Option<f64>,
    pub urgency_analysis: UrgencyAnalysis,
    pub sentiment_analysis: SentimentAnalysis,
    pub priority_analysis: PriorityAnalysis,
    pub categories_analysis: CategoriesAnalysis,
    pub data_quality: DataQuality,
}

/// Identifier of a generated report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportTicket {
    #[serde(deserialize_with = "id_string")]
    pub report_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metrics_tolerate_missing_and_null_fields() {
        let m: MetricsSnapshot =
            serde_json::from_value(json!({"total_casos": 10, "casos_urgentes": null})).unwrap();
        assert_eq!(m.total_casos, Some(10.0));
        assert_eq!(m.casos_urgentes, None);
        assert_eq!(m.porcentaje_rural, None);
    }

    #[test]
    fn high_priority_share_guards_zero_total() {
        let m = MetricsSnapshot {
            alta_prioridad: Some(5.0),
            ..Default::default()
        };
        assert_eq!(m.high_priority_percentage(), 0.0);
        let m = MetricsSnapshot {
            total_casos: Some(3.0),
            alta_prioridad: Some(1.0),
            ..Default::default()
        };
        assert_eq!(m.high_priority_percentage(), 33.0);
    }

    #[test]
    fn temporal_series_uses_months_and_counts() {
        let ds: ChartDataset =
            serde_json::from_value(json!({"months": ["2024-01", "2024-02"], "counts": [4, 9]}))
                .unwrap();
        assert_eq!(ds.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(ds.values, vec![4.0, 9.0]);
        assert_eq!(ds.total(), 13.0);
    }

    #[test]
    fn priority_case_accepts_numeric_id() {
        let c: PriorityCase = serde_json::from_value(json!({
            "ID": 42,
            "Ciudad": "Cali",
            "Categoría del problema": "Salud",
            "Nivel de urgencia": "Urgente",
            "Prioridad": 91,
            "Zona rural": 1,
            "Acceso a internet": 0
        }))
        .unwrap();
        assert_eq!(c.id, "42");
        assert_eq!(c.priority, 91.0);
    }

    #[test]
    fn uploaded_analysis_defaults_missing_sections() {
        let a: UploadedAnalysis =
            serde_json::from_value(json!({"analysis_id": "abc", "total_records": 120})).unwrap();
        assert_eq!(a.analysis_id, "abc");
        assert_eq!(a.urgency_analysis, UrgencyAnalysis::default());
        assert_eq!(a.data_quality.quality_score, None);
    }
}
