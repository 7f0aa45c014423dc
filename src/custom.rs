// Custom analysis page: metrics of one uploaded dataset, two charts, the
// derived insights and a local JSON download.
use crate::charts::{
    ChartKind, ChartRegistry, ChartSlot, SeriesStyle, CUSTOM_CATEGORY_PALETTE, PRIORITY_PALETTE,
};
use crate::config::ClientConfig;
use crate::error::{AppError, CustomAnalysisError};
use crate::filters::Query;
use crate::gateway::{custom_metrics_path, Gateway, Transport};
use crate::output;
use crate::types::{ChartDataset, MetricsSnapshot};
use crate::util::{format_count, format_number, format_percent, plain_number};
use crate::view::{Banner, CustomView, MetricField};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CATEGORY_NAMES: [&str; 6] = [
    "Salud",
    "Educación",
    "Seguridad",
    "Medio Ambiente",
    "Transporte",
    "Servicios Públicos",
];

// Share of the per-category average given to each synthetic bucket.
const BUCKET_WEIGHTS: [f64; 6] = [0.9, 0.75, 0.6, 0.45, 0.3, 0.15];

const LOADING_MARKER: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub enum Insight {
    HighUrgency { percent: f64 },
    LowUrgency { percent: f64 },
    MajorityHighPriority { high: f64 },
    PositiveSentiment { positive: f64, negative: f64 },
    NegativeSentiment { positive: f64, negative: f64 },
    ExcellentQuality { quality: f64 },
    ImprovableQuality { quality: f64 },
    LargeDataset { total: f64 },
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insight::HighUrgency { percent } => write!(
                f,
                "🚨 Alto nivel de urgencia detectado: {}% de casos requieren atención inmediata",
                plain_number(*percent)
            ),
            Insight::LowUrgency { percent } => write!(
                f,
                "✅ Bajo nivel de urgencia: Solo {}% de casos son urgentes",
                plain_number(*percent)
            ),
            Insight::MajorityHighPriority { high } => write!(
                f,
                "⭐ La mayoría de casos ({}) tienen alta prioridad",
                plain_number(*high)
            ),
            Insight::PositiveSentiment { positive, negative } => write!(
                f,
                "😊 Sentimiento predominantemente positivo: {} casos positivos vs {} negativos",
                plain_number(*positive),
                plain_number(*negative)
            ),
            Insight::NegativeSentiment { positive, negative } => write!(
                f,
                "😟 Sentimiento predominantemente negativo: {} casos negativos vs {} positivos",
                plain_number(*negative),
                plain_number(*positive)
            ),
            Insight::ExcellentQuality { quality } => write!(
                f,
                "🎯 Excelente calidad de datos: {}% de precisión",
                plain_number(*quality)
            ),
            Insight::ImprovableQuality { quality } => write!(
                f,
                "⚠️ Calidad de datos mejorable: {}% de precisión",
                plain_number(*quality)
            ),
            Insight::LargeDataset { total } => write!(
                f,
                "📊 Dataset extenso con {} registros: Análisis robusto disponible",
                format_number(*total)
            ),
        }
    }
}

/// Insights in fixed order: urgency, priority, sentiment, quality, size.
///
/// A rule whose inputs are missing from the snapshot does not fire.
pub fn generate_insights(m: &MetricsSnapshot) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(percent) = m.porcentaje_urgentes {
        if percent > 30.0 {
            insights.push(Insight::HighUrgency { percent });
        } else if percent < 10.0 {
            insights.push(Insight::LowUrgency { percent });
        }
    }

    // "Majority" is read as at least half: a strict majority would keep the
    // rule silent for 10 high out of 20, a split the dashboard is expected
    // to flag. Missing medium or low counts add nothing to the total.
    if let Some(high) = m.alta_prioridad {
        let total = high + m.media_prioridad.unwrap_or(0.0) + m.baja_prioridad.unwrap_or(0.0);
        if high > 0.0 && high >= total * 0.5 {
            insights.push(Insight::MajorityHighPriority { high });
        }
    }

    if let (Some(positive), Some(negative)) = (m.casos_positivos, m.casos_negativos) {
        if positive > negative {
            insights.push(Insight::PositiveSentiment { positive, negative });
        } else if negative > positive {
            insights.push(Insight::NegativeSentiment { positive, negative });
        }
    }

    if let Some(quality) = m.calidad_datos {
        if quality > 90.0 {
            insights.push(Insight::ExcellentQuality { quality });
        } else if quality < 70.0 {
            insights.push(Insight::ImprovableQuality { quality });
        }
    }

    if let Some(total) = m.total_casos {
        if total > 1000.0 {
            insights.push(Insight::LargeDataset { total });
        }
    }

    insights
}

/// Placeholder category distribution. The API does not return a real
/// breakdown for custom analyses, so buckets are derived from the category
/// count and the total. Not data.
pub fn synthetic_category_distribution(m: &MetricsSnapshot) -> ChartDataset {
    let categories = m.categorias_detectadas.unwrap_or(0.0).floor();
    let total = m.total_casos.unwrap_or(0.0);
    if categories < 1.0 || !categories.is_finite() {
        return ChartDataset::default();
    }
    let average = total / categories;
    let buckets = (categories as usize).min(CATEGORY_NAMES.len());
    ChartDataset::new(
        CATEGORY_NAMES
            .iter()
            .zip(BUCKET_WEIGHTS)
            .take(buckets)
            .map(|(name, weight)| (*name, (average * weight).floor().max(0.0) + 1.0)),
    )
}

pub fn priority_distribution(m: &MetricsSnapshot) -> ChartDataset {
    ChartDataset::new([
        ("Alta Prioridad", m.alta_prioridad.unwrap_or(0.0)),
        ("Media Prioridad", m.media_prioridad.unwrap_or(0.0)),
        ("Baja Prioridad", m.baja_prioridad.unwrap_or(0.0)),
    ])
}

/// Identifier from the last path segment of a location such as
/// `/dashboard/custom/abc123`. A bare identifier is accepted as is.
pub fn parse_analysis_id(location: &str) -> Option<String> {
    let path = location.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    path.trim()
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInfo {
    pub id: String,
    pub date: String,
    pub total_records: String,
    pub categories: String,
    pub ai_accuracy: String,
}

impl AnalysisInfo {
    pub fn new(id: &str, m: &MetricsSnapshot, date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            date: date.format("%-d/%-m/%Y").to_string(),
            total_records: format_count(m.total_casos),
            categories: plain_number(m.categorias_detectadas.unwrap_or(0.0)),
            ai_accuracy: plain_number(m.ai_accuracy.unwrap_or(0.0)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadedReport<'a> {
    analysis_id: &'a str,
    timestamp: String,
    metrics: &'a MetricsSnapshot,
}

pub fn report_file_name(analysis_id: &str) -> String {
    format!("orion_analysis_{}.json", analysis_id)
}

pub struct CustomAnalysisController<T, V> {
    gateway: Gateway<T>,
    view: V,
    charts: ChartRegistry,
    config: ClientConfig,
    analysis_id: Option<String>,
    metrics: Option<MetricsSnapshot>,
    insights: Vec<Insight>,
}

impl<T: Transport, V: CustomView> CustomAnalysisController<T, V> {
    pub fn new(gateway: Gateway<T>, view: V, config: ClientConfig) -> Self {
        Self {
            gateway,
            view,
            charts: ChartRegistry::new(),
            config,
            analysis_id: None,
            metrics: None,
            insights: Vec::new(),
        }
    }

    pub fn analysis_id(&self) -> Option<&str> {
        self.analysis_id.as_deref()
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// Load the analysis named by the last segment of `location`: metrics,
    /// info, charts and insights, in that order.
    pub async fn load(&mut self, location: &str) -> Result<(), CustomAnalysisError> {
        let Some(id) = parse_analysis_id(location) else {
            return Err(self.fatal(CustomAnalysisError::MissingId));
        };
        info!(analysis_id = %id, "loading custom analysis");
        self.analysis_id = Some(id.clone());
        for field in [
            MetricField::TotalCasos,
            MetricField::CasosUrgentes,
            MetricField::AltaPrioridad,
            MetricField::CalidadDatos,
        ] {
            self.view.set_metric(field, LOADING_MARKER.to_string());
        }

        let metrics = match self
            .gateway
            .get::<MetricsSnapshot>(&custom_metrics_path(&id), Query::new())
            .await
        {
            Ok(m) => m,
            Err(e) => return Err(self.fatal(CustomAnalysisError::Load(e))),
        };

        self.show_metrics(&metrics);
        self.view
            .set_analysis_info(AnalysisInfo::new(&id, &metrics, Utc::now().date_naive()));
        self.view.set_quality_bars(
            metrics.calidad_datos.unwrap_or(0.0),
            metrics.completitud.unwrap_or(0.0),
        );
        self.draw_charts(&metrics);

        let insights = generate_insights(&metrics);
        self.view.show_insights(&insights);
        info!(analysis_id = %id, insights = insights.len(), "custom analysis loaded");
        self.insights = insights;
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Save the loaded metrics as `orion_analysis_{id}.json` under `dir`.
    pub fn download_report(&mut self, dir: &Path) -> Result<PathBuf, AppError> {
        let (Some(id), Some(metrics)) = (self.analysis_id.as_deref(), self.metrics.as_ref()) else {
            return Err(CustomAnalysisError::NotLoaded.into());
        };
        let report = DownloadedReport {
            analysis_id: id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            metrics,
        };
        let path = dir.join(report_file_name(id));
        output::write_json(&path, &report)?;
        info!(path = %path.display(), "analysis report saved");
        self.view.show_banner(Banner::success(
            "Informe descargado exitosamente",
            self.config.success_banner_ttl,
        ));
        Ok(path)
    }

    fn fatal(&mut self, err: CustomAnalysisError) -> CustomAnalysisError {
        warn!(error = %err, "custom analysis unavailable");
        self.view.show_fatal_error(&err.to_string());
        err
    }

    fn draw_charts(&mut self, m: &MetricsSnapshot) {
        let category = SeriesStyle::new(ChartKind::Doughnut, CUSTOM_CATEGORY_PALETTE);
        if let Err(e) = self.charts.render(
            &mut self.view,
            ChartSlot::Category,
            &synthetic_category_distribution(m),
            &category,
        ) {
            warn!(error = %e, "category chart not drawn");
        }
        let priority =
            SeriesStyle::new(ChartKind::Bar, PRIORITY_PALETTE).labeled("Número de Casos");
        if let Err(e) = self.charts.render(
            &mut self.view,
            ChartSlot::Priority,
            &priority_distribution(m),
            &priority,
        ) {
            warn!(error = %e, "priority chart not drawn");
        }
    }

    fn show_metrics(&mut self, m: &MetricsSnapshot) {
        let v = &mut self.view;
        v.set_metric(MetricField::TotalCasos, format_count(m.total_casos));
        v.set_metric(MetricField::CasosUrgentes, format_count(m.casos_urgentes));
        v.set_metric(MetricField::PorcentajeUrgentes, format_percent(m.porcentaje_urgentes));
        v.set_metric(MetricField::AltaPrioridad, format_count(m.alta_prioridad));
        v.set_metric(
            MetricField::PorcentajeAltaPrioridad,
            format_percent(Some(m.high_priority_percentage())),
        );
        v.set_metric(MetricField::CalidadDatos, format_percent(m.calidad_datos));
        v.set_metric(MetricField::Completitud, format_percent(m.completitud));
        v.set_metric(MetricField::CasosPositivos, format_count(m.casos_positivos));
        v.set_metric(MetricField::CasosNegativos, format_count(m.casos_negativos));
    }
}
