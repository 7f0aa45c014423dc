// Typed update surface for each page. Controllers only talk to these traits;
// the terminal `Screen` implements all of them.
use crate::cases::{CaseSummary, PriorityTableRow};
use crate::charts::{ChartSlot, ChartSurface};
use crate::custom::{AnalysisInfo, Insight};
use crate::problems::ProblemsReport;
use crate::upload::{PreviewCard, Progress, UploadState};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// A transient message; it disappears once `ttl` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub ttl: Duration,
}

impl Banner {
    pub fn success(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            ttl,
        }
    }

    pub fn error(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            ttl,
        }
    }
}

/// Numeric fields shown as metric cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricField {
    TotalCasos,
    CasosUrgentes,
    PorcentajeUrgentes,
    ZonaRural,
    PorcentajeRural,
    SinInternet,
    PorcentajeSinInternet,
    AltaPrioridad,
    PorcentajeAltaPrioridad,
    CalidadDatos,
    Completitud,
    CasosPositivos,
    CasosNegativos,
}

impl MetricField {
    pub const DASHBOARD: [MetricField; 7] = [
        MetricField::TotalCasos,
        MetricField::CasosUrgentes,
        MetricField::PorcentajeUrgentes,
        MetricField::ZonaRural,
        MetricField::PorcentajeRural,
        MetricField::SinInternet,
        MetricField::PorcentajeSinInternet,
    ];

    pub const CUSTOM: [MetricField; 9] = [
        MetricField::TotalCasos,
        MetricField::CasosUrgentes,
        MetricField::PorcentajeUrgentes,
        MetricField::AltaPrioridad,
        MetricField::PorcentajeAltaPrioridad,
        MetricField::CalidadDatos,
        MetricField::Completitud,
        MetricField::CasosPositivos,
        MetricField::CasosNegativos,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricField::TotalCasos => "Total de casos",
            MetricField::CasosUrgentes => "Casos urgentes",
            MetricField::PorcentajeUrgentes => "% urgentes",
            MetricField::ZonaRural => "Zona rural",
            MetricField::PorcentajeRural => "% rural",
            MetricField::SinInternet => "Sin internet",
            MetricField::PorcentajeSinInternet => "% sin internet",
            MetricField::AltaPrioridad => "Alta prioridad",
            MetricField::PorcentajeAltaPrioridad => "% alta prioridad",
            MetricField::CalidadDatos => "Calidad de datos",
            MetricField::Completitud => "Completitud",
            MetricField::CasosPositivos => "Casos positivos",
            MetricField::CasosNegativos => "Casos negativos",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProblemsPanel {
    Analyzing,
    Report(ProblemsReport),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Ready,
    Busy,
}

/// Regions every page has.
pub trait Page {
    fn show_banner(&mut self, banner: Banner);
    fn set_metric(&mut self, field: MetricField, text: String);
}

pub trait DashboardView: Page + ChartSurface {
    fn set_loading(&mut self, loading: bool);
    fn set_chart_loading(&mut self, slot: ChartSlot, loading: bool);
    fn set_filter_indicator(&mut self, active: bool);
    fn show_cases(&mut self, summary: Vec<CaseSummary>, table: Vec<PriorityTableRow>);
    fn show_cases_error(&mut self, list_message: &str, table_message: &str);
    fn show_problems(&mut self, panel: ProblemsPanel);
}

pub trait UploadView: Page {
    /// Lifecycle step of the upload, pushed on every transition.
    fn set_upload_state(&mut self, state: UploadState);
    fn show_file_info(&mut self, name: &str, size: &str);
    fn set_progress(&mut self, progress: Option<Progress>);
    fn show_preview(&mut self, cards: Vec<PreviewCard>);
    fn hide_preview(&mut self);
    fn set_report_button(&mut self, state: ButtonState);
    fn reset_upload_area(&mut self);
}

pub trait CustomView: Page + ChartSurface {
    /// Persistent error that replaces the page content.
    fn show_fatal_error(&mut self, message: &str);
    fn set_analysis_info(&mut self, info: AnalysisInfo);
    fn set_quality_bars(&mut self, quality: f64, completeness: f64);
    fn show_insights(&mut self, insights: &[Insight]);
}
