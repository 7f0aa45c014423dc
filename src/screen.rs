// Terminal rendering of the three pages.
//
// `Screen` keeps the last state pushed into every region and turns it into
// text on demand. Chart slots exist only for the page they were built for;
// drawing into any other slot fails with `RenderError::MissingTarget`.
use crate::cases::{CaseSummary, PriorityTableRow};
use crate::charts::{ChartHandle, ChartKind, ChartSlot, ChartSpec, ChartSurface};
use crate::custom::{AnalysisInfo, Insight};
use crate::error::RenderError;
use crate::output::markdown_table;
use crate::problems;
use crate::upload::{PreviewCard, Progress, UploadState};
use crate::util::plain_number;
use crate::view::{
    Banner, BannerKind, ButtonState, CustomView, DashboardView, MetricField, Page, ProblemsPanel,
    UploadView,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Instant;
use tabled::Tabled;
use tracing::debug;

const BAR_WIDTH: usize = 30;
const PROGRESS_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Dashboard,
    Upload,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartRegion {
    Chart { handle: ChartHandle, spec: ChartSpec },
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CasesRegion {
    #[default]
    Pending,
    Ready {
        summary: Vec<CaseSummary>,
        table: Vec<PriorityTableRow>,
    },
    Error {
        list: String,
        table: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadArea {
    #[default]
    Empty,
    FileInfo { name: String, size: String },
}

#[derive(Tabled, Clone)]
struct MetricRow {
    #[tabled(rename = "Indicador")]
    label: &'static str,
    #[tabled(rename = "Valor")]
    value: String,
}

#[derive(Tabled, Clone)]
struct CardRow {
    #[tabled(rename = "Métrica")]
    title: &'static str,
    #[tabled(rename = "Valor")]
    value: String,
    #[tabled(rename = "Detalle")]
    note: String,
}

#[derive(Debug)]
pub struct Screen {
    pub page: PageKind,
    targets: BTreeSet<ChartSlot>,
    charts: BTreeMap<ChartSlot, ChartRegion>,
    next_handle: u64,
    pub destroyed_charts: usize,
    metrics: BTreeMap<MetricField, String>,
    banners: Vec<(Banner, Instant)>,
    pub loading: bool,
    pub chart_loading: BTreeSet<ChartSlot>,
    pub filters_active: bool,
    pub cases: CasesRegion,
    pub problems: Option<ProblemsPanel>,
    pub upload_area: UploadArea,
    pub upload_states: Vec<UploadState>,
    pub progress: Option<Progress>,
    pub progress_history: Vec<Progress>,
    pub preview: Option<Vec<PreviewCard>>,
    pub report_button: Option<ButtonState>,
    pub report_button_history: Vec<ButtonState>,
    pub analysis_info: Option<AnalysisInfo>,
    pub quality_bars: Option<(f64, f64)>,
    pub insights: Vec<Insight>,
    pub fatal_error: Option<String>,
    echo: bool,
}

impl Screen {
    fn for_page(page: PageKind, targets: &[ChartSlot]) -> Self {
        Self {
            page,
            targets: targets.iter().copied().collect(),
            charts: BTreeMap::new(),
            next_handle: 0,
            destroyed_charts: 0,
            metrics: BTreeMap::new(),
            banners: Vec::new(),
            loading: false,
            chart_loading: BTreeSet::new(),
            filters_active: false,
            cases: CasesRegion::default(),
            problems: None,
            upload_area: UploadArea::default(),
            upload_states: Vec::new(),
            progress: None,
            progress_history: Vec::new(),
            preview: None,
            report_button: None,
            report_button_history: Vec::new(),
            analysis_info: None,
            quality_bars: None,
            insights: Vec::new(),
            fatal_error: None,
            echo: false,
        }
    }

    pub fn dashboard() -> Self {
        Self::for_page(PageKind::Dashboard, &ChartSlot::DASHBOARD)
    }

    pub fn upload() -> Self {
        Self::for_page(PageKind::Upload, &[])
    }

    pub fn custom() -> Self {
        Self::for_page(PageKind::Custom, &[ChartSlot::Category, ChartSlot::Priority])
    }

    /// Print banners and progress to stderr as they arrive.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn metric(&self, field: MetricField) -> Option<&str> {
        self.metrics.get(&field).map(String::as_str)
    }

    pub fn chart(&self, slot: ChartSlot) -> Option<&ChartRegion> {
        self.charts.get(&slot)
    }

    pub fn live_chart_count(&self) -> usize {
        self.charts
            .values()
            .filter(|c| matches!(c, ChartRegion::Chart { .. }))
            .count()
    }

    /// Every banner shown so far, oldest first.
    pub fn banners(&self) -> Vec<Banner> {
        self.banners.iter().map(|(b, _)| b.clone()).collect()
    }

    /// Banners whose time to live has not elapsed yet.
    pub fn active_banners(&self) -> Vec<&Banner> {
        self.banners
            .iter()
            .filter(|(b, shown)| shown.elapsed() < b.ttl)
            .map(|(b, _)| b)
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for banner in self.active_banners() {
            let _ = writeln!(out, "{}", banner_line(banner));
        }
        if let Some(message) = &self.fatal_error {
            let _ = writeln!(out, "⚠ {}", message);
            return out;
        }
        match self.page {
            PageKind::Dashboard => self.render_dashboard(&mut out),
            PageKind::Upload => self.render_upload(&mut out),
            PageKind::Custom => self.render_custom(&mut out),
        }
        out
    }

    fn render_metrics(&self, out: &mut String, fields: &[MetricField]) {
        let rows: Vec<MetricRow> = fields
            .iter()
            .filter_map(|f| {
                self.metric(*f).map(|v| MetricRow {
                    label: f.label(),
                    value: v.to_string(),
                })
            })
            .collect();
        if !rows.is_empty() {
            let _ = writeln!(out, "{}\n", markdown_table(&rows, rows.len()));
        }
    }

    fn render_charts(&self, out: &mut String) {
        for slot in &self.targets {
            let _ = writeln!(out, "{}", slot.title());
            if self.chart_loading.contains(slot) {
                let _ = writeln!(out, "  (cargando...)\n");
                continue;
            }
            match self.charts.get(slot) {
                Some(ChartRegion::Chart { spec, .. }) => {
                    let _ = writeln!(out, "{}", chart_text(spec));
                }
                Some(ChartRegion::Placeholder(message)) => {
                    let _ = writeln!(out, "  {}\n", message);
                }
                None => {
                    let _ = writeln!(out, "  -\n");
                }
            }
        }
    }

    fn render_dashboard(&self, out: &mut String) {
        let _ = writeln!(out, "Orion · Dashboard");
        if self.loading {
            let _ = writeln!(out, "(actualizando...)");
        }
        if self.filters_active {
            let _ = writeln!(out, "Filtros activos");
        }
        let _ = writeln!(out);
        self.render_metrics(out, &MetricField::DASHBOARD);
        self.render_charts(out);

        let _ = writeln!(out, "Casos Prioritarios");
        match &self.cases {
            CasesRegion::Pending => {
                let _ = writeln!(out, "  -");
            }
            CasesRegion::Ready { summary, table } => {
                if summary.is_empty() {
                    let _ = writeln!(out, "  No hay casos prioritarios");
                } else {
                    for case in summary {
                        let _ = writeln!(out, "  {}", summary_line(case));
                    }
                    let _ = writeln!(out, "\n{}", markdown_table(table, table.len()));
                }
            }
            CasesRegion::Error { list, table } => {
                let _ = writeln!(out, "  {}", list);
                let _ = writeln!(out, "  {}", table);
            }
        }

        match &self.problems {
            None => {}
            Some(ProblemsPanel::Analyzing) => {
                let _ = writeln!(out, "\nAnalizando problemas...");
            }
            Some(ProblemsPanel::Report(report)) => {
                let _ = writeln!(out, "\n{}", problems::render(report));
            }
            Some(ProblemsPanel::Error(message)) => {
                let _ = writeln!(out, "\n{}", message);
            }
        }
    }

    fn render_upload(&self, out: &mut String) {
        let _ = writeln!(out, "Orion · Análisis Personalizado\n");
        match &self.upload_area {
            UploadArea::Empty => {
                let _ = writeln!(out, "Arrastra tu dataset aquí");
                let _ = writeln!(out, "Formatos soportados: CSV, Excel (.xlsx, .xls)");
            }
            UploadArea::FileInfo { name, size } => {
                let _ = writeln!(out, "Archivo Seleccionado");
                let _ = writeln!(out, "{}", name);
                let _ = writeln!(out, "Tamaño: {}", size);
            }
        }
        if let Some(p) = &self.progress {
            let _ = writeln!(out, "\n{}", progress_line(p));
        }
        if let Some(cards) = &self.preview {
            let rows: Vec<CardRow> = cards
                .iter()
                .map(|c| CardRow {
                    title: c.title,
                    value: c.value.clone(),
                    note: c.note.clone().unwrap_or_default(),
                })
                .collect();
            let _ = writeln!(out, "\nVista Previa del Análisis");
            let _ = writeln!(out, "{}", markdown_table(&rows, rows.len()));
        }
        if self.report_button == Some(ButtonState::Busy) {
            let _ = writeln!(out, "\nGenerando...");
        }
    }

    fn render_custom(&self, out: &mut String) {
        let _ = writeln!(out, "Orion · Dashboard Personalizado\n");
        if let Some(info) = &self.analysis_info {
            let _ = writeln!(out, "ID: {}  |  Fecha: {}", info.id, info.date);
            let _ = writeln!(
                out,
                "Registros: {}  |  Categorías: {}  |  Precisión IA: {}%\n",
                info.total_records, info.categories, info.ai_accuracy
            );
        }
        self.render_metrics(out, &MetricField::CUSTOM);
        if let Some((quality, completeness)) = self.quality_bars {
            let _ = writeln!(out, "Calidad      {}", percent_bar(quality));
            let _ = writeln!(out, "Completitud  {}\n", percent_bar(completeness));
        }
        self.render_charts(out);
        let _ = writeln!(out, "Insights");
        if self.insights.is_empty() {
            let _ = writeln!(out, "  No hay insights disponibles para este análisis");
        } else {
            for insight in &self.insights {
                let _ = writeln!(out, "  {}", insight);
            }
        }
    }

    fn echo_line(&self, line: &str) {
        if self.echo {
            let mut err = std::io::stderr();
            let _ = writeln!(err, "{}", line);
        }
    }
}

fn banner_line(banner: &Banner) -> String {
    match banner.kind {
        BannerKind::Success => format!("[OK] {}", banner.message),
        BannerKind::Error => format!("[ERROR] {}", banner.message),
    }
}

fn summary_line(case: &CaseSummary) -> String {
    let mark = if case.urgent { " ⚠" } else { "" };
    format!(
        "#{} {} | {} | {} [{}]{}",
        case.id,
        case.city,
        case.category,
        case.score,
        case.class.as_str(),
        mark
    )
}

fn progress_line(p: &Progress) -> String {
    let filled = usize::from(p.percent) * PROGRESS_WIDTH / 100;
    format!(
        "[{}{}] {}% {}",
        "#".repeat(filled),
        ".".repeat(PROGRESS_WIDTH - filled),
        p.percent,
        p.stage
    )
}

fn percent_bar(value: f64) -> String {
    let clamped = value.clamp(0.0, 100.0);
    let filled = (clamped / 100.0 * BAR_WIDTH as f64).round() as usize;
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        plain_number(value)
    )
}

fn chart_text(spec: &ChartSpec) -> String {
    let mut out = String::new();
    if let Some(label) = &spec.label {
        let _ = writeln!(out, "  {}", label);
    }
    let max = spec.points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let total: f64 = spec.points.iter().map(|p| p.value).sum();
    let width = spec.points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    for p in &spec.points {
        let filled = if max > 0.0 {
            (p.value / max * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let share = match spec.kind {
            ChartKind::Doughnut if total > 0.0 => {
                format!(" ({}%)", plain_number((p.value / total * 1000.0).round() / 10.0))
            }
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {:<width$} {} {}{}",
            p.label,
            "█".repeat(filled),
            plain_number(p.value),
            share,
            width = width
        );
    }
    out
}

impl Page for Screen {
    fn show_banner(&mut self, banner: Banner) {
        self.echo_line(&banner_line(&banner));
        self.banners.push((banner, Instant::now()));
    }

    fn set_metric(&mut self, field: MetricField, text: String) {
        self.metrics.insert(field, text);
    }
}

impl ChartSurface for Screen {
    fn create_chart(&mut self, spec: ChartSpec) -> Result<ChartHandle, RenderError> {
        if !self.targets.contains(&spec.slot) {
            return Err(RenderError::MissingTarget(spec.slot));
        }
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.charts
            .insert(spec.slot, ChartRegion::Chart { handle, spec });
        Ok(handle)
    }

    fn destroy_chart(&mut self, handle: ChartHandle) {
        let slot = self.charts.iter().find_map(|(slot, region)| match region {
            ChartRegion::Chart { handle: h, .. } if *h == handle => Some(*slot),
            _ => None,
        });
        if let Some(slot) = slot {
            self.charts.remove(&slot);
            self.destroyed_charts += 1;
        }
    }

    fn show_chart_placeholder(&mut self, slot: ChartSlot, message: &str) {
        if !self.targets.contains(&slot) {
            debug!(%slot, "no target for placeholder");
            return;
        }
        self.charts
            .insert(slot, ChartRegion::Placeholder(message.to_string()));
    }
}

impl DashboardView for Screen {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_chart_loading(&mut self, slot: ChartSlot, loading: bool) {
        if loading {
            self.chart_loading.insert(slot);
        } else {
            self.chart_loading.remove(&slot);
        }
    }

    fn set_filter_indicator(&mut self, active: bool) {
        self.filters_active = active;
    }

    fn show_cases(&mut self, summary: Vec<CaseSummary>, table: Vec<PriorityTableRow>) {
        self.cases = CasesRegion::Ready { summary, table };
    }

    fn show_cases_error(&mut self, list_message: &str, table_message: &str) {
        self.cases = CasesRegion::Error {
            list: list_message.to_string(),
            table: table_message.to_string(),
        };
    }

    fn show_problems(&mut self, panel: ProblemsPanel) {
        self.problems = Some(panel);
    }
}

impl UploadView for Screen {
    fn set_upload_state(&mut self, state: UploadState) {
        self.upload_states.push(state);
    }

    fn show_file_info(&mut self, name: &str, size: &str) {
        self.upload_area = UploadArea::FileInfo {
            name: name.to_string(),
            size: size.to_string(),
        };
    }

    fn set_progress(&mut self, progress: Option<Progress>) {
        if let Some(p) = progress {
            self.echo_line(&progress_line(&p));
            self.progress_history.push(p);
        }
        self.progress = progress;
    }

    fn show_preview(&mut self, cards: Vec<PreviewCard>) {
        self.preview = Some(cards);
    }

    fn hide_preview(&mut self) {
        self.preview = None;
    }

    fn set_report_button(&mut self, state: ButtonState) {
        self.report_button = Some(state);
        self.report_button_history.push(state);
    }

    fn reset_upload_area(&mut self) {
        self.upload_area = UploadArea::Empty;
    }
}

impl CustomView for Screen {
    fn show_fatal_error(&mut self, message: &str) {
        self.fatal_error = Some(message.to_string());
    }

    fn set_analysis_info(&mut self, info: AnalysisInfo) {
        self.analysis_info = Some(info);
    }

    fn set_quality_bars(&mut self, quality: f64, completeness: f64) {
        self.quality_bars = Some((quality, completeness));
    }

    fn show_insights(&mut self, insights: &[Insight]) {
        self.insights = insights.to_vec();
    }
}
