// Dashboard controller.
//
// One refresh cycle fetches the metrics snapshot first and, if that worked,
// the three chart series and the priority cases concurrently. Each of the
// concurrent branches fails on its own: a broken chart only replaces its own
// slot with a placeholder.
use crate::cases::{export_rows, summarize, table_rows};
use crate::charts::{
    ChartKind, ChartRegistry, ChartSlot, SeriesStyle, CATEGORY_PALETTE, TEMPORAL_PALETTE,
    URGENCY_PALETTE,
};
use crate::config::ClientConfig;
use crate::error::{AppError, GatewayError, ValidationError};
use crate::filters::{FilterCriteria, Query};
use crate::gateway::{self, Gateway, Transport};
use crate::output;
use crate::problems::ProblemsReport;
use crate::types::{ChartDataset, MetricsSnapshot, PriorityCase};
use crate::util::{format_count, format_number, format_percent};
use crate::view::{Banner, DashboardView, MetricField, ProblemsPanel};
use std::path::Path;
use tracing::{debug, info, warn};

const METRIC_ERROR_MARKER: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Idle,
    Loading,
    Ready,
    ApplyingFilter,
    Failed,
}

/// Endpoint set for one refresh cycle.
struct Endpoints {
    metrics: &'static str,
    category: &'static str,
    urgency: &'static str,
    temporal: &'static str,
    cases: &'static str,
}

const UNFILTERED: Endpoints = Endpoints {
    metrics: gateway::METRICS,
    category: gateway::CATEGORY_DISTRIBUTION,
    urgency: gateway::URGENCY_DISTRIBUTION,
    temporal: gateway::TEMPORAL_TRENDS,
    cases: gateway::PRIORITY_CASES,
};

const FILTERED: Endpoints = Endpoints {
    metrics: gateway::FILTERED_METRICS,
    category: gateway::FILTERED_CATEGORY_DISTRIBUTION,
    urgency: gateway::FILTERED_URGENCY_DISTRIBUTION,
    temporal: gateway::FILTERED_TEMPORAL_TRENDS,
    cases: gateway::FILTERED_PRIORITY_CASES,
};

pub struct DashboardController<T, V> {
    gateway: Gateway<T>,
    view: V,
    charts: ChartRegistry,
    criteria: FilterCriteria,
    state: DashboardState,
    metrics: Option<MetricsSnapshot>,
    cases: Vec<PriorityCase>,
    config: ClientConfig,
}

impl<T: Transport, V: DashboardView> DashboardController<T, V> {
    pub fn new(gateway: Gateway<T>, view: V, config: ClientConfig) -> Self {
        Self {
            gateway,
            view,
            charts: ChartRegistry::new(),
            criteria: FilterCriteria::default(),
            state: DashboardState::Idle,
            metrics: None,
            cases: Vec::new(),
            config,
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()
    }

    pub fn cases(&self) -> &[PriorityCase] {
        &self.cases
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

    /// Unfiltered load of every region.
    pub async fn load_initial(&mut self) -> DashboardState {
        info!("loading dashboard");
        self.state = DashboardState::Loading;
        self.view.set_loading(true);
        match self.refresh_cycle(false).await {
            Ok(()) => {
                self.state = DashboardState::Ready;
                info!(cases = self.cases.len(), "dashboard ready");
            }
            Err(e) => {
                self.state = DashboardState::Failed;
                warn!(error = %e, "dashboard load failed");
                self.view.show_banner(Banner::error(
                    "Error cargando datos del dashboard",
                    self.config.error_banner_ttl,
                ));
            }
        }
        self.view.set_loading(false);
        self.state
    }

    /// Validate `criteria` and reload every region through the filtered
    /// endpoints. Invalid criteria leave the dashboard untouched.
    pub async fn apply_filters(
        &mut self,
        criteria: FilterCriteria,
    ) -> Result<DashboardState, ValidationError> {
        if let Err(e) = criteria.validate() {
            info!(error = %e, "filters rejected");
            self.view
                .show_banner(Banner::error(e.to_string(), self.config.error_banner_ttl));
            return Err(e);
        }
        info!(?criteria, "applying filters");
        self.criteria = criteria;
        self.state = DashboardState::ApplyingFilter;
        self.view.set_loading(true);
        match self.refresh_cycle(true).await {
            Ok(()) => {
                self.state = DashboardState::Ready;
                self.view.set_filter_indicator(self.criteria.is_active());
            }
            Err(e) => {
                self.state = DashboardState::Failed;
                warn!(error = %e, "filtered load failed");
                self.view.show_banner(Banner::error(
                    "Error aplicando filtros",
                    self.config.error_banner_ttl,
                ));
            }
        }
        self.view.set_loading(false);
        Ok(self.state)
    }

    pub async fn clear_filters(&mut self) -> DashboardState {
        debug!("clearing filters");
        self.criteria = FilterCriteria::default();
        self.view.set_filter_indicator(false);
        self.load_initial().await
    }

    /// Reload with the current criteria and confirm with a success banner.
    pub async fn refresh(&mut self) -> DashboardState {
        let state = if self.criteria.is_active() {
            let criteria = self.criteria.clone();
            match self.apply_filters(criteria).await {
                Ok(state) => state,
                Err(_) => self.state,
            }
        } else {
            self.load_initial().await
        };
        if state == DashboardState::Ready {
            self.view.show_banner(Banner::success(
                "Dashboard actualizado correctamente",
                self.config.success_banner_ttl,
            ));
        }
        state
    }

    pub async fn analyze_problems(&mut self) -> Option<ProblemsReport> {
        info!("analyzing dashboard problems");
        self.view.show_problems(ProblemsPanel::Analyzing);
        match self
            .gateway
            .get::<ProblemsReport>(gateway::DASHBOARD_PROBLEMS, Query::new())
            .await
        {
            Ok(report) => {
                info!(total = report.total_problems, "problems analysis complete");
                self.view.show_problems(ProblemsPanel::Report(report.clone()));
                Some(report)
            }
            Err(e) => {
                self.view.show_problems(ProblemsPanel::Error(format!(
                    "Error analizando problemas: {}",
                    e
                )));
                None
            }
        }
    }

    /// Write the cases of the last successful load to `path` as CSV.
    ///
    /// Cells hold raw values (numeric score, boolean flags) so the file
    /// can be re-read by other tools; the on-screen badges stay on screen.
    pub fn export_cases(&self, path: &Path) -> Result<usize, AppError> {
        let rows = export_rows(&self.cases);
        output::write_csv(path, &rows)?;
        info!(path = %path.display(), rows = rows.len(), "priority cases exported");
        Ok(rows.len())
    }

    /// One load of every region, shared by the initial load, filtering and
    /// refresh.
    ///
    /// - Metrics come first. If they fail every metric card reads `Error`
    ///   and the cycle stops; that is the only error returned.
    /// - The three charts and the cases are then fetched together. Each one
    ///   fails on its own: a chart falls back to its placeholder, the cases
    ///   region shows its error text, and the rest of the page still renders.
    /// - While filtered, the charts show a loading marker until their data is in.
    async fn refresh_cycle(&mut self, filtered: bool) -> Result<(), GatewayError> {
        let endpoints = if filtered { &FILTERED } else { &UNFILTERED };
        let query = if filtered {
            self.criteria.query()
        } else {
            Query::new()
        };

        let metrics = match self
            .gateway
            .get::<MetricsSnapshot>(endpoints.metrics, query.clone())
            .await
        {
            Ok(m) => m,
            Err(e) => {
                for field in MetricField::DASHBOARD {
                    self.view.set_metric(field, METRIC_ERROR_MARKER.to_string());
                }
                return Err(e);
            }
        };
        self.show_metrics(&metrics);
        self.metrics = Some(metrics);

        if filtered {
            for slot in ChartSlot::DASHBOARD {
                self.view.set_chart_loading(slot, true);
            }
        }

        // Only the case endpoints take `limit`; charts always cover everything.
        let mut case_query = query.clone();
        case_query.push(("limit", self.config.priority_limit.to_string()));
        // Borrow the gateway alone so the view stays free while the requests run.
        let gw = &self.gateway;
        let (category, urgency, temporal, cases) = tokio::join!(
            gw.get::<ChartDataset>(endpoints.category, query.clone()),
            gw.get::<ChartDataset>(endpoints.urgency, query.clone()),
            gw.get::<ChartDataset>(endpoints.temporal, query),
            gw.get::<Vec<PriorityCase>>(endpoints.cases, case_query),
        );

        self.draw_chart(
            ChartSlot::Category,
            category,
            SeriesStyle::new(ChartKind::Doughnut, CATEGORY_PALETTE),
        );
        let style = SeriesStyle::new(ChartKind::Bar, URGENCY_PALETTE);
        let style = match &urgency {
            Ok(ds) => style.labeled(format!("Total: {} casos", format_number(ds.total()))),
            Err(_) => style,
        };
        self.draw_chart(ChartSlot::Urgency, urgency, style);
        let temporal_label = if filtered {
            "Reportes por Mes (Filtrados)"
        } else {
            "Reportes por Mes"
        };
        self.draw_chart(
            ChartSlot::Temporal,
            temporal,
            SeriesStyle::new(ChartKind::Bar, TEMPORAL_PALETTE).labeled(temporal_label),
        );

        // A failed fetch also forgets the previous cases, so an export never
        // writes rows the screen no longer shows.
        match cases {
            Ok(cases) => {
                self.view.show_cases(summarize(&cases), table_rows(&cases));
                self.cases = cases;
            }
            Err(e) => {
                warn!(error = %e, "priority cases unavailable");
                self.cases.clear();
                if filtered {
                    self.view.show_cases_error(
                        "Error cargando casos prioritarios filtrados",
                        "Error cargando datos filtrados",
                    );
                } else {
                    self.view
                        .show_cases_error("Error cargando casos prioritarios", "Error cargando datos");
                }
            }
        }

        if filtered {
            for slot in ChartSlot::DASHBOARD {
                self.view.set_chart_loading(slot, false);
            }
        }
        Ok(())
    }

    /// Draw one fetched dataset, or its placeholder when the fetch failed.
    fn draw_chart(
        &mut self,
        slot: ChartSlot,
        fetched: Result<ChartDataset, GatewayError>,
        style: SeriesStyle,
    ) {
        match fetched {
            Ok(dataset) => {
                if let Err(e) = self.charts.render(&mut self.view, slot, &dataset, &style) {
                    warn!(%slot, error = %e, "chart not drawn");
                }
            }
            Err(e) => self.charts.fail(&mut self.view, slot, &e.to_string()),
        }
    }

    // Absent fields read as `0` / `0%` rather than leaving the card blank.
    fn show_metrics(&mut self, m: &MetricsSnapshot) {
        let v = &mut self.view;
        v.set_metric(MetricField::TotalCasos, format_count(m.total_casos));
        v.set_metric(MetricField::CasosUrgentes, format_count(m.casos_urgentes));
        v.set_metric(MetricField::PorcentajeUrgentes, format_percent(m.porcentaje_urgentes));
        v.set_metric(MetricField::ZonaRural, format_count(m.zona_rural));
        v.set_metric(MetricField::PorcentajeRural, format_percent(m.porcentaje_rural));
        v.set_metric(MetricField::SinInternet, format_count(m.sin_internet));
        v.set_metric(
            MetricField::PorcentajeSinInternet,
            format_percent(m.porcentaje_sin_internet),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartSlot;
    use crate::gateway::ApiRequest;
    use crate::screen::{CasesRegion, ChartRegion, Screen};
    use crate::testing::{sample_cases, FakeTransport};
    use crate::view::BannerKind;
    use serde_json::json;

    fn controller(fake: FakeTransport) -> DashboardController<FakeTransport, Screen> {
        DashboardController::new(Gateway::new(fake), Screen::dashboard(), ClientConfig::default())
    }

    #[tokio::test]
    async fn initial_load_fills_every_region() {
        let mut dash = controller(FakeTransport::dashboard());
        assert_eq!(dash.load_initial().await, DashboardState::Ready);

        let screen = dash.view();
        assert_eq!(screen.metric(MetricField::TotalCasos), Some("1,200"));
        assert_eq!(screen.metric(MetricField::PorcentajeUrgentes), Some("30.5%"));
        for slot in ChartSlot::DASHBOARD {
            assert!(matches!(screen.chart(slot), Some(ChartRegion::Chart { .. })));
        }
        assert_eq!(dash.charts().live_count(), 3);
        match &screen.cases {
            CasesRegion::Ready { summary, table } => {
                assert_eq!(summary.len(), 10);
                assert_eq!(table.len(), 12);
            }
            other => panic!("unexpected cases region: {other:?}"),
        }
        assert!(!screen.loading);
    }

    #[tokio::test]
    async fn urgency_chart_label_carries_total() {
        let mut dash = controller(FakeTransport::dashboard());
        dash.load_initial().await;
        match dash.view().chart(ChartSlot::Urgency) {
            Some(ChartRegion::Chart { spec, .. }) => {
                assert_eq!(spec.label.as_deref(), Some("Total: 1,200 casos"));
            }
            other => panic!("urgency chart missing: {other:?}"),
        }
    }

    #[tokio::test]
    async fn one_failing_chart_does_not_block_the_others() {
        let fake = FakeTransport::dashboard().with_status(gateway::CATEGORY_DISTRIBUTION, 500);
        let mut dash = controller(fake);
        assert_eq!(dash.load_initial().await, DashboardState::Ready);

        let screen = dash.view();
        assert_eq!(
            screen.chart(ChartSlot::Category),
            Some(&ChartRegion::Placeholder(
                "Error cargando gráfico de categorías".to_string()
            ))
        );
        assert!(matches!(screen.chart(ChartSlot::Urgency), Some(ChartRegion::Chart { .. })));
        assert!(matches!(screen.chart(ChartSlot::Temporal), Some(ChartRegion::Chart { .. })));
        assert!(matches!(screen.cases, CasesRegion::Ready { .. }));
        assert_eq!(dash.charts().live_count(), 2);
    }

    #[tokio::test]
    async fn empty_series_becomes_placeholder() {
        let fake = FakeTransport::dashboard()
            .with_data(gateway::TEMPORAL_TRENDS, json!({"months": [], "counts": []}));
        let mut dash = controller(fake);
        dash.load_initial().await;
        assert_eq!(
            dash.view().chart(ChartSlot::Temporal),
            Some(&ChartRegion::Placeholder("Error cargando gráfico temporal".to_string()))
        );
    }

    #[tokio::test]
    async fn metrics_failure_marks_fields_and_skips_the_rest() {
        let fake = FakeTransport::dashboard().with_status(gateway::METRICS, 500);
        let mut dash = controller(fake);
        assert_eq!(dash.load_initial().await, DashboardState::Failed);

        for field in MetricField::DASHBOARD {
            assert_eq!(dash.view().metric(field), Some("Error"));
        }
        assert_eq!(dash.gateway().transport().requested_paths(), vec![gateway::METRICS]);
        let banner = dash.view().banners().last().cloned().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Error cargando datos del dashboard");
    }

    #[tokio::test]
    async fn missing_metric_fields_render_as_zero() {
        let fake = FakeTransport::dashboard().with_data(gateway::METRICS, json!({}));
        let mut dash = controller(fake);
        dash.load_initial().await;
        assert_eq!(dash.view().metric(MetricField::TotalCasos), Some("0"));
        assert_eq!(dash.view().metric(MetricField::PorcentajeRural), Some("0%"));
    }

    #[tokio::test]
    async fn invalid_filters_never_reach_the_network() {
        let mut dash = controller(FakeTransport::dashboard());
        dash.load_initial().await;
        let before = dash.gateway().transport().requests().len();

        let bad = FilterCriteria::from_form(None, None, Some("2021-01-01".into()), Some("2020-01-01".into()));
        assert_eq!(dash.apply_filters(bad).await, Err(ValidationError::InvertedRange));

        assert_eq!(dash.gateway().transport().requests().len(), before);
        assert_eq!(dash.state(), DashboardState::Ready);
        assert!(dash.criteria().fecha_inicio.is_none());
        assert_eq!(
            dash.view().banners().last().map(|b| b.message.as_str()),
            Some("La fecha de inicio debe ser anterior a la fecha de fin")
        );
    }

    #[tokio::test]
    async fn filters_use_filtered_endpoints_and_light_the_indicator() {
        let mut dash = controller(FakeTransport::dashboard());
        dash.load_initial().await;
        let criteria = FilterCriteria::from_form(Some("Salud".into()), None, None, None);
        assert_eq!(dash.apply_filters(criteria).await, Ok(DashboardState::Ready));

        assert!(dash.view().filters_active);
        let requests = dash.gateway().transport().requests();
        let cases_request = requests
            .iter()
            .find(|r| r.path() == gateway::FILTERED_PRIORITY_CASES)
            .cloned()
            .unwrap();
        assert_eq!(
            cases_request,
            ApiRequest::Get {
                path: gateway::FILTERED_PRIORITY_CASES.into(),
                query: vec![("categoria", "Salud".into()), ("limit", "20".into())],
            }
        );
        assert!(dash.view().chart_loading.is_empty());
        match dash.view().chart(ChartSlot::Temporal) {
            Some(ChartRegion::Chart { spec, .. }) => {
                assert_eq!(spec.label.as_deref(), Some("Reportes por Mes (Filtrados)"))
            }
            other => panic!("temporal chart missing: {other:?}"),
        }
    }

    #[tokio::test]
    async fn filtered_case_failure_uses_filtered_messages() {
        let fake = FakeTransport::dashboard().with_status(gateway::FILTERED_PRIORITY_CASES, 400);
        let mut dash = controller(fake);
        let criteria = FilterCriteria::from_form(None, Some("Urgente".into()), None, None);
        dash.apply_filters(criteria).await.unwrap();
        assert_eq!(
            dash.view().cases,
            CasesRegion::Error {
                list: "Error cargando casos prioritarios filtrados".into(),
                table: "Error cargando datos filtrados".into(),
            }
        );
    }

    #[tokio::test]
    async fn filtered_metrics_failure_marks_every_field() {
        let fake = FakeTransport::dashboard().with_status(gateway::FILTERED_METRICS, 500);
        let mut dash = controller(fake);
        dash.load_initial().await;
        assert!(!dash.view().filters_active);

        let criteria = FilterCriteria::from_form(Some("Salud".into()), None, None, None);
        assert_eq!(dash.apply_filters(criteria).await, Ok(DashboardState::Failed));

        let screen = dash.view();
        for field in MetricField::DASHBOARD {
            assert_eq!(screen.metric(field), Some("Error"), "{field:?}");
        }
        let banner = screen.banners().last().cloned().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Error aplicando filtros");
        assert!(!screen.filters_active);
        assert!(screen.chart_loading.is_empty());
        assert!(!screen.loading);
        // The cycle stops at the metrics; no filtered chart or case request follows.
        let paths = dash.gateway().transport().requested_paths();
        assert_eq!(
            paths.iter().filter(|p| p.starts_with("/api/filtered-")).count(),
            1
        );
    }

    #[tokio::test]
    async fn clearing_filters_reloads_unfiltered() {
        let mut dash = controller(FakeTransport::dashboard());
        let criteria = FilterCriteria::from_form(Some("Salud".into()), None, None, None);
        dash.apply_filters(criteria).await.unwrap();
        assert!(dash.view().filters_active);

        assert_eq!(dash.clear_filters().await, DashboardState::Ready);
        assert!(!dash.view().filters_active);
        assert_eq!(dash.criteria(), &FilterCriteria::default());
        let last_metrics = dash
            .gateway()
            .transport()
            .requested_paths()
            .into_iter()
            .filter(|p| p.contains("metrics"))
            .last();
        assert_eq!(last_metrics.as_deref(), Some(gateway::METRICS));
    }

    #[tokio::test]
    async fn reloading_keeps_one_chart_per_slot() {
        let mut dash = controller(FakeTransport::dashboard());
        dash.load_initial().await;
        dash.load_initial().await;
        dash.refresh().await;
        assert_eq!(dash.charts().live_count(), 3);
        assert_eq!(dash.view().live_chart_count(), 3);
        assert_eq!(dash.view().destroyed_charts, 6);
        assert_eq!(
            dash.view().banners().last().map(|b| b.kind),
            Some(BannerKind::Success)
        );
    }

    #[tokio::test]
    async fn problems_analysis_reports_failure_inline() {
        let fake = FakeTransport::dashboard().with_status(gateway::DASHBOARD_PROBLEMS, 500);
        let mut dash = controller(fake);
        assert!(dash.analyze_problems().await.is_none());
        assert_eq!(
            dash.view().problems,
            Some(ProblemsPanel::Error(
                "Error analizando problemas: HTTP error! status: 500".into()
            ))
        );
    }

    #[tokio::test]
    async fn problems_analysis_shows_report() {
        let fake = FakeTransport::dashboard().with_data(
            gateway::DASHBOARD_PROBLEMS,
            json!({"total_problems": 0, "critical_problems": 0, "problems": [],
                   "solutions": {}, "action_plan": {}, "analysis_timestamp": "2024-05-01"}),
        );
        let mut dash = controller(fake);
        let report = dash.analyze_problems().await.unwrap();
        assert_eq!(report.total_problems, 0);
        assert!(matches!(dash.view().problems, Some(ProblemsPanel::Report(_))));
    }

    #[tokio::test]
    async fn exports_current_cases_as_csv() {
        let mut dash = controller(FakeTransport::dashboard());
        dash.load_initial().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casos.csv");
        assert_eq!(dash.export_cases(&path).unwrap(), sample_cases().len());
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Ciudad,Categoría,Urgencia,Prioridad,Clase,Rural,Internet")
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("100,Bogotá,Salud,Urgente,95"), "{first}");
        assert!(first.ends_with(",high,false,false"), "{first}");
        assert!(!text.contains('⚠'));
        assert!(!text.contains("/100"));
    }
}
