// Chart slots and the registry that owns the live chart in each of them.
use crate::error::RenderError;
use crate::types::ChartDataset;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

pub const PRIMARY: &str = "#667eea";
pub const SUCCESS: &str = "#11998e";
pub const WARNING: &str = "#f093fb";
pub const DANGER: &str = "#f5576c";
pub const INFO: &str = "#4facfe";
pub const PURPLE: &str = "#9b59b6";

pub const CATEGORY_PALETTE: &[&str] = &[PRIMARY, SUCCESS, WARNING, DANGER];
pub const URGENCY_PALETTE: &[&str] = &[DANGER, SUCCESS];
pub const TEMPORAL_PALETTE: &[&str] = &[PRIMARY, SUCCESS, WARNING, DANGER, INFO];
pub const CUSTOM_CATEGORY_PALETTE: &[&str] = &[PRIMARY, SUCCESS, WARNING, DANGER, INFO, PURPLE];
pub const PRIORITY_PALETTE: &[&str] = &[DANGER, WARNING, SUCCESS];

/// Named chart target. Each slot holds at most one live chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartSlot {
    Category,
    Urgency,
    Temporal,
    Priority,
}

impl ChartSlot {
    pub const DASHBOARD: [ChartSlot; 3] = [ChartSlot::Category, ChartSlot::Urgency, ChartSlot::Temporal];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartSlot::Category => "category",
            ChartSlot::Urgency => "urgency",
            ChartSlot::Temporal => "temporal",
            ChartSlot::Priority => "priority",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartSlot::Category => "Distribución por Categoría",
            ChartSlot::Urgency => "Distribución por Urgencia",
            ChartSlot::Temporal => "Tendencias Temporales",
            ChartSlot::Priority => "Distribución por Prioridad",
        }
    }

    /// Text shown in place of the chart when it cannot be drawn.
    pub fn placeholder(self) -> &'static str {
        match self {
            ChartSlot::Category => "Error cargando gráfico de categorías",
            ChartSlot::Urgency => "Error cargando gráfico de urgencia",
            ChartSlot::Temporal => "Error cargando gráfico temporal",
            ChartSlot::Priority => "Error cargando gráfico de prioridad",
        }
    }
}

impl fmt::Display for ChartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Doughnut,
    Bar,
}

/// Presentation of a series: chart kind, legend label and palette.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub kind: ChartKind,
    pub label: Option<String>,
    pub palette: &'static [&'static str],
}

impl SeriesStyle {
    pub fn new(kind: ChartKind, palette: &'static [&'static str]) -> Self {
        Self {
            kind,
            label: None,
            palette,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

/// Everything a surface needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub slot: ChartSlot,
    pub kind: ChartKind,
    pub label: Option<String>,
    pub points: Vec<ChartPoint>,
}

impl ChartSpec {
    fn build(slot: ChartSlot, dataset: &ChartDataset, style: &SeriesStyle) -> Self {
        let points = dataset
            .labels
            .iter()
            .zip(&dataset.values)
            .enumerate()
            .map(|(i, (label, value))| ChartPoint {
                label: label.clone(),
                value: *value,
                color: palette_color(style.palette, i),
            })
            .collect();
        Self {
            slot,
            kind: style.kind,
            label: style.label.clone(),
            points,
        }
    }
}

/// Color for the `index`-th point, cycling through the palette.
pub fn palette_color(palette: &'static [&'static str], index: usize) -> &'static str {
    if palette.is_empty() {
        return PRIMARY;
    }
    palette[index % palette.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

/// A place charts can be drawn on.
pub trait ChartSurface {
    fn create_chart(&mut self, spec: ChartSpec) -> Result<ChartHandle, RenderError>;
    fn destroy_chart(&mut self, handle: ChartHandle);
    fn show_chart_placeholder(&mut self, slot: ChartSlot, message: &str);
}

/// Slot name -> live chart. A slot is always emptied before it is refilled.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    live: HashMap<ChartSlot, ChartHandle>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `dataset` into `slot`.
    ///
    /// - Whatever the slot held before is destroyed first, so a slot never
    ///   has two live charts.
    /// - Empty data or labels and values of different lengths leave the
    ///   placeholder in the slot and return the reason.
    pub fn render<S: ChartSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        slot: ChartSlot,
        dataset: &ChartDataset,
        style: &SeriesStyle,
    ) -> Result<ChartHandle, RenderError> {
        self.release(surface, slot);
        if dataset.is_empty() {
            surface.show_chart_placeholder(slot, slot.placeholder());
            return Err(RenderError::EmptyDataset(slot));
        }
        if dataset.labels.len() != dataset.values.len() {
            surface.show_chart_placeholder(slot, slot.placeholder());
            return Err(RenderError::MismatchedSeries {
                slot,
                labels: dataset.labels.len(),
                values: dataset.values.len(),
            });
        }
        let handle = surface.create_chart(ChartSpec::build(slot, dataset, style))?;
        debug!(%slot, points = dataset.labels.len(), "chart rendered");
        self.live.insert(slot, handle);
        Ok(handle)
    }

    /// Replace the slot with its placeholder after a failed fetch.
    pub fn fail<S: ChartSurface + ?Sized>(&mut self, surface: &mut S, slot: ChartSlot, detail: &str) {
        warn!(%slot, detail, "chart unavailable");
        self.release(surface, slot);
        surface.show_chart_placeholder(slot, slot.placeholder());
    }

    pub fn release<S: ChartSurface + ?Sized>(&mut self, surface: &mut S, slot: ChartSlot) {
        if let Some(handle) = self.live.remove(&slot) {
            surface.destroy_chart(handle);
        }
    }

    pub fn live(&self, slot: ChartSlot) -> Option<ChartHandle> {
        self.live.get(&slot).copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
