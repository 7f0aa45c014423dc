// Problems detected by the backend, their proposed solutions and the action
// plan grouped by time horizon.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn badge(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub estimated_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub solution_title: String,
    #[serde(default)]
    pub problem_title: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPlan {
    pub immediate_actions: Vec<Action>,
    pub short_term_actions: Vec<Action>,
    pub medium_term_actions: Vec<Action>,
    pub long_term_actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::Immediate,
        Horizon::ShortTerm,
        Horizon::MediumTerm,
        Horizon::LongTerm,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Horizon::Immediate => "Acciones Inmediatas",
            Horizon::ShortTerm => "Corto Plazo (1-4 semanas)",
            Horizon::MediumTerm => "Mediano Plazo (1-3 meses)",
            Horizon::LongTerm => "Largo Plazo (3+ meses)",
        }
    }
}

impl ActionPlan {
    pub fn actions(&self, horizon: Horizon) -> &[Action] {
        match horizon {
            Horizon::Immediate => &self.immediate_actions,
            Horizon::ShortTerm => &self.short_term_actions,
            Horizon::MediumTerm => &self.medium_term_actions,
            Horizon::LongTerm => &self.long_term_actions,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemsReport {
    pub total_problems: u64,
    pub critical_problems: u64,
    pub problems: Vec<Problem>,
    pub solutions: HashMap<String, Solution>,
    pub action_plan: ActionPlan,
    pub analysis_timestamp: Option<String>,
}

#[derive(Tabled)]
struct ActionRow<'a> {
    #[tabled(rename = "Solución")]
    solution: &'a str,
    #[tabled(rename = "Problema")]
    problem: &'a str,
    #[tabled(rename = "Tiempo")]
    time: &'a str,
    #[tabled(rename = "Prioridad")]
    priority: String,
}

/// Solutions in the order of the problems they address.
pub fn ordered_solutions(report: &ProblemsReport) -> Vec<(&Problem, &Solution)> {
    report
        .problems
        .iter()
        .filter_map(|p| report.solutions.get(&p.id).map(|s| (p, s)))
        .collect()
}

/// Horizons that have at least one action, in fixed order.
pub fn populated_horizons(plan: &ActionPlan) -> Vec<(Horizon, &[Action])> {
    Horizon::ALL
        .iter()
        .map(|h| (*h, plan.actions(*h)))
        .filter(|(_, actions)| !actions.is_empty())
        .collect()
}

pub fn render(report: &ProblemsReport) -> String {
    let mut out = String::new();
    let stamp = report.analysis_timestamp.as_deref().unwrap_or("-");
    if report.total_problems == 0 {
        let _ = writeln!(out, "¡Excelente! No se detectaron problemas críticos en los datos.");
        let _ = writeln!(out, "Última actualización: {}", stamp);
        return out;
    }

    let _ = writeln!(
        out,
        "{} problemas detectados | {} problemas críticos\n",
        report.total_problems, report.critical_problems
    );

    let _ = writeln!(out, "Problemas Detectados");
    for p in &report.problems {
        let _ = writeln!(out, "  [{}] {}", p.severity.badge(), p.title);
        if !p.description.is_empty() {
            let _ = writeln!(out, "      {}", p.description);
        }
        let _ = writeln!(out, "      {} | {}", p.category, p.impact);
    }

    let solutions = ordered_solutions(report);
    if !solutions.is_empty() {
        let _ = writeln!(out, "\nSoluciones Propuestas");
        for (_, s) in solutions {
            let _ = writeln!(out, "  [{}] {}", s.priority.to_uppercase(), s.title);
            if !s.description.is_empty() {
                let _ = writeln!(out, "      {}", s.description);
            }
            let _ = writeln!(out, "      Tiempo estimado: {}", s.estimated_time);
        }
    }

    let horizons = populated_horizons(&report.action_plan);
    if !horizons.is_empty() {
        let _ = writeln!(out, "\nPlan de Acción");
        for (horizon, actions) in horizons {
            let rows: Vec<ActionRow> = actions
                .iter()
                .map(|a| ActionRow {
                    solution: &a.solution_title,
                    problem: &a.problem_title,
                    time: &a.estimated_time,
                    priority: a.priority.to_uppercase(),
                })
                .collect();
            let _ = writeln!(out, "\n{}", horizon.title());
            let _ = writeln!(out, "{}", Table::new(rows).with(Style::markdown()));
        }
    }

    let _ = writeln!(out, "\nÚltima actualización: {}", stamp);
    out
}
