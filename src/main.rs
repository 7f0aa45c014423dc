// Entry point and high-level CLI flow.
//
// Each subcommand drives one page of the Orion client:
// - `dashboard` loads the metrics dashboard and then offers an interactive
//   menu (refresh, filters, problems analysis, CSV export).
// - `upload` validates and uploads a dataset, shows the preview and can
//   continue straight to the generated report.
// - `custom` opens the analysis named by a location or identifier.
// - `problems` prints the problems analysis once.
mod cases;
mod charts;
mod config;
mod custom;
mod dashboard;
mod error;
mod filters;
mod gateway;
mod output;
mod problems;
mod screen;
#[cfg(test)]
mod testing;
mod types;
mod upload;
mod util;
mod view;

use clap::{Parser, Subcommand};
use config::ClientConfig;
use custom::CustomAnalysisController;
use dashboard::DashboardController;
use error::AppError;
use filters::FilterCriteria;
use gateway::{Gateway, HttpTransport};
use screen::Screen;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use upload::{FileCandidate, UploadController};

const DEFAULT_EXPORT_FILE: &str = "casos_prioritarios.csv";

#[derive(Parser, Debug)]
#[command(name = "orion-dashboard", version, about = "Cliente de terminal para el dashboard Orion")]
struct Cli {
    /// Base URL of the Orion API (overrides ORION_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Metrics dashboard with an interactive menu.
    Dashboard {
        #[arg(long)]
        categoria: Option<String>,
        #[arg(long)]
        urgencia: Option<String>,
        /// Start date, YYYY-MM-DD.
        #[arg(long)]
        desde: Option<String>,
        /// End date, YYYY-MM-DD.
        #[arg(long)]
        hasta: Option<String>,
    },
    /// Upload a CSV or Excel dataset for a custom analysis.
    Upload {
        file: PathBuf,
        /// Generate the full report and open it.
        #[arg(long)]
        report: bool,
    },
    /// Open a custom analysis by location (`/dashboard/custom/<id>`) or id.
    Custom {
        location: String,
        /// Save the analysis as JSON into this directory.
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Print the problems analysis of the dashboard data.
    Problems,
}

/// Install the global subscriber.
///
/// - `RUST_LOG` wins when set; otherwise only warnings and errors show, so
///   the terminal pages stay readable.
/// - Logs always go to stderr; stdout is reserved for the rendered pages.
/// - `--log-json` / `ORION_LOG_JSON` switch to one JSON object per line.
fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

// Only fails if the TLS backend cannot be initialised.
fn http_gateway(config: &ClientConfig) -> Result<Gateway<HttpTransport>, AppError> {
    let transport =
        HttpTransport::new(&config.base_url).map_err(|e| AppError::Client(e.to_string()))?;
    Ok(Gateway::new(transport))
}

/// Print `label` and read one trimmed line. `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Read a menu choice after the common "Opción:" prompt.
fn read_choice() -> Option<String> {
    prompt("Opción: ")
}

/// Ask for the four filter fields; blank answers leave a field unset.
fn prompt_filters() -> Option<FilterCriteria> {
    let categoria = prompt("Categoría (vacío = todas): ")?;
    let urgencia = prompt("Urgencia (vacío = todas): ")?;
    let desde = prompt("Fecha inicio YYYY-MM-DD (vacío = sin límite): ")?;
    let hasta = prompt("Fecha fin YYYY-MM-DD (vacío = sin límite): ")?;
    Some(FilterCriteria::from_form(
        Some(categoria),
        Some(urgencia),
        Some(desde),
        Some(hasta),
    ))
}

fn print_menu() {
    println!("[1] Actualizar");
    println!("[2] Aplicar filtros");
    println!("[3] Limpiar filtros");
    println!("[4] Analizar problemas");
    println!("[5] Exportar casos prioritarios (CSV)");
    println!("[0] Salir\n");
}

async fn run_dashboard(config: ClientConfig, criteria: FilterCriteria) -> Result<ExitCode, AppError> {
    let gateway = http_gateway(&config)?;
    let mut dash = DashboardController::new(gateway, Screen::dashboard().with_echo(), config);
    // Filters given on the command line replace the unfiltered first load.
    // If they are rejected the banner explains why and the plain dashboard
    // loads instead.
    if criteria.is_active() {
        if dash.apply_filters(criteria).await.is_err() {
            dash.load_initial().await;
        }
    } else {
        dash.load_initial().await;
    }
    println!("{}", dash.view().render());

    loop {
        print_menu();
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                dash.refresh().await;
            }
            "2" => {
                let Some(criteria) = prompt_filters() else {
                    break;
                };
                // A rejected form keeps the current view; the banner says why.
                let _ = dash.apply_filters(criteria).await;
            }
            "3" => {
                dash.clear_filters().await;
            }
            "4" => {
                dash.analyze_problems().await;
            }
            "5" => {
                let answer = prompt(&format!("Archivo destino [{}]: ", DEFAULT_EXPORT_FILE))
                    .unwrap_or_default();
                let target = if answer.is_empty() {
                    DEFAULT_EXPORT_FILE.to_string()
                } else {
                    answer
                };
                match dash.export_cases(Path::new(&target)) {
                    Ok(rows) => println!(
                        "{} casos exportados a {}\n",
                        util::format_int(rows),
                        target
                    ),
                    Err(e) => eprintln!("Error de escritura: {}\n", e),
                }
                // The screen did not change; skip the re-render.
                continue;
            }
            "0" => break,
            _ => {
                println!("Opción no válida. Ingrese un número del 0 al 5.\n");
                continue;
            }
        }
        println!("{}", dash.view().render());
    }
    println!("Saliendo del programa.");
    Ok(ExitCode::SUCCESS)
}

async fn run_problems(config: ClientConfig) -> Result<ExitCode, AppError> {
    let gateway = http_gateway(&config)?;
    let mut dash = DashboardController::new(gateway, Screen::dashboard(), config);
    match dash.analyze_problems().await {
        Some(report) => {
            println!("{}", problems::render(&report));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            if let Some(view::ProblemsPanel::Error(message)) = &dash.view().problems {
                eprintln!("{}", message);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_upload(config: ClientConfig, file: &Path, report: bool) -> Result<ExitCode, AppError> {
    let candidate = match FileCandidate::from_path(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    let gateway = http_gateway(&config)?;
    let mut up = UploadController::new(gateway, Screen::upload().with_echo(), config.clone());
    let uploaded = up.select_file(candidate).await;
    println!("{}", up.view().render());
    if uploaded.is_err() {
        return Ok(ExitCode::FAILURE);
    }
    if !report {
        return Ok(ExitCode::SUCCESS);
    }
    match up.generate_report().await {
        Ok(location) => {
            println!("Informe disponible en {}\n", location);
            run_custom(config, &location, None).await
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn run_custom(
    config: ClientConfig,
    location: &str,
    download: Option<&Path>,
) -> Result<ExitCode, AppError> {
    let gateway = http_gateway(&config)?;
    let mut page = CustomAnalysisController::new(gateway, Screen::custom().with_echo(), config);
    let loaded = page.load(location).await;
    println!("{}", page.view().render());
    if loaded.is_err() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(dir) = download {
        let path = page.download_report(dir)?;
        println!("Informe guardado en {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(command: Commands, config: ClientConfig) -> Result<ExitCode, AppError> {
    match command {
        Commands::Dashboard {
            categoria,
            urgencia,
            desde,
            hasta,
        } => {
            let criteria = FilterCriteria::from_form(categoria, urgencia, desde, hasta);
            run_dashboard(config, criteria).await
        }
        Commands::Upload { file, report } => run_upload(config, &file, report).await,
        Commands::Custom { location, download } => {
            run_custom(config, &location, download.as_deref()).await
        }
        Commands::Problems => run_problems(config).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    config.log_json |= cli.log_json;
    init_tracing(config.log_json);

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
