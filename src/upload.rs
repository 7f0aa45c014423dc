// Dataset upload: local file checks, the multipart upload with its progress
// indicator, the preview of the returned analysis and report generation.
use crate::config::ClientConfig;
use crate::error::{AppError, FileRejection, GatewayError, ReportError};
use crate::gateway::{self, Gateway, Transport, UploadForm};
use crate::types::{ReportTicket, UploadedAnalysis};
use crate::util::{format_count, format_file_size, format_percent, plain_number};
use crate::view::{Banner, ButtonState, UploadView};
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const MAX_NAME_CHARS: usize = 255;
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub const ANALYSIS_TYPE: &str = "custom";
pub const PROGRESS_CAP: u8 = 90;

// Increments of the progress indicator, repeated in order. Each is at most 15.
const PROGRESS_STEPS: [u8; 6] = [12, 7, 15, 4, 10, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Validating,
    Uploading,
    Processing,
    Preview,
    Failed,
}

/// A local file picked for upload. Only name and size are known until the
/// file passes validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

impl FileCandidate {
    pub fn from_path(path: &Path) -> Result<Self, FileRejection> {
        let meta = std::fs::metadata(path).map_err(|e| FileRejection::Unreadable(e.to_string()))?;
        if !meta.is_file() {
            return Err(FileRejection::Unreadable(format!(
                "{} no es un archivo",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size: meta.len(),
            path: path.to_path_buf(),
        })
    }
}

/// Local checks in fixed order; the first failing rule is returned.
pub fn validate_file(file: &FileCandidate) -> Result<(), FileRejection> {
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    if !extension.is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str())) {
        return Err(FileRejection::UnsupportedType);
    }
    if file.size > MAX_FILE_SIZE {
        return Err(FileRejection::TooLarge);
    }
    if file.size == 0 {
        return Err(FileRejection::Empty);
    }
    if file.name.chars().count() > MAX_NAME_CHARS {
        return Err(FileRejection::NameTooLong);
    }
    if file.name.contains(INVALID_NAME_CHARS) {
        return Err(FileRejection::InvalidCharacters);
    }
    Ok(())
}

/// User-facing message for a failed upload.
///
/// Status codes come from `Http` only, so a port or path that happens to
/// contain `500` never reads as a server error. Transport failures are
/// connection problems unless the detail says the request timed out.
pub fn classify_upload_failure(error: &GatewayError) -> String {
    match error {
        GatewayError::Http(500) => {
            "Error interno del servidor. Verifique que el archivo no esté corrupto y tenga el formato correcto.".to_string()
        }
        GatewayError::Http(400) => {
            "Formato de archivo no válido. Use archivos CSV o Excel (.xlsx, .xls).".to_string()
        }
        GatewayError::Http(413) => "El archivo es demasiado grande. Máximo 50MB.".to_string(),
        GatewayError::Transport(detail) if detail.to_ascii_lowercase().contains("timeout") => {
            "El archivo está tardando mucho en procesarse. Intente con un archivo más pequeño.".to_string()
        }
        GatewayError::Transport(detail) if is_connection_failure(detail) => {
            "Error de conexión. Verifique su conexión a internet e intente nuevamente.".to_string()
        }
        GatewayError::Application(message) => format!("Error: {}", message),
        other => format!("Error: {}", other),
    }
}

// Detail prefixes written by `HttpTransport` when no response was read.
fn is_connection_failure(detail: &str) -> bool {
    detail.starts_with(gateway::FETCH_FAILED) || detail.starts_with(gateway::BODY_UNREADABLE)
}

pub fn stage_label(percent: u8) -> &'static str {
    match percent {
        0..=29 => "Cargando archivo...",
        30..=59 => "Procesando datos...",
        60..=89 => "Aplicando IA...",
        _ => "Finalizando análisis...",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub stage: &'static str,
}

impl Progress {
    pub fn at(percent: u8) -> Self {
        Self {
            percent,
            stage: stage_label(percent),
        }
    }
}

/// Cosmetic progress shown while the server works. It is not measured: it
/// walks a fixed increment schedule and stops at `PROGRESS_CAP` until the
/// response arrives.
#[derive(Debug, Default)]
pub struct SyntheticProgress {
    percent: u8,
    ticks: usize,
}

impl SyntheticProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Progress {
        Progress::at(self.percent)
    }

    pub fn is_capped(&self) -> bool {
        self.percent >= PROGRESS_CAP
    }

    pub fn advance(&mut self) -> Progress {
        let step = PROGRESS_STEPS[self.ticks % PROGRESS_STEPS.len()];
        self.ticks += 1;
        self.percent = self.percent.saturating_add(step).min(PROGRESS_CAP);
        self.current()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewCard {
    pub title: &'static str,
    pub value: String,
    pub note: Option<String>,
}

impl PreviewCard {
    fn new(title: &'static str, value: String) -> Self {
        Self {
            title,
            value,
            note: None,
        }
    }

    fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

pub fn preview_cards(a: &UploadedAnalysis) -> Vec<PreviewCard> {
    vec![
        PreviewCard::new("Total Registros", format_count(a.total_records)),
        PreviewCard::new(
            "Categorías Detectadas",
            plain_number(a.categories_analysis.total_categories.unwrap_or(0.0)),
        ),
        PreviewCard::new("Casos Urgentes", format_count(a.urgency_analysis.urgent_cases)).with_note(
            format!("{} del total", format_percent(a.urgency_analysis.urgency_percentage)),
        ),
        PreviewCard::new("Precisión IA", format_percent(a.ai_accuracy))
            .with_note(format!("Calidad: {}", format_percent(a.data_quality.quality_score))),
        PreviewCard::new("Casos Positivos", format_count(a.sentiment_analysis.positive_cases)),
        PreviewCard::new("Alta Prioridad", format_count(a.priority_analysis.high_priority)),
    ]
}

pub fn report_location(report_id: &str) -> String {
    format!("/dashboard/custom/{}", report_id)
}

pub struct UploadController<T, V> {
    gateway: Gateway<T>,
    view: V,
    config: ClientConfig,
    state: UploadState,
    file: Option<FileCandidate>,
    analysis: Option<UploadedAnalysis>,
}

impl<T: Transport, V: UploadView> UploadController<T, V> {
    pub fn new(gateway: Gateway<T>, view: V, config: ClientConfig) -> Self {
        Self {
            gateway,
            view,
            config,
            state: UploadState::Idle,
            file: None,
            analysis: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn file(&self) -> Option<&FileCandidate> {
        self.file.as_ref()
    }

    pub fn analysis(&self) -> Option<&UploadedAnalysis> {
        self.analysis.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// Validate `file`, upload it and show the preview of the analysis.
    pub async fn select_file(&mut self, file: FileCandidate) -> Result<UploadedAnalysis, AppError> {
        info!(file = %file.name, size = file.size, "file selected");
        self.enter(UploadState::Validating);
        self.analysis = None;
        self.view.hide_preview();

        if let Err(rejection) = validate_file(&file) {
            self.reject(&rejection);
            return Err(rejection.into());
        }
        self.view
            .show_file_info(&file.name, &format_file_size(file.size));

        let bytes = match tokio::fs::read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let rejection = FileRejection::Unreadable(e.to_string());
                self.reject(&rejection);
                return Err(rejection.into());
            }
        };
        let form = UploadForm {
            file_name: file.name.clone(),
            bytes,
            analysis_type: ANALYSIS_TYPE.to_string(),
        };
        self.file = Some(file);

        self.enter(UploadState::Uploading);
        let result = self.send_with_progress(form).await;
        self.view.set_progress(None);
        match result {
            Ok(analysis) => {
                info!(analysis_id = %analysis.analysis_id, "analysis ready");
                self.enter(UploadState::Preview);
                self.view.show_preview(preview_cards(&analysis));
                self.view.set_report_button(ButtonState::Ready);
                self.analysis = Some(analysis.clone());
                Ok(analysis)
            }
            Err(e) => {
                self.enter(UploadState::Failed);
                self.view.show_banner(Banner::error(
                    classify_upload_failure(&e),
                    self.config.upload_error_banner_ttl,
                ));
                Err(e.into())
            }
        }
    }

    /// Ask the server for the full report of the previewed analysis and
    /// return the location where it can be viewed.
    pub async fn generate_report(&mut self) -> Result<String, ReportError> {
        let Some(analysis_id) = self.analysis.as_ref().map(|a| a.analysis_id.clone()) else {
            self.view.show_banner(Banner::error(
                ReportError::NoAnalysis.to_string(),
                self.config.upload_error_banner_ttl,
            ));
            return Err(ReportError::NoAnalysis);
        };
        info!(%analysis_id, "generating full report");
        self.view.set_report_button(ButtonState::Busy);
        let body = json!({"analysis_id": analysis_id, "report_type": "full"});
        match self
            .gateway
            .post::<ReportTicket>(gateway::GENERATE_REPORT, body)
            .await
        {
            Ok(ticket) => Ok(report_location(&ticket.report_id)),
            Err(e) => {
                let err = ReportError::from(e);
                self.view.set_report_button(ButtonState::Ready);
                self.view.show_banner(Banner::error(
                    err.to_string(),
                    self.config.upload_error_banner_ttl,
                ));
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        debug!("upload reset");
        self.file = None;
        self.analysis = None;
        self.enter(UploadState::Idle);
        self.view.set_progress(None);
        self.view.hide_preview();
        self.view.reset_upload_area();
    }

    fn enter(&mut self, state: UploadState) {
        debug!(from = ?self.state, to = ?state, "upload state");
        self.state = state;
        self.view.set_upload_state(state);
    }

    fn reject(&mut self, rejection: &FileRejection) {
        warn!(reason = %rejection, "file rejected");
        self.enter(UploadState::Failed);
        self.file = None;
        self.view.show_banner(Banner::error(
            rejection.to_string(),
            self.config.upload_error_banner_ttl,
        ));
    }

    /// Upload `form` while the progress indicator ticks.
    ///
    /// - The request is polled first on every wake-up, so a response that is
    ///   already there is never delayed by a pending tick.
    /// - Ticks stop once the indicator is capped; from then on the page reads
    ///   `Processing` until the server answers.
    /// - The caller clears the indicator whatever the outcome.
    async fn send_with_progress(&mut self, form: UploadForm) -> Result<UploadedAnalysis, GatewayError> {
        let mut progress = SyntheticProgress::new();
        let mut ticker = interval(self.config.progress_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately.
        ticker.tick().await;
        self.view.set_progress(Some(progress.current()));

        let request = self
            .gateway
            .upload::<UploadedAnalysis>(gateway::UPLOAD_DATASET, form);
        tokio::pin!(request);
        loop {
            tokio::select! {
                biased;
                result = &mut request => return result,
                _ = ticker.tick(), if !progress.is_capped() => {
                    let p = progress.advance();
                    if progress.is_capped() {
                        // `request` still borrows the gateway, so no `enter` here.
                        debug!(from = ?self.state, to = ?UploadState::Processing, "upload state");
                        self.state = UploadState::Processing;
                        self.view.set_upload_state(UploadState::Processing);
                    }
                    self.view.set_progress(Some(p));
                }
            }
        }
    }
}
