// Error taxonomy for the client.
//
// Transport/Http/Application failures come from the gateway and are turned
// into banners at the call site. Validation failures block the triggering
// action before any request is made. Render failures only ever degrade the
// region they belong to.
use crate::charts::ChartSlot;
use thiserror::Error;

/// Failure of a single API call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Connection refused, body unreadable, malformed JSON or a payload that
    /// does not match the expected shape.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx status from the server.
    #[error("HTTP error! status: {0}")]
    Http(u16),

    /// The server answered `success: false`.
    #[error("{0}")]
    Application(String),
}

/// Which date field of the filter form failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn label(self) -> &'static str {
        match self {
            DateField::Start => "inicio",
            DateField::End => "fin",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Formato de fecha de {} inválido. Use YYYY-MM-DD", .0.label())]
    BadFormat(DateField),

    #[error(
        "La fecha de {} debe estar entre {} y {} (recibido {})",
        .0.label(),
        crate::filters::MIN_YEAR,
        crate::filters::MAX_YEAR,
        .1
    )]
    YearOutOfRange(DateField, i32),

    #[error("La fecha de inicio debe ser anterior a la fecha de fin")]
    InvertedRange,
}

/// Reasons a local file is refused before upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileRejection {
    #[error("Tipo de archivo no soportado. Use CSV o Excel (.xlsx, .xls)")]
    UnsupportedType,

    #[error("El archivo es demasiado grande. Máximo 50MB")]
    TooLarge,

    #[error("El archivo está vacío. Seleccione un archivo válido.")]
    Empty,

    #[error("El nombre del archivo es demasiado largo. Use un nombre más corto.")]
    NameTooLong,

    #[error("El nombre del archivo contiene caracteres no válidos. Use solo letras, números y guiones.")]
    InvalidCharacters,

    #[error("No se pudo leer el archivo: {0}")]
    Unreadable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    #[error("No hay datos de análisis disponibles")]
    NoAnalysis,

    #[error("Error generando informe: {0}")]
    Failed(#[from] GatewayError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("render target for slot `{0}` not found")]
    MissingTarget(ChartSlot),

    #[error("no data for slot `{0}`")]
    EmptyDataset(ChartSlot),

    #[error("slot `{slot}` has {labels} labels but {values} values")]
    MismatchedSeries {
        slot: ChartSlot,
        labels: usize,
        values: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustomAnalysisError {
    #[error("ID de análisis no encontrado")]
    MissingId,

    #[error("No hay datos de análisis disponibles")]
    NotLoaded,

    #[error("Error cargando análisis personalizado: {0}")]
    Load(#[from] GatewayError),
}

/// Top-level failure of a CLI command.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    File(#[from] FileRejection),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Custom(#[from] CustomAnalysisError),

    #[error("write error: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
