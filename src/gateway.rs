// Remote data gateway: every call to the Orion API goes through here.
//
// The gateway knows the `{success, data, error}` envelope and turns each
// response into either the typed payload or a `GatewayError`. Sending bytes
// over the wire is delegated to a `Transport` so the envelope rules can be
// exercised without a server.
use crate::error::GatewayError;
use crate::filters::Query;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

pub const METRICS: &str = "/api/metrics";
pub const CATEGORY_DISTRIBUTION: &str = "/api/category-distribution";
pub const URGENCY_DISTRIBUTION: &str = "/api/urgency-distribution";
pub const TEMPORAL_TRENDS: &str = "/api/temporal-trends";
pub const PRIORITY_CASES: &str = "/api/priority-cases";
pub const FILTERED_METRICS: &str = "/api/filtered-metrics";
pub const FILTERED_PRIORITY_CASES: &str = "/api/filtered-priority-cases";
pub const FILTERED_CATEGORY_DISTRIBUTION: &str = "/api/filtered-category-distribution";
pub const FILTERED_URGENCY_DISTRIBUTION: &str = "/api/filtered-urgency-distribution";
pub const FILTERED_TEMPORAL_TRENDS: &str = "/api/filtered-temporal-trends";
pub const DASHBOARD_PROBLEMS: &str = "/api/dashboard-problems";
pub const UPLOAD_DATASET: &str = "/api/upload-dataset";
pub const GENERATE_REPORT: &str = "/api/generate-report";

const FALLBACK_ERROR: &str = "Error desconocido";

// Leading text of `Transport` details written by `HttpTransport`.
pub const FETCH_FAILED: &str = "Failed to fetch";
pub const BODY_UNREADABLE: &str = "unreadable body";
pub const TIMED_OUT: &str = "timeout";

pub fn custom_metrics_path(analysis_id: &str) -> String {
    format!("/api/custom-metrics/{}", analysis_id)
}

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub analysis_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Get { path: String, query: Query },
    PostJson { path: String, body: Value },
    PostMultipart { path: String, form: UploadForm },
}

impl ApiRequest {
    pub fn path(&self) -> &str {
        match self {
            ApiRequest::Get { path, .. }
            | ApiRequest::PostJson { path, .. }
            | ApiRequest::PostMultipart { path, .. } => path,
        }
    }
}

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. Only network-level failures are errors here;
    /// any status code is returned as a response.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Turn a raw response into the payload of a successful envelope.
///
/// When the envelope has no `data` member the remaining top-level members
/// are used as the payload (report generation answers that way).
pub fn decode_envelope<T: DeserializeOwned>(response: RawResponse) -> Result<T, GatewayError> {
    if !(200..300).contains(&response.status) {
        return Err(GatewayError::Http(response.status));
    }
    let envelope: Envelope = serde_json::from_str(&response.body)
        .map_err(|e| GatewayError::Transport(format!("malformed response: {e}")))?;
    if envelope.success != Some(true) {
        let message = envelope
            .error
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR.to_string());
        return Err(GatewayError::Application(message));
    }
    let payload = match envelope.data {
        Some(data) => data,
        None => Value::Object(envelope.rest),
    };
    serde_json::from_value(payload)
        .map_err(|e| GatewayError::Transport(format!("unexpected payload: {e}")))
}

pub struct Gateway<T> {
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[instrument(level = "debug", skip(self, query), fields(params = query.len()))]
    pub async fn get<D: DeserializeOwned>(&self, path: &str, query: Query) -> Result<D, GatewayError> {
        let request = ApiRequest::Get {
            path: path.to_string(),
            query,
        };
        self.exchange(request).await
    }

    #[instrument(level = "debug", skip(self, body))]
    pub async fn post<D: DeserializeOwned>(&self, path: &str, body: Value) -> Result<D, GatewayError> {
        let request = ApiRequest::PostJson {
            path: path.to_string(),
            body,
        };
        self.exchange(request).await
    }

    #[instrument(level = "debug", skip(self, form), fields(file = %form.file_name, bytes = form.bytes.len()))]
    pub async fn upload<D: DeserializeOwned>(&self, path: &str, form: UploadForm) -> Result<D, GatewayError> {
        let request = ApiRequest::PostMultipart {
            path: path.to_string(),
            form,
        };
        self.exchange(request).await
    }

    async fn exchange<D: DeserializeOwned>(&self, request: ApiRequest) -> Result<D, GatewayError> {
        let path = request.path().to_string();
        let result = match self.transport.send(request).await {
            Ok(response) => {
                debug!(%path, status = response.status, "response received");
                decode_envelope(response)
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!(%path, error = %e, "request failed");
        }
        result
    }
}

/// Production transport over `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, GatewayError> {
        let builder = match request {
            ApiRequest::Get { path, query } => self.client.get(self.url(&path)).query(&query),
            ApiRequest::PostJson { path, body } => self.client.post(self.url(&path)).json(&body),
            ApiRequest::PostMultipart { path, form } => {
                let part = reqwest::multipart::Part::bytes(form.bytes).file_name(form.file_name);
                let multipart = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("analysis_type", form.analysis_type);
                self.client.post(self.url(&path)).multipart(multipart)
            }
        };
        let response = builder
            .send()
            .await
            .map_err(|e| transport_failure(FETCH_FAILED, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_failure(BODY_UNREADABLE, e))?;
        Ok(RawResponse { status, body })
    }
}

/// Wrap a reqwest error as `Transport`.
///
/// The URL is dropped from the detail: callers match on it, and a host or
/// port must not be mistaken for a status code.
fn transport_failure(context: &str, e: reqwest::Error) -> GatewayError {
    let prefix = if e.is_timeout() { TIMED_OUT } else { context };
    GatewayError::Transport(format!("{}: {}", prefix, e.without_url()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::types::{ChartDataset, MetricsSnapshot, ReportTicket};
    use serde_json::json;

    #[test]
    fn non_2xx_is_http_error() {
        let r = RawResponse {
            status: 503,
            body: "{\"success\": true}".into(),
        };
        assert_eq!(
            decode_envelope::<Value>(r),
            Err(GatewayError::Http(503))
        );
    }

    #[test]
    fn success_false_uses_server_message_or_fallback() {
        let r = RawResponse::ok(json!({"success": false, "error": "sin datos"}).to_string());
        assert_eq!(
            decode_envelope::<Value>(r),
            Err(GatewayError::Application("sin datos".into()))
        );
        let r = RawResponse::ok(json!({"data": {}}).to_string());
        assert_eq!(
            decode_envelope::<Value>(r),
            Err(GatewayError::Application(FALLBACK_ERROR.into()))
        );
    }

    #[test]
    fn malformed_json_is_transport_error() {
        let r = RawResponse::ok("<html>oops</html>");
        assert!(matches!(
            decode_envelope::<Value>(r),
            Err(GatewayError::Transport(_))
        ));
    }

    #[test]
    fn payload_without_data_member_reads_top_level() {
        let r = RawResponse::ok(json!({"success": true, "report_id": "r-9"}).to_string());
        let ticket: ReportTicket = decode_envelope(r).unwrap();
        assert_eq!(ticket.report_id, "r-9");
    }

    #[tokio::test]
    async fn get_sends_query_and_decodes_payload() {
        let fake = FakeTransport::default().with_data(
            FILTERED_CATEGORY_DISTRIBUTION,
            json!({"labels": ["Salud"], "values": [3]}),
        );
        let gateway = Gateway::new(fake);
        let ds: ChartDataset = gateway
            .get(
                FILTERED_CATEGORY_DISTRIBUTION,
                vec![("categoria", "Salud".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(ds.labels, vec!["Salud"]);
        let sent = gateway.transport().requests();
        assert_eq!(
            sent,
            vec![ApiRequest::Get {
                path: FILTERED_CATEGORY_DISTRIBUTION.into(),
                query: vec![("categoria", "Salud".to_string())],
            }]
        );
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let fake = FakeTransport::default()
            .with_failure(METRICS, GatewayError::Transport("connection refused".into()));
        let gateway = Gateway::new(fake);
        let res: Result<MetricsSnapshot, _> = gateway.get(METRICS, Vec::new()).await;
        assert_eq!(
            res,
            Err(GatewayError::Transport("connection refused".into()))
        );
    }

    #[tokio::test]
    async fn refused_connection_detail_leaves_out_the_url() {
        // Nothing listens on port 1.
        let gateway = Gateway::new(HttpTransport::new("http://127.0.0.1:1").unwrap());
        let res: Result<MetricsSnapshot, _> = gateway.get(METRICS, Vec::new()).await;
        match res {
            Err(GatewayError::Transport(detail)) => {
                assert!(detail.starts_with(FETCH_FAILED), "{detail}");
                assert!(!detail.contains("127.0.0.1"), "{detail}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
