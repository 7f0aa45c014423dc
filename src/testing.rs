// In-memory transport for controller tests.
use crate::error::GatewayError;
use crate::gateway::{self, ApiRequest, RawResponse, Transport};
use crate::types::PriorityCase;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
struct Route {
    reply: Result<RawResponse, GatewayError>,
    delay: Option<Duration>,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            reply: Ok(RawResponse {
                status: 404,
                body: "{}".to_string(),
            }),
            delay: None,
        }
    }
}

/// Answers by request path and records every request it sees. Unknown paths
/// get a 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    fn route(&mut self, path: &str) -> &mut Route {
        self.routes.entry(path.to_string()).or_default()
    }

    /// Successful envelope carrying `data`.
    pub fn with_data(self, path: &str, data: Value) -> Self {
        self.with_body(path, json!({"success": true, "data": data}))
    }

    /// 200 response with `body` as is.
    pub fn with_body(mut self, path: &str, body: Value) -> Self {
        self.route(path).reply = Ok(RawResponse::ok(body.to_string()));
        self
    }

    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.route(path).reply = Ok(RawResponse {
            status,
            body: json!({"success": false}).to_string(),
        });
        self
    }

    pub fn with_failure(mut self, path: &str, error: GatewayError) -> Self {
        self.route(path).reply = Err(error);
        self
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.route(path).delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.path().to_string())
            .collect()
    }

    /// Every dashboard endpoint, filtered and unfiltered, answering with
    /// consistent sample data.
    pub fn dashboard() -> Self {
        let metrics = json!({
            "total_casos": 1200,
            "casos_urgentes": 366,
            "porcentaje_urgentes": 30.5,
            "zona_rural": 400,
            "porcentaje_rural": 33.3,
            "sin_internet": 250,
            "porcentaje_sin_internet": 20.8
        });
        let categories = json!({
            "labels": ["Salud", "Educación", "Seguridad", "Transporte"],
            "values": [500, 300, 250, 150]
        });
        let urgency = json!({"labels": ["Urgente", "No urgente"], "values": [366, 834]});
        let temporal = json!({
            "months": ["2024-01", "2024-02", "2024-03"],
            "counts": [380, 410, 410]
        });
        let cases = serde_json::to_value(sample_cases()).unwrap();

        let mut fake = Self::default();
        for (plain, filtered, data) in [
            (gateway::METRICS, gateway::FILTERED_METRICS, &metrics),
            (
                gateway::CATEGORY_DISTRIBUTION,
                gateway::FILTERED_CATEGORY_DISTRIBUTION,
                &categories,
            ),
            (
                gateway::URGENCY_DISTRIBUTION,
                gateway::FILTERED_URGENCY_DISTRIBUTION,
                &urgency,
            ),
            (
                gateway::TEMPORAL_TRENDS,
                gateway::FILTERED_TEMPORAL_TRENDS,
                &temporal,
            ),
            (gateway::PRIORITY_CASES, gateway::FILTERED_PRIORITY_CASES, &cases),
        ] {
            fake = fake
                .with_data(plain, data.clone())
                .with_data(filtered, data.clone());
        }
        fake
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, GatewayError> {
        let route = self
            .routes
            .get(request.path())
            .cloned()
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        route.reply
    }
}

/// Twelve cases in descending priority, alternating rural and urban.
pub fn sample_cases() -> Vec<PriorityCase> {
    let cities = ["Bogotá", "Medellín", "Cali", "Pasto"];
    let categories = ["Salud", "Educación", "Seguridad"];
    (0..12)
        .map(|i| {
            let priority = 95.0 - f64::from(i) * 4.0;
            PriorityCase {
                id: format!("{}", 100 + i),
                city: cities[i as usize % cities.len()].to_string(),
                category: categories[i as usize % categories.len()].to_string(),
                urgency: if priority >= 80.0 {
                    "Urgente".to_string()
                } else {
                    "No urgente".to_string()
                },
                priority,
                rural: json!(i % 2),
                internet: json!(i % 3 != 0),
            }
        })
        .collect()
}
