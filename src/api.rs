//! REST API for the load estimation service.
//!
//! Provides HTTP endpoints for single-type and multi-type estimates.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EstimatorSettings};
use crate::model::{BoxType, Container, PackingResult, Target, ValidationError};
use crate::optimizer::{
    EstimateError, EstimatorConfig, PackEvent, SingleEstimate, compute_multi,
    compute_multi_with_progress, compute_single,
};
use crate::types::Dimensions;

#[derive(Clone)]
struct ApiState {
    estimator: EstimatorSettings,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>fit-it-now API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Container part shared by both estimate requests.
///
/// A missing `gap` falls back to the configured default clearance.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    #[schema(value_type = [f64; 3], example = json!([1360.0, 245.0, 270.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
    #[serde(default)]
    #[schema(nullable = true)]
    pub gap: Option<f64>,
}

impl ContainerRequest {
    fn into_container(self, default_gap: f64) -> Result<Container, ValidationError> {
        Container::new(
            Dimensions::from_tuple(self.dims),
            self.max_weight,
            self.gap.unwrap_or(default_gap),
        )
    }
}

/// Request for the single-type estimate: as many boxes of one kind as fit.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "dims": [1360.0, 245.0, 270.0], "max_weight": 20000.0, "gap": 0.5 },
        "dims": [60.0, 40.0, 40.0],
        "weight": 12.5
    })
)]
pub struct SingleEstimateRequest {
    pub container: ContainerRequest,
    #[schema(value_type = [f64; 3], example = json!([60.0, 40.0, 40.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
}

/// Requested quantity of a multi-type box: a count or the keyword `"unbounded"`.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum TargetRequest {
    Count(i64),
    Keyword(TargetKeyword),
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetKeyword {
    Unbounded,
}

impl From<TargetRequest> for Target {
    fn from(request: TargetRequest) -> Self {
        match request {
            TargetRequest::Count(raw) => Target::from_signed(raw),
            TargetRequest::Keyword(TargetKeyword::Unbounded) => Target::Unbounded,
        }
    }
}

/// One box type of a multi-type request.
///
/// `target` is mandatory. Send `"unbounded"` to load as many as fit.
#[derive(Deserialize, Clone, ToSchema)]
pub struct BoxTypeRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub name: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([60.0, 40.0, 40.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub target: TargetRequest,
}

impl BoxTypeRequest {
    fn into_box_type(self, index: usize) -> BoxType {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Type {}", index + 1));
        BoxType::new(
            index,
            name,
            Dimensions::from_tuple(self.dims),
            self.weight,
            self.target.into(),
        )
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "dims": [1360.0, 245.0, 270.0], "max_weight": 20000.0 },
        "boxes": [
            { "name": "Euro crate", "dims": [60.0, 40.0, 40.0], "weight": 12.5, "target": 120 },
            { "name": "Parcel", "dims": [30.0, 20.0, 15.0], "weight": 2.0, "target": "unbounded" }
        ],
        "keep_input_order": true
    })
)]
pub struct MultiEstimateRequest {
    pub container: ContainerRequest,
    pub boxes: Vec<BoxTypeRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub keep_input_order: Option<bool>,
}

#[derive(Debug)]
struct ValidatedMultiRequest {
    container: Container,
    box_types: Vec<BoxType>,
    keep_input_order: bool,
}

impl ValidatedMultiRequest {
    fn box_type_count(&self) -> usize {
        self.box_types.len()
    }

    fn into_parts(self) -> (Container, Vec<BoxType>, bool) {
        (self.container, self.box_types, self.keep_input_order)
    }
}

impl MultiEstimateRequest {
    fn into_validated(self, default_gap: f64) -> Result<ValidatedMultiRequest, ValidationError> {
        let container = self.container.into_container(default_gap)?;
        let box_types = self
            .boxes
            .into_iter()
            .enumerate()
            .map(|(idx, spec)| spec.into_box_type(idx))
            .collect();

        Ok(ValidatedMultiRequest {
            container,
            box_types,
            keep_input_order: self.keep_input_order.unwrap_or(false),
        })
    }
}

/// Response of the single-type estimate.
///
/// # Fields
/// * `capacity` - Geometric capacity ignoring the weight limit
/// * `count` - Reported number of boxes
/// * `weight_limited` - The weight limit reduced `count` below `capacity`
/// * `exceeds_weight_limit` - `total_weight` is above `max_weight` (only when enforcement is off)
#[derive(Serialize, ToSchema)]
pub struct SingleEstimateResponse {
    pub capacity: u64,
    pub count: u64,
    pub total_weight: f64,
    pub max_weight: f64,
    pub efficiency: f64,
    pub weight_limited: bool,
    pub exceeds_weight_limit: bool,
}

impl SingleEstimateResponse {
    fn from_estimate(estimate: SingleEstimate, container: &Container) -> Self {
        Self {
            capacity: estimate.capacity,
            count: estimate.count,
            total_weight: estimate.total_weight,
            max_weight: container.max_weight,
            efficiency: estimate.efficiency,
            weight_limited: estimate.weight_limited,
            exceeds_weight_limit: estimate.total_weight > container.max_weight,
        }
    }
}

/// Response of the multi-type estimate.
#[derive(Serialize, ToSchema)]
pub struct MultiEstimateResponse {
    pub boxes: Vec<EstimatedBoxType>,
    pub total_weight: f64,
    pub max_weight: f64,
    pub efficiency: f64,
    pub remaining_height: f64,
    pub is_complete: bool,
}

/// Single box type in the multi-type response.
///
/// # Fields
/// * `index` - Position in the request
/// * `target` - Requested quantity, `null` when unbounded
/// * `actual` - Fitted quantity
/// * `shortfall` - Requested units that did not fit
#[derive(Serialize, ToSchema)]
pub struct EstimatedBoxType {
    pub index: usize,
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([60.0, 40.0, 40.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub target: Option<u64>,
    pub actual: u64,
    pub shortfall: Option<u64>,
}

impl MultiEstimateResponse {
    /// Creates a MultiEstimateResponse from a PackingResult.
    pub fn from_packing_result(result: PackingResult, container: &Container) -> Self {
        let is_complete = result.is_complete();
        let PackingResult {
            box_types,
            total_weight,
            efficiency,
            remaining_height,
            ..
        } = result;

        Self {
            boxes: box_types
                .into_iter()
                .map(|b| EstimatedBoxType {
                    shortfall: b.shortfall(),
                    target: b.target.as_count(),
                    index: b.index,
                    dims: b.dims.as_tuple(),
                    weight: b.unit_weight,
                    actual: b.actual,
                    name: b.name,
                })
                .collect(),
            total_weight,
            max_weight: container.max_weight,
            efficiency,
            remaining_height,
            is_complete,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    version: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn estimate_error(err: EstimateError) -> Response {
    match err {
        EstimateError::InvalidGeometry(inner) => container_config_error(inner.to_string()),
    }
}

fn parse_multi_request(
    payload: Result<Json<MultiEstimateRequest>, JsonRejection>,
    config: &EstimatorConfig,
) -> Result<ValidatedMultiRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload
        .into_validated(config.default_gap)
        .map_err(|err| container_config_error(err.to_string()))
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_single, handle_multi, handle_multi_stream, handle_health),
    components(
        schemas(
            ContainerRequest,
            SingleEstimateRequest,
            SingleEstimateResponse,
            BoxTypeRequest,
            TargetRequest,
            TargetKeyword,
            MultiEstimateRequest,
            MultiEstimateResponse,
            EstimatedBoxType,
            PackEvent,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags((name = "estimate", description = "Endpoints for container load estimates"))
)]
struct ApiDoc;

/// Builds the application router with all endpoints.
fn router(estimator: EstimatorSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { estimator };

    Router::new()
        // API endpoints
        .route("/estimate/single", post(handle_single))
        .route("/estimate/multi", post(handle_multi))
        .route("/estimate/multi_stream", post(handle_multi_stream))
        .route("/health", get(handle_health))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from a frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    estimator: EstimatorSettings,
) -> std::io::Result<()> {
    let app = router(estimator);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let display_host = config.display_host().to_string();
    info!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /estimate/single, POST /estimate/multi, POST /estimate/multi_stream");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /estimate/single.
///
/// Counts how many boxes of one type fit into the container.
#[utoipa::path(
    post,
    path = "/estimate/single",
    request_body = SingleEstimateRequest,
    responses(
        (status = 200, description = "Estimate computed", body = SingleEstimateResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container geometry",
            body = ErrorResponse
        )
    ),
    tag = "estimate"
)]
async fn handle_single(
    State(state): State<ApiState>,
    payload: Result<Json<SingleEstimateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let config = state.estimator.estimator_config();
    let container = match request.container.into_container(config.default_gap) {
        Ok(container) => container,
        Err(err) => return container_config_error(err.to_string()),
    };
    let item = Dimensions::from_tuple(request.dims);

    info!(
        "📥 New single estimate: box {:?} in container {:?}",
        item.as_tuple(),
        container.dims.as_tuple()
    );
    match compute_single(&container, item, request.weight, &config) {
        Ok(estimate) => {
            info!(
                "📦 Result: {} boxes (capacity {}), {:.2}% filled",
                estimate.count, estimate.capacity, estimate.efficiency
            );
            let response = SingleEstimateResponse::from_estimate(estimate, &container);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => estimate_error(err),
    }
}

/// Handler for POST /estimate/multi.
///
/// Loads several box types layer by layer, largest first.
#[utoipa::path(
    post,
    path = "/estimate/multi",
    request_body = MultiEstimateRequest,
    responses(
        (status = 200, description = "Estimate computed", body = MultiEstimateResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container geometry",
            body = ErrorResponse
        )
    ),
    tag = "estimate"
)]
async fn handle_multi(
    State(state): State<ApiState>,
    payload: Result<Json<MultiEstimateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_multi_request(payload, &state.estimator.estimator_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!("📥 New multi estimate: {} box types", request.box_type_count());
    let (container, box_types, keep_input_order) = request.into_parts();

    match compute_multi(&container, box_types) {
        Ok(result) => {
            info!(
                "📦 Result: {} units, {:.1} kg, {:.2}% filled",
                result.total_actual(),
                result.total_weight,
                result.efficiency
            );
            let result = if keep_input_order {
                result.in_input_order()
            } else {
                result
            };
            let response = MultiEstimateResponse::from_packing_result(result, &container);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => estimate_error(err),
    }
}

/// Handler for POST /estimate/multi_stream (SSE).
///
/// Streams one event per box type as Server-Sent Events (text/event-stream),
/// followed by a final `Finished` event.
#[utoipa::path(
    post,
    path = "/estimate/multi_stream",
    request_body = MultiEstimateRequest,
    responses(
        (
            status = 200,
            description = "Streams estimate events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container geometry",
            body = ErrorResponse
        )
    ),
    tag = "estimate"
)]
async fn handle_multi_stream(
    State(state): State<ApiState>,
    payload: Result<Json<MultiEstimateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_multi_request(payload, &state.estimator.estimator_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (container, box_types, _) = request.into_parts();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || stream_estimate(&container, box_types, tx));

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Runs the multi-type estimate and forwards every event as JSON into `tx`.
///
/// Blocks on a full channel, so it must run outside the async runtime.
fn stream_estimate(container: &Container, box_types: Vec<BoxType>, tx: mpsc::Sender<String>) {
    let outcome = compute_multi_with_progress(container, box_types, |evt| {
        if let Ok(json) = serde_json::to_string(evt) {
            // A closed receiver just drops the remaining events
            let _ = tx.blocking_send(json);
        }
    });
    if let Err(err) = outcome {
        warn!("⚠️ Streaming estimate aborted: {err}");
    }
}

/// Handler for GET /health.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "estimate"
)]
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
