//! Single normalization boundary between the location endpoints and the core.
//!
//! A list call is a [`ListRequest`] sent through the Http capability and read
//! back with [`LocationGateway::read`]. The three envelope shapes the backend
//! emits are flattened here and nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::capabilities::{route_of, AppHttp, BaseUrl, HttpResult, REQUEST_ID_HEADER};
use crate::config::{ConfigError, GatewayConfig};
use crate::error::LocationError;
use crate::event::Event;
use crate::model::{Level, LocationId, LocationNode, RawId};

const LOCATIONS_SEGMENT: &str = "locations";

/// Resource segment and fallback query parameter for each level.
const fn endpoint(level: Level) -> (&'static str, Option<&'static str>) {
    match level {
        Level::Country => ("countries", None),
        Level::Department => ("department-states", Some("countryId")),
        Level::Municipality => ("municipalities", Some("departmentId")),
        Level::Village => ("villages", Some("municipalityId")),
    }
}

#[derive(Deserialize)]
struct RawNode {
    id: RawId,
    name: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// `/locations/villages/M9` or `/locations/villages?municipalityId=M9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteForm {
    Path,
    Query,
}

/// One list call, tagged with the id sent as `X-Request-Id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub level: Level,
    pub parent: Option<LocationId>,
    pub form: RouteForm,
    pub request_id: String,
}

impl ListRequest {
    /// `parent` is ignored for countries and required for every other level.
    pub fn new(level: Level, parent: Option<&str>) -> Result<Self, LocationError> {
        let parent = match level.parent() {
            None => None,
            Some(_) => Some(
                parent
                    .and_then(|id| LocationId::new(id).ok())
                    .ok_or(LocationError::InvalidParent { level })?,
            ),
        };
        Ok(Self {
            level,
            parent,
            form: RouteForm::Path,
            request_id: Uuid::new_v4().to_string(),
        })
    }

    /// The query-parameter form of a path-form request, under a fresh id.
    #[must_use]
    pub fn fallback(&self) -> Option<Self> {
        if self.form != RouteForm::Path || self.parent.is_none() {
            return None;
        }
        Some(Self {
            form: RouteForm::Query,
            request_id: Uuid::new_v4().to_string(),
            ..self.clone()
        })
    }
}

/// How a finished list call reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Loaded(Vec<LocationNode>),
    Failed(LocationError),
    /// The path form failed in transit; send this query-form request instead.
    Retry(ListRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationGateway {
    base_url: BaseUrl,
    config: GatewayConfig,
}

impl LocationGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let base_url = config.validate()?;
        Ok(Self { base_url, config })
    }

    pub fn url(&self, request: &ListRequest) -> Result<Url, LocationError> {
        let (resource, query_param) = endpoint(request.level);
        let parent = request.parent.as_ref().map(LocationId::as_str);

        let built = match (request.form, parent, query_param) {
            (RouteForm::Query, Some(parent), Some(param)) => self
                .base_url
                .endpoint(&[LOCATIONS_SEGMENT, resource], Some((param, parent))),
            (_, Some(parent), Some(_)) => self
                .base_url
                .endpoint(&[LOCATIONS_SEGMENT, resource, parent], None),
            (_, None, Some(_)) => {
                return Err(LocationError::InvalidParent {
                    level: request.level,
                })
            }
            (_, _, None) => self.base_url.endpoint(&[LOCATIONS_SEGMENT, resource], None),
        };
        built.map_err(|e| LocationError::transport(None, e.to_string(), &request.request_id))
    }

    /// Issues `request` as a `GET`; `make_event` turns the answer into the
    /// event that carries it back to `update`.
    pub fn send<F>(
        &self,
        http: &AppHttp,
        request: ListRequest,
        make_event: F,
    ) -> Result<(), LocationError>
    where
        F: FnOnce(ListRequest, HttpResult) -> Event + Send + 'static,
    {
        let url = self.url(&request)?;
        debug!(
            level = %request.level,
            route = %route_of(&url),
            request_id = %request.request_id,
            "requesting location list"
        );
        let request_id = request.request_id.clone();
        http.get(url.as_str())
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .send(move |result| make_event(request, result));
        Ok(())
    }

    /// Reads the answer to `request`. A failed exchange in path form asks for
    /// the query form when the fallback is on; a body that arrived but does
    /// not parse is final.
    pub fn read(&self, request: &ListRequest, result: HttpResult) -> ListOutcome {
        let body = match exchange(request, result) {
            Ok(body) => body,
            Err(error) => {
                if self.config.query_fallback {
                    if let Some(next) = request.fallback() {
                        debug!(%error, level = %request.level, "path form failed, retrying with query parameter");
                        return ListOutcome::Retry(next);
                    }
                }
                warn!(%error, level = %request.level, "location request failed");
                return ListOutcome::Failed(error);
            }
        };

        if body.len() > self.config.max_response_bytes {
            return ListOutcome::Failed(LocationError::malformed(
                request.level,
                format!(
                    "body of {} bytes exceeds maximum of {}",
                    body.len(),
                    self.config.max_response_bytes
                ),
            ));
        }

        match normalize(request.level, &body) {
            Ok(nodes) => {
                debug!(level = %request.level, count = nodes.len(), "location list loaded");
                ListOutcome::Loaded(nodes)
            }
            Err(error) => {
                let error = error.with_request_id(&request.request_id);
                warn!(%error, level = %request.level, "unusable location payload");
                ListOutcome::Failed(error)
            }
        }
    }
}

/// The body of a 2xx answer, or the transport failure it amounts to.
fn exchange(request: &ListRequest, result: HttpResult) -> Result<Vec<u8>, LocationError> {
    let rejected = |status: u16, body: &[u8]| {
        let message = serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("HTTP error: {status}"));
        LocationError::transport(Some(status), message, &request.request_id)
    };

    match result {
        Ok(mut response) => {
            let status = response.status();
            let body = response.take_body().unwrap_or_default();
            if status.is_success() {
                Ok(body)
            } else {
                Err(rejected(u16::from(status), &body))
            }
        }
        Err(crux_http::HttpError::Http { code, body, .. }) => {
            Err(rejected(u16::from(code), body.as_deref().unwrap_or_default()))
        }
        Err(error) => Err(LocationError::transport(
            None,
            error.to_string(),
            &request.request_id,
        )),
    }
}

/// Flattens a bare array, `{data: [...]}` or `{success, data: [...]}` into
/// nodes of `level`. `{success: false}` is a server-reported failure.
pub fn normalize(level: Level, body: &[u8]) -> Result<Vec<LocationNode>, LocationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| LocationError::malformed(level, format!("invalid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(Value::Bool(false)) = map.get("success") {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("server reported failure")
                    .to_string();
                return Err(LocationError::Transport {
                    status: None,
                    message,
                    request_id: None,
                });
            }
            match map.remove("data") {
                Some(Value::Array(items)) => items,
                Some(_) => return Err(LocationError::malformed(level, "`data` is not a list")),
                None => return Err(LocationError::malformed(level, "object without `data`")),
            }
        }
        other => {
            return Err(LocationError::malformed(
                level,
                format!("expected a list, got {}", json_type(&other)),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawNode = serde_json::from_value(item)
                .map_err(|e| LocationError::malformed(level, format!("item {index}: {e}")))?;
            let id = raw
                .id
                .into_id()
                .ok_or_else(|| LocationError::malformed(level, format!("item {index}: empty id")))?;
            Ok(LocationNode::new(id, raw.name, level))
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
