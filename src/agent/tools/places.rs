//! Place search tool backed by the serper.dev places endpoint.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::base::{require_str, Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

const DEFAULT_API_BASE: &str = "https://google.serper.dev/places";

/// Search for locations by free-text query, optionally scoped to a country.
pub struct PlaceSearchTool {
    api_key: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl PlaceSearchTool {
    /// If `api_key` is `None`, the `SERPER_API_KEY` environment variable is
    /// checked. Passing `Some("")` explicitly disables env fallback.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self::with_api_base(api_key, DEFAULT_API_BASE, timeout)
    }

    pub fn with_api_base(api_key: Option<String>, api_base: &str, timeout: Duration) -> Self {
        let resolved_key = match api_key {
            Some(key) => key,
            None => std::env::var("SERPER_API_KEY").unwrap_or_default(),
        };
        Self {
            api_key: resolved_key,
            api_base: api_base.to_string(),
            client: Client::new(),
            timeout,
        }
    }
}

/// Project one provider place record into the fields the model needs,
/// preserving provider order and rank.
fn project_place(place: &serde_json::Value) -> serde_json::Value {
    json!({
        "position": place.get("position").cloned().unwrap_or(serde_json::Value::Null),
        "title": place.get("title").cloned().unwrap_or(serde_json::Value::Null),
        "address": place.get("address").cloned().unwrap_or(serde_json::Value::Null),
        "latitude": place.get("latitude").cloned().unwrap_or(serde_json::Value::Null),
        "longitude": place.get("longitude").cloned().unwrap_or(serde_json::Value::Null),
        "category": place.get("category").cloned().unwrap_or(serde_json::Value::Null),
        "website": place.get("website").cloned().unwrap_or(serde_json::Value::Null),
        "cid": place.get("cid").cloned().unwrap_or(serde_json::Value::Null),
    })
}

#[async_trait]
impl Tool for PlaceSearchTool {
    fn name(&self) -> &str {
        "search_places"
    }

    fn description(&self) -> &str {
        "Search for locations on the map. Returns top results with title, address, coordinates, category, and website."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "country": {
                    "type": "string",
                    "description": "Optional two-letter country code (e.g. 'sg' for Singapore)"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let query = match require_str(&args, "query") {
            Ok(q) => q.to_string(),
            Err(kind) => return ToolOutcome::failure(kind),
        };
        let country = args.get("country").and_then(|v| v.as_str());

        if self.api_key.is_empty() {
            return ToolOutcome::failure(ToolErrorKind::InvalidArguments(
                "SERPER_API_KEY not configured".to_string(),
            ));
        }

        let mut payload = json!({ "q": query });
        if let Some(gl) = country {
            payload["gl"] = json!(gl);
        }

        let response = match self
            .client
            .post(&self.api_base)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                    "place search provider unreachable: {}",
                    e
                )));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                "place search provider returned HTTP {}",
                status
            )));
        }

        let data: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::MalformedResponse(format!(
                    "unparseable place search payload: {}",
                    e
                )));
            }
        };

        // The result field is part of the provider contract; its absence on
        // a 2xx is a malformed payload, not an empty result.
        let places = match data.get("places").and_then(|p| p.as_array()) {
            Some(arr) => arr,
            None => {
                return ToolOutcome::failure(ToolErrorKind::MalformedResponse(
                    "missing field 'places' in provider payload".to_string(),
                ));
            }
        };

        let projected: Vec<serde_json::Value> = places.iter().map(project_place).collect();
        match serde_json::to_string_pretty(&projected) {
            Ok(rendered) => ToolOutcome::success(rendered),
            Err(e) => ToolOutcome::failure(ToolErrorKind::ExecutionFailed(e.to_string())),
        }
    }
}
