//! Uniform response envelope with CORS headers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

/// Proxy-integration response returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded body
    pub body: String,
}

impl ApiResponse {
    /// Decode the body, for callers and tests that want the value back.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Wrap a status and body in the envelope every handler returns.
pub fn build_response<T: Serialize + ?Sized>(
    status_code: u16,
    body: &T,
    allowed_origin: &str,
) -> ApiResponse {
    let headers = BTreeMap::from([
        (
            "Access-Control-Allow-Origin".to_string(),
            allowed_origin.to_string(),
        ),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "GET,POST,OPTIONS".to_string(),
        ),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]);

    match serde_json::to_string(body) {
        Ok(body) => ApiResponse {
            status_code,
            headers,
            body,
        },
        Err(e) => {
            log::error!("Response body failed to encode: {}", e);
            ApiResponse {
                status_code: 500,
                headers,
                body: json!({ "message": "Internal error" }).to_string(),
            }
        }
    }
}

/// `{"message": ...}` body used by every non-data response.
pub fn message(text: &str) -> serde_json::Value {
    json!({ "message": text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_cors_headers() {
        let response = build_response(200, &message("ok"), "*");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers["Access-Control-Allow-Headers"], "Content-Type");
        assert_eq!(
            response.headers["Access-Control-Allow-Methods"],
            "GET,POST,OPTIONS"
        );
        assert_eq!(response.body, r#"{"message":"ok"}"#);
    }

    #[test]
    fn origin_is_configurable() {
        let response = build_response(404, &message("Not found"), "https://rotationsinfo.com");
        assert_eq!(
            response.headers["Access-Control-Allow-Origin"],
            "https://rotationsinfo.com"
        );
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn envelope_serializes_for_the_gateway() {
        let response = build_response(200, &[1, 2, 3], "*");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "[1,2,3]");
        assert_eq!(json["headers"]["Content-Type"], "application/json");
    }
}
