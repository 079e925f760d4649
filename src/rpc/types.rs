use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: RpcErrorBody) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One message on the host/UI channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "rpc-request")]
    Request { request: RpcRequest },

    #[serde(rename = "rpc-response")]
    Response { response: RpcResponse },

    /// Host-initiated push (job status and progress).
    #[serde(rename = "transfer-event")]
    Event { event: Value },
}

impl Envelope {
    pub fn request(request: RpcRequest) -> Self {
        Envelope::Request { request }
    }

    pub fn response(response: RpcResponse) -> Self {
        Envelope::Response { response }
    }

    pub fn event(event: Value) -> Self {
        Envelope::Event { event }
    }
}

/// Params for methods that take none.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NoParams {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let env = Envelope::request(RpcRequest {
            id: "1".into(),
            method: "transfer.getAllJobs".into(),
            params: Value::Null,
        });

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "rpc-request");
        assert_eq!(json["request"]["method"], "transfer.getAllJobs");
    }

    #[test]
    fn test_response_envelope_parse() {
        let raw = json!({
            "type": "rpc-response",
            "response": {
                "id": "abc",
                "error": { "code": -32005, "message": "missing" }
            }
        });

        let env: Envelope = serde_json::from_value(raw).unwrap();
        match env {
            Envelope::Response { response } => {
                assert_eq!(response.id, "abc");
                assert!(response.result.is_none());
                assert_eq!(response.error.unwrap().code, -32005);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_success_omits_error() {
        let resp = RpcResponse::success("7", json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("error"));
    }
}
