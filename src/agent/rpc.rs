//! JSON-RPC 2.0 envelopes and error codes.

use serde_json::{Value, json};

use crate::context::LoadError;

#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse(err: serde_json::Error) -> Self {
        Self::new(-32700, format!("parse error: {err}"))
    }

    pub fn invalid_request() -> Self {
        Self::new(-32600, "invalid request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal(message: String) -> Self {
        Self::new(-32603, message)
    }

    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(-32002, format!("resource not found: {uri}"))
    }
}

impl From<LoadError> for RpcError {
    fn from(err: LoadError) -> Self {
        Self::internal(err.to_string())
    }
}

pub fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn error(id: Value, err: &RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code, "message": err.message },
    })
}
