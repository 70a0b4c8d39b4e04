//! JSON-RPC 2.0 message types for the compiler process bridge.
//!
//! Both sides send requests: the host asks for a `build`, the compiler
//! calls back with `resolve` and `load` while the build is running.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Codes the host answers a bad compiler callback with.
pub mod error_codes {
    /// The compiler wrote a line that is not JSON.
    pub const PARSE_ERROR: i32 = -32700;
    /// A callback other than `resolve` or `load`.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// `resolve` or `load` params that do not fit the hook argument types.
    pub const INVALID_PARAMS: i32 = -32602;
    /// A hook result that could not be encoded.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Method the host invokes to start a build.
pub const METHOD_BUILD: &str = "build";
/// Callback the compiler invokes to resolve a specifier.
pub const METHOD_RESOLVE: &str = "resolve";
/// Callback the compiler invokes to load a module.
pub const METHOD_LOAD: &str = "load";

/// A `build` call from the host, or a hook callback from the compiler.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Answer to a [`Request`]: build output, a hook result, or an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Answer a callback with a hook result.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Reject a callback the hooks cannot serve.
    pub fn error(id: u64, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Error half of a [`Response`].
///
/// A failed build carries its diagnostics in `data.errors`; a rejected
/// callback leaves `data` empty.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Any line read from the compiler: a callback request or a response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Request(Request),
    Response(Response),
}
