use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Debug)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: RpcParams<'a>,
    pub id: u64,
}

#[derive(Serialize, Debug)]
pub struct RpcParams<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub args: &'a [Value],
}

#[derive(Deserialize, Debug)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<RpcErrorData>,
}

#[derive(Deserialize, Debug)]
pub struct RpcErrorData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RpcError {
    /// The server-side exception message when present, else the envelope's.
    pub fn detail(&self) -> String {
        match &self.data {
            Some(RpcErrorData {
                name: Some(name),
                message: Some(message),
            }) => format!("{message} ({name})"),
            Some(RpcErrorData {
                message: Some(message),
                ..
            }) => message.clone(),
            _ => format!("{} (code {})", self.message, self.code),
        }
    }
}
