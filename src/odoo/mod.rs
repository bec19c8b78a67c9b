use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::config;
use crate::odoo::model::{RpcParams, RpcRequest, RpcResponse};

pub mod domain;
pub mod model;

pub use domain::{Domain, DomainItem};

/// Record collection holding customers.
pub const PARTNER_MODEL: &str = "res.partner";

/// Search/read/create/write primitives against named record collections.
#[async_trait]
pub trait CustomerBackend: Send + Sync {
    async fn search(&self, model: &str, domain: &Domain) -> Result<Vec<i64>>;

    async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Value>>;

    async fn create(&self, model: &str, values: Map<String, Value>) -> Result<i64>;

    async fn write(&self, model: &str, ids: &[i64], values: Map<String, Value>) -> Result<bool>;
}

/// An authenticated JSON-RPC session with an Odoo server.
pub struct OdooClient {
    http: Client,
    endpoint: Url,
    db: String,
    uid: i64,
    password: String,
    next_id: AtomicU64,
}

impl fmt::Debug for OdooClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdooClient")
            .field("endpoint", &self.endpoint)
            .field("db", &self.db)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

impl OdooClient {
    /// Authenticate against the configured backend and keep the session.
    pub async fn login(cfg: &config::Backend) -> Result<Self> {
        let endpoint = jsonrpc_endpoint(&cfg.url)?;
        let mut client = Self::with_session(endpoint, cfg.db.clone(), 0, cfg.password.clone())?;

        let result = client
            .call(
                "common",
                "authenticate",
                &[
                    json!(cfg.db),
                    json!(cfg.username),
                    json!(cfg.password),
                    json!({}),
                ],
            )
            .await
            .context("backend authentication request failed")?;
        client.uid = parse_uid(&result).with_context(|| {
            format!(
                "backend rejected credentials for {} on database {}",
                cfg.username, cfg.db
            )
        })?;
        info!(uid = client.uid, db = %cfg.db, "authenticated with backend");
        Ok(client)
    }

    /// Build a client for an already known session.
    pub fn with_session(endpoint: Url, db: String, uid: i64, password: String) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("ldap-customer-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            db,
            uid,
            password,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn build_request(
        &self,
        service: &str,
        method: &str,
        args: &[Value],
    ) -> Result<reqwest::Request> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            method: "call",
            params: RpcParams {
                service,
                method,
                args,
            },
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.http
            .post(self.endpoint.clone())
            .json(&body)
            .build()
            .context("failed to build backend request")
    }

    async fn call(&self, service: &str, method: &str, args: &[Value]) -> Result<Value> {
        let request = self.build_request(service, method, args)?;
        debug!(service, method, url = %request.url(), "backend rpc call");

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach backend")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "backend HTTP error");
            return Err(anyhow!("backend HTTP error {}: {}", status, body));
        }

        let payload: RpcResponse = res
            .json()
            .await
            .context("invalid backend JSON-RPC response")?;
        into_result(payload).with_context(|| format!("backend call {service}.{method} failed"))
    }

    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        debug!(model, method, "execute_kw");
        self.call(
            "object",
            "execute_kw",
            &[
                json!(self.db),
                json!(self.uid),
                json!(self.password),
                json!(model),
                json!(method),
                Value::Array(args),
                Value::Object(kwargs),
            ],
        )
        .await
    }
}

#[async_trait]
impl CustomerBackend for OdooClient {
    async fn search(&self, model: &str, domain: &Domain) -> Result<Vec<i64>> {
        let result = self
            .execute_kw(model, "search", vec![domain.to_value()], Map::new())
            .await?;
        serde_json::from_value(result).context("search did not return a list of ids")
    }

    async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Value>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".into(), json!(fields));
        let result = self
            .execute_kw(model, "read", vec![json!(ids)], kwargs)
            .await?;
        serde_json::from_value(result).context("read did not return a list of records")
    }

    async fn create(&self, model: &str, values: Map<String, Value>) -> Result<i64> {
        let result = self
            .execute_kw(model, "create", vec![Value::Object(values)], Map::new())
            .await?;
        result
            .as_i64()
            .ok_or_else(|| anyhow!("create returned {result} instead of an id"))
    }

    async fn write(&self, model: &str, ids: &[i64], values: Map<String, Value>) -> Result<bool> {
        let result = self
            .execute_kw(
                model,
                "write",
                vec![json!(ids), Value::Object(values)],
                Map::new(),
            )
            .await?;
        result
            .as_bool()
            .ok_or_else(|| anyhow!("write returned {result} instead of a boolean"))
    }
}

/// `<base>/jsonrpc`, keeping any path prefix of `base`.
pub fn jsonrpc_endpoint(base: &str) -> Result<Url> {
    let mut base = Url::parse(base.trim()).with_context(|| format!("invalid backend URL {base}"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("jsonrpc").context("invalid backend URL")
}

/// The backend answers `false` instead of a uid when credentials are wrong.
fn parse_uid(result: &Value) -> Result<i64> {
    match result {
        Value::Number(n) => n.as_i64().ok_or_else(|| anyhow!("invalid uid {n}")),
        Value::Bool(false) => Err(anyhow!("authentication refused")),
        other => Err(anyhow!("unexpected authentication result {other}")),
    }
}

fn into_result(payload: RpcResponse) -> Result<Value> {
    if let Some(err) = payload.error {
        return Err(anyhow!("{}", err.detail()));
    }
    Ok(payload.result.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OdooClient {
        let endpoint = jsonrpc_endpoint("https://odoo.example.com").unwrap();
        OdooClient::with_session(endpoint, "prod".into(), 2, "secret".into()).unwrap()
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        assert_eq!(
            jsonrpc_endpoint("https://odoo.example.com").unwrap().as_str(),
            "https://odoo.example.com/jsonrpc"
        );
        assert_eq!(
            jsonrpc_endpoint("https://example.com/odoo").unwrap().as_str(),
            "https://example.com/odoo/jsonrpc"
        );
        assert_eq!(
            jsonrpc_endpoint("https://example.com/odoo/").unwrap().as_str(),
            "https://example.com/odoo/jsonrpc"
        );
        assert!(jsonrpc_endpoint("not a url").is_err());
    }

    #[test]
    fn build_request_wraps_call_in_jsonrpc_envelope() {
        let client = client();
        let request = client
            .build_request("object", "execute_kw", &[json!("prod"), json!(2)])
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/jsonrpc");
        assert_eq!(
            request
                .headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );

        let body: Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "call");
        assert_eq!(body["params"]["service"], "object");
        assert_eq!(body["params"]["method"], "execute_kw");
        assert_eq!(body["params"]["args"], json!(["prod", 2]));
    }

    #[test]
    fn request_ids_increase() {
        let client = client();
        let id_of = |req: reqwest::Request| -> u64 {
            let body: Value =
                serde_json::from_slice(req.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
            body["id"].as_u64().unwrap()
        };
        let first = id_of(client.build_request("common", "version", &[]).unwrap());
        let second = id_of(client.build_request("common", "version", &[]).unwrap());
        assert!(second > first);
    }

    #[test]
    fn parse_uid_accepts_number_and_refuses_false() {
        assert_eq!(parse_uid(&json!(7)).unwrap(), 7);
        assert!(parse_uid(&json!(false)).is_err());
        assert!(parse_uid(&json!("7")).is_err());
    }

    #[test]
    fn rpc_error_surfaces_server_message() {
        let payload: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": 200,
                "message": "Odoo Server Error",
                "data": {
                    "name": "odoo.exceptions.AccessError",
                    "message": "You are not allowed to modify this document"
                }
            }
        }))
        .unwrap();
        let err = into_result(payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You are not allowed to modify this document (odoo.exceptions.AccessError)"
        );

        let payload: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 2, "result": [1, 2] }))
                .unwrap();
        assert_eq!(into_result(payload).unwrap(), json!([1, 2]));
    }
}
