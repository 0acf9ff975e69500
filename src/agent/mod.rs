//! Automation protocol: line-delimited JSON-RPC 2.0 over stdio.
//!
//! Resources are read through [`SiteContext::load`], so a client always
//! sees content at least as fresh as the last change notification.
//!
//! | URI                       | Contents                           |
//! |---------------------------|------------------------------------|
//! | `forge://pages`           | Every page (without body)          |
//! | `forge://tags`            | Sorted, deduplicated tags          |
//! | `forge://categories`      | Sorted, deduplicated categories    |
//! | `forge://sections`        | Section names                      |
//! | `forge://sections/<name>` | Pages in one section               |

mod rpc;


use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::context::SiteContext;
use rpc::RpcError;

/// Resource whose change notification covers all content.
pub const PAGES_URI: &str = "forge://pages";
const TAGS_URI: &str = "forge://tags";
const CATEGORIES_URI: &str = "forge://categories";
const SECTIONS_URI: &str = "forge://sections";
const SECTION_PREFIX: &str = "forge://sections/";

const PROTOCOL_VERSION: &str = "2024-11-05";
const JSON_MIME: &str = "application/json";

/// Writes whole JSON lines; responses and notifications never interleave.
#[derive(Clone)]
pub struct Notifier {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Notifier {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        let out: Box<dyn Write + Send> = Box::new(out);
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn send(&self, message: &Value) -> io::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut out = self.out.lock();
        out.write_all(&line)?;
        out.flush()
    }

    /// Tell the client that `uri` changed. Carries no payload.
    pub fn resource_updated(&self, uri: &str) -> io::Result<()> {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/resources/updated",
            "params": { "uri": uri },
        }))
    }
}

pub struct Agent {
    context: Arc<SiteContext>,
    out: Notifier,
}

impl Agent {
    pub fn new(context: Arc<SiteContext>, out: Notifier) -> Self {
        Self { context, out }
    }

    /// Answer requests from `input` until it is closed.
    pub fn run(&self, input: impl BufRead) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_message(&line) {
                self.out.send(&reply)?;
            }
        }
        Ok(())
    }

    /// Handle one JSON-RPC message. Notifications produce no reply.
    pub fn handle_message(&self, line: &str) -> Option<Value> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => return Some(rpc::error(Value::Null, &RpcError::parse(e))),
        };

        let id = message.get("id").cloned();
        let Some(method) = message.get("method").and_then(Value::as_str) else {
            return Some(rpc::error(id.unwrap_or(Value::Null), &RpcError::invalid_request()));
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        // No id: a notification, e.g. `notifications/initialized`
        let id = id?;
        crate::debug!("agent"; "{}", method);

        Some(match self.dispatch(method, &params) {
            Ok(result) => rpc::success(id, result),
            Err(err) => rpc::error(id, &err),
        })
    }

    fn dispatch(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": {
                    "resources": { "subscribe": true, "listChanged": false },
                },
            })),
            "ping" | "resources/subscribe" | "resources/unsubscribe" => Ok(json!({})),
            "resources/list" => self.list_resources(),
            "resources/read" => {
                let uri = params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::invalid_params("missing `uri`"))?;
                self.read_resource(uri)
            }
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn list_resources(&self) -> Result<Value, RpcError> {
        let site = self.context.load()?;

        let fixed = [
            (PAGES_URI, "pages"),
            (TAGS_URI, "tags"),
            (CATEGORIES_URI, "categories"),
            (SECTIONS_URI, "sections"),
        ];
        let mut resources: Vec<Value> = fixed
            .iter()
            .map(|(uri, name)| resource_entry(uri, name))
            .collect();
        for section in site.sections() {
            let uri = format!("{SECTION_PREFIX}{section}");
            resources.push(resource_entry(&uri, &format!("section: {section}")));
        }
        Ok(json!({ "resources": resources }))
    }

    fn read_resource(&self, uri: &str) -> Result<Value, RpcError> {
        let site = self.context.load()?;

        let data = match uri {
            PAGES_URI => serde_json::to_value(&site.pages),
            TAGS_URI => serde_json::to_value(site.tags()),
            CATEGORIES_URI => serde_json::to_value(site.categories()),
            SECTIONS_URI => serde_json::to_value(site.sections()),
            _ => match uri.strip_prefix(SECTION_PREFIX) {
                Some(name) if site.sections().iter().any(|s| s == name) => {
                    serde_json::to_value(site.section_pages(name))
                }
                _ => return Err(RpcError::resource_not_found(uri)),
            },
        }
        .map_err(|e| RpcError::internal(e.to_string()))?;

        Ok(json!({
            "contents": [{
                "uri": uri,
                "mimeType": JSON_MIME,
                "text": data.to_string(),
            }],
        }))
    }
}

fn resource_entry(uri: &str, name: &str) -> Value {
    json!({ "uri": uri, "name": name, "mimeType": JSON_MIME })
}
