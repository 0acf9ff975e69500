//! HTTP response construction.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tiny_http::{Header, Response, StatusCode};

use crate::utils::mime::types::{HTML, PLAIN};

const NOT_FOUND_BODY: &[u8] = b"404 Not Found";

/// Headers that keep the browser from caching anything during development.
const NO_CACHE: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// A response body with its status and headers, before it goes on the wire.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// `Content-Security-Policy` value, if any
    pub csp: Option<String>,
}

impl Reply {
    pub fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
            csp: None,
        }
    }

    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self::new(200, content_type, body)
    }

    pub fn with_csp(mut self, policy: String) -> Self {
        self.csp = Some(policy);
        self
    }

    /// Every header sent with this reply.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![("Content-Type", self.content_type)];
        headers.extend(NO_CACHE);
        if let Some(policy) = &self.csp {
            headers.push(("Content-Security-Policy", policy.as_str()));
        }
        headers
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .into_iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let headers: Vec<Header> = self
            .headers()
            .into_iter()
            .filter_map(|(field, value)| Header::from_bytes(field.as_bytes(), value.as_bytes()).ok())
            .collect();

        let mut response = Response::from_data(self.body).with_status_code(StatusCode(self.status));
        for header in headers {
            response.add_header(header);
        }
        response
    }
}

/// 404 reply: `<root>/404.html` verbatim if present, plain text otherwise.
///
/// The custom page is served without live-reload injection.
pub fn not_found(root: &Path) -> Reply {
    let custom = root.join("404.html");
    if custom.is_file()
        && let Ok(body) = fs::read(&custom)
    {
        return Reply::new(404, HTML, body);
    }
    Reply::new(404, PLAIN, NOT_FOUND_BODY.to_vec())
}

/// 500 reply for a file that resolved but could not be read.
pub fn internal_error(message: &str) -> Reply {
    Reply::new(500, PLAIN, format!("500 Internal Server Error\n{message}").into_bytes())
}
