//! Development server with live reload support.
//!
//! Files are served over HTTP by `tiny_http`; the reload WebSocket lives
//! on its own port:
//!
//! ```text
//! http port --> tiny_http --> request pool --> handle_request --> output dir
//! ws port   --> accept loop --> hub::accept --> Hub
//! ```
//!
//! `handle_request` is a pure function of the URL and the output
//! directory, so it is tested without sockets.

mod inject;
mod lifecycle;
mod nonce;
mod path;
mod response;


use std::fs;
use std::io;
use std::net::{IpAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, TryRecvError};
use thiserror::Error;

use crate::config::SiteConfig;
use crate::embed::serve::{LIVERELOAD_JS, LiveReloadVars};
use crate::hub::{self, Hub};
use crate::utils::mime::{self, types};
use crate::watch::Watcher;
use lifecycle::InFlight;
pub use response::Reply;

/// Grace period for in-flight requests on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// How often the accept loops check for cancellation.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind ports {first}-{last}: {source}")]
    Bind {
        first: u16,
        last: u16,
        #[source]
        source: io::Error,
    },
    #[error("failed to create request pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What to serve and how.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Build output directory. Read-only from the server's side.
    pub root: PathBuf,
    pub interface: IpAddr,
    pub port: u16,
    /// First port tried for the reload WebSocket
    pub ws_port: u16,
    pub live_reload: bool,
    pub csp_nonce: bool,
}

impl ServerOptions {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            root: config.build.output.clone(),
            interface: config.serve.interface,
            port: config.serve.port,
            ws_port: config.serve.ws_port,
            live_reload: config.serve.live_reload,
            csp_nonce: config.serve.csp_nonce,
        }
    }
}

/// Sockets bound by [`Server::bind`], not yet accepting.
pub struct Listeners {
    http: tiny_http::Server,
    /// Present when live reload is enabled
    ws: Option<TcpListener>,
}

pub struct Server {
    options: ServerOptions,
    hub: Arc<Hub>,
    watcher: Option<Arc<Watcher>>,
    /// Ports actually bound; the configured ones until then
    port: AtomicU16,
    ws_port: AtomicU16,
    in_flight: InFlight,
    stopping: AtomicBool,
}

impl Server {
    pub fn new(options: ServerOptions, hub: Arc<Hub>) -> Self {
        let port = AtomicU16::new(options.port);
        let ws_port = AtomicU16::new(options.ws_port);
        Self {
            options,
            hub,
            watcher: None,
            port,
            ws_port,
            in_flight: InFlight::default(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Run `watcher` alongside the server, stopping it with the server.
    pub fn with_watcher(mut self, watcher: Arc<Watcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    #[cfg(test)]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Acquire)
    }

    /// Port the reload script connects to.
    pub fn ws_port(&self) -> u16 {
        self.ws_port.load(Ordering::Acquire)
    }

    /// Bind the HTTP port and, with live reload, the WebSocket port.
    ///
    /// Each tries the next ports if the configured one is busy.
    pub fn bind(&self) -> Result<Listeners, ServeError> {
        let interface = self.options.interface;

        let http = lifecycle::bind_with_retry(interface, self.options.port, |addr| {
            tiny_http::Server::http(addr).map_err(io::Error::other)
        })?;
        let addr = http
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::other("HTTP listener has no IP address"))?;
        self.port.store(addr.port(), Ordering::Release);
        crate::log!("serve"; "http://{}", addr);

        let ws = if self.options.live_reload {
            let listener =
                lifecycle::bind_with_retry(interface, self.options.ws_port, |addr| TcpListener::bind(addr))?;
            let ws_addr = listener.local_addr()?;
            self.ws_port.store(ws_addr.port(), Ordering::Release);
            crate::debug!("serve"; "live reload on ws://{}{}", ws_addr, hub::WS_PATH);
            Some(listener)
        } else {
            None
        };

        Ok(Listeners { http, ws })
    }

    /// Bind and serve until `cancel` fires (or its sender is dropped).
    pub fn start(self: &Arc<Self>, cancel: Receiver<()>) -> Result<(), ServeError> {
        let listeners = self.bind()?;
        self.serve(listeners, cancel)
    }

    /// Serve on already bound listeners until cancelled, then shut down
    /// gracefully.
    pub fn serve(self: &Arc<Self>, listeners: Listeners, cancel: Receiver<()>) -> Result<(), ServeError> {
        let Listeners { http, ws } = listeners;

        let hub = Arc::clone(&self.hub);
        thread::Builder::new()
            .name("hub".into())
            .spawn(move || hub.run())?;

        if let Some(listener) = ws {
            let server = Arc::clone(self);
            thread::Builder::new()
                .name("ws-accept".into())
                .spawn(move || server.accept_ws(listener))?;
        }

        if let Some(watcher) = &self.watcher {
            let watcher = Arc::clone(watcher);
            thread::Builder::new()
                .name("watcher".into())
                .spawn(move || {
                    if let Err(e) = watcher.start() {
                        crate::log!("error"; "watcher stopped: {}", e);
                    }
                })?;
        }

        // Thread pool so a slow client cannot hold up other requests
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("http-{i}"))
            .build()?;

        while !self.stopping.load(Ordering::Acquire) {
            match cancel.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            match http.recv_timeout(ACCEPT_POLL) {
                Ok(Some(request)) => {
                    let guard = self.in_flight.begin();
                    let server = Arc::clone(self);
                    pool.spawn(move || {
                        server.respond(request);
                        drop(guard);
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    crate::debug!("serve"; "accept error: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        crate::log!("serve"; "shutting down...");
        if !self.in_flight.wait_idle(SHUTDOWN_GRACE) {
            crate::log!("serve"; "{} requests still running, closing anyway", self.in_flight.count());
        }
        self.stop();
        drop(http);
        Ok(())
    }

    /// Stop the watcher, the hub and the listeners, in that order.
    ///
    /// Safe to call at any time, including before [`Server::start`].
    pub fn stop(&self) {
        if let Some(watcher) = &self.watcher {
            watcher.stop();
        }
        self.hub.stop();
        self.stopping.store(true, Ordering::Release);
    }

    fn accept_ws(&self, listener: TcpListener) {
        if let Err(e) = listener.set_nonblocking(true) {
            crate::log!("hub"; "cannot accept reload clients: {}", e);
            return;
        }
        while !self.stopping.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, addr)) => match hub::accept(&self.hub, stream) {
                    Ok(id) => crate::debug!("hub"; "client {} from {}", id, addr),
                    Err(e) => crate::debug!("hub"; "handshake with {} failed: {}", addr, e),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    crate::debug!("hub"; "accept error: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }
    }

    fn respond(&self, request: tiny_http::Request) {
        let reply = self.handle_request(request.url());
        crate::debug!("serve"; "{} {} {}", request.method(), request.url(), reply.status);
        // tiny_http drops the body for HEAD
        if let Err(e) = request.respond(reply.into_response()) {
            crate::debug!("serve"; "failed to send response: {}", e);
        }
    }

    /// Answer one request from the output directory.
    ///
    /// Every method is treated as GET.
    pub fn handle_request(&self, url: &str) -> Reply {
        let root = &self.options.root;
        let Some(path) = path::resolve(root, url) else {
            return response::not_found(root);
        };

        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) => {
                crate::log!("serve"; "failed to read {}: {}", path.display(), e);
                return response::internal_error(&e.to_string());
            }
        };

        let mut content_type = mime::from_path(&path);
        if content_type == types::OCTET_STREAM && mime::sniff_html(&body) {
            content_type = types::HTML;
        }

        if !self.options.live_reload || !mime::is_html(content_type) {
            return Reply::ok(content_type, body);
        }
        self.rewrite_html(body)
    }

    /// Inject the reload script, tagging inline scripts with a nonce if enabled.
    fn rewrite_html(&self, body: Vec<u8>) -> Reply {
        let nonce = self.options.csp_nonce.then(nonce::generate);
        let body = match &nonce {
            Some(nonce) => inject::apply_nonce(&body, nonce),
            None => body,
        };

        let script = LIVERELOAD_JS.render(&LiveReloadVars {
            ws_port: self.ws_port(),
            nonce: nonce.clone(),
        });
        let reply = Reply::ok(types::HTML, inject::inject_script(&body, &script));

        match nonce {
            Some(nonce) => reply.with_csp(nonce::policy(&nonce)),
            None => reply,
        }
    }
}
