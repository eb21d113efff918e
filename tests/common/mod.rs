//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use asset_proxy::config::{ProxySettings, ThemeConfig};
use asset_proxy::http::RewriteState;
use asset_proxy::rewrite::FsSpriteSource;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const HOSTNAME: &str = "www.hel.fi";

pub const SPRITE: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg"><symbol id="helsinki"></symbol></svg>"#;

/// A canned origin response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Request heads the mock origin received, lowercased.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock origin on a random port answering every request with the
/// response `f` picks for the request path.
pub async fn start_mock_origin<F>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let requests = log.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_lowercase();
                let path = head
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                requests.lock().unwrap().push(head);

                let response = f(&path);
                let mut out = format!("HTTP/1.1 {} OK\r\n", response.status);
                for (name, value) in &response.headers {
                    out.push_str(&format!("{name}: {value}\r\n"));
                }
                out.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    response.body.len()
                ));

                let _ = socket.write_all(out.as_bytes()).await;
                let _ = socket.write_all(&response.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, log)
}

/// Write `themes/hdbt/sprite.svg` under `root`.
pub fn write_sprite(root: &Path) {
    let dir = root.join("themes/hdbt");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("sprite.svg"), SPRITE).unwrap();
}

pub fn settings_with_prefixes() -> ProxySettings {
    let mut settings = ProxySettings {
        asset_path: "test-assets".to_string(),
        ..ProxySettings::default()
    };
    for lang in ["en", "fi", "sv"] {
        settings
            .prefixes
            .insert(lang.to_string(), format!("prefix-{lang}"));
    }
    settings
}

pub fn rewrite_state(settings: ProxySettings, document_root: &Path) -> RewriteState {
    RewriteState {
        settings: Arc::new(ArcSwap::from_pointee(settings)),
        hostname: Arc::from(HOSTNAME),
        theme: Arc::new(ThemeConfig {
            document_root: document_root.to_path_buf(),
            ..ThemeConfig::default()
        }),
        sprites: Arc::new(FsSpriteSource),
        robots_noindex: false,
        max_body_size: 64 * 1024,
    }
}
