//! Shared fixtures: a scripted in-memory transport and sample payloads.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drivecat::adapters::{Transport, TransportError, TransportResponse};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Body {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Fail(TransportError),
}

impl Reply {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Reply::Body {
            status: 200,
            content_type: Some(content_type.to_string()),
            body,
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Body {
            status,
            content_type: Some("text/html".to_string()),
            body: b"<html>error</html>".to_vec(),
        }
    }
}

/// Transport that plays back queued replies, then a fallback.
///
/// Replies can also be routed by URL substring, which takes priority over
/// the queue.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Reply>>,
    routes: Mutex<Vec<(String, Reply)>>,
    fallback: Reply,
    head_status: u16,
    gets: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(fallback: Reply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            fallback,
            head_status: 200,
            gets: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: Reply) -> Self {
        self.queue.lock().unwrap().push_back(reply);
        self
    }

    pub fn route(self, needle: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().push((needle.to_string(), reply));
        self
    }

    pub fn with_head_status(mut self, status: u16) -> Self {
        self.head_status = status;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        routed
            .or_else(|| self.queue.lock().unwrap().pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn head(&self, _url: &str, _timeout: Duration) -> Result<u16, TransportError> {
        Ok(self.head_status)
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        match self.next_reply(url) {
            Reply::Body {
                status,
                content_type,
                body,
            } => Ok(TransportResponse::from_bytes(
                url,
                status,
                content_type.as_deref(),
                body,
            )),
            Reply::Fail(e) => Err(e),
        }
    }
}

/// A PNG header padded to `len` bytes; `fill` varies the payload
pub fn png_bytes(width: u32, height: u32, len: usize, fill: u8) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.resize(len, fill);
    data
}

/// The host's virus scan warning page with a relative confirm link
pub fn interstitial_page(id: &str) -> Vec<u8> {
    format!(
        r#"<!DOCTYPE html><html><head><title>Google Drive - Virus scan warning</title></head>
<body><p>Google Drive can't scan this file for viruses.</p>
<a id="uc-download-link" href="/uc?export=download&amp;confirm=t0k3n&amp;id={id}">Download anyway</a>
</body></html>"#
    )
    .into_bytes()
}

pub const ID_A: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz012345";
pub const ID_B: &str = "1ZyXwVuTsRqPoNmLkJiHgFeDcBa543210";
pub const ID_C: &str = "1QqQqQqQqQqQqQqQqQqQqQqQqQqQqQqQq";

pub fn view_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view?usp=sharing", id)
}
