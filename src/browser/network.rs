//! Network request capture
//!
//! The CDP session emits a request event when the page issues a fetch and
//! a response event when the answer comes back. Both observers append
//! into a shared [`NetworkLog`] that `get_network_requests` later reads
//! out. Correlation is by URL: a response attaches to the oldest entry
//! with the same URL that has no response yet.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, GetResponseBodyParams, Headers,
    ResourceType,
};
use chromiumoxide::Page;
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Stored in place of response bodies that are not worth buffering as text.
pub const BINARY_BODY_PLACEHOLDER: &str = "[Binary or large content]";

/// Content types whose response bodies are captured verbatim.
const TEXTUAL_CONTENT_PREFIXES: &[&str] = &["application/json", "application/xml", "text/"];

/// Filter applied by `get_network_requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFilter {
    /// Every captured request
    #[default]
    All,
    /// XMLHttpRequest traffic only
    Xhr,
    /// fetch() traffic only
    Fetch,
}

impl RequestFilter {
    /// The wire label for this filter
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestFilter::All => "all",
            RequestFilter::Xhr => "xhr",
            RequestFilter::Fetch => "fetch",
        }
    }

    fn matches(&self, record: &RequestRecord) -> bool {
        match self {
            RequestFilter::All => true,
            RequestFilter::Xhr => record.resource_type == "xhr",
            RequestFilter::Fetch => record.resource_type == "fetch",
        }
    }
}

impl std::fmt::Display for RequestFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(RequestFilter::All),
            "xhr" => Ok(RequestFilter::Xhr),
            "fetch" => Ok(RequestFilter::Fetch),
            other => Err(Error::invalid_input(format!(
                "unknown filter_type {other:?} (expected \"all\", \"xhr\" or \"fetch\")"
            ))),
        }
    }
}

/// One observed browser network exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Target address
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Flattened request headers
    pub headers: HashMap<String, String>,
    /// Lower-case resource category ("document", "xhr", "fetch", ...)
    pub resource_type: String,
    /// RFC 3339 capture time
    pub timestamp: String,
    /// Request body, captured for POST/PUT/PATCH only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// The matched response, once observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
}

/// The response half of a captured exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// HTTP status code
    pub status: i64,
    /// Flattened response headers
    pub headers: HashMap<String, String>,
    /// Declared content type
    pub content_type: String,
    /// Body text, or [`BINARY_BODY_PLACEHOLDER`] for non-textual content;
    /// absent when retrieval failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Why body retrieval failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered, growable list of captured exchanges.
///
/// Cloning is cheap and shares the underlying list; the navigate handler,
/// the two observer tasks and `get_network_requests` all hold clones.
#[derive(Clone, Default)]
pub struct NetworkLog {
    entries: Arc<Mutex<Vec<RequestRecord>>>,
}

impl NetworkLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a captured request
    pub fn push(&self, record: RequestRecord) {
        self.entries.lock().push(record);
    }

    /// Attach a response to the oldest same-URL entry without one.
    ///
    /// First unmatched entry wins. Returns false when no entry matched,
    /// which happens for responses whose request predates the last
    /// [`clear`](Self::clear).
    pub fn attach_response(&self, url: &str, response: ResponseRecord) -> bool {
        let mut entries = self.entries.lock();
        match entries
            .iter_mut()
            .find(|e| e.url == url && e.response.is_none())
        {
            Some(entry) => {
                entry.response = Some(response);
                true
            }
            None => false,
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of captured requests
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of every entry, in capture order
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.entries.lock().clone()
    }

    /// Copy of the entries matching `filter`, in capture order
    pub fn filtered(&self, filter: RequestFilter) -> Vec<RequestRecord> {
        self.entries
            .lock()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }
}

/// Subscribes to a page's CDP network events and feeds a [`NetworkLog`].
pub struct NetworkMonitor {
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Enable the network domain on `page` and spawn the two observer
    /// tasks. The tasks run until [`detach`](Self::detach) or until the
    /// page's event streams end.
    #[instrument(skip(page, log))]
    pub async fn attach(page: &Page, log: NetworkLog) -> Result<Self> {
        page.execute(EnableParams::default()).await?;

        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let request_log = log.clone();
        let request_task = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                debug!(method = %event.request.method, url = %event.request.url, "captured request");
                request_log.push(record_from_event(&event));
            }
        });

        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let response_log = log.clone();
        let response_page = page.clone();
        let response_task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let record = response_record(&response_page, &event).await;
                if !response_log.attach_response(&event.response.url, record) {
                    debug!(url = %event.response.url, "response without a matching request");
                }
            }
        });

        Ok(Self {
            tasks: vec![request_task, response_task],
        })
    }

    /// Stop observing. Safe to call more than once.
    pub fn detach(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

fn record_from_event(event: &EventRequestWillBeSent) -> RequestRecord {
    let method = event.request.method.clone();
    let body = match method.to_ascii_uppercase().as_str() {
        "POST" | "PUT" | "PATCH" => event.request.post_data.clone(),
        _ => None,
    };

    RequestRecord {
        url: event.request.url.clone(),
        method,
        headers: header_map(&event.request.headers),
        resource_type: resource_type_label(event.r#type.as_ref()),
        timestamp: Utc::now().to_rfc3339(),
        body,
        response: None,
    }
}

async fn response_record(page: &Page, event: &EventResponseReceived) -> ResponseRecord {
    let headers = header_map(&event.response.headers);
    let content_type = content_type_of(&headers, &event.response.mime_type);
    let status = event.response.status;

    if !is_textual(&content_type) {
        return ResponseRecord {
            status,
            headers,
            content_type,
            content: Some(BINARY_BODY_PLACEHOLDER.to_string()),
            error: None,
        };
    }

    match page
        .execute(GetResponseBodyParams::new(event.request_id.clone()))
        .await
    {
        Ok(reply) => {
            // A textual content type can still come back base64-wrapped.
            let content = if reply.result.base64_encoded {
                BINARY_BODY_PLACEHOLDER.to_string()
            } else {
                reply.result.body.clone()
            };
            ResponseRecord {
                status,
                headers,
                content_type,
                content: Some(content),
                error: None,
            }
        }
        Err(e) => ResponseRecord {
            status,
            headers,
            content_type,
            content: None,
            error: Some(e.to_string()),
        },
    }
}

fn header_map(headers: &Headers) -> HashMap<String, String> {
    headers
        .inner()
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let value = v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string());
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn content_type_of(headers: &HashMap<String, String>, mime_type: &str) -> String {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| mime_type.to_string())
}

fn is_textual(content_type: &str) -> bool {
    TEXTUAL_CONTENT_PREFIXES
        .iter()
        .any(|p| content_type.starts_with(p))
}

fn resource_type_label(ty: Option<&ResourceType>) -> String {
    let label = match ty {
        Some(ResourceType::Document) => "document",
        Some(ResourceType::Stylesheet) => "stylesheet",
        Some(ResourceType::Image) => "image",
        Some(ResourceType::Media) => "media",
        Some(ResourceType::Font) => "font",
        Some(ResourceType::Script) => "script",
        Some(ResourceType::Xhr) => "xhr",
        Some(ResourceType::Fetch) => "fetch",
        Some(ResourceType::EventSource) => "eventsource",
        Some(ResourceType::WebSocket) => "websocket",
        Some(ResourceType::Manifest) => "manifest",
        Some(ResourceType::Ping) => "ping",
        Some(ResourceType::Prefetch) => "prefetch",
        _ => "other",
    };
    label.to_string()
}
