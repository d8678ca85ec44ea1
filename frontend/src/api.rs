//! HTTP/SSE adapter: base-URL resolution, a request wrapper that returns
//! non-2xx responses as typed results, the framed SSE reader, and the
//! attachment download helper.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use gloo_net::http::{Request, Response};
use js_sys::{Reflect, Uint8Array};
use ragai_console::filename::filename_from_disposition;
use ragai_console::prefs;
use ragai_console::sse::{SseDecoder, SseFrame};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{HtmlAnchorElement, ReadableStreamDefaultReader};

use crate::storage;

const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Resolution order: `window.API_URL`, the localStorage override, then the
/// local default.
pub fn api_base() -> String {
    if let Some(window) = web_sys::window() {
        if let Ok(value) = Reflect::get(&window, &JsValue::from_str("API_URL")) {
            if let Some(base) = value.as_string() {
                let base = base.trim();
                if !base.is_empty() {
                    return base.trim_end_matches('/').to_string();
                }
            }
        }
    }
    if let Some(base) = storage::get(prefs::KEY_API_URL) {
        let base = base.trim();
        if !base.is_empty() {
            return base.trim_end_matches('/').to_string();
        }
    }
    DEFAULT_API_BASE.to_string()
}

pub fn api_url(path: &str) -> String {
    format!("{}{}", api_base(), path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response.
    Network(String),
    /// The server answered outside 2xx; carries its text when it sent any.
    Status { status: u16, message: String },
}

impl ApiError {
    pub fn network(context: &str, err: impl fmt::Display) -> Self {
        Self::Network(format!("{context}: {err}"))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "API unreachable at {} ({detail})", api_base()),
            Self::Status { status, message } if message.is_empty() => {
                write!(f, "Request failed ({status})")
            }
            Self::Status { status, message } => write!(f, "Request failed ({status}): {message}"),
        }
    }
}

/// Non-2xx responses become typed errors; the body is drained either way so
/// the connection can be reused.
async fn into_result(response: Response) -> Result<Response, ApiError> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(text);
    Err(ApiError::Status { status, message })
}

pub async fn get_json<T: DeserializeOwned>(path: &str) -> Result<T, ApiError> {
    let response = Request::get(&api_url(path))
        .send()
        .await
        .map_err(|err| ApiError::network(path, err))?;
    let response = into_result(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::network(path, err))
}

pub async fn post_json<T: DeserializeOwned>(
    path: &str,
    body: &impl Serialize,
) -> Result<T, ApiError> {
    let request = Request::post(&api_url(path))
        .json(body)
        .map_err(|err| ApiError::network(path, err))?;
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::network(path, err))?;
    let response = into_result(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::network(path, err))
}

/// POST without a payload (job triggers, purges, resets).
pub async fn post_empty<T: DeserializeOwned>(path: &str) -> Result<T, ApiError> {
    post_json(path, &serde_json::json!({})).await
}

pub async fn put_json<T: DeserializeOwned>(
    path: &str,
    body: &impl Serialize,
) -> Result<T, ApiError> {
    let request = Request::put(&api_url(path))
        .json(body)
        .map_err(|err| ApiError::network(path, err))?;
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::network(path, err))?;
    let response = into_result(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::network(path, err))
}

pub async fn delete(path: &str) -> Result<(), ApiError> {
    let response = Request::delete(&api_url(path))
        .send()
        .await
        .map_err(|err| ApiError::network(path, err))?;
    let response = into_result(response).await?;
    // Drain the body; delete responses carry only a status object.
    let _ = response.text().await;
    Ok(())
}

/// Handle to one SSE stream. Closing is idempotent; once closed, the
/// in-flight pump stops touching the page.
#[derive(Clone)]
pub struct SseHandle {
    closed: Rc<Cell<bool>>,
}

impl SseHandle {
    fn new() -> Self {
        Self {
            closed: Rc::new(Cell::new(false)),
        }
    }

    pub fn close(&self) {
        self.closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

pub enum SseRequest {
    Get,
    PostJson(Value),
}

/// Open an SSE stream and pump frames into `on_frame`. `on_end` fires
/// exactly once when the stream finishes: `None` for a clean end-of-stream,
/// `Some` for a network or status failure. Neither callback runs after
/// `close()` — the caller's channel slot owns the stream's lifetime.
pub fn sse_open(
    path: &str,
    request: SseRequest,
    mut on_frame: impl FnMut(SseFrame) + 'static,
    mut on_end: impl FnMut(Option<ApiError>) + 'static,
) -> SseHandle {
    let handle = SseHandle::new();
    let pump_handle = handle.clone();
    let url = api_url(path);
    let path = path.to_string();

    spawn_local(async move {
        let outcome = pump_stream(&url, &path, request, &pump_handle, &mut on_frame).await;
        if pump_handle.is_closed() {
            return;
        }
        pump_handle.close();
        on_end(outcome.err());
    });

    handle
}

async fn pump_stream(
    url: &str,
    path: &str,
    request: SseRequest,
    handle: &SseHandle,
    on_frame: &mut impl FnMut(SseFrame),
) -> Result<(), ApiError> {
    let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".to_string()))?;

    let init = web_sys::RequestInit::new();
    match request {
        SseRequest::Get => {
            init.set_method("GET");
        }
        SseRequest::PostJson(body) => {
            init.set_method("POST");
            let headers = web_sys::Headers::new()
                .map_err(|_| ApiError::network(path, "headers unavailable"))?;
            let _ = headers.append("Content-Type", "application/json");
            init.set_headers(headers.as_ref());
            init.set_body(&JsValue::from_str(&body.to_string()));
        }
    }

    let response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(|err| ApiError::network(path, js_error_text(&err)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| ApiError::network(path, "unexpected fetch result"))?;

    if !response.ok() {
        let status = response.status();
        let message = match response.text() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .ok()
                .and_then(|text| text.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        let message = serde_json::from_str::<Value>(&message)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(message);
        return Err(ApiError::Status { status, message });
    }

    let body = response
        .body()
        .ok_or_else(|| ApiError::network(path, "response had no body"))?;
    let reader: ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|_| ApiError::network(path, "stream reader unavailable"))?;

    let mut decoder = SseDecoder::new();
    loop {
        if handle.is_closed() {
            let _ = reader.cancel();
            return Ok(());
        }

        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|err| ApiError::network(path, js_error_text(&err)))?;

        // The slot may have been reassigned while we were suspended.
        if handle.is_closed() {
            let _ = reader.cancel();
            return Ok(());
        }

        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .ok()
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        if done {
            break;
        }

        let value = Reflect::get(&chunk, &JsValue::from_str("value")).unwrap_or(JsValue::UNDEFINED);
        let bytes = Uint8Array::new(&value).to_vec();
        for frame in decoder.feed(&bytes) {
            if handle.is_closed() {
                return Ok(());
            }
            on_frame(frame);
        }
    }

    if let Some(frame) = decoder.flush() {
        if !handle.is_closed() {
            on_frame(frame);
        }
    }
    Ok(())
}

fn js_error_text(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| "fetch failed".to_string())
}

/// Fetch an attachment endpoint and hand it to the browser's downloader.
pub async fn download(path: &str, fallback_name: &str) -> Result<(), ApiError> {
    let response = Request::get(&api_url(path))
        .send()
        .await
        .map_err(|err| ApiError::network(path, err))?;
    let response = into_result(response).await?;
    download_from_response(&response, fallback_name).await
}

/// Blob-URL download: synthesize an anchor, click it, and release the URL
/// in the same microtask.
pub async fn download_from_response(response: &Response, fallback: &str) -> Result<(), ApiError> {
    let disposition = response.headers().get("content-disposition");
    let filename = filename_from_disposition(disposition.as_deref(), fallback);

    let bytes = response
        .binary()
        .await
        .map_err(|err| ApiError::network("download", err))?;

    trigger_blob_download(&bytes, &filename)
        .map_err(|_| ApiError::Network("download failed".to_string()))
}

fn trigger_blob_download(bytes: &[u8], filename: &str) -> Result<(), JsValue> {
    let array = Uint8Array::from(bytes);
    let parts = js_sys::Array::new();
    parts.push(&array.buffer());
    let blob = web_sys::Blob::new_with_u8_array_sequence(&parts)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = crate::dom::web_document().ok_or_else(|| JsValue::from_str("no document"))?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("anchor"))?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    if let Some(body) = document.body() {
        let _ = body.append_child(&anchor);
        anchor.click();
        anchor.remove();
    } else {
        anchor.click();
    }
    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}
