//! Shared fixtures: a recording HTTP double, a valid configuration and a
//! real PDF builder.
#![allow(dead_code)]

use async_trait::async_trait;
use canvas_responder::Config;
use canvas_responder::error::Result;
use canvas_responder::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use canvas_responder::providers::Provider;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use parking_lot::Mutex;
use serde_json::Value;

pub const CANVAS_BASE: &str = "https://canvas.test/api/v1";
pub const COURSE_ID: &str = "42";
pub const CANVAS_TOKEN: &str = "canvas-token";
pub const LLM_ENDPOINT: &str =
    "https://llm.test/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-08-01-preview";
pub const LLM_KEY: &str = "llm-key";

struct Route {
    method: Method,
    url_fragment: String,
    response: HttpResponse,
}

/// Answers requests from canned routes and records every request it sees.
///
/// A route matches when the method is equal and the URL contains the
/// fragment; the first match wins. Unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: Method, url_fragment: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.lock().push(Route {
            method,
            url_fragment: url_fragment.to_string(),
            response: HttpResponse::new(status, body),
        });
        self
    }

    pub fn on_json(self, method: Method, url_fragment: &str, status: u16, body: &Value) -> Self {
        self.on(method, url_fragment, status, body.to_string())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, method: Method, url_fragment: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.url.contains(url_fragment))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.clone());
        let routes = self.routes.lock();
        let response = routes
            .iter()
            .find(|route| route.method == request.method && request.url.contains(&route.url_fragment))
            .map_or_else(
                || HttpResponse::new(404, format!("no route for {} {}", request.method, request.url)),
                |route| route.response.clone(),
            );
        drop(routes);
        Ok(response)
    }
}

/// A configuration that passes validation and points at the mock hosts
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.canvas.base_url = CANVAS_BASE.to_string();
    config.canvas.access_token = CANVAS_TOKEN.to_string();
    config.canvas.course_id = COURSE_ID.to_string();
    config.llm.provider = Provider::Azure;
    config.llm.endpoint = LLM_ENDPOINT.to_string();
    config.llm.api_key = LLM_KEY.to_string();
    config
}

/// A chat completion envelope carrying `content`
pub fn completion_body(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": content }
        }]
    })
}

/// JSON body of a recorded request
pub fn request_json(request: &HttpRequest) -> &Value {
    request.json.as_ref().expect("request should carry a JSON body")
}

/// Build a PDF with one page per entry, each showing its text in Courier
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let contents: Vec<Content> = pages.iter().map(|text| text_page(text)).collect();
    pdf_from_contents(contents)
}

/// Build a PDF whose first page holds `text` and whose second page selects
/// its font with a number instead of a name, which text extraction rejects
pub fn pdf_with_unreadable_page(text: &str) -> Vec<u8> {
    let broken = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![24.into(), 24.into()]),
            Operation::new("Tj", vec![Object::string_literal("Lost page")]),
            Operation::new("ET", vec![]),
        ],
    };
    pdf_from_contents(vec![text_page(text), broken])
}

fn text_page(text: &str) -> Content {
    Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    }
}

fn pdf_from_contents(contents: Vec<Content>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for content in contents {
        let encoded = content.encode().expect("content stream should encode");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).expect("page count fits in i64");
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF should serialize");
    bytes
}

pub fn hello_world_pdf() -> Vec<u8> {
    pdf_with_pages(&["Hello World"])
}
