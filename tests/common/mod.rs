//! Shared fixtures for integration tests: a local report server and
//! scripted completion models.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use report2json::{CompletionModel, ModelError};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

pub const LAB_REPORT_TEXT: &str = "City Diagnostics\n\
Patient Name: Ravi Kumar\n\
Reported On: 12/03/2024\n\
Complete Blood Count\n\
Hemoglobin 10.2 g/dL 13.0 - 17.0\n\
WBC 7200 /uL 4000 - 11000\n";

pub const PDF_TEXT: &str = "Hemoglobin 10.2 g/dL";

/// Start a report server on an ephemeral port and return its address.
///
/// Routes:
/// * `/report.txt`   plain-text report
/// * `/report.html`  HTML report
/// * `/report.pdf,`  one-page PDF (note the trailing comma)
/// * `/fake.pdf`     `application/pdf` header over non-PDF bytes
/// * `/empty`        200 with an empty body
/// * `/missing`      404
/// * `/ua`           echoes the request's `User-Agent`
/// * `/slow`         answers after 3 s
pub async fn spawn_report_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/report.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], LAB_REPORT_TEXT) }),
        )
        .route(
            "/report.html",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><body><p>Glucose 130 mg/dL</p></body></html>",
                )
            }),
        )
        .route(
            "/report.pdf,",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], one_page_pdf(PDF_TEXT)) }),
        )
        .route(
            "/fake.pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "this is not a pdf") }),
        )
        .route(
            "/latin1",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
                    &b"Patient Name: Jos\xe9 Pe\xf1a"[..],
                )
            }),
        )
        .route("/empty", get(|| async { StatusCode::OK }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/ua", get(echo_user_agent))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late"
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

async fn echo_user_agent(headers: HeaderMap) -> impl IntoResponse {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<none>")
        .to_string()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

/// A minimal one-page PDF with a single line of Helvetica text.
///
/// `text` must not contain parentheses or backslashes.
pub fn one_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        tail.push_str(&format!("{off:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.extend_from_slice(tail.as_bytes());
    out
}

/// Completion model driven by a closure over the prompt. Records prompts.
pub struct ScriptedModel<F> {
    respond: F,
    prompts: Mutex<Vec<String>>,
}

impl<F> ScriptedModel<F>
where
    F: Fn(&str) -> Result<String, ModelError> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl<F> CompletionModel for ScriptedModel<F>
where
    F: Fn(&str) -> Result<String, ModelError> + Send + Sync,
{
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

/// A model that always replies with `reply`.
pub fn replying(
    reply: &'static str,
) -> ScriptedModel<impl Fn(&str) -> Result<String, ModelError> + Send + Sync> {
    ScriptedModel::new(move |_| Ok(reply.to_string()))
}

pub const CLEAN_REPLY: &str = r#"{
  "Patient_Name": "Ravi Kumar",
  "Report_Date": "2024-03-12",
  "Test_Name": "Complete Blood Count",
  "Key_Findings": "Low hemoglobin",
  "Test_Results": {
    "Hemoglobin": { "Value": "10.2 g/dL", "Reference_Range": "13.0 - 17.0", "Status": "Low" },
    "WBC": { "Value": "7200 /uL", "Reference_Range": "4000 - 11000", "Status": "Normal" }
  }
}"#;
