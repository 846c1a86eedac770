//! Upload UI (`contentgen serve`).
//!
//! ```text
//! GET  /                      research paper upload form
//! POST /convert               multipart upload → results page
//! GET  /blog                  blog writer form
//! POST /blog                  write and export a post → results page
//! POST /blog/analyze          content-quality report for a post
//! POST /blog/originality      originality score for a post
//! GET  /exports/{id}/{file}   download an exported document
//! ```

use crate::blog::{
    self, Audience, BlogOutput, BlogRequest, BlogType, ContentGoal, Industry, Tone,
    DEFAULT_WORDS, MAX_WORDS, MIN_WORDS, WORD_STEP,
};
use crate::config::{ConversionConfig, OutputFormat, AVAILABLE_MODELS};
use crate::convert::convert_from_bytes;
use crate::error::ContentGenError;
use crate::export::html::{escape_html, markdown_to_html};
use crate::output::{ConversionOutput, ExportReport};
use crate::pipeline::input;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use base64::Engine;
use serde::Deserialize;
use std::fmt::Display;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "No such export.".into(),
        }
    }
}

impl From<ContentGenError> for AppError {
    fn from(e: ContentGenError) -> Self {
        let status = if e.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            match &e {
                ContentGenError::ProviderNotConfigured { .. }
                | ContentGenError::LlmFailed { .. }
                | ContentGenError::EmptyResponse { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };
        if status.is_server_error() {
            error!("Request failed: {e}");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = format!(
            "<h2>Something went wrong</h2>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back</a></p>\n",
            escape_html(&self.message)
        );
        (self.status, Html(page("Error", &body))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    config: Arc<ConversionConfig>,
}

pub fn build_router(config: ConversionConfig) -> Router {
    let limit = config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/convert", post(convert_upload))
        .route("/blog", get(blog_form).post(blog_submit))
        .route("/blog/analyze", post(blog_analyze))
        .route("/blog/originality", post(blog_originality))
        .route("/exports/{id}/{file}", get(download))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(AppState {
            config: Arc::new(config),
        })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: ConversionConfig, bind: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    info!("contentgen serve listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("contentgen serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Shared form pieces
// ---------------------------------------------------------------------------

fn model_select(config: &ConversionConfig) -> String {
    let selected_model = config.effective_model();
    let mut models = String::from("<p><label>Model <select name=\"model\">\n");
    for (id, blurb) in AVAILABLE_MODELS {
        let selected = if *id == selected_model { " selected" } else { "" };
        models.push_str(&format!(
            "<option value=\"{id}\"{selected}>{id} ({})</option>\n",
            escape_html(blurb)
        ));
    }
    models.push_str("</select></label></p>\n");
    models
}

fn format_radios(config: &ConversionConfig) -> String {
    let mut formats = String::from("<fieldset><legend>Output format</legend>\n");
    for format in [OutputFormat::Both, OutputFormat::Pdf, OutputFormat::Html] {
        let checked = if format == config.output_format { " checked" } else { "" };
        formats.push_str(&format!(
            "<label><input type=\"radio\" name=\"format\" value=\"{f}\"{checked}> {label}</label>\n",
            f = format.as_str(),
            label = format.as_str().to_uppercase(),
        ));
    }
    formats.push_str("</fieldset>\n");
    formats
}

fn option_select<T>(name: &str, label: &str, all: &[T], selected: T) -> String
where
    T: Copy + PartialEq + Display,
{
    let mut html = format!("<p><label>{label} <select name=\"{name}\">\n");
    for v in all {
        let attr = if *v == selected { " selected" } else { "" };
        let text = escape_html(&v.to_string());
        html.push_str(&format!("<option value=\"{text}\"{attr}>{text}</option>\n"));
    }
    html.push_str("</select></label></p>\n");
    html
}

/// A copy of the server config with the model picked in a form, if any.
fn with_model(config: &ConversionConfig, model: Option<&str>) -> ConversionConfig {
    let mut config = config.clone();
    if let Some(m) = model.map(str::trim).filter(|m| !m.is_empty()) {
        config.model = Some(m.to_string());
    }
    config
}

/// Blank or missing fields fall back to `default`.
fn parse_or<T>(value: Option<&str>, default: T) -> Result<T, ContentGenError>
where
    T: FromStr<Err = ContentGenError>,
{
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.parse(),
        _ => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Research paper converter
// ---------------------------------------------------------------------------

async fn index(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;
    let body = format!(
        r#"<h2>Research paper to content</h2>
<form action="/convert" method="post" enctype="multipart/form-data">
<p><label>Research paper (PDF) <input type="file" name="file" accept="application/pdf" required></label></p>
<p><label>Brand guidelines (PDF, optional) <input type="file" name="brand" accept="application/pdf"></label></p>
{formats}<p><label><input type="checkbox" name="translate" value="on"{translate}> Translate to English first</label></p>
{models}<p><button type="submit">Generate</button></p>
</form>
"#,
        formats = format_radios(config),
        translate = if config.translate { " checked" } else { "" },
        models = model_select(config),
    );
    Html(page("Content generator", &body))
}

/// Fields read from the upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    brand: Option<Vec<u8>>,
    format: Option<String>,
    translate: bool,
    model: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .and_then(|n| std::path::Path::new(n).file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload.pdf".to_string());
                let bytes = field.bytes().await?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "brand" => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.brand = Some(bytes.to_vec());
                }
            }
            "format" => form.format = Some(field.text().await?),
            // An unchecked box is not submitted at all.
            "translate" => {
                let v = field.text().await?;
                form.translate = matches!(v.trim(), "on" | "true" | "1" | "yes");
            }
            "model" => form.model = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

async fn convert_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let form = read_form(multipart).await?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| AppError::bad_request("Please upload a research paper PDF."))?;

    let mut config = with_model(&state.config, form.model.as_deref());
    config.output_format = parse_or(form.format.as_deref(), config.output_format)?;
    config.translate = form.translate;

    // Held until the conversion returns; removed on drop.
    let brand_file = match form.brand {
        Some(ref brand) => {
            input::validate_upload("brand guidelines", brand, config.max_upload_bytes)?;
            let mut tmp = tempfile::Builder::new()
                .prefix("brand-")
                .suffix(".pdf")
                .tempfile()
                .map_err(|e| ContentGenError::Internal(format!("brand temp file: {e}")))?;
            tmp.write_all(brand)
                .map_err(|e| ContentGenError::Internal(format!("brand temp file: {e}")))?;
            config.brand_guidelines = Some(tmp.path().to_path_buf());
            Some(tmp)
        }
        None => None,
    };

    let output = convert_from_bytes(&bytes, &file_name, &config).await?;
    drop(brand_file);

    Ok(Html(page("Results", &results_body(&output))))
}

fn results_body(output: &ConversionOutput) -> String {
    let mut body = String::from("<h2>Your documents are ready</h2>\n");
    body.push_str(&exports_section(&output.exports));
    body.push_str("<h3>Generated content</h3>\n<article>\n");
    body.push_str(&markdown_to_html(&output.markdown));
    body.push_str("</article>\n<p><a href=\"/\">Convert another paper</a></p>\n");
    body
}

// ---------------------------------------------------------------------------
// Blog writer
// ---------------------------------------------------------------------------

async fn blog_form(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;
    let fields = [
        option_select("audience", "Target audience", Audience::ALL, Audience::Student),
        option_select("tone", "Writing tone", Tone::ALL, Tone::Conversational),
        option_select("industry", "Industry", Industry::ALL, Industry::EdTech),
        option_select("blog_type", "Blog type", BlogType::ALL, BlogType::HowToGuide),
        option_select("goal", "Content goal", ContentGoal::ALL, ContentGoal::Educate),
    ]
    .concat();

    let body = format!(
        r#"<h2>AI blog writer</h2>
<form action="/blog" method="post">
<p><label>Topic <input type="text" name="topic" size="60" required></label></p>
{fields}<p><label>Word limit <input type="number" name="word_limit" min="{MIN_WORDS}" max="{MAX_WORDS}" step="{WORD_STEP}" value="{DEFAULT_WORDS}"></label></p>
{formats}{models}<p><button type="submit">Generate blog post</button></p>
</form>
"#,
        formats = format_radios(config),
        models = model_select(config),
    );
    Html(page("Blog writer", &body))
}

#[derive(Deserialize)]
struct BlogForm {
    #[serde(default)]
    topic: String,
    audience: Option<String>,
    tone: Option<String>,
    industry: Option<String>,
    blog_type: Option<String>,
    goal: Option<String>,
    word_limit: Option<String>,
    format: Option<String>,
    model: Option<String>,
}

impl BlogForm {
    fn request(&self) -> Result<BlogRequest, ContentGenError> {
        let words = match self.word_limit.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() => w.parse::<u32>().map_err(|_| {
                ContentGenError::InvalidConfig(format!("word limit must be a number (got '{w}')"))
            })?,
            _ => DEFAULT_WORDS,
        };
        let request = BlogRequest::new(self.topic.trim())
            .audience(parse_or(self.audience.as_deref(), Audience::Student)?)
            .tone(parse_or(self.tone.as_deref(), Tone::Conversational)?)
            .industry(parse_or(self.industry.as_deref(), Industry::EdTech)?)
            .blog_type(parse_or(self.blog_type.as_deref(), BlogType::HowToGuide)?)
            .goal(parse_or(self.goal.as_deref(), ContentGoal::Educate)?)
            .word_limit(words)?;
        request.validate()?;
        Ok(request)
    }
}

async fn blog_submit(
    State(state): State<AppState>,
    Form(form): Form<BlogForm>,
) -> Result<Html<String>, AppError> {
    let request = form.request()?;
    let mut config = with_model(&state.config, form.model.as_deref());
    config.output_format = parse_or(form.format.as_deref(), config.output_format)?;

    let post = blog::write_blog(&request, &config).await?;
    let exports = blog::export_blog(&post, &config)?;

    Ok(Html(page("Blog post", &blog_results_body(&post, &exports, &config))))
}

fn blog_results_body(
    post: &BlogOutput,
    exports: &ExportReport,
    config: &ConversionConfig,
) -> String {
    let mut body = format!("<h2>{}</h2>\n", escape_html(&post.topic));
    body.push_str(&exports_section(exports));

    let content = escape_html(&post.markdown);
    let model = escape_html(config.effective_model());
    for (action, label) in [
        ("/blog/analyze", "Analyze Content"),
        ("/blog/originality", "Check Plagiarism"),
    ] {
        body.push_str(&format!(
            "<form action=\"{action}\" method=\"post\" class=\"inline\">\n\
             <textarea name=\"content\" hidden>{content}</textarea>\n\
             <input type=\"hidden\" name=\"model\" value=\"{model}\">\n\
             <button type=\"submit\">{label}</button>\n</form>\n"
        ));
    }

    body.push_str("<h3>Generated post</h3>\n<article>\n");
    body.push_str(&markdown_to_html(&post.markdown));
    body.push_str("</article>\n<p><a href=\"/blog\">Write another post</a></p>\n");
    body
}

#[derive(Deserialize)]
struct ReviewForm {
    #[serde(default)]
    content: String,
    model: Option<String>,
}

impl ReviewForm {
    fn content(&self) -> Result<&str, AppError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::bad_request("There is no content to review."));
        }
        Ok(content)
    }
}

async fn blog_analyze(
    State(state): State<AppState>,
    Form(form): Form<ReviewForm>,
) -> Result<Html<String>, AppError> {
    let content = form.content()?;
    let config = with_model(&state.config, form.model.as_deref());
    let report = blog::analyze_content(content, &config).await?;

    let body = format!(
        "<h2>Content analysis</h2>\n<article>\n{}</article>\n<p><a href=\"/blog\">Back to the blog writer</a></p>\n",
        markdown_to_html(&report)
    );
    Ok(Html(page("Content analysis", &body)))
}

async fn blog_originality(
    State(state): State<AppState>,
    Form(form): Form<ReviewForm>,
) -> Result<Html<String>, AppError> {
    let content = form.content()?;
    let config = with_model(&state.config, form.model.as_deref());
    let result = blog::check_originality(content, &config).await?;

    let summary = match (result.score, result.band) {
        (Some(score), Some(band)) => format!(
            "<p class=\"score\">Originality score: <strong>{score}/100</strong> ({band})</p>\n"
        ),
        _ => "<p class=\"score\">The checker did not report a score.</p>\n".to_string(),
    };
    let body = format!(
        "<h2>Originality check</h2>\n{summary}<article>\n{}</article>\n<p><a href=\"/blog\">Back to the blog writer</a></p>\n",
        markdown_to_html(&result.report)
    );
    Ok(Html(page("Originality check", &body)))
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// Download links, export failures and an inline PDF preview.
fn exports_section(exports: &ExportReport) -> String {
    let id = exports
        .directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut body = String::from("<ul>\n");
    for file in &exports.files {
        let name = file.file_name();
        body.push_str(&format!(
            "<li><a href=\"{}\" download>Download {}</a> ({} bytes)</li>\n",
            escape_html(&export_href(&id, &name)),
            escape_html(&name),
            file.bytes
        ));
    }
    body.push_str("</ul>\n");

    if !exports.errors.is_empty() {
        body.push_str("<ul class=\"error\">\n");
        for e in &exports.errors {
            body.push_str(&format!("<li>{}</li>\n", escape_html(&e.to_string())));
        }
        body.push_str("</ul>\n");
    }

    if let Some(pdf) = exports.find("pdf") {
        match std::fs::read(pdf) {
            Ok(bytes) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                body.push_str(&format!(
                    "<iframe class=\"preview\" src=\"data:application/pdf;base64,{encoded}\" \
                     title=\"PDF preview\"></iframe>\n"
                ));
            }
            Err(e) => warn!("PDF preview unavailable: {e}"),
        }
    }
    body
}

/// `/exports/{id}/{name}` with both segments percent-encoded.
fn export_href(id: &str, name: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse("http://localhost/") else {
        return "/".to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(["exports", id, name]);
    }
    url.path().to_string()
}

/// A single path segment we are willing to join onto the export root.
fn safe_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(['/', '\\', '\0'])
}

/// File name for a quoted `Content-Disposition` value: printable ASCII only,
/// without quotes or backslashes.
fn header_file_name(file: &str) -> String {
    file.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' ' => ' ',
            c if c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect()
}

async fn download(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if !safe_segment(&id) || !safe_segment(&file) {
        return Err(AppError::not_found());
    }
    let content_type = match std::path::Path::new(&file)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some("pdf") => "application/pdf",
        Some("html") => "text/html; charset=utf-8",
        _ => return Err(AppError::not_found()),
    };

    let path = state.config.output_dir.join(&id).join(&file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::not_found())?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", header_file_name(&file)),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
body {{ font-family: Arial, Helvetica, sans-serif; margin: 40px auto; max-width: 860px; }}
nav {{ margin-bottom: 2em; }}
.error {{ color: #b00020; }}
form.inline {{ display: inline-block; margin-right: 1em; }}
iframe.preview {{ width: 100%; height: 720px; border: 1px solid #ccc; }}
</style>
</head>
<body>
<nav><a href="/blog">AI Blog Writer</a> | <a href="/">Research Paper to Content</a></nav>
{body}</body>
</html>
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
