//! Integration tests for the full conversion and blog flows.
//!
//! A scripted `ChatBackend` answers by agent role, so these run offline.
//! Input PDFs are produced with the crate's own PDF writer.

use async_trait::async_trait;
use edgequake_contentgen::blog::{self, BlogRequest, OriginalityBand, Tone};
use edgequake_contentgen::export::pdf::render_pdf;
use edgequake_contentgen::pipeline::llm::resolve_backend_with;
use edgequake_contentgen::prompts;
use edgequake_contentgen::{
    convert, convert_from_bytes, inspect, ChatBackend, ChatReply, ContentGenError,
    ConversionConfig, OutputFormat, Prompt, SamplingOptions,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const FORMATTED: &str = "```markdown\n# Faster Pipelines\n\nThroughput **doubled** after batching.\n\n| Run | Items/s |\n|---|---|\n| before | 120 |\n| after | 240 |\n```";

/// Answers each prompt according to the role in its system message and
/// records every prompt it saw.
#[derive(Default)]
struct Scripted {
    seen: Mutex<Vec<Prompt>>,
}

impl Scripted {
    fn prompts(&self) -> Vec<Prompt> {
        self.seen.lock().unwrap().clone()
    }

    fn user_prompt_for(&self, role: &str) -> String {
        let marker = format!("You are {role}.");
        self.prompts()
            .into_iter()
            .find(|p| p.system.starts_with(&marker))
            .map(|p| p.user)
            .unwrap_or_else(|| panic!("no prompt for {role}"))
    }
}

#[async_trait]
impl ChatBackend for Scripted {
    async fn chat(&self, prompt: &Prompt, _: &SamplingOptions) -> Result<ChatReply, String> {
        self.seen.lock().unwrap().push(prompt.clone());
        let s = prompt.system.as_str();
        let content = if s == prompts::TRANSLATOR_SYSTEM {
            "=== Page 1 ===\nTRANSLATED: throughput doubled".to_string()
        } else if s == prompts::BRAND_SYSTEM {
            "Brand: navy headings, friendly voice".to_string()
        } else if s == prompts::ANALYST_SYSTEM {
            "1. Content Quality Assessment: solid".to_string()
        } else if s.starts_with("You are Research Analyst.") {
            "Title: Faster Pipelines\nThroughput doubled.".to_string()
        } else if s.starts_with("You are Content Creator.") {
            "# Faster Pipelines\nThroughput doubled.".to_string()
        } else if s.starts_with("You are Content Formatter.") {
            FORMATTED.to_string()
        } else if s.starts_with("You are Content Writer.") {
            "# Batching in Practice\n\nA friendly walk through batching.".to_string()
        } else if s.starts_with("You are Plagiarism Checker.") {
            "Analysis of patterns.\nScore: 82/100\nRecommendations: vary openings.".to_string()
        } else {
            format!("notes from {}", s.lines().next().unwrap_or_default())
        };
        Ok(ChatReply {
            content,
            prompt_tokens: 100,
            completion_tokens: 20,
        })
    }
}

struct Failing;

#[async_trait]
impl ChatBackend for Failing {
    async fn chat(&self, _: &Prompt, _: &SamplingOptions) -> Result<ChatReply, String> {
        Err("quota exceeded".into())
    }
}

fn write_pdf(dir: &Path, name: &str, markdown: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, render_pdf(None, markdown).unwrap()).unwrap();
    path
}

fn paper(dir: &Path) -> PathBuf {
    write_pdf(
        dir,
        "pipeline_paper.pdf",
        "# Faster Pipelines\n\nWe measured throughput before and after batching.\n\nThroughput doubled.",
    )
}

fn config(out: &Path, backend: Arc<dyn ChatBackend>) -> ConversionConfig {
    ConversionConfig::builder()
        .backend(backend)
        .output_dir(out)
        .translate(false)
        .max_retries(1)
        .retry_backoff_ms(0)
        .build()
        .unwrap()
}

/// Every opened tag of interest is closed.
fn assert_balanced(page: &str, tags: &[&str]) {
    for tag in tags {
        let open = page.matches(&format!("<{tag}>")).count()
            + page.matches(&format!("<{tag} ")).count();
        let close = page.matches(&format!("</{tag}>")).count();
        assert_eq!(open, close, "unbalanced <{tag}>");
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_pdf_gives_nonempty_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = paper(dir.path());

    let report = inspect(pdf.to_string_lossy()).await.unwrap();
    assert!(report.page_count >= 1);
    assert_eq!(report.text_pages, report.page_count);
    assert!(report.processed_chars > 0);
    assert!(report.processed_preview.contains("=== Page 1 ==="));
    assert!(report.raw_preview.contains("throughput"));
    assert!(report.encoding.valid_utf8);
}

#[tokio::test]
async fn missing_file_is_reported() {
    let err = inspect("/definitely/not/here.pdf").await.unwrap_err();
    assert!(matches!(err, ContentGenError::FileNotFound { .. }));
    assert!(err.is_user_error());
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_writes_pdf_and_html() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports");
    let backend = Arc::new(Scripted::default());
    let pdf = paper(dir.path());

    let output = convert(pdf.to_string_lossy(), &config(&out, backend.clone()))
        .await
        .unwrap();

    let roles: Vec<&str> = output.steps.iter().map(|s| s.role.as_str()).collect();
    assert_eq!(roles, ["Research Analyst", "Content Creator", "Content Formatter"]);
    assert!(output.markdown.starts_with("# Faster Pipelines\n"));
    assert!(!output.markdown.contains("```"));
    assert_eq!(output.stats.total_input_tokens, 300);
    assert!(output.crew_input.contains("=== Page 1 ==="));

    // The research step sees the document itself.
    let research = backend.user_prompt_for("Research Analyst");
    assert!(research.contains("throughput"));
    // Each later step sees the previous answer.
    let formatter = backend.user_prompt_for("Content Formatter");
    assert!(formatter.contains("# Faster Pipelines\nThroughput doubled."));

    assert_eq!(output.exports.directory.parent(), Some(out.as_path()));
    let pdf_out = output.exports.find("pdf").unwrap();
    assert_eq!(pdf_out.file_name().unwrap(), "pipeline_paper.pdf");
    assert!(std::fs::read(pdf_out).unwrap().starts_with(b"%PDF"));

    let html_out = output.exports.find("html").unwrap();
    let page = std::fs::read_to_string(html_out).unwrap();
    assert!(page.contains("<title>Faster Pipelines</title>"));
    assert!(page.contains("<table>"));
    assert!(page.contains("Source document: pipeline_paper"));
    assert_balanced(&page, &["html", "head", "body", "main", "table", "footer"]);
}

#[tokio::test]
async fn translated_run_uses_translation_and_english_stem() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(Scripted::default());
    let pdf = paper(dir.path());
    let mut cfg = config(&dir.path().join("exports"), backend.clone());
    cfg.translate = true;
    cfg.output_format = OutputFormat::Html;

    let output = convert(pdf.to_string_lossy(), &cfg).await.unwrap();

    assert_eq!(output.steps[0].role, "Translator");
    assert_eq!(output.steps.len(), 4);
    assert!(output.crew_input.starts_with("=== Page 1 ===\nTRANSLATED"));
    assert!(backend
        .user_prompt_for("Research Analyst")
        .contains("TRANSLATED: throughput doubled"));

    assert_eq!(output.exports.files.len(), 1);
    let html = output.exports.find("html").unwrap();
    assert_eq!(html.file_name().unwrap(), "pipeline_paper_english.html");
    assert!(output.exports.find("pdf").is_none());
}

#[tokio::test]
async fn brand_summary_reaches_content_creator() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(Scripted::default());
    let pdf = paper(dir.path());
    let brand = write_pdf(
        dir.path(),
        "brand.pdf",
        "# Brand Book\n\nHeadings are navy. Our voice is friendly.",
    );
    let mut cfg = config(&dir.path().join("exports"), backend.clone());
    cfg.brand_guidelines = Some(brand);
    cfg.output_format = OutputFormat::Pdf;

    let output = convert(pdf.to_string_lossy(), &cfg).await.unwrap();

    assert_eq!(
        output.brand_context.as_deref(),
        Some("Brand: navy headings, friendly voice")
    );
    assert!(output.steps.iter().any(|s| s.role == "Brand Analyst"));
    assert!(backend
        .user_prompt_for("Content Creator")
        .contains("Brand: navy headings, friendly voice"));
    let brand_prompt = backend
        .prompts()
        .into_iter()
        .find(|p| p.system == prompts::BRAND_SYSTEM)
        .unwrap();
    assert!(brand_prompt.user.contains("navy"));
}

#[tokio::test]
async fn upload_bytes_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), Arc::new(Scripted::default()));

    let err = convert_from_bytes(b"hello", "notes.pdf", &cfg).await.unwrap_err();
    assert!(matches!(err, ContentGenError::NotAPdf { .. }));

    let err = convert_from_bytes(b"", "empty.pdf", &cfg).await.unwrap_err();
    assert!(matches!(err, ContentGenError::EmptyUpload { .. }));
}

#[tokio::test]
async fn upload_bytes_convert() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), Arc::new(Scripted::default()));
    let bytes = std::fs::read(paper(dir.path())).unwrap();

    let output = convert_from_bytes(&bytes, "uploaded.pdf", &cfg).await.unwrap();
    assert_eq!(output.source, "uploaded.pdf");
    let names: Vec<String> = output.exports.files.iter().map(|f| f.file_name()).collect();
    assert!(names.contains(&"uploaded.pdf".to_string()));
    assert!(names.contains(&"uploaded.html".to_string()));
}

#[tokio::test]
async fn llm_failure_stops_before_export() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports");
    let pdf = paper(dir.path());

    let err = convert(pdf.to_string_lossy(), &config(&out, Arc::new(Failing)))
        .await
        .unwrap_err();
    match err {
        ContentGenError::LlmFailed { role, detail, .. } => {
            assert_eq!(role, "Research Analyst");
            assert!(detail.contains("quota exceeded"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(!out.exists());
}

/// Answers every step in Hindi.
struct Untranslated;

#[async_trait]
impl ChatBackend for Untranslated {
    async fn chat(&self, _: &Prompt, _: &SamplingOptions) -> Result<ChatReply, String> {
        Ok(ChatReply {
            content: "# शोध सारांश\n\nथ्रूपुट दोगुना हो गया।".to_string(),
            prompt_tokens: 10,
            completion_tokens: 10,
        })
    }
}

#[tokio::test]
async fn unprintable_pdf_is_not_written_silently() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = paper(dir.path());

    let mut cfg = config(&dir.path().join("pdf_only"), Arc::new(Untranslated));
    cfg.output_format = OutputFormat::Pdf;
    let err = convert(pdf.to_string_lossy(), &cfg).await.unwrap_err();
    match err {
        ContentGenError::NoOutputs(reasons) => assert!(reasons.contains("no printable text")),
        other => panic!("unexpected: {other:?}"),
    }

    // HTML keeps the text, so the run succeeds with the PDF failure recorded.
    let cfg = config(&dir.path().join("both"), Arc::new(Untranslated));
    let output = convert(pdf.to_string_lossy(), &cfg).await.unwrap();
    assert_eq!(output.exports.files.len(), 1);
    assert!(output.exports.find("html").is_some());
    assert_eq!(output.exports.errors.len(), 1);
    assert_eq!(output.exports.errors[0].format, "pdf");
}

#[test]
fn missing_key_is_provider_not_configured() {
    let cfg = ConversionConfig::builder()
        .provider_name("gemini")
        .build()
        .unwrap();
    let err = match resolve_backend_with(&cfg, |_| None) {
        Err(e) => e,
        Ok(_) => panic!("backend resolved without a key"),
    };
    assert!(matches!(err, ContentGenError::ProviderNotConfigured { .. }));
    assert!(err.to_string().contains("GEMINI_API_KEY"));
}

// ── Blog ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn blog_post_is_written_and_exported() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(Scripted::default());
    let cfg = config(dir.path(), backend.clone());
    let request = BlogRequest::new("Batching for Throughput")
        .tone(Tone::Storytelling)
        .word_limit(800)
        .unwrap();

    let post = blog::write_blog(&request, &cfg).await.unwrap();
    let roles: Vec<&str> = post.steps.iter().map(|s| s.role.as_str()).collect();
    assert_eq!(roles, ["Research Specialist", "NLP Specialist", "Content Writer"]);
    assert!(post.markdown.starts_with("# Batching in Practice"));
    assert!(backend
        .user_prompt_for("Content Writer")
        .contains("Word Limit: 800 words"));

    let report = blog::export_blog(&post, &cfg).unwrap();
    let html = std::fs::read_to_string(report.find("html").unwrap()).unwrap();
    assert!(html.contains("<title>Batching for Throughput</title>"));
    assert!(report.find("pdf").unwrap().ends_with("blog_post.pdf"));
}

#[tokio::test]
async fn blank_topic_is_rejected_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(Scripted::default());
    let err = blog::write_blog(&BlogRequest::new("   "), &config(dir.path(), backend.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, ContentGenError::InvalidConfig(_)));
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn review_helpers() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), Arc::new(Scripted::default()));

    let analysis = blog::analyze_content("Some post", &cfg).await.unwrap();
    assert!(analysis.contains("Content Quality Assessment"));

    let originality = blog::check_originality("Some post", &cfg).await.unwrap();
    assert_eq!(originality.score, Some(82));
    assert_eq!(originality.band, Some(OriginalityBand::MostlyOriginal));
    assert!(originality.report.contains("vary openings"));
}
