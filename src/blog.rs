//! Blog writing: research → NLP → writer crew, plus review helpers.
//!
//! ```rust,no_run
//! use edgequake_contentgen::blog::{write_blog, Audience, BlogRequest};
//! use edgequake_contentgen::ConversionConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = BlogRequest::new("Rust for data engineers")
//!     .audience(Audience::Engineer)
//!     .word_limit(1200)?;
//! let post = write_blog(&request, &ConversionConfig::default()).await?;
//! println!("{}", post.markdown);
//! # Ok(())
//! # }
//! ```

use crate::config::ConversionConfig;
use crate::crew::{Crew, Task};
use crate::error::ContentGenError;
use crate::export;
use crate::output::{ExportReport, StepResult};
use crate::pipeline::llm::{self, Prompt, RetryPolicy, SamplingOptions};
use crate::pipeline::postprocess;
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const MIN_WORDS: u32 = 700;
pub const MAX_WORDS: u32 = 2000;
pub const WORD_STEP: u32 = 50;
pub const DEFAULT_WORDS: u32 = 1000;

/// File stem used by [`export_blog`].
pub const BLOG_STEM: &str = "blog_post";

// ── Option lists ─────────────────────────────────────────────────────────

/// Closed option list with display labels; parses from the label or the
/// variant name, case-insensitively.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ContentGenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        v.label().eq_ignore_ascii_case(wanted)
                            || format!("{:?}", v).eq_ignore_ascii_case(wanted)
                    })
                    .ok_or_else(|| {
                        let options: Vec<&str> = $name::ALL.iter().map(|v| v.label()).collect();
                        ContentGenError::InvalidConfig(format!(
                            "unknown {} '{}'; expected one of: {}",
                            stringify!($name),
                            wanted,
                            options.join(", ")
                        ))
                    })
            }
        }
    };
}

labelled_enum!(
    /// Who the post is written for.
    Audience {
        Student => "Student",
        Engineer => "Engineer",
        PhdResearcher => "PhD Researcher",
        BusinessProfessional => "Business Professional",
        GeneralPublic => "General Public",
        TechnicalExpert => "Technical Expert",
        Academic => "Academic",
    }
);

labelled_enum!(
    Tone {
        Conversational => "Conversational",
        Storytelling => "Storytelling",
        Humorous => "Humorous",
        Professional => "Professional",
        Academic => "Academic",
        Technical => "Technical",
        Casual => "Casual",
    }
);

labelled_enum!(
    Industry {
        EdTech => "EdTech",
        Finance => "Finance",
        Legal => "Legal",
        Healthcare => "Healthcare",
        Technology => "Technology",
        Marketing => "Marketing",
        Science => "Science",
        Education => "Education",
        Business => "Business",
        Other => "Other",
    }
);

labelled_enum!(
    BlogType {
        HowToGuide => "How-to Guide",
        Listicle => "Listicle",
        CaseStudy => "Case Study",
        OpinionPiece => "Opinion Piece",
        TechnicalTutorial => "Technical Tutorial",
        NewsAnalysis => "News Analysis",
        Review => "Review",
        ResearchSummary => "Research Summary",
    }
);

labelled_enum!(
    /// What the post should achieve.
    ContentGoal {
        Educate => "Educate",
        RankSeo => "Rank (SEO)",
        Convert => "Convert",
        Explain => "Explain",
        Entertain => "Entertain",
        Inform => "Inform",
        Persuade => "Persuade",
    }
);

// ── Request ──────────────────────────────────────────────────────────────

/// Parameters for one blog post. Defaults are the first entry of each list
/// and [`DEFAULT_WORDS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRequest {
    pub topic: String,
    pub audience: Audience,
    pub tone: Tone,
    pub industry: Industry,
    pub blog_type: BlogType,
    pub goal: ContentGoal,
    pub word_limit: u32,
}

impl BlogRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            audience: Audience::Student,
            tone: Tone::Conversational,
            industry: Industry::EdTech,
            blog_type: BlogType::HowToGuide,
            goal: ContentGoal::Educate,
            word_limit: DEFAULT_WORDS,
        }
    }

    pub fn audience(mut self, v: Audience) -> Self {
        self.audience = v;
        self
    }

    pub fn tone(mut self, v: Tone) -> Self {
        self.tone = v;
        self
    }

    pub fn industry(mut self, v: Industry) -> Self {
        self.industry = v;
        self
    }

    pub fn blog_type(mut self, v: BlogType) -> Self {
        self.blog_type = v;
        self
    }

    pub fn goal(mut self, v: ContentGoal) -> Self {
        self.goal = v;
        self
    }

    /// Set the word limit; must be within 700–2000 and a multiple of 50.
    pub fn word_limit(mut self, words: u32) -> Result<Self, ContentGenError> {
        check_word_limit(words)?;
        self.word_limit = words;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ContentGenError> {
        if self.topic.trim().is_empty() {
            return Err(ContentGenError::InvalidConfig(
                "Please enter a topic to generate a blog post.".into(),
            ));
        }
        check_word_limit(self.word_limit)
    }

    fn research_task(&self) -> Task {
        Task::new(
            format!(
                "Research and gather information about: {}\n\
                 Target Audience: {}\n\
                 Industry/Domain: {}\n\
                 Blog Type: {}\n\
                 Content Goal: {}",
                self.topic.trim(),
                self.audience,
                self.industry,
                self.blog_type,
                self.goal
            ),
            "A comprehensive research summary with key points, statistics, and relevant \
             information about the topic.",
            prompts::research_specialist(),
        )
        .without_context()
    }

    fn nlp_task(&self) -> Task {
        Task::new(
            format!(
                "Process and analyze the gathered information using NLP techniques.\n\
                 Consider the following parameters:\n\
                 - Target Audience: {}\n\
                 - Writing Tone: {}\n\
                 - Industry/Domain: {}\n\
                 - Blog Type: {}\n\
                 - Content Goal: {}",
                self.audience, self.tone, self.industry, self.blog_type, self.goal
            ),
            "An analyzed and structured outline with key points organized for blog writing, \
             incorporating NLP insights.",
            prompts::nlp_specialist(),
        )
    }

    fn writing_task(&self) -> Task {
        Task::new(
            format!(
                "Write an engaging blog post based on the processed information.\n\
                 Follow these guidelines:\n\
                 - Topic: {}\n\
                 - Target Audience: {}\n\
                 - Writing Tone: {}\n\
                 - Industry/Domain: {}\n\
                 - Blog Type: {}\n\
                 - Content Goal: {}\n\
                 - Word Limit: {} words (strictly adhere to this range)\n\
                 Ensure the content is well-structured and meets the specified requirements. \
                 Write the post in Markdown.",
                self.topic.trim(),
                self.audience,
                self.tone,
                self.industry,
                self.blog_type,
                self.goal,
                self.word_limit
            ),
            "A complete, well-structured blog post that meets all specified requirements \
             and guidelines.",
            prompts::content_writer(),
        )
    }

    /// The three blog-writing steps in order.
    pub fn crew(&self) -> Crew {
        Crew::new(vec![self.research_task(), self.nlp_task(), self.writing_task()])
    }
}

fn check_word_limit(words: u32) -> Result<(), ContentGenError> {
    if !(MIN_WORDS..=MAX_WORDS).contains(&words) || words % WORD_STEP != 0 {
        return Err(ContentGenError::InvalidConfig(format!(
            "word limit must be between {MIN_WORDS} and {MAX_WORDS} in steps of {WORD_STEP} (got {words})"
        )));
    }
    Ok(())
}

// ── Writing ──────────────────────────────────────────────────────────────

/// A generated post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogOutput {
    pub topic: String,
    /// Polished Markdown of the final step.
    pub markdown: String,
    pub steps: Vec<StepResult>,
}

pub async fn write_blog(
    request: &BlogRequest,
    config: &ConversionConfig,
) -> Result<BlogOutput, ContentGenError> {
    request.validate()?;
    let backend = llm::resolve_backend(config)?;
    info!("Writing blog post: {}", request.topic.trim());

    let steps = request
        .crew()
        .kickoff(
            backend.as_ref(),
            &SamplingOptions::creative(config),
            &RetryPolicy::from_config(config),
            config.progress_callback.as_ref(),
        )
        .await?;

    let last = steps
        .last()
        .ok_or_else(|| ContentGenError::Internal("crew returned no steps".into()))?;
    let markdown = postprocess::polish_markdown(&last.output);
    if markdown.trim().is_empty() {
        return Err(ContentGenError::EmptyResponse {
            role: last.role.clone(),
        });
    }

    Ok(BlogOutput {
        topic: request.topic.trim().to_string(),
        markdown,
        steps,
    })
}

/// Write `blog_post.pdf` and `blog_post.html` into a fresh export directory,
/// titled with the topic.
pub fn export_blog(
    post: &BlogOutput,
    config: &ConversionConfig,
) -> Result<ExportReport, ContentGenError> {
    let dir = export::create_export_dir(&config.output_dir)?;
    let report = export::export_all(
        &post.markdown,
        Some(&post.topic),
        BLOG_STEM,
        &dir,
        config.output_format,
    )?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(report.files.len());
    }
    Ok(report)
}

// ── Review ───────────────────────────────────────────────────────────────

/// Five-point content-quality report for a post.
pub async fn analyze_content(
    text: &str,
    config: &ConversionConfig,
) -> Result<String, ContentGenError> {
    let backend = llm::resolve_backend(config)?;
    let prompt = Prompt::new(prompts::ANALYST_SYSTEM, prompts::analysis_prompt(text));
    let step = llm::run_step(
        backend.as_ref(),
        "Content Analyst",
        &prompt,
        &SamplingOptions::creative(config),
        &RetryPolicy::from_config(config),
    )
    .await?;
    Ok(step.output)
}

/// Interpretation of an originality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginalityBand {
    HighlyOriginal,
    MostlyOriginal,
    ModeratelyOriginal,
    NeedsImprovement,
    SignificantConcerns,
}

impl OriginalityBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => OriginalityBand::HighlyOriginal,
            70..=89 => OriginalityBand::MostlyOriginal,
            50..=69 => OriginalityBand::ModeratelyOriginal,
            30..=49 => OriginalityBand::NeedsImprovement,
            _ => OriginalityBand::SignificantConcerns,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OriginalityBand::HighlyOriginal => "Highly original",
            OriginalityBand::MostlyOriginal => "Mostly original",
            OriginalityBand::ModeratelyOriginal => "Moderately original",
            OriginalityBand::NeedsImprovement => "Needs improvement",
            OriginalityBand::SignificantConcerns => "Significant concerns",
        }
    }
}

impl fmt::Display for OriginalityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The checker's full answer and the score parsed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalityReport {
    pub report: String,
    /// `None` when the answer carried no `Score:` line.
    pub score: Option<u8>,
    pub band: Option<OriginalityBand>,
}

impl OriginalityReport {
    pub fn from_report(report: String) -> Self {
        let score = parse_score(&report);
        Self {
            band: score.map(OriginalityBand::from_score),
            score,
            report,
        }
    }
}

static RE_FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// First integer on the line after the first `Score:`, clamped to 100.
pub fn parse_score(report: &str) -> Option<u8> {
    let (_, after) = report.split_once("Score:")?;
    let line = after.lines().next().unwrap_or_default();
    let digits = RE_FIRST_INT.find(line)?.as_str();
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(100) as u8)
}

/// Run the Plagiarism Checker agent over `text`.
pub async fn check_originality(
    text: &str,
    config: &ConversionConfig,
) -> Result<OriginalityReport, ContentGenError> {
    let backend = llm::resolve_backend(config)?;
    let task = Task::new(
        format!(
            "Analyze the following content and provide:\n\
             1. A plagiarism score (0-100, where 100 is completely original)\n\
             2. Detailed analysis of writing patterns\n\
             3. Specific areas that might need improvement\n\
             4. Recommendations for enhancing originality\n\n\
             Content to analyze:\n{text}"
        ),
        "A detailed plagiarism analysis report with a \"Score: <number>\" line and recommendations.",
        prompts::plagiarism_checker(),
    )
    .without_context();

    let role = task.agent.role.clone();
    let step = llm::run_step(
        backend.as_ref(),
        &role,
        &task.prompt(None),
        &SamplingOptions::creative(config),
        &RetryPolicy::from_config(config),
    )
    .await?;

    Ok(OriginalityReport::from_report(step.output))
}
