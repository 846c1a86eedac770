//! Agent personas and task prompts.
//!
//! Every prompt the crate sends lives here, so prompt regressions show up
//! in one diff and unit tests can inspect prompts without a model.
//!
//! Two crews are defined:
//!
//! * **Research conversion**: Research Analyst → Content Creator →
//!   Content Formatter. Each step may only restructure the source; none may
//!   add information.
//! * **Blog writing**: Research Specialist → NLP Specialist → Content Writer,
//!   plus a stand-alone Plagiarism Checker.

use crate::crew::{Agent, Task};

// ── Research conversion agents ───────────────────────────────────────────

pub fn research_analyst() -> Agent {
    Agent::new(
        "Research Analyst",
        "Extract and organize information from research documents",
        "You are an expert research analyst with deep experience in academic \
         and technical document analysis. You excel at extracting key information, \
         identifying main arguments, and organizing content logically while \
         maintaining the original context and accuracy of the source material.",
    )
}

pub fn content_creator() -> Agent {
    Agent::new(
        "Content Creator",
        "Transform research findings into well-structured, readable content",
        "You are a skilled content creator who specializes in transforming \
         complex research into clear, engaging content. You maintain the \
         technical accuracy while improving readability and flow.",
    )
}

pub fn content_formatter() -> Agent {
    Agent::new(
        "Content Formatter",
        "Format content for various output formats while maintaining structure",
        "You are an expert in content formatting and presentation. You ensure \
         that content is properly structured for different output formats \
         while maintaining readability and professional appearance.",
    )
}

// ── Research conversion tasks ────────────────────────────────────────────

const RESEARCH_RULES: &str = r#"STRICTLY extract and organize the content of the document below exactly as it appears.

CRITICAL RULES:
1. DO NOT add any information that is not explicitly present in the document
2. DO NOT make creative interpretations or expansions
3. DO NOT reorganize or restructure the content's original flow
4. Copy text verbatim where possible, maintaining exact wording
5. Preserve all numerical data, statistics, and figures exactly as they appear

Extract and organize the following sections IN ORDER:
1. Title (from the beginning of the document)
2. Authors (if present)
3. Abstract/Introduction
4. Main Content (maintaining original structure)
5. Conclusions
6. References

For each section:
- Use exact quotes from the document
- Include page numbers when available (pages are marked "=== Page N ===")
- Maintain original paragraph structure
- Keep all numerical values unchanged
- Preserve technical terminology exactly
- Keep citations in their original format

Act as a precise extractor, not an interpreter or rewriter.
If a section is not found, state explicitly that it is not present in the document."#;

/// Extraction step. The document text is embedded in the task itself.
pub fn research_task(document: &str) -> Task {
    Task::new(
        format!("{RESEARCH_RULES}\n\nDOCUMENT:\n\"\"\"\n{document}\n\"\"\""),
        "A faithful, verbatim reproduction of the source document's content, \
         maintaining original structure, wording, and data, with page numbers preserved.",
        research_analyst(),
    )
    .without_context()
}

/// Structuring step. `brand_context` only affects presentation.
pub fn content_creation_task(brand_context: Option<&str>) -> Task {
    let brand = brand_context
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or("None provided.");

    Task::new(
        format!(
            r#"Using ONLY the extracted content from the research step, create a structured document.

CRITICAL REQUIREMENTS:
1. Use ONLY information present in the source material
2. DO NOT add any new information, interpretations, or expansions
3. DO NOT modify or paraphrase technical content
4. Maintain all original data, figures, and statistics exactly
5. Keep all technical terminology unchanged

Structure the content as follows:
1. Title: Use the exact original title
2. Authors: List all authors as shown in the source
3. Main Content: Follow the original document's structure
   - Keep original section headings
   - Maintain original paragraph organization
   - Use verbatim quotes for key findings
   - Keep all numerical data unchanged
4. Conclusions: Use the original conclusions
5. References: Include all original references in their exact format

Brand Context (if applicable):
{brand}

Note: Apply branding ONLY to visual formatting, never to modify the actual content."#
        ),
        "A structured document that faithfully represents the original content \
         without any creative additions or modifications.",
        content_creator(),
    )
}

const FORMATTING_RULES: &str = r#"Format the document while preserving exact content.

CRITICAL RULES:
1. DO NOT modify any content
2. DO NOT add or remove information
3. DO NOT rewrite or paraphrase
4. Maintain all technical terms exactly

Apply only these formatting elements:
1. Basic Structure:
   - # for document title
   - ## for main sections
   - ### for subsections
   - Basic lists (when present in original)
   - Simple tables (when present in original)

2. Text Formatting:
   - Preserve original paragraph breaks
   - Maintain original list structures
   - Keep table layouts as in source
   - Retain original emphasis (bold/italic) if present

3. NO modifications to:
   - Technical terminology
   - Numerical values
   - Equations or formulas
   - Citations or references
   - Author names or affiliations

Output ONLY the Markdown document. Do not wrap it in code fences."#;

pub fn formatting_task() -> Task {
    Task::new(
        FORMATTING_RULES,
        "A cleanly formatted Markdown document with the exact same content as the source material.",
        content_formatter(),
    )
}

/// The three research-conversion steps in order.
pub fn research_crew(document: &str, brand_context: Option<&str>) -> Vec<Task> {
    vec![
        research_task(document),
        content_creation_task(brand_context),
        formatting_task(),
    ]
}

// ── Single-call prompts ──────────────────────────────────────────────────

pub const TRANSLATOR_SYSTEM: &str =
    "You are a careful technical translator. Reply with the translation only.";

pub fn translation_prompt(text: &str) -> String {
    format!(
        "Translate the following Hindi/Devanagari text to English.\n\
         Keep technical terms as is, and maintain any numerical values or measurements exactly.\n\
         Preserve formatting and structure of the text, including the \"=== Page N ===\" markers.\n\n\
         Text to translate:\n{text}\n\n\
         Please provide a clear and accurate translation while keeping technical terminology intact."
    )
}

pub const BRAND_SYSTEM: &str =
    "You are a brand analyst. Summarise brand guidelines concisely for a document designer.";

pub fn brand_prompt(guidelines: &str) -> String {
    format!(
        "Extract key branding elements, tone, voice, and styling guidelines from the \
         brand guidelines document below.\n\nBRAND GUIDELINES:\n\"\"\"\n{guidelines}\n\"\"\""
    )
}

pub const ANALYST_SYSTEM: &str = "You are an experienced editor who reviews blog content.";

pub fn analysis_prompt(content: &str) -> String {
    format!(
        "Analyze the following blog content and provide a detailed report including:\n\
         1. Content Quality Assessment\n\
         2. Key Points and Main Arguments\n\
         3. Writing Style Analysis\n\
         4. Potential Improvements\n\
         5. Originality Assessment (based on common patterns and structures)\n\n\
         Blog Content:\n{content}"
    )
}

// ── Blog agents ──────────────────────────────────────────────────────────

pub fn research_specialist() -> Agent {
    Agent::new(
        "Research Specialist",
        "Gather comprehensive information about the given topic while considering \
         target audience, industry, and content goals",
        "You are an expert researcher with years of experience in gathering \
         and analyzing information from various sources. Your expertise lies \
         in finding accurate and relevant information quickly, while ensuring \
         the content aligns with the target audience's knowledge level, \
         industry context, and specific content goals. You adapt research depth \
         and focus to whether the content needs to educate, convert, rank, or entertain.",
    )
}

pub fn nlp_specialist() -> Agent {
    Agent::new(
        "NLP Specialist",
        "Process and analyze the gathered information using NLP techniques while \
         maintaining the specified tone and style",
        "You are an NLP expert who specializes in text processing and analysis. \
         You identify key themes, extract important information, and structure \
         content effectively. You adapt the content's tone and style to the \
         requirements, whether conversational, storytelling, humorous, or professional, \
         and make the structure fit the chosen blog type while keeping it readable.",
    )
}

pub fn content_writer() -> Agent {
    Agent::new(
        "Content Writer",
        "Create engaging and well-structured blog content that matches the specified \
         audience, tone, and content goals",
        "You are a professional content writer with expertise in creating \
         engaging and informative blog posts. You adapt your writing style to \
         different audiences (students, engineers, PhD researchers, etc.) and \
         switch between tones (conversational, storytelling, humorous, etc.). \
         You optimise content for different goals (educate, convert, rank, entertain) \
         while keeping the technical depth right for the audience.",
    )
}

pub fn plagiarism_checker() -> Agent {
    Agent::new(
        "Plagiarism Checker",
        "Analyze content originality and provide a plagiarism score based on specific \
         criteria while considering the content type and audience",
        r#"You are an expert in content verification and plagiarism detection.
You analyze content on five criteria, each worth 20 points:

1. Writing Style Originality: unique sentence structures, personal voice and tone,
   creative expression, avoidance of clichés, fit to the specified tone and audience.
2. Content Structure: original organization, flow and transitions, section
   arrangement, presentation, alignment with blog type and content goal.
3. Language and Vocabulary: word choice, varied vocabulary, metaphors, original
   expressions, suitability for the target audience.
4. Idea Development: original perspectives, insights, connections, approaches,
   relevance to the industry or domain.
5. Technical Elements: original examples, data presentation, formatting, use of
   technical terms, alignment with content goals.

For each criterion give a score (0-20), specific examples from the text, areas for
improvement and recommendations.

Sum the criteria into a final score (0-100) and report it on its own line as
"Score: <number>". A score of:
- 90-100: Highly original
- 70-89: Mostly original
- 50-69: Moderately original
- 30-49: Needs improvement
- 0-29: Significant concerns"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_task_embeds_document() {
        let t = research_task("=== Page 1 ===\nHello");
        assert!(t.description.contains("=== Page 1 ===\nHello"));
        assert!(!t.uses_context);
        assert_eq!(t.agent.role, "Research Analyst");
    }

    #[test]
    fn brand_context_is_inserted_or_defaulted() {
        let with = content_creation_task(Some("Navy blue, formal voice"));
        assert!(with.description.contains("Navy blue, formal voice"));
        let without = content_creation_task(Some("   "));
        assert!(without.description.contains("None provided."));
        assert!(without.description.contains("ONLY to visual formatting"));
    }

    #[test]
    fn research_crew_order() {
        let roles: Vec<_> = research_crew("x", None)
            .into_iter()
            .map(|t| t.agent.role)
            .collect();
        assert_eq!(roles, ["Research Analyst", "Content Creator", "Content Formatter"]);
    }

    #[test]
    fn analysis_prompt_has_five_points() {
        let p = analysis_prompt("post");
        for n in 1..=5 {
            assert!(p.contains(&format!("{n}. ")));
        }
        assert!(p.ends_with("post"));
    }

    #[test]
    fn plagiarism_checker_asks_for_score_line() {
        assert!(plagiarism_checker().backstory.contains("Score: <number>"));
    }
}
