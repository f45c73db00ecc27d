//! Competitor-analysis request and result types, plus the constrained output
//! schema sent to the model so its raw response parses as [`AnalysisResult`].

use serde::{Deserialize, Serialize};

/// Input for one analysis: the competitor page text and the targeted subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub competitor_content: String,
    pub subject: String,
}

impl AnalysisRequest {
    /// Both fields must be non-empty before anything is sent upstream.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.competitor_content.is_empty() || self.subject.is_empty() {
            Err("missing competitorContent or subject")
        } else {
            Ok(())
        }
    }
}

/// SEO fields extracted from the competitor page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub h1: String,
    pub meta_title: String,
    pub meta_description: String,
}

/// Structured result of one analysis. Produced per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub seo_analysis: SeoAnalysis,
    pub content_angle: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub strategic_opportunity: String,
}

/// Response schema in the API's OBJECT/STRING/ARRAY vocabulary. Conformance of
/// the model output is the upstream's contract; parsing enforces it here.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "seoAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "h1": { "type": "STRING" },
                    "metaTitle": { "type": "STRING" },
                    "metaDescription": { "type": "STRING" }
                }
            },
            "contentAngle": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "weaknesses": { "type": "ARRAY", "items": { "type": "STRING" } },
            "strategicOpportunity": { "type": "STRING" }
        }
    })
}

/// Prompt for the single-shot analysis call.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    format!(
        "Analyse le contenu de la page concurrente suivante sur le sujet \"{}\". Contenu à analyser: \"{}\"",
        request.subject, request.competitor_content
    )
}
