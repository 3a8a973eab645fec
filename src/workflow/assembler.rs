use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::run::FinalReport;
use crate::service::{ReportSynthesizer, StageOutputs};
use crate::stage::StageDefinition;

pub const DEFAULT_REPORT_TITLE: &str = "Financial Analysis Report";

/// Turns completed stage outputs into a final report.
///
/// Makes one synthesis attempt. Any failure, including an empty result, falls
/// back to a report stitched together from the stage outputs, so
/// [`ReportAssembler::assemble`] cannot fail.
pub struct ReportAssembler {
    synthesizer: Arc<dyn ReportSynthesizer>,
    stages: Vec<StageDefinition>,
    title: String,
}

impl ReportAssembler {
    pub fn new(synthesizer: Arc<dyn ReportSynthesizer>, stages: Vec<StageDefinition>) -> Self {
        Self {
            synthesizer,
            stages,
            title: DEFAULT_REPORT_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub async fn assemble(&self, query: &str, outputs: &StageOutputs) -> FinalReport {
        let reason = match self.synthesizer.synthesize(query, outputs).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(chars = text.chars().count(), "report synthesized");
                return FinalReport::synthesized(text, Utc::now());
            }
            Ok(_) => "synthesis returned an empty report".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(reason = %reason, "report synthesis failed, using fallback report");
        let generated_at = Utc::now();
        let text = fallback_report(&self.title, query, &self.stages, outputs, generated_at);
        FinalReport::fallback(text, reason, generated_at)
    }
}

/// Build the degraded report from whatever stage outputs exist.
///
/// Deterministic for a given `generated_at`. Stages without output get a
/// placeholder line so every stage keeps its section.
pub fn fallback_report(
    title: &str,
    query: &str,
    stages: &[StageDefinition],
    outputs: &StageOutputs,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title));
    out.push_str("## Executive Summary\n");
    out.push_str(&format!("Query: {}\n", query));
    out.push_str(
        "Comprehensive report synthesis was unavailable, so this report combines the \
         individual stage outputs below without cross-stage integration.\n",
    );

    for stage in stages {
        out.push_str(&format!("\n## {}\n", stage.name));
        match outputs.get(&stage.id) {
            Some(output) => out.push_str(output.trim_end()),
            None => out.push_str(&format!("{} output not available", stage.name)),
        }
        out.push('\n');
    }

    out.push_str("\n---\n");
    out.push_str(&format!(
        "Generated on {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}


#[cfg(test)]
mod tests {
    use super::testing::FixedSynthesizer;
    use super::*;
    use crate::document::Block;
    use crate::errors::ServiceError;
    use crate::service::NoSynthesis;
    use crate::stage::get_default_stages;
    use chrono::TimeZone;

    fn outputs() -> StageOutputs {
        let mut o = StageOutputs::new();
        o.insert("research", "R-OUT");
        o.insert("analysis", "A-OUT");
        o.insert("recommendation", "C-OUT");
        o
    }

    fn assembler(synth: Arc<dyn ReportSynthesizer>) -> ReportAssembler {
        ReportAssembler::new(synth, get_default_stages())
    }

    #[tokio::test]
    async fn test_synthesized_report_used_verbatim() {
        let synth = Arc::new(FixedSynthesizer::ok("# Full Report\nAll good"));
        let report = assembler(synth.clone()).assemble("q", &outputs()).await;
        assert!(!report.degraded);
        assert!(report.synthesis_error.is_none());
        assert_eq!(report.text, "# Full Report\nAll good");
        assert_eq!(synth.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back() {
        let synth = Arc::new(FixedSynthesizer::err(ServiceError::Transport(
            "connection reset".into(),
        )));
        let report = assembler(synth.clone()).assemble("Analyze Apple", &outputs()).await;
        assert!(report.degraded);
        assert!(report.synthesis_error.as_deref().unwrap().contains("connection reset"));
        assert!(report.text.contains("Query: Analyze Apple"));
        for out in ["R-OUT", "A-OUT", "C-OUT"] {
            assert!(report.text.contains(out));
        }
        assert_eq!(synth.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unsuccessful_response_falls_back() {
        let synth = Arc::new(FixedSynthesizer::err(ServiceError::Unsuccessful(
            "quota".into(),
        )));
        let report = assembler(synth).assemble("q", &outputs()).await;
        assert!(report.degraded);
        assert!(!report.text.is_empty());
    }

    #[tokio::test]
    async fn test_blank_synthesis_counts_as_failure() {
        let synth = Arc::new(FixedSynthesizer::ok("  \n "));
        let report = assembler(synth).assemble("q", &outputs()).await;
        assert!(report.degraded);
        assert_eq!(
            report.synthesis_error.as_deref(),
            Some("synthesis returned an empty report")
        );
    }

    #[tokio::test]
    async fn test_no_synthesis_always_falls_back() {
        let report = assembler(Arc::new(NoSynthesis))
            .assemble("q", &StageOutputs::new())
            .await;
        assert!(report.degraded);
        assert!(report.text.contains("Research Agent output not available"));
    }

    #[test]
    fn test_fallback_has_one_section_per_stage_in_order() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let text = fallback_report(
            DEFAULT_REPORT_TITLE,
            "Analyze Apple",
            &get_default_stages(),
            &outputs(),
            at,
        );
        let doc = crate::document::parse_document(&text);
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Financial Analysis Report",
                "Executive Summary",
                "Research Agent",
                "Analysis Agent",
                "Recommendation Agent",
            ]
        );
        assert_eq!(
            doc.sections[2].blocks.first(),
            Some(&Block::Paragraph("R-OUT".to_string()))
        );
        assert!(text.trim_end().ends_with("Generated on 2024-03-01 09:30:00 UTC"));
    }

    #[test]
    fn test_fallback_placeholder_for_missing_output() {
        let mut partial = StageOutputs::new();
        partial.insert("research", "R-OUT");
        partial.insert("recommendation", "C-OUT");
        let text = fallback_report("T", "q", &get_default_stages(), &partial, Utc::now());
        assert!(text.contains("## Analysis Agent\nAnalysis Agent output not available"));
        assert!(text.contains("R-OUT"));
        assert!(text.contains("C-OUT"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let stages = get_default_stages();
        let a = fallback_report("T", "q", &stages, &outputs(), at);
        let b = fallback_report("T", "q", &stages, &outputs(), at);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_custom_title() {
        let report = assembler(Arc::new(NoSynthesis))
            .with_title("Quarterly Review")
            .assemble("q", &outputs())
            .await;
        assert!(report.text.starts_with("# Quarterly Review\n"));
    }
}
