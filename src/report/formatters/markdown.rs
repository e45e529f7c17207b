use anyhow::Result;
use async_trait::async_trait;

use super::ReportFormatter;
use crate::models::AnalyzerStatus;
use crate::report::{ReportSection, ReviewReport};

/// Markdown formatter. One section per component; components without data get
/// an explicit unavailable marker instead of being dropped.
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self
    }

    fn status_symbol(status: AnalyzerStatus) -> &'static str {
        match status {
            AnalyzerStatus::Succeeded => "✅",
            AnalyzerStatus::Failed => "❌",
            AnalyzerStatus::TimedOut => "⏱️",
            AnalyzerStatus::Pending => "⏳",
        }
    }

    fn render_section(&self, section: &ReportSection) -> String {
        let title = section.component.title();
        let mut content = format!("## {title}\n\n");

        match &section.data {
            Some(data) => {
                let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
                content.push_str("```json\n");
                content.push_str(&body);
                content.push_str("\n```\n");
            }
            None => {
                content.push_str(&format!(
                    "_{title} data unavailable ({})._\n",
                    section.status
                ));
            }
        }

        content
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportFormatter for MarkdownFormatter {
    async fn format(&self, report: &ReviewReport) -> Result<String> {
        let mut content = String::new();

        content.push_str(&format!("# Operational Review {}\n\n", report.review_id));
        content.push_str(&format!(
            "Generated: {}\n\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        content.push_str(&format!(
            "Window: {} to {}\n\n",
            report.window.start.format("%Y-%m-%d"),
            report.window.end.format("%Y-%m-%d")
        ));

        content.push_str("| Component | Status |\n");
        content.push_str("|-----------|--------|\n");
        for section in &report.sections {
            content.push_str(&format!(
                "| {} | {} {} |\n",
                section.component.title(),
                Self::status_symbol(section.status),
                section.status
            ));
        }
        content.push('\n');

        for section in &report.sections {
            content.push_str(&self.render_section(section));
            content.push('\n');
        }

        Ok(content)
    }

    fn name(&self) -> &str {
        "markdown"
    }

    fn file_extension(&self) -> &str {
        "md"
    }
}
