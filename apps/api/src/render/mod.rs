// Renderers: pure functions from (ExportViewModel, StyleTokens) to a finished artifact.
// All three walk the same section outline (`sections`) so order and omission rules
// live in one place.

pub mod avatar;
pub mod docx;
pub mod font_metrics;
pub mod html;
pub mod pdf;
pub mod sections;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::view_model::ExportViewModel;
use crate::templates::StyleTokens;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("DOCX rendering failed: {0}")]
    Docx(String),

    #[error("avatar could not be processed: {0}")]
    Avatar(String),
}

/// The three downloadable artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Html,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Html => "html",
        }
    }

    /// PDF is the only format whose header layout needs an explicit headline.
    pub fn requires_headline(&self) -> bool {
        matches!(self, ExportFormat::Pdf)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

/// Renders one artifact. The result is either the complete document or an error.
pub fn render(
    format: ExportFormat,
    vm: &ExportViewModel,
    tokens: &StyleTokens,
) -> Result<Vec<u8>, RenderError> {
    match format {
        ExportFormat::Pdf => pdf::render_pdf(vm, tokens),
        ExportFormat::Docx => docx::render_docx(vm),
        ExportFormat::Html => Ok(html::render_html(vm, tokens).into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_headers() {
        assert_eq!(ExportFormat::Pdf.content_type(), "application/pdf");
        assert_eq!(ExportFormat::Html.content_type(), "text/html; charset=utf-8");
        assert_eq!(ExportFormat::Docx.extension(), "docx");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("PDF".parse::<ExportFormat>(), Ok(ExportFormat::Pdf));
        assert_eq!("htm".parse::<ExportFormat>(), Ok(ExportFormat::Html));
        assert!("odt".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_only_pdf_requires_headline() {
        assert!(ExportFormat::Pdf.requires_headline());
        assert!(!ExportFormat::Docx.requires_headline());
        assert!(!ExportFormat::Html.requires_headline());
    }
}
