//! Visual templates and the color tokens each one contributes to the renderers.
//!
//! Template ids come from the client and may be stale or misspelled. Resolution never
//! fails: anything unrecognised resolves to `modern`.

use serde::{Deserialize, Serialize};

/// The five visual templates a portfolio can be exported with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TemplateId {
    #[default]
    Modern,
    Classic,
    Creative,
    Minimal,
    Tech,
}

pub const ALL_TEMPLATES: [TemplateId; 5] = [
    TemplateId::Modern,
    TemplateId::Classic,
    TemplateId::Creative,
    TemplateId::Minimal,
    TemplateId::Tech,
];

impl TemplateId {
    /// Resolves a client-supplied id. Unknown ids fall back to `Modern`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "modern" => TemplateId::Modern,
            "classic" => TemplateId::Classic,
            "creative" => TemplateId::Creative,
            "minimal" => TemplateId::Minimal,
            "tech" => TemplateId::Tech,
            _ => TemplateId::Modern,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Modern => "modern",
            TemplateId::Classic => "classic",
            TemplateId::Creative => "creative",
            TemplateId::Minimal => "minimal",
            TemplateId::Tech => "tech",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TemplateId::Modern => "Modern",
            TemplateId::Classic => "Classic",
            TemplateId::Creative => "Creative",
            TemplateId::Minimal => "Minimal",
            TemplateId::Tech => "Tech",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemplateId::Modern => "Clean, minimalist design with bold typography",
            TemplateId::Classic => "Traditional professional layout with elegant styling",
            TemplateId::Creative => "Bold, colorful design perfect for designers and artists",
            TemplateId::Minimal => "Ultra-minimal design focusing on content",
            TemplateId::Tech => "Modern tech-focused design with code-inspired elements",
        }
    }

    /// Builds a fresh token set for this template.
    pub fn tokens(&self) -> StyleTokens {
        let (primary, secondary, accent, border, name) = match self {
            TemplateId::Modern => ("#6366f1", "#8b5cf6", "#ec4899", "#6366f1", "#6366f1"),
            TemplateId::Classic => ("#1e40af", "#3b82f6", "#60a5fa", "#1e40af", "#1e40af"),
            TemplateId::Creative => ("#f59e0b", "#ef4444", "#8b5cf6", "#f59e0b", "#f59e0b"),
            TemplateId::Minimal => ("#000000", "#4b5563", "#9ca3af", "#9ca3af", "#000000"),
            TemplateId::Tech => ("#10b981", "#3b82f6", "#f59e0b", "#10b981", "#10b981"),
        };
        StyleTokens {
            primary_color: primary.to_string(),
            secondary_color: secondary.to_string(),
            accent_color: accent.to_string(),
            border_color: border.to_string(),
            name_color: name.to_string(),
        }
    }
}

impl From<String> for TemplateId {
    fn from(raw: String) -> Self {
        TemplateId::parse(&raw)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named hex colors for one template.
///
/// Constructed per request and handed to a renderer by value, so concurrent exports
/// never share a style object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTokens {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub border_color: String,
    pub name_color: String,
}

/// Returns the tokens for a raw template id, falling back to `modern`.
pub fn get_tokens(raw_id: &str) -> StyleTokens {
    TemplateId::parse(raw_id).tokens()
}

/// Catalogue entry served by `GET /api/v1/templates`.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: TemplateId,
    pub name: &'static str,
    pub description: &'static str,
    pub tokens: StyleTokens,
}

pub fn all_templates() -> Vec<TemplateInfo> {
    ALL_TEMPLATES
        .iter()
        .map(|id| TemplateInfo {
            id: *id,
            name: id.display_name(),
            description: id.description(),
            tokens: id.tokens(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_color(value: &str) -> bool {
        value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_every_known_template_has_five_hex_tokens() {
        for id in ALL_TEMPLATES {
            let t = get_tokens(id.as_str());
            for color in [
                &t.primary_color,
                &t.secondary_color,
                &t.accent_color,
                &t.border_color,
                &t.name_color,
            ] {
                assert!(is_hex_color(color), "{id}: '{color}' is not a hex color");
            }
        }
    }

    #[test]
    fn test_unknown_template_returns_modern_tokens() {
        assert_eq!(get_tokens("brutalist"), get_tokens("modern"));
        assert_eq!(get_tokens(""), TemplateId::Modern.tokens());
    }

    #[test]
    fn test_tech_tokens_are_green() {
        let t = get_tokens("tech");
        assert_eq!(t.primary_color, "#10b981");
        assert_eq!(t.name_color, "#10b981");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(TemplateId::parse(" Classic "), TemplateId::Classic);
        assert_eq!(TemplateId::parse("TECH"), TemplateId::Tech);
    }

    #[test]
    fn test_deserialize_unknown_id_never_fails() {
        let id: TemplateId = serde_json::from_str("\"vaporwave\"").unwrap();
        assert_eq!(id, TemplateId::Modern);
        let id: TemplateId = serde_json::from_str("\"creative\"").unwrap();
        assert_eq!(id, TemplateId::Creative);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TemplateId::Minimal).unwrap(),
            "\"minimal\""
        );
    }

    #[test]
    fn test_catalogue_lists_all_templates_in_order() {
        let ids: Vec<&str> = all_templates().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["modern", "classic", "creative", "minimal", "tech"]);
    }
}
