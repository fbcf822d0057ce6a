//! Self-contained HTML document renderer.
//!
//! Output has inline styling only and never references external assets. Every
//! user-supplied value is escaped at the point it is written; links are written
//! only after sanitising.

use std::fmt::Write as _;

use super::avatar::is_data_image;
use super::sections::{self, HeaderBlock, ProjectCard, SectionVisitor, TimelineItem, TimelineKind};
use crate::content::sanitize::{escape_html, safe_url};
use crate::content::view_model::ExportViewModel;
use crate::templates::StyleTokens;

const EXTERNAL_LINK_ATTRS: &str = r#"target="_blank" rel="noopener noreferrer""#;

fn stylesheet(tokens: &StyleTokens) -> String {
    let primary = escape_html(&tokens.primary_color);
    let secondary = escape_html(&tokens.secondary_color);
    let accent = escape_html(&tokens.accent_color);
    let border = escape_html(&tokens.border_color);
    let name = escape_html(&tokens.name_color);
    format!(
        r#"* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; background: #f5f5f5; padding: 20px; }}
.container {{ max-width: 900px; margin: 0 auto; background: white; padding: 40px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
.header {{ text-align: center; border-bottom: 3px solid {border}; padding-bottom: 20px; margin-bottom: 30px; }}
.avatar {{ width: 120px; height: 120px; border-radius: 50%; object-fit: cover; border: 3px solid {border}; margin-bottom: 15px; }}
h1 {{ color: {name}; font-size: 2.5em; margin-bottom: 10px; }}
.headline {{ font-size: 1.3em; color: {secondary}; margin-bottom: 15px; }}
.contact-info, .social-links {{ display: flex; justify-content: center; flex-wrap: wrap; gap: 15px; margin-top: 10px; font-size: 0.9em; }}
.social-links a, .project-header a {{ color: {primary}; text-decoration: none; }}
.social-links a:hover, .project-header a:hover {{ text-decoration: underline; }}
section {{ margin-bottom: 30px; }}
h2 {{ color: {primary}; font-size: 1.8em; border-bottom: 2px solid {primary}; padding-bottom: 10px; margin-bottom: 15px; }}
.bio {{ font-size: 1.1em; line-height: 1.8; white-space: pre-line; }}
.skills {{ display: flex; flex-wrap: wrap; gap: 10px; }}
.skill-tag {{ background: {primary}1a; color: {primary}; border: 1px solid {primary}; padding: 5px 15px; border-radius: 20px; font-size: 0.9em; }}
.responsibilities ul {{ list-style: none; padding-left: 0; margin-bottom: 20px; }}
.responsibilities li {{ padding: 5px 0 5px 20px; position: relative; }}
.responsibilities li:before {{ content: "\2022"; color: {accent}; font-weight: bold; position: absolute; left: 0; }}
.timeline-item, .project-item {{ margin-bottom: 20px; padding-left: 15px; border-left: 3px solid {accent}; }}
.item-header {{ display: flex; justify-content: space-between; align-items: baseline; margin-bottom: 5px; }}
.item-title {{ font-weight: bold; font-size: 1.1em; color: #333; }}
.item-subtitle {{ color: #666; }}
.period {{ color: #999; font-size: 0.9em; font-style: italic; }}
.description {{ margin-top: 10px; color: #555; white-space: pre-line; }}
.project-item .skills {{ margin-top: 10px; }}
@media print {{ body {{ background: white; padding: 0; }} .container {{ box-shadow: none; padding: 20px; }} }}"#
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Section writer
// ────────────────────────────────────────────────────────────────────────────

struct HtmlWriter {
    body: String,
}

impl HtmlWriter {
    fn open_section(&mut self, class: &str, title: &str) {
        let _ = write!(
            self.body,
            r#"<section class="{class}"><h2>{}</h2>"#,
            escape_html(title)
        );
    }

    fn close_section(&mut self) {
        self.body.push_str("</section>\n");
    }

    fn chips(&mut self, items: &[String]) {
        self.body.push_str(r#"<div class="skills">"#);
        for item in items {
            let _ = write!(self.body, r#"<span class="skill-tag">{}</span>"#, escape_html(item));
        }
        self.body.push_str("</div>");
    }
}

impl SectionVisitor for HtmlWriter {
    type Output = String;

    fn header(&mut self, header: &HeaderBlock<'_>) {
        self.body.push_str(r#"<div class="header">"#);
        if let Some(avatar) = header.avatar.filter(|a| is_data_image(a)) {
            let _ = write!(
                self.body,
                r#"<img class="avatar" src="{}" alt="{}">"#,
                escape_html(avatar.trim()),
                escape_html(header.name)
            );
        }
        let _ = write!(self.body, "<h1>{}</h1>", escape_html(header.name));
        if !header.headline.trim().is_empty() {
            let _ = write!(
                self.body,
                r#"<div class="headline">{}</div>"#,
                escape_html(header.headline)
            );
        }
        if !header.contacts.is_empty() {
            self.body.push_str(r#"<div class="contact-info">"#);
            for entry in header.contacts {
                let _ = write!(
                    self.body,
                    "<span>{}: {}</span>",
                    escape_html(&entry.label),
                    escape_html(&entry.value)
                );
            }
            self.body.push_str("</div>");
        }
        let links: Vec<(String, &str)> = header
            .socials
            .iter()
            .filter_map(|l| safe_url(&l.value).map(|href| (href, l.label.as_str())))
            .collect();
        if !links.is_empty() {
            self.body.push_str(r#"<div class="social-links">"#);
            for (href, label) in links {
                let _ = write!(
                    self.body,
                    r#"<a href="{}" {EXTERNAL_LINK_ATTRS}>{}</a>"#,
                    escape_html(&href),
                    escape_html(label)
                );
            }
            self.body.push_str("</div>");
        }
        self.body.push_str("</div>\n");
    }

    fn summary(&mut self, title: &str, text: &str) {
        self.open_section("bio-section", title);
        let _ = write!(self.body, r#"<div class="bio">{}</div>"#, escape_html(text));
        self.close_section();
    }

    fn bullet_list(&mut self, title: &str, items: &[String]) {
        self.open_section("responsibilities", title);
        self.body.push_str("<ul>");
        for item in items {
            let _ = write!(self.body, "<li>{}</li>", escape_html(item));
        }
        self.body.push_str("</ul>");
        self.close_section();
    }

    fn chip_list(&mut self, title: &str, items: &[String]) {
        self.open_section("skills-section", title);
        self.chips(items);
        self.close_section();
    }

    fn timeline(&mut self, title: &str, kind: TimelineKind, items: &[TimelineItem<'_>]) {
        let class = match kind {
            TimelineKind::Experience => "experience-section",
            TimelineKind::Education => "education-section",
        };
        self.open_section(class, title);
        for item in items {
            let _ = write!(
                self.body,
                r#"<div class="timeline-item"><div class="item-header"><div><div class="item-title">{}</div>"#,
                escape_html(item.display_title(kind))
            );
            let subtitle = match (item.subtitle, item.location) {
                (Some(s), Some(l)) => Some(format!("{s} · {l}")),
                (Some(s), None) => Some(s.to_string()),
                (None, Some(l)) => Some(l.to_string()),
                (None, None) => None,
            };
            if let Some(subtitle) = subtitle {
                let _ = write!(
                    self.body,
                    r#"<div class="item-subtitle">{}</div>"#,
                    escape_html(&subtitle)
                );
            }
            self.body.push_str("</div>");
            if let Some(period) = item.period {
                let _ = write!(self.body, r#"<div class="period">{}</div>"#, escape_html(period));
            }
            self.body.push_str("</div>");
            if let Some(description) = item.description {
                let _ = write!(
                    self.body,
                    r#"<div class="description">{}</div>"#,
                    escape_html(description)
                );
            }
            self.body.push_str("</div>");
        }
        self.close_section();
    }

    fn projects(&mut self, title: &str, cards: &[ProjectCard<'_>]) {
        self.open_section("projects-section", title);
        for card in cards {
            let _ = write!(
                self.body,
                r#"<div class="project-item"><div class="item-header"><div class="item-title">{}</div>"#,
                escape_html(card.title)
            );
            if let Some(href) = card.link.and_then(safe_url) {
                let _ = write!(
                    self.body,
                    r#"<a href="{}" {EXTERNAL_LINK_ATTRS}>View &rarr;</a>"#,
                    escape_html(&href)
                );
            }
            self.body.push_str("</div>");
            if let Some(description) = card.description {
                let _ = write!(
                    self.body,
                    r#"<div class="description">{}</div>"#,
                    escape_html(description)
                );
            }
            if !card.tags.is_empty() {
                self.chips(card.tags);
            }
            self.body.push_str("</div>");
        }
        self.close_section();
    }

    fn finish(self) -> String {
        self.body
    }
}

/// Renders the complete document. Pure: equal inputs give equal strings.
pub fn render_html(vm: &ExportViewModel, tokens: &StyleTokens) -> String {
    let body = sections::walk(vm, HtmlWriter { body: String::new() });
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{} - Portfolio</title>
<style>
{}
</style>
</head>
<body>
<div class="container template-{}">
{body}</div>
</body>
</html>
"#,
        escape_html(&vm.resolved_name),
        stylesheet(tokens),
        vm.template_id.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::view_model::LabeledValue;
    use crate::render::avatar::tests::png_data_url;
    use crate::render::sections::tests::sample_view_model;
    use crate::templates::TemplateId;

    fn render(vm: &ExportViewModel) -> String {
        render_html(vm, &vm.template_id.tokens())
    }

    #[test]
    fn test_project_title_is_escaped() {
        let html = render(&sample_view_model());
        assert!(html.contains("&lt;b&gt;Evil&lt;/b&gt;"));
        assert!(!html.contains("<b>Evil"));
        assert!(html.contains("A CLI &amp; a daemon"));
    }

    #[test]
    fn test_sections_appear_in_order() {
        let html = render(&sample_view_model());
        let positions: Vec<usize> = [
            "<h1>Jane Doe</h1>",
            "Professional Summary",
            "Key Responsibilities",
            "Skills &amp; Technologies",
            "Professional Experience",
            "<h2>Education</h2>",
            "<h2>Projects</h2>",
        ]
        .iter()
        .map(|needle| html.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn test_links_are_sanitized_and_isolated() {
        let mut vm = sample_view_model();
        vm.social_links.push(LabeledValue {
            label: "Website".to_string(),
            value: "javascript:alert(1)".to_string(),
        });
        let html = render(&vm);
        assert!(!html.contains("javascript:"));
        assert!(html.contains(
            r#"<a href="https://github.com/jane" target="_blank" rel="noopener noreferrer">GitHub</a>"#
        ));
        assert!(html.contains(r#"href="https://jane.dev/cli""#));
    }

    #[test]
    fn test_script_in_name_is_escaped() {
        let mut vm = sample_view_model();
        vm.resolved_name = "<script>alert(1)</script>".to_string();
        let html = render(&vm);
        assert!(!html.contains("<script>"));
        assert!(html.contains("<title>&lt;script&gt;alert(1)&lt;/script&gt; - Portfolio</title>"));
    }

    #[test]
    fn test_theme_colors_are_applied() {
        let mut vm = sample_view_model();
        vm.template_id = TemplateId::Creative;
        let html = render(&vm);
        assert!(html.contains("#f59e0b"));
        assert!(html.contains("template-creative"));
        assert!(!html.contains("#10b981"));
    }

    #[test]
    fn test_only_data_url_avatars_are_embedded() {
        let mut vm = sample_view_model();
        vm.profile.avatar = Some("https://cdn.example.com/jane.jpg".to_string());
        assert!(!render(&vm).contains("<img"));

        vm.profile.avatar = Some(png_data_url(2, 2));
        assert!(render(&vm).contains(r#"<img class="avatar" src="data:image/png;base64,"#));
    }

    #[test]
    fn test_no_external_assets() {
        let html = render(&sample_view_model());
        assert!(!html.contains("<link"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let vm = sample_view_model();
        assert_eq!(render(&vm), render(&vm));
    }
}
