//! DOCX renderer built on docx-rs.
//!
//! Rendering is two steps: the outline is lowered to a flat list of `DocxBlock`s,
//! then the writer turns blocks into docx-rs paragraphs. Word documents carry no
//! template theming and no avatar.

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, LineSpacing, Paragraph, Run, Style, StyleType};

use super::sections::{self, HeaderBlock, ProjectCard, SectionVisitor, TimelineItem, TimelineKind};
use super::RenderError;
use crate::content::view_model::{ExportViewModel, LabeledValue};

const TITLE_STYLE: &str = "Title";
const HEADING_STYLE: &str = "Heading1";

/// Half-points, as docx-rs sizes runs.
const EXPERIENCE_HEADING_SIZE: usize = 24;
const HEADING_SPACING_BEFORE: u32 = 400;
const HEADING_SPACING_AFTER: u32 = 200;
/// First `w14:paraId`. Paragraph ids follow the block index, above the range docx-rs
/// counts through on its own.
const PARA_ID_BASE: usize = 0x1000_0000;

/// Intermediate paragraph model between the outline and docx-rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocxBlock {
    /// The name, centred in the Title style.
    Title(String),
    /// Centred plain paragraph (headline, contact line, social line).
    Centered(String),
    Heading(String),
    Bullet(String),
    Body(String),
    /// Bold entry heading; `large` only for experience.
    EntryHeading { text: String, large: bool },
    Period(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Outline lowering
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct DocxLowering {
    blocks: Vec<DocxBlock>,
}

fn joined(entries: &[LabeledValue]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.label, e.value))
        .collect::<Vec<_>>()
        .join(" | ")
}

impl SectionVisitor for DocxLowering {
    type Output = Vec<DocxBlock>;

    fn header(&mut self, header: &HeaderBlock<'_>) {
        self.blocks.push(DocxBlock::Title(header.name.to_string()));
        if !header.headline.trim().is_empty() {
            self.blocks.push(DocxBlock::Centered(header.headline.to_string()));
        }
        if !header.contacts.is_empty() {
            self.blocks.push(DocxBlock::Centered(joined(header.contacts)));
        }
        if !header.socials.is_empty() {
            self.blocks.push(DocxBlock::Centered(joined(header.socials)));
        }
    }

    fn summary(&mut self, title: &str, text: &str) {
        self.blocks.push(DocxBlock::Heading(title.to_string()));
        self.blocks.push(DocxBlock::Body(text.to_string()));
    }

    fn bullet_list(&mut self, title: &str, items: &[String]) {
        self.blocks.push(DocxBlock::Heading(title.to_string()));
        self.blocks
            .extend(items.iter().map(|item| DocxBlock::Bullet(item.clone())));
    }

    fn chip_list(&mut self, title: &str, items: &[String]) {
        self.blocks.push(DocxBlock::Heading(title.to_string()));
        self.blocks.push(DocxBlock::Body(items.join(", ")));
    }

    fn timeline(&mut self, title: &str, kind: TimelineKind, items: &[TimelineItem<'_>]) {
        self.blocks.push(DocxBlock::Heading(title.to_string()));
        for item in items {
            self.blocks.push(DocxBlock::EntryHeading {
                text: item.heading(kind),
                large: kind == TimelineKind::Experience,
            });
            if let Some(period) = item.period {
                self.blocks.push(DocxBlock::Period(period.to_string()));
            }
            if let Some(description) = item.description {
                self.blocks.push(DocxBlock::Body(description.to_string()));
            }
        }
    }

    fn projects(&mut self, title: &str, cards: &[ProjectCard<'_>]) {
        self.blocks.push(DocxBlock::Heading(title.to_string()));
        for card in cards {
            self.blocks.push(DocxBlock::EntryHeading {
                text: card.title.to_string(),
                large: false,
            });
            if let Some(description) = card.description {
                self.blocks.push(DocxBlock::Body(description.to_string()));
            }
        }
    }

    fn finish(self) -> Vec<DocxBlock> {
        self.blocks
    }
}

/// Lowers the view model to document blocks in section order.
pub fn blocks(vm: &ExportViewModel) -> Vec<DocxBlock> {
    sections::walk(vm, DocxLowering::default())
}

// ────────────────────────────────────────────────────────────────────────────
// Writer
// ────────────────────────────────────────────────────────────────────────────

fn to_paragraph(block: &DocxBlock) -> Paragraph {
    match block {
        DocxBlock::Title(text) => Paragraph::new()
            .add_run(Run::new().add_text(text))
            .style(TITLE_STYLE)
            .align(AlignmentType::Center),
        DocxBlock::Centered(text) => Paragraph::new()
            .add_run(Run::new().add_text(text))
            .align(AlignmentType::Center),
        DocxBlock::Heading(text) => Paragraph::new()
            .add_run(Run::new().add_text(text))
            .style(HEADING_STYLE)
            .line_spacing(
                LineSpacing::new()
                    .before(HEADING_SPACING_BEFORE)
                    .after(HEADING_SPACING_AFTER),
            ),
        DocxBlock::Bullet(text) => Paragraph::new()
            .add_run(Run::new().add_text("• ").bold())
            .add_run(Run::new().add_text(text)),
        DocxBlock::Body(text) => Paragraph::new().add_run(Run::new().add_text(text)),
        DocxBlock::EntryHeading { text, large } => {
            let run = Run::new().add_text(text).bold();
            let run = if *large {
                run.size(EXPERIENCE_HEADING_SIZE)
            } else {
                run
            };
            Paragraph::new().add_run(run)
        }
        DocxBlock::Period(text) => Paragraph::new().add_run(Run::new().add_text(text).italic()),
    }
}

fn styled_document() -> Docx {
    Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Title")
                .size(56)
                .bold(),
        )
        .add_style(
            Style::new(HEADING_STYLE, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
}

/// Packs blocks into a complete `.docx` archive.
pub fn write_docx(blocks: &[DocxBlock]) -> Result<Vec<u8>, RenderError> {
    let doc = blocks
        .iter()
        .enumerate()
        .fold(styled_document(), |doc, (i, block)| {
            doc.add_paragraph(to_paragraph(block).id(format!("{:08x}", PARA_ID_BASE + i)))
        });

    let mut cursor = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut cursor)
        .map_err(|e| RenderError::Docx(e.to_string()))?;
    Ok(cursor.into_inner())
}

pub fn render_docx(vm: &ExportViewModel) -> Result<Vec<u8>, RenderError> {
    write_docx(&blocks(vm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::sections::tests::sample_view_model;

    #[test]
    fn test_header_blocks() {
        let blocks = blocks(&sample_view_model());
        assert_eq!(blocks[0], DocxBlock::Title("Jane Doe".to_string()));
        assert_eq!(
            blocks[1],
            DocxBlock::Centered("Backend Developer | Building Innovative Solutions".to_string())
        );
        assert_eq!(
            blocks[2],
            DocxBlock::Centered("Email: jane@example.com | Location: Berlin".to_string())
        );
        assert_eq!(
            blocks[3],
            DocxBlock::Centered("GitHub: https://github.com/jane".to_string())
        );
    }

    #[test]
    fn test_section_content() {
        let blocks = blocks(&sample_view_model());
        assert!(blocks.contains(&DocxBlock::Body("Go, Rust, PostgreSQL".to_string())));
        assert!(blocks.contains(&DocxBlock::Bullet("Design APIs".to_string())));
        assert!(blocks.contains(&DocxBlock::EntryHeading {
            text: "Senior Engineer at Acme".to_string(),
            large: true,
        }));
        assert!(blocks.contains(&DocxBlock::Period("03/2019 - Present".to_string())));
        assert!(blocks.contains(&DocxBlock::EntryHeading {
            text: "BSc Computer Science - TU Berlin".to_string(),
            large: false,
        }));
        // Word text runs are not markup; titles stay verbatim.
        assert!(blocks.contains(&DocxBlock::EntryHeading {
            text: "<b>Evil</b>".to_string(),
            large: false,
        }));
    }

    #[test]
    fn test_headings_follow_outline_order() {
        let headings: Vec<String> = blocks(&sample_view_model())
            .into_iter()
            .filter_map(|b| match b {
                DocxBlock::Heading(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(
            headings,
            vec![
                sections::SUMMARY_TITLE,
                sections::RESPONSIBILITIES_TITLE,
                sections::SKILLS_TITLE,
                sections::EXPERIENCE_TITLE,
                sections::EDUCATION_TITLE,
                sections::PROJECTS_TITLE,
            ]
        );
    }

    #[test]
    fn test_minimal_document_has_only_header() {
        let mut vm = sample_view_model();
        vm.resolved_bio.clear();
        vm.contact_entries.clear();
        vm.social_links.clear();
        vm.skills.clear();
        vm.responsibilities.clear();
        vm.experience.clear();
        vm.education.clear();
        vm.projects.clear();
        assert_eq!(blocks(&vm).len(), 2);
    }

    #[test]
    fn test_render_docx_is_zip_archive() {
        let bytes = render_docx(&sample_view_model()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_render_docx_is_byte_identical_across_threads() {
        let first = render_docx(&sample_view_model()).unwrap();
        let again = render_docx(&sample_view_model()).unwrap();
        assert_eq!(first, again);

        let elsewhere = std::thread::spawn(|| {
            // Advance docx-rs's paragraph counter on this thread first.
            let _ = (0..7).map(|_| Paragraph::new()).count();
            render_docx(&sample_view_model()).unwrap()
        })
        .join()
        .unwrap();
        assert_eq!(first, elsewhere);
    }
}
