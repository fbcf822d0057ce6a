//! PDF rendering in two stages.
//!
//! 1. `layout` walks the section outline and produces a `PdfPlan`: a display list of
//!    positioned text runs, filled rectangles, link areas and the avatar slot, already
//!    split into A4 pages. Coordinates are millimetres measured from the top-left.
//! 2. `paint` replays the plan onto a `printpdf` document, then `finalize` adds the
//!    link annotations and a stable trailer `/ID` so equal inputs give equal bytes.
//!
//! The theme is built per call from the request's `StyleTokens`; nothing global is
//! touched, so concurrent renders are independent.

use std::io::BufWriter;

use ::image::{imageops::FilterType, DynamicImage, GenericImageView};
use printpdf::lopdf::{
    self, Dictionary as LoDictionary, Document as LoDocument, Object, StringFormat,
};
use printpdf::path::PaintMode;
use printpdf::*;

use super::avatar::{decode_data_url, decode_upright};
use super::font_metrics::{get_metrics, PdfFont, PT_TO_MM};
use super::sections::{
    walk, HeaderBlock, ProjectCard, SectionVisitor, TimelineItem, TimelineKind,
};
use super::RenderError;
use crate::content::view_model::ExportViewModel;
use crate::templates::StyleTokens;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const LINE_HEIGHT: f32 = 1.45;
/// Baseline offset from the top of a line box, as a fraction of the font size.
const ASCENT: f32 = 0.78;

const NAME_PT: f32 = 24.0;
const HEADLINE_PT: f32 = 12.5;
const SECTION_PT: f32 = 13.0;
const ITEM_TITLE_PT: f32 = 11.0;
const BODY_PT: f32 = 10.0;
const SMALL_PT: f32 = 9.0;
const CHIP_PT: f32 = 8.5;

const AVATAR_MM: f32 = 28.0;
const AVATAR_PX: u32 = 320;
const TIMELINE_INDENT_MM: f32 = 5.0;

// ────────────────────────────────────────────────────────────────────────────
// Theme
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| {
            u8::from_str_radix(expanded.get(i..i + 2)?, 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Mixes toward white by `amount` (0..=1).
    pub fn tint(self, amount: f32) -> Self {
        let mix = |c: f32| c + (1.0 - c) * amount;
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }

    /// Mixes toward black by `amount` (0..=1).
    pub fn darken(self, amount: f32) -> Self {
        let mix = |c: f32| c * (1.0 - amount);
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }
}

impl From<RgbColor> for Color {
    fn from(c: RgbColor) -> Self {
        Color::Rgb(Rgb::new(c.r, c.g, c.b, None))
    }
}

/// Request-scoped colors derived from one template's tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfTheme {
    pub primary: RgbColor,
    pub secondary: RgbColor,
    pub accent: RgbColor,
    pub border: RgbColor,
    pub name: RgbColor,
    pub chip_fill: RgbColor,
    pub chip_text: RgbColor,
    pub tag_fill: RgbColor,
    pub text: RgbColor,
    pub muted: RgbColor,
}

impl PdfTheme {
    pub fn from_tokens(tokens: &StyleTokens) -> Self {
        let parse = |hex: &str| RgbColor::from_hex(hex).unwrap_or(RgbColor::BLACK);
        let primary = parse(&tokens.primary_color);
        let accent = parse(&tokens.accent_color);
        Self {
            primary,
            secondary: parse(&tokens.secondary_color),
            accent,
            border: parse(&tokens.border_color),
            name: parse(&tokens.name_color),
            chip_fill: primary.tint(0.85),
            chip_text: primary.darken(0.35),
            tag_fill: accent.tint(0.85),
            text: RgbColor::new(0.2, 0.2, 0.2),
            muted: RgbColor::new(0.45, 0.45, 0.45),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Display list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        page: usize,
        x: f32,
        baseline: f32,
        size_pt: f32,
        font: PdfFont,
        color: RgbColor,
        text: String,
    },
    Rect {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: RgbColor,
    },
    Link {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        uri: String,
    },
    Avatar {
        page: usize,
        x: f32,
        y: f32,
        size: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfPlan {
    pub page_count: usize,
    pub ops: Vec<DrawOp>,
}

impl PdfPlan {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Vertical cursor over an unbounded run of A4 pages.
#[derive(Debug, Clone, Copy)]
struct PageFlow {
    page: usize,
    y: f32,
}

impl PageFlow {
    const TOP: f32 = MARGIN_MM;
    const BOTTOM: f32 = PAGE_HEIGHT_MM - MARGIN_MM;

    fn new() -> Self {
        Self { page: 0, y: Self::TOP }
    }

    fn at_top(&self) -> bool {
        self.y <= Self::TOP
    }

    /// Starts a new page unless `height` still fits on this one.
    fn ensure(&mut self, height: f32) {
        if self.y + height > Self::BOTTOM && !self.at_top() {
            self.page += 1;
            self.y = Self::TOP;
        }
    }

    fn advance(&mut self, dy: f32) {
        self.y += dy;
    }
}

fn line_height(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LINE_HEIGHT
}

/// Replaces characters the base-14 fonts cannot show. Line breaks survive as `\n`.
fn pdf_text(s: &str) -> String {
    s.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            '\r' => '\n',
            '\n' | ' '..='~' | '\u{a0}'..='\u{ff}' => c,
            '–' | '—' | '‘' | '’' | '“' | '”' | '•' | '…' | '€' => c,
            _ => '?',
        })
        .collect()
}

/// `pdf_text` for single-line runs such as chips and links.
fn pdf_inline(s: &str) -> String {
    pdf_text(s).replace('\n', " ")
}

/// Truncates `text` with "..." so it fits `max_mm`.
fn fit_text(text: &str, font: PdfFont, size_pt: f32, max_mm: f32) -> String {
    let metrics = get_metrics(font);
    if metrics.width_mm(text, size_pt) <= max_mm {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        let candidate = format!("{out}{c}...");
        if metrics.width_mm(&candidate, size_pt) > max_mm {
            break;
        }
        out.push(c);
    }
    out.push_str("...");
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

struct PdfLayout<'t> {
    theme: &'t PdfTheme,
    has_avatar: bool,
    flow: PageFlow,
    ops: Vec<DrawOp>,
}

impl<'t> PdfLayout<'t> {
    fn new(theme: &'t PdfTheme, has_avatar: bool) -> Self {
        Self {
            theme,
            has_avatar,
            flow: PageFlow::new(),
            ops: Vec::new(),
        }
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: RgbColor) {
        self.ops.push(DrawOp::Rect {
            page: self.flow.page,
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn text_at(
        &mut self,
        x: f32,
        baseline: f32,
        text: &str,
        font: PdfFont,
        size_pt: f32,
        color: RgbColor,
    ) {
        self.ops.push(DrawOp::Text {
            page: self.flow.page,
            x,
            baseline,
            size_pt,
            font,
            color,
            text: text.to_string(),
        });
    }

    /// Places one line at the cursor and moves below it.
    fn text_line(&mut self, x: f32, text: &str, font: PdfFont, size_pt: f32, color: RgbColor) {
        let h = line_height(size_pt);
        self.flow.ensure(h);
        let baseline = self.flow.y + size_pt * PT_TO_MM * ASCENT;
        self.text_at(x, baseline, text, font, size_pt, color);
        self.flow.advance(h);
    }

    fn paragraph(
        &mut self,
        x: f32,
        width: f32,
        text: &str,
        font: PdfFont,
        size_pt: f32,
        color: RgbColor,
    ) {
        for line in get_metrics(font).wrap(&pdf_text(text), size_pt, width) {
            self.text_line(x, &line, font, size_pt, color);
        }
    }

    fn section_title(&mut self, title: &str) {
        if !self.flow.at_top() {
            self.flow.advance(5.0);
        }
        // Keep the heading with at least two body lines.
        self.flow.ensure(line_height(SECTION_PT) + 2.0 * line_height(BODY_PT) + 4.0);
        let color = self.theme.primary;
        self.text_line(MARGIN_MM, title, PdfFont::HelveticaBold, SECTION_PT, color);
        let y = self.flow.y + 0.5;
        self.rect(MARGIN_MM, y, 22.0, 0.9, self.theme.accent);
        self.flow.advance(4.0);
    }

    /// Lays out labels as filled chips, wrapping into rows within `max_width`.
    fn chips(
        &mut self,
        left: f32,
        max_width: f32,
        labels: &[String],
        size_pt: f32,
        fill: RgbColor,
        ink: RgbColor,
    ) {
        let metrics = get_metrics(PdfFont::Helvetica);
        let pad = 2.2;
        let gap = 2.0;
        let height = size_pt * PT_TO_MM * 1.9;
        let mut x = left;
        self.flow.ensure(height);

        for label in labels {
            let label = fit_text(
                &pdf_inline(label),
                PdfFont::Helvetica,
                size_pt,
                max_width - 2.0 * pad,
            );
            let width = metrics.width_mm(&label, size_pt) + 2.0 * pad;
            if x > left && x + width > left + max_width {
                self.flow.advance(height + gap);
                self.flow.ensure(height);
                x = left;
            }
            let y = self.flow.y;
            self.rect(x, y, width, height, fill);
            let baseline = y + height / 2.0 + size_pt * PT_TO_MM * 0.35;
            self.text_at(x + pad, baseline, &label, PdfFont::Helvetica, size_pt, ink);
            x += width + gap;
        }
        self.flow.advance(height + gap);
    }

    /// Inline text links, wrapping within `max_width`.
    fn links(&mut self, left: f32, max_width: f32, links: &[(String, String)]) {
        let size_pt = SMALL_PT + 0.5;
        let metrics = get_metrics(PdfFont::HelveticaBold);
        let h = line_height(size_pt);
        let gap = 6.0;
        let mut x = left;
        self.flow.ensure(h);

        for (label, uri) in links {
            let label = pdf_inline(label);
            let width = metrics.width_mm(&label, size_pt);
            if x > left && x + width > left + max_width {
                self.flow.advance(h);
                self.flow.ensure(h);
                x = left;
            }
            let y = self.flow.y;
            let baseline = y + size_pt * PT_TO_MM * ASCENT;
            let color = self.theme.primary;
            self.text_at(x, baseline, &label, PdfFont::HelveticaBold, size_pt, color);
            self.ops.push(DrawOp::Link {
                page: self.flow.page,
                x,
                y,
                width,
                height: h,
                uri: uri.clone(),
            });
            x += width + gap;
        }
        self.flow.advance(h);
    }

    /// Draws a vertical bar from `start` to the cursor, split across page breaks.
    fn vertical_bar(&mut self, x: f32, start: PageFlow, width: f32, color: RgbColor) {
        let end = self.flow;
        for page in start.page..=end.page {
            let top = if page == start.page { start.y } else { PageFlow::TOP };
            let bottom = if page == end.page { end.y } else { PageFlow::BOTTOM };
            if bottom > top {
                self.ops.push(DrawOp::Rect {
                    page,
                    x,
                    y: top,
                    width,
                    height: bottom - top,
                    color,
                });
            }
        }
    }
}

impl SectionVisitor for PdfLayout<'_> {
    type Output = PdfPlan;

    fn header(&mut self, header: &HeaderBlock<'_>) {
        let top = self.flow;
        let text_width = if self.has_avatar {
            self.ops.push(DrawOp::Avatar {
                page: top.page,
                x: PAGE_WIDTH_MM - MARGIN_MM - AVATAR_MM,
                y: top.y,
                size: AVATAR_MM,
            });
            CONTENT_WIDTH_MM - AVATAR_MM - 6.0
        } else {
            CONTENT_WIDTH_MM
        };

        let theme = self.theme;
        let (bold, regular) = (PdfFont::HelveticaBold, PdfFont::Helvetica);
        self.paragraph(MARGIN_MM, text_width, header.name, bold, NAME_PT, theme.name);
        self.flow.advance(1.0);
        let (headline, color) = (header.headline, theme.secondary);
        self.paragraph(MARGIN_MM, text_width, headline, regular, HEADLINE_PT, color);
        self.flow.advance(2.5);

        if !header.contacts.is_empty() {
            let labels: Vec<String> = header
                .contacts
                .iter()
                .map(|c| format!("{}: {}", c.label, c.value))
                .collect();
            let (fill, ink) = (theme.chip_fill, theme.chip_text);
            self.chips(MARGIN_MM, text_width, &labels, CHIP_PT, fill, ink);
        }
        if !header.socials.is_empty() {
            let links: Vec<(String, String)> = header
                .socials
                .iter()
                .map(|s| (s.label.clone(), s.value.clone()))
                .collect();
            self.links(MARGIN_MM, text_width, &links);
        }

        if self.has_avatar && self.flow.page == top.page {
            self.flow.y = self.flow.y.max(top.y + AVATAR_MM + 2.0);
        }
        self.flow.advance(2.0);
        let y = self.flow.y;
        self.rect(MARGIN_MM, y, CONTENT_WIDTH_MM, 0.8, theme.border);
        self.flow.advance(3.0);
    }

    fn summary(&mut self, title: &str, text: &str) {
        self.section_title(title);
        let color = self.theme.text;
        self.paragraph(MARGIN_MM, CONTENT_WIDTH_MM, text, PdfFont::Helvetica, BODY_PT, color);
    }

    fn bullet_list(&mut self, title: &str, items: &[String]) {
        self.section_title(title);
        let indent = 6.0;
        let h = line_height(BODY_PT);
        let metrics = get_metrics(PdfFont::Helvetica);
        for item in items {
            let lines = metrics.wrap(&pdf_text(item), BODY_PT, CONTENT_WIDTH_MM - indent);
            for (i, line) in lines.iter().enumerate() {
                self.flow.ensure(h);
                if i == 0 {
                    let y = self.flow.y + h / 2.0 - 1.0;
                    self.rect(MARGIN_MM + 0.6, y, 1.6, 1.6, self.theme.accent);
                }
                let color = self.theme.text;
                self.text_line(MARGIN_MM + indent, line, PdfFont::Helvetica, BODY_PT, color);
            }
            self.flow.advance(0.8);
        }
    }

    fn chip_list(&mut self, title: &str, items: &[String]) {
        self.section_title(title);
        let (fill, ink) = (self.theme.chip_fill, self.theme.chip_text);
        self.chips(MARGIN_MM, CONTENT_WIDTH_MM, items, SMALL_PT, fill, ink);
    }

    fn timeline(&mut self, title: &str, kind: TimelineKind, items: &[TimelineItem<'_>]) {
        self.section_title(title);
        let theme = self.theme;
        let x = MARGIN_MM + TIMELINE_INDENT_MM;
        let width = CONTENT_WIDTH_MM - TIMELINE_INDENT_MM;

        for item in items {
            self.flow.ensure(line_height(ITEM_TITLE_PT) + line_height(BODY_PT));
            let start = self.flow;
            self.rect(MARGIN_MM - 0.4, start.y + 1.2, 1.6, 1.6, theme.primary);

            let meta: Vec<&str> = [item.period, item.location].into_iter().flatten().collect();
            let meta = pdf_inline(&meta.join(" | "));
            let meta_width = get_metrics(PdfFont::Helvetica).width_mm(&meta, SMALL_PT);
            let title_width = if meta.is_empty() {
                width
            } else {
                (width - meta_width - 4.0).max(width / 2.0)
            };

            let title_lines = get_metrics(PdfFont::HelveticaBold).wrap(
                &pdf_text(item.display_title(kind)),
                ITEM_TITLE_PT,
                title_width,
            );
            for (i, line) in title_lines.iter().enumerate() {
                self.flow.ensure(line_height(ITEM_TITLE_PT));
                if i == 0 && !meta.is_empty() {
                    let baseline = self.flow.y + ITEM_TITLE_PT * PT_TO_MM * ASCENT;
                    let meta_x = MARGIN_MM + CONTENT_WIDTH_MM - meta_width;
                    let muted = theme.muted;
                    self.text_at(meta_x, baseline, &meta, PdfFont::Helvetica, SMALL_PT, muted);
                }
                self.text_line(x, line, PdfFont::HelveticaBold, ITEM_TITLE_PT, theme.text);
            }
            if let Some(subtitle) = item.subtitle {
                self.paragraph(x, width, subtitle, PdfFont::Helvetica, BODY_PT, theme.secondary);
            }
            if let Some(description) = item.description {
                self.flow.advance(0.8);
                let size = BODY_PT - 0.5;
                self.paragraph(x, width, description, PdfFont::Helvetica, size, theme.text);
            }
            self.vertical_bar(MARGIN_MM + 0.2, start, 0.6, theme.border);
            self.flow.advance(3.5);
        }
    }

    fn projects(&mut self, title: &str, cards: &[ProjectCard<'_>]) {
        self.section_title(title);
        let theme = self.theme;
        let x = MARGIN_MM + TIMELINE_INDENT_MM;
        let width = CONTENT_WIDTH_MM - TIMELINE_INDENT_MM;

        for card in cards {
            self.flow.ensure(line_height(ITEM_TITLE_PT) + line_height(BODY_PT));
            let start = self.flow;
            let bold = PdfFont::HelveticaBold;
            self.paragraph(x, width, card.title, bold, ITEM_TITLE_PT, theme.primary);
            if let Some(description) = card.description {
                let size = BODY_PT - 0.5;
                self.paragraph(x, width, description, PdfFont::Helvetica, size, theme.text);
            }
            if let Some(link) = card.link {
                let shown = fit_text(&pdf_inline(link), PdfFont::Helvetica, SMALL_PT, width);
                let h = line_height(SMALL_PT);
                self.flow.ensure(h);
                let link_width = get_metrics(PdfFont::Helvetica).width_mm(&shown, SMALL_PT);
                self.ops.push(DrawOp::Link {
                    page: self.flow.page,
                    x,
                    y: self.flow.y,
                    width: link_width,
                    height: h,
                    uri: link.to_string(),
                });
                self.text_line(x, &shown, PdfFont::Helvetica, SMALL_PT, theme.secondary);
            }
            if !card.tags.is_empty() {
                self.flow.advance(1.0);
                self.chips(x, width, card.tags, CHIP_PT - 0.5, theme.tag_fill, theme.text);
            }
            self.vertical_bar(MARGIN_MM + 0.2, start, 0.8, theme.accent);
            self.flow.advance(3.5);
        }
    }

    fn finish(self) -> PdfPlan {
        PdfPlan {
            page_count: self.flow.page + 1,
            ops: self.ops,
        }
    }
}

/// Computes the display list for a view model.
pub fn layout(vm: &ExportViewModel, theme: &PdfTheme, has_avatar: bool) -> PdfPlan {
    walk(vm, PdfLayout::new(theme, has_avatar))
}

// ────────────────────────────────────────────────────────────────────────────
// Painting
// ────────────────────────────────────────────────────────────────────────────

/// Decodes an avatar reference into a square RGB image ready for embedding.
///
/// Only `data:image/` references can be embedded; anything else is an error the
/// caller recovers from by omitting the avatar.
pub fn prepare_avatar(reference: &str) -> Result<DynamicImage, RenderError> {
    let bytes = decode_data_url(reference)?;
    let img = decode_upright(&bytes)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(RenderError::Avatar("image has no pixels".to_string()));
    }
    let side = w.min(h);
    let square = img.crop_imm((w - side) / 2, (h - side) / 2, side, side);
    let square = if side > AVATAR_PX {
        square.resize_exact(AVATAR_PX, AVATAR_PX, FilterType::Triangle)
    } else {
        square
    };
    Ok(DynamicImage::ImageRgb8(square.to_rgb8()))
}

fn document_id(name: &str) -> String {
    ::uuid::Uuid::new_v5(&::uuid::Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string()
}

/// Paints everything except link annotations, then hands off to `finalize`.
fn paint(
    plan: &PdfPlan,
    title: &str,
    avatar: Option<&DynamicImage>,
) -> Result<Vec<u8>, RenderError> {
    let epoch = ::time::OffsetDateTime::UNIX_EPOCH;
    let id = document_id(title);
    let (doc, page1, layer1) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_document_id(id.clone())
        .with_creation_date(epoch)
        .with_mod_date(epoch)
        .with_metadata_date(epoch);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(format!("PDF font error: {e}")))?;

    let mut layers = vec![doc.get_page(page1).get_layer(layer1)];
    for n in 1..plan.page_count {
        let (page, layer) =
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), format!("Page {}", n + 1));
        layers.push(doc.get_page(page).get_layer(layer));
    }
    let layer_for = |page: usize| {
        layers
            .get(page)
            .ok_or_else(|| RenderError::Pdf(format!("display list references missing page {page}")))
    };
    let flip = |y: f32| Mm(PAGE_HEIGHT_MM - y);

    for op in &plan.ops {
        match op {
            DrawOp::Text { page, x, baseline, size_pt, font, color, text } => {
                let layer = layer_for(*page)?;
                let font_ref = match font {
                    PdfFont::Helvetica => &regular,
                    PdfFont::HelveticaBold => &bold,
                };
                layer.set_fill_color((*color).into());
                layer.use_text(text.as_str(), *size_pt, Mm(*x), flip(*baseline), font_ref);
            }
            DrawOp::Rect { page, x, y, width, height, color } => {
                let layer = layer_for(*page)?;
                layer.set_fill_color((*color).into());
                layer.add_rect(
                    Rect::new(Mm(*x), flip(y + height), Mm(x + width), flip(*y))
                        .with_mode(PaintMode::Fill),
                );
            }
            // Added by `finalize` in display-list order.
            DrawOp::Link { .. } => {}
            DrawOp::Avatar { page, x, y, size } => {
                let Some(img) = avatar else { continue };
                let layer = layer_for(*page)?;
                let dpi = img.width() as f32 * 25.4 / size;
                Image::from_dynamic_image(img).add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(Mm(*x)),
                        translate_y: Some(flip(y + size)),
                        dpi: Some(dpi),
                        ..Default::default()
                    },
                );
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Pdf(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| RenderError::Pdf(format!("PDF buffer error: {e}")))?;
    finalize(&bytes, plan, &id)
}

/// Adds the plan's link annotations in display-list order and pins the trailer
/// `/ID` to `id`, which printpdf otherwise fills with random characters.
fn finalize(bytes: &[u8], plan: &PdfPlan, id: &str) -> Result<Vec<u8>, RenderError> {
    let pdf_err = |e: lopdf::Error| RenderError::Pdf(format!("PDF finalize error: {e}"));
    let mut doc = LoDocument::load_mem(bytes).map_err(pdf_err)?;
    let pages: Vec<lopdf::ObjectId> = doc.get_pages().into_values().collect();

    let to_pt = |mm: f32| Object::from(mm / PT_TO_MM);
    let mut annots: Vec<Vec<Object>> = vec![Vec::new(); pages.len()];
    for op in &plan.ops {
        let DrawOp::Link { page, x, y, width, height, uri } = op else {
            continue;
        };
        let page_annots = annots
            .get_mut(*page)
            .ok_or_else(|| RenderError::Pdf(format!("link references missing page {page}")))?;
        let action = LoDictionary::from_iter(vec![
            ("S", Object::Name(b"URI".to_vec())),
            ("URI", Object::string_literal(uri.as_str())),
        ]);
        let annot = LoDictionary::from_iter(vec![
            ("Type", Object::Name(b"Annot".to_vec())),
            ("Subtype", Object::Name(b"Link".to_vec())),
            (
                "Rect",
                Object::Array(vec![
                    to_pt(*x),
                    to_pt(PAGE_HEIGHT_MM - y - height),
                    to_pt(x + width),
                    to_pt(PAGE_HEIGHT_MM - y),
                ]),
            ),
            (
                "Border",
                Object::Array(vec![0.into(), 0.into(), 0.into()]),
            ),
            ("A", Object::Dictionary(action)),
        ]);
        page_annots.push(Object::Reference(doc.add_object(annot)));
    }

    for (page_id, refs) in pages.into_iter().zip(annots) {
        doc.get_dictionary_mut(page_id)
            .map_err(pdf_err)?
            .set("Annots", Object::Array(refs));
    }

    let id = Object::String(id.as_bytes().to_vec(), StringFormat::Literal);
    doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| RenderError::Pdf(format!("PDF finalize error: {e}")))?;
    Ok(out)
}

/// Renders the view model as a complete PDF document.
///
/// A malformed or non-embeddable avatar is logged and left out.
pub fn render_pdf(vm: &ExportViewModel, tokens: &StyleTokens) -> Result<Vec<u8>, RenderError> {
    let theme = PdfTheme::from_tokens(tokens);
    let avatar = vm
        .profile
        .avatar
        .as_deref()
        .and_then(|reference| match prepare_avatar(reference) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!("Omitting avatar from PDF: {e}");
                None
            }
        });
    let plan = layout(vm, &theme, avatar.is_some());
    paint(&plan, &vm.resolved_name, avatar.as_ref())
}
