//! Declarative section outline shared by every renderer.
//!
//! `outline` derives the ordered list of non-empty sections from a view model once;
//! each renderer implements `SectionVisitor` and only decides how a section looks.

use crate::content::view_model::{ExportViewModel, LabeledValue};

pub const SUMMARY_TITLE: &str = "Professional Summary";
pub const RESPONSIBILITIES_TITLE: &str = "Key Responsibilities";
pub const SKILLS_TITLE: &str = "Skills & Technologies";
pub const EXPERIENCE_TITLE: &str = "Professional Experience";
pub const EDUCATION_TITLE: &str = "Education";
pub const PROJECTS_TITLE: &str = "Projects";

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBlock<'a> {
    pub name: &'a str,
    pub headline: &'a str,
    pub avatar: Option<&'a str>,
    pub contacts: &'a [LabeledValue],
    pub socials: &'a [LabeledValue],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineKind {
    Experience,
    Education,
}

impl TimelineKind {
    pub fn title(&self) -> &'static str {
        match self {
            TimelineKind::Experience => EXPERIENCE_TITLE,
            TimelineKind::Education => EDUCATION_TITLE,
        }
    }

    /// Joins title and subtitle in one-line headings: "Engineer at Acme", "BSc - MIT".
    pub fn connector(&self) -> &'static str {
        match self {
            TimelineKind::Experience => " at ",
            TimelineKind::Education => " - ",
        }
    }

    /// Shown when an entry has a subtitle or description but no title.
    pub fn placeholder(&self) -> &'static str {
        match self {
            TimelineKind::Experience => "Role",
            TimelineKind::Education => "Degree",
        }
    }
}

/// One experience or education entry, normalised to title/subtitle.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem<'a> {
    pub title: Option<&'a str>,
    pub subtitle: Option<&'a str>,
    pub period: Option<&'a str>,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl TimelineItem<'_> {
    pub fn display_title(&self, kind: TimelineKind) -> &str {
        self.title.unwrap_or(kind.placeholder())
    }

    /// Single-line heading used by flat renderers.
    pub fn heading(&self, kind: TimelineKind) -> String {
        let title = self.display_title(kind);
        match self.subtitle {
            Some(subtitle) => format!("{title}{}{subtitle}", kind.connector()),
            None => title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCard<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub link: Option<&'a str>,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section<'a> {
    Header(HeaderBlock<'a>),
    Summary(&'a str),
    Responsibilities(&'a [String]),
    Skills(&'a [String]),
    Timeline(TimelineKind, Vec<TimelineItem<'a>>),
    Projects(Vec<ProjectCard<'a>>),
}

impl Section<'_> {
    pub fn title(&self) -> Option<&'static str> {
        match self {
            Section::Header(_) => None,
            Section::Summary(_) => Some(SUMMARY_TITLE),
            Section::Responsibilities(_) => Some(RESPONSIBILITIES_TITLE),
            Section::Skills(_) => Some(SKILLS_TITLE),
            Section::Timeline(kind, _) => Some(kind.title()),
            Section::Projects(_) => Some(PROJECTS_TITLE),
        }
    }
}

/// Header, summary, responsibilities, skills, experience, education, projects.
/// Everything after the header is omitted when empty.
pub fn outline(vm: &ExportViewModel) -> Vec<Section<'_>> {
    let mut sections = vec![Section::Header(HeaderBlock {
        name: &vm.resolved_name,
        headline: &vm.resolved_headline,
        avatar: vm.profile.avatar.as_deref(),
        contacts: &vm.contact_entries,
        socials: &vm.social_links,
    })];

    if !vm.resolved_bio.trim().is_empty() {
        sections.push(Section::Summary(&vm.resolved_bio));
    }
    if !vm.responsibilities.is_empty() {
        sections.push(Section::Responsibilities(&vm.responsibilities));
    }
    if !vm.skills.is_empty() {
        sections.push(Section::Skills(&vm.skills));
    }

    let experience: Vec<TimelineItem<'_>> = vm
        .experience
        .iter()
        .map(|e| TimelineItem {
            title: e.role.as_deref(),
            subtitle: e.company.as_deref(),
            period: e.period.as_deref(),
            location: e.location.as_deref(),
            description: e.description.as_deref(),
        })
        .collect();
    if !experience.is_empty() {
        sections.push(Section::Timeline(TimelineKind::Experience, experience));
    }

    let education: Vec<TimelineItem<'_>> = vm
        .education
        .iter()
        .map(|e| TimelineItem {
            title: e.degree.as_deref(),
            subtitle: e.institution.as_deref(),
            period: e.period.as_deref(),
            location: None,
            description: e.description.as_deref(),
        })
        .collect();
    if !education.is_empty() {
        sections.push(Section::Timeline(TimelineKind::Education, education));
    }

    let projects: Vec<ProjectCard<'_>> = vm
        .projects
        .iter()
        .map(|p| ProjectCard {
            title: p.title.as_deref().unwrap_or("Project"),
            description: p.description.as_deref(),
            link: p.link.as_deref(),
            tags: &p.tags,
        })
        .collect();
    if !projects.is_empty() {
        sections.push(Section::Projects(projects));
    }

    sections
}

/// Format-specific rendering of the shared outline.
pub trait SectionVisitor {
    type Output;

    fn header(&mut self, header: &HeaderBlock<'_>);
    fn summary(&mut self, title: &str, text: &str);
    fn bullet_list(&mut self, title: &str, items: &[String]);
    fn chip_list(&mut self, title: &str, items: &[String]);
    fn timeline(&mut self, title: &str, kind: TimelineKind, items: &[TimelineItem<'_>]);
    fn projects(&mut self, title: &str, cards: &[ProjectCard<'_>]);
    fn finish(self) -> Self::Output;
}

/// Drives `visitor` over the outline of `vm` in section order.
pub fn walk<V: SectionVisitor>(vm: &ExportViewModel, mut visitor: V) -> V::Output {
    for section in outline(vm) {
        let title = section.title().unwrap_or_default();
        match &section {
            Section::Header(header) => visitor.header(header),
            Section::Summary(text) => visitor.summary(title, text),
            Section::Responsibilities(items) => visitor.bullet_list(title, items),
            Section::Skills(items) => visitor.chip_list(title, items),
            Section::Timeline(kind, items) => visitor.timeline(title, *kind, items),
            Section::Projects(cards) => visitor.projects(title, cards),
        }
    }
    visitor.finish()
}
