//! The canonical, renderer-agnostic export view model and the two ways to obtain one:
//! building it from a raw `ContentRecord`, or re-normalising a client-supplied payload.
//!
//! Both paths run the same filters, so the URL and non-empty invariants hold no matter
//! where the data came from. Nothing in here escapes HTML.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bio::{compose, fallback_bio};
use super::duration::{estimate_years, experience_summary};
use super::profession::ProfessionDirectory;
use super::sanitize::{non_blank, safe_url, validate_email, validate_phone};
use crate::models::portfolio::{
    Contact, ContentRecord, EducationItem, ExperienceItem, ProjectItem, SkillEntry, SocialLinks,
};
use crate::templates::TemplateId;

pub const DEFAULT_NAME: &str = "Your Name";
pub const DEFAULT_PROFESSION: &str = "Professional";

// ────────────────────────────────────────────────────────────────────────────
// View model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperienceView {
    pub role: Option<String>,
    pub company: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EducationView {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Already validated and sanitized.
    pub link: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileBlock {
    /// Data URL or remote URL, possibly replaced by the avatar processor.
    pub avatar: Option<String>,
}

/// Everything a renderer needs, already resolved, trimmed and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportViewModel {
    pub resolved_name: String,
    pub resolved_headline: String,
    pub resolved_profession_title: String,
    pub resolved_bio: String,
    pub contact_entries: Vec<LabeledValue>,
    pub social_links: Vec<LabeledValue>,
    pub skills: Vec<String>,
    pub responsibilities: Vec<String>,
    pub experience: Vec<ExperienceView>,
    pub education: Vec<EducationView>,
    pub projects: Vec<ProjectView>,
    pub profile: ProfileBlock,
    #[serde(rename = "template")]
    pub template_id: TemplateId,
}

pub fn fallback_headline(profession_title: &str) -> String {
    format!("{profession_title} | Building Innovative Solutions")
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builds the view model for one export.
///
/// Never fails: a missing field degrades to its default and a failing profession
/// directory is treated as a miss. `template` overrides the record's own selection.
pub fn build_view_model(
    record: &ContentRecord,
    directory: &dyn ProfessionDirectory,
    template: Option<&str>,
    now: NaiveDate,
) -> ExportViewModel {
    let profession_title = resolve_profession_title(record, directory);
    let resolved_name = non_blank(record.profile.name.as_deref())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let resolved_headline = non_blank(record.profile.headline.as_deref())
        .unwrap_or_else(|| fallback_headline(&profession_title));

    let skills = skill_names(&record.skills);
    let joined_skills = skills.join(", ");
    let summary = experience_summary(estimate_years(&record.experience, now));

    let composed = compose(
        record.profile.bio.as_deref().unwrap_or_default(),
        &[
            ("name", Some(resolved_name.as_str())),
            ("headline", Some(resolved_headline.as_str())),
            ("title", Some(profession_title.as_str())),
            ("skills", Some(joined_skills.as_str())),
            ("experience", Some(summary.as_str())),
        ],
    );
    let resolved_bio = match composed.trim() {
        "" => fallback_bio(&resolved_name, &profession_title, &joined_skills),
        text => text.to_string(),
    };

    let template_id = template
        .or(record.selected_template.as_deref())
        .map(TemplateId::parse)
        .unwrap_or_default();

    ExportViewModel {
        resolved_name,
        resolved_headline,
        resolved_profession_title: profession_title,
        resolved_bio,
        contact_entries: contact_entries(&record.contact),
        social_links: social_links(&record.social),
        skills,
        responsibilities: responsibilities(&record.responsibilities),
        experience: experience_views(&record.experience),
        education: education_views(&record.education),
        projects: project_views(&record.projects),
        profile: ProfileBlock {
            avatar: non_blank(record.profile.avatar.as_deref()),
        },
        template_id,
    }
}

fn resolve_profession_title(record: &ContentRecord, directory: &dyn ProfessionDirectory) -> String {
    if let Some(custom) = non_blank(record.custom_profession.as_deref()) {
        return custom;
    }
    let Some(id) = non_blank(record.profession.as_deref()) else {
        return DEFAULT_PROFESSION.to_string();
    };
    match directory.lookup(&id) {
        Ok(Some(profession)) => non_blank(Some(profession.title.as_str())).unwrap_or(id),
        Ok(None) => id,
        Err(e) => {
            tracing::warn!("Profession lookup for '{id}' failed, using raw id: {e}");
            id
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Filters shared by the builder and payload normalisation
// ────────────────────────────────────────────────────────────────────────────

fn skill_names(skills: &[SkillEntry]) -> Vec<String> {
    skills
        .iter()
        .filter_map(|s| non_blank(Some(s.name())))
        .collect()
}

fn responsibilities(items: &[Option<String>]) -> Vec<String> {
    items.iter().filter_map(|r| non_blank(r.as_deref())).collect()
}

fn contact_entries(contact: &Contact) -> Vec<LabeledValue> {
    let mut entries = Vec::new();
    if let Some(email) = non_blank(contact.email.as_deref()).filter(|e| validate_email(e)) {
        entries.push(labeled("Email", email));
    }
    if let Some(phone) = non_blank(contact.phone.as_deref()).filter(|p| validate_phone(p)) {
        entries.push(labeled("Phone", phone));
    }
    if let Some(location) = non_blank(contact.location.as_deref()) {
        entries.push(labeled("Location", location));
    }
    entries
}

fn social_links(social: &SocialLinks) -> Vec<LabeledValue> {
    [
        ("GitHub", &social.github),
        ("LinkedIn", &social.linkedin),
        ("Twitter", &social.twitter),
        ("Website", &social.website),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        let url = safe_url(value.as_deref()?)?;
        Some(labeled(label, url))
    })
    .collect()
}

fn experience_views(items: &[ExperienceItem]) -> Vec<ExperienceView> {
    items
        .iter()
        .map(|e| ExperienceView {
            role: non_blank(e.role.as_deref()),
            company: non_blank(e.company.as_deref()),
            period: non_blank(e.period.as_deref()),
            description: non_blank(e.description.as_deref()),
            location: non_blank(e.location.as_deref()),
        })
        .filter(|e| e.role.is_some() || e.company.is_some() || e.description.is_some())
        .collect()
}

fn education_views(items: &[EducationItem]) -> Vec<EducationView> {
    items
        .iter()
        .map(|e| EducationView {
            degree: non_blank(e.degree.as_deref()),
            institution: non_blank(e.institution.as_deref()),
            period: non_blank(e.period.as_deref()),
            description: non_blank(e.description.as_deref()),
        })
        .filter(|e| e.degree.is_some() || e.institution.is_some() || e.description.is_some())
        .collect()
}

fn project_views(items: &[ProjectItem]) -> Vec<ProjectView> {
    items
        .iter()
        .map(|p| {
            let link = p.link.as_deref().and_then(safe_url);
            if link.is_none() && non_blank(p.link.as_deref()).is_some() {
                tracing::debug!("Dropping invalid project link");
            }
            ProjectView {
                title: non_blank(p.title.as_deref()),
                description: non_blank(p.description.as_deref()),
                link,
                tags: p
                    .tags
                    .iter()
                    .flatten()
                    .filter_map(|t| non_blank(Some(t.as_str())))
                    .collect(),
            }
        })
        .filter(|p| p.title.is_some() || p.description.is_some())
        .collect()
}

fn labeled(label: &str, value: String) -> LabeledValue {
    LabeledValue {
        label: label.to_string(),
        value,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client-supplied payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabeledValuePayload {
    pub label: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePayload {
    pub avatar: Option<String>,
}

/// A view model as posted by a client. Untrusted: nothing here reaches a renderer
/// until `normalize` has re-run the filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPayload {
    #[serde(alias = "safeName")]
    pub resolved_name: Option<String>,
    #[serde(alias = "safeHeadline")]
    pub resolved_headline: Option<String>,
    #[serde(alias = "professionTitle")]
    pub resolved_profession_title: Option<String>,
    #[serde(alias = "displayBio")]
    pub resolved_bio: Option<String>,
    pub contact_entries: Vec<LabeledValuePayload>,
    pub social_links: Vec<LabeledValuePayload>,
    pub skills: Vec<SkillEntry>,
    pub responsibilities: Vec<Option<String>>,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub projects: Vec<ProjectItem>,
    pub profile: ProfilePayload,
    pub template: Option<String>,
}

impl ExportPayload {
    pub fn name(&self) -> Option<String> {
        non_blank(self.resolved_name.as_deref())
    }

    pub fn headline(&self) -> Option<String> {
        non_blank(self.resolved_headline.as_deref())
    }

    /// Re-applies every view-model filter. A blank name becomes the default name and a
    /// blank headline the fallback headline; callers validate before relying on either.
    pub fn normalize(self) -> ExportViewModel {
        let profession_title = non_blank(self.resolved_profession_title.as_deref())
            .unwrap_or_else(|| DEFAULT_PROFESSION.to_string());
        let resolved_name = self.name().unwrap_or_else(|| DEFAULT_NAME.to_string());
        let resolved_headline = self
            .headline()
            .unwrap_or_else(|| fallback_headline(&profession_title));

        ExportViewModel {
            resolved_name,
            resolved_headline,
            resolved_bio: non_blank(self.resolved_bio.as_deref()).unwrap_or_default(),
            resolved_profession_title: profession_title,
            contact_entries: self
                .contact_entries
                .iter()
                .filter_map(normalize_contact)
                .collect(),
            social_links: self
                .social_links
                .iter()
                .filter_map(normalize_social)
                .collect(),
            skills: skill_names(&self.skills),
            responsibilities: responsibilities(&self.responsibilities),
            experience: experience_views(&self.experience),
            education: education_views(&self.education),
            projects: project_views(&self.projects),
            profile: ProfileBlock {
                avatar: non_blank(self.profile.avatar.as_deref()),
            },
            template_id: self
                .template
                .as_deref()
                .map(TemplateId::parse)
                .unwrap_or_default(),
        }
    }
}

fn normalize_contact(entry: &LabeledValuePayload) -> Option<LabeledValue> {
    let label = non_blank(entry.label.as_deref())?;
    let value = non_blank(entry.value.as_deref())?;
    let valid = match label.to_ascii_lowercase().as_str() {
        "email" => validate_email(&value),
        "phone" => validate_phone(&value),
        _ => true,
    };
    valid.then(|| LabeledValue { label, value })
}

fn normalize_social(entry: &LabeledValuePayload) -> Option<LabeledValue> {
    let value = safe_url(entry.value.as_deref()?)?;
    let label = non_blank(entry.label.as_deref()).unwrap_or_else(|| "Link".to_string());
    Some(LabeledValue { label, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::profession::{JsonProfessionDirectory, Profession};
    use crate::content::CollaboratorError;
    use crate::models::portfolio::Profile;

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn directory() -> JsonProfessionDirectory {
        JsonProfessionDirectory::new(vec![Profession {
            slug: "backend-developer".to_string(),
            title: "Backend Developer".to_string(),
            headline: None,
            bio: None,
            skills: vec![],
            responsibilities: vec![],
        }])
    }

    struct BrokenDirectory;

    impl ProfessionDirectory for BrokenDirectory {
        fn lookup(&self, _id: &str) -> Result<Option<Profession>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("down".to_string()))
        }

        fn search(&self, _t: &str, _l: usize) -> Result<Vec<Profession>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("down".to_string()))
        }
    }

    fn jane() -> ContentRecord {
        ContentRecord {
            profile: Profile {
                name: Some("Jane Doe".to_string()),
                headline: Some("   ".to_string()),
                bio: None,
                avatar: None,
            },
            skills: vec![
                SkillEntry::Name("Go".to_string()),
                SkillEntry::Name(" Rust ".to_string()),
                SkillEntry::Name("".to_string()),
            ],
            selected_template: Some("tech".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_jane_doe_fallbacks() {
        let vm = build_view_model(&jane(), &directory(), None, now());
        assert_eq!(vm.resolved_name, "Jane Doe");
        assert_eq!(vm.resolved_profession_title, "Professional");
        assert_eq!(vm.resolved_headline, "Professional | Building Innovative Solutions");
        assert!(vm.resolved_bio.contains("Jane Doe"));
        assert!(vm.resolved_bio.contains("Go, Rust"));
        assert_eq!(vm.skills, vec!["Go", "Rust"]);
        assert_eq!(vm.template_id, TemplateId::Tech);
    }

    #[test]
    fn test_empty_record_still_has_name_and_headline() {
        let vm = build_view_model(&ContentRecord::default(), &directory(), None, now());
        assert_eq!(vm.resolved_name, DEFAULT_NAME);
        assert!(!vm.resolved_headline.is_empty());
        assert!(vm.resolved_bio.ends_with("various technologies."));
        assert_eq!(vm.template_id, TemplateId::Modern);
    }

    #[test]
    fn test_build_is_idempotent() {
        let record = jane();
        let a = build_view_model(&record, &directory(), None, now());
        let b = build_view_model(&record, &directory(), None, now());
        assert_eq!(a, b);
    }

    #[test]
    fn test_profession_resolution_order() {
        let mut record = ContentRecord {
            profession: Some("backend-developer".to_string()),
            ..Default::default()
        };
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(vm.resolved_profession_title, "Backend Developer");

        record.custom_profession = Some(" Platform Engineer ".to_string());
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(vm.resolved_profession_title, "Platform Engineer");

        let record = ContentRecord {
            profession: Some("astronaut".to_string()),
            ..Default::default()
        };
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(vm.resolved_profession_title, "astronaut");
    }

    #[test]
    fn test_directory_failure_is_a_miss() {
        let record = ContentRecord {
            profession: Some("backend-developer".to_string()),
            ..Default::default()
        };
        let vm = build_view_model(&record, &BrokenDirectory, None, now());
        assert_eq!(vm.resolved_profession_title, "backend-developer");
    }

    #[test]
    fn test_bio_placeholders_use_resolved_values() {
        let mut record = jane();
        record.profile.bio =
            Some("{name}, {title}, {experience} in {skills}.{unknown}".to_string());
        record.experience = vec![ExperienceItem {
            role: Some("Engineer".to_string()),
            period: Some("01/2020 - 01/2022".to_string()),
            ..Default::default()
        }];
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(vm.resolved_bio, "Jane Doe, Professional, 2 years in Go, Rust.");
    }

    #[test]
    fn test_bio_of_only_placeholders_falls_back() {
        let mut record = jane();
        record.profile.bio = Some("{experience}".to_string());
        let vm = build_view_model(&record, &directory(), None, now());
        assert!(vm.resolved_bio.starts_with("I am Jane Doe"));
    }

    #[test]
    fn test_invalid_links_and_contacts_are_dropped() {
        let mut record = jane();
        record.social = SocialLinks {
            github: Some("github.com/jane".to_string()),
            linkedin: Some("javascript:alert(1)".to_string()),
            twitter: Some("  ".to_string()),
            website: None,
        };
        record.contact = Contact {
            email: Some("not-an-email".to_string()),
            phone: Some("+44 20 7946 0958".to_string()),
            location: Some(" Berlin ".to_string()),
        };
        record.projects = vec![
            ProjectItem {
                title: Some("CLI".to_string()),
                link: Some("javascript:alert(1)".to_string()),
                ..Default::default()
            },
            ProjectItem {
                tags: Some(vec!["rust".to_string()]),
                ..Default::default()
            },
        ];
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(
            vm.social_links,
            vec![labeled("GitHub", "https://github.com/jane".to_string())]
        );
        let labels: Vec<&str> = vm.contact_entries.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Phone", "Location"]);
        assert_eq!(vm.contact_entries[1].value, "Berlin");
        assert_eq!(vm.projects.len(), 1);
        assert_eq!(vm.projects[0].link, None);
    }

    #[test]
    fn test_entries_without_displayable_fields_are_dropped() {
        let mut record = jane();
        record.experience = vec![
            ExperienceItem {
                period: Some("2020".to_string()),
                location: Some("Remote".to_string()),
                ..Default::default()
            },
            ExperienceItem {
                company: Some("Acme".to_string()),
                ..Default::default()
            },
        ];
        record.education = vec![EducationItem {
            period: Some("2010 - 2014".to_string()),
            ..Default::default()
        }];
        record.responsibilities = vec![Some(" Ship ".to_string()), None, Some("".to_string())];
        let vm = build_view_model(&record, &directory(), None, now());
        assert_eq!(vm.experience.len(), 1);
        assert_eq!(vm.experience[0].company.as_deref(), Some("Acme"));
        assert!(vm.education.is_empty());
        assert_eq!(vm.responsibilities, vec!["Ship"]);
    }

    #[test]
    fn test_template_argument_overrides_record() {
        let vm = build_view_model(&jane(), &directory(), Some("classic"), now());
        assert_eq!(vm.template_id, TemplateId::Classic);
        let vm = build_view_model(&jane(), &directory(), Some("nope"), now());
        assert_eq!(vm.template_id, TemplateId::Modern);
    }

    #[test]
    fn test_payload_accepts_legacy_field_names() {
        let payload: ExportPayload = serde_json::from_str(
            r#"{
                "safeName": " Jane ",
                "safeHeadline": "Engineer",
                "professionTitle": "Engineer",
                "displayBio": "Hello",
                "skills": ["Go", { "name": "Rust" }],
                "template": "creative"
            }"#,
        )
        .unwrap();
        let vm = payload.normalize();
        assert_eq!(vm.resolved_name, "Jane");
        assert_eq!(vm.resolved_bio, "Hello");
        assert_eq!(vm.skills, vec!["Go", "Rust"]);
        assert_eq!(vm.template_id, TemplateId::Creative);
    }

    #[test]
    fn test_payload_normalisation_revalidates_urls() {
        let payload: ExportPayload = serde_json::from_str(
            r#"{
                "resolvedName": "Jane",
                "contactEntries": [
                    { "label": "Email", "value": "jane@" },
                    { "label": "Location", "value": "Lisbon" }
                ],
                "socialLinks": [
                    { "label": "GitHub", "value": "javascript:alert(1)" },
                    { "label": "Website", "value": "jane.dev" }
                ],
                "projects": [
                    { "title": "<b>Evil</b>", "link": "data:text/html,x" }
                ]
            }"#,
        )
        .unwrap();
        let vm = payload.normalize();
        assert_eq!(vm.contact_entries, vec![labeled("Location", "Lisbon".to_string())]);
        assert_eq!(vm.social_links, vec![labeled("Website", "https://jane.dev".to_string())]);
        assert_eq!(vm.projects[0].title.as_deref(), Some("<b>Evil</b>"));
        assert_eq!(vm.projects[0].link, None);
    }

    #[test]
    fn test_payload_blank_headline_gets_fallback() {
        let payload = ExportPayload {
            resolved_name: Some("Jane".to_string()),
            resolved_profession_title: Some("Designer".to_string()),
            ..Default::default()
        };
        assert!(payload.headline().is_none());
        let vm = payload.normalize();
        assert_eq!(vm.resolved_headline, "Designer | Building Innovative Solutions");
    }

    #[test]
    fn test_built_view_model_survives_payload_normalisation() {
        let mut record = jane();
        record.social.github = Some("github.com/jane".to_string());
        record.contact.email = Some("jane@example.com".to_string());
        record.projects = vec![ProjectItem {
            title: Some("CLI".to_string()),
            link: Some("jane.dev/cli".to_string()),
            tags: Some(vec!["rust".to_string()]),
            ..Default::default()
        }];
        let built = build_view_model(&record, &directory(), None, now());
        let json = serde_json::to_string(&built).unwrap();
        let payload: ExportPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.normalize(), built);
    }
}
