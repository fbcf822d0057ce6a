use serde::{Deserialize, Serialize};

/// Portfolio content exactly as the editing client submits it.
///
/// Every field is optional on the wire: the client autosaves partially filled forms,
/// and `null` is as common as an empty string. Nothing here is trusted or trimmed;
/// `content::view_model::build_view_model` is the only consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentRecord {
    pub profile: Profile,
    pub social: SocialLinks,
    pub contact: Contact,
    pub skills: Vec<SkillEntry>,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub projects: Vec<ProjectItem>,
    pub responsibilities: Vec<Option<String>>,
    pub profession: Option<String>,
    pub custom_profession: Option<String>,
    pub selected_template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub headline: Option<String>,
    /// Free text that may contain `{name}`-style placeholders.
    pub bio: Option<String>,
    /// Data URL or remote URL of the profile picture.
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocialLinks {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// Skills arrive either as bare names or as `{ "name": ... }` objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SkillEntry {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
    },
}

impl SkillEntry {
    pub fn name(&self) -> &str {
        match self {
            SkillEntry::Name(name) => name,
            SkillEntry::Detailed { name } => name.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperienceItem {
    pub role: Option<String>,
    pub company: Option<String>,
    /// Free-text date range, e.g. "03/2019 - Present".
    pub period: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EducationItem {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_sparse_client_payload() {
        let json = r#"{
            "profile": { "name": "Jane Doe", "headline": null },
            "skills": ["Go", { "id": 3, "name": "Rust" }, { "id": 4 }],
            "responsibilities": ["Lead reviews", null],
            "customProfession": "Platform Engineer"
        }"#;
        let record: ContentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.profile.name.as_deref(), Some("Jane Doe"));
        assert!(record.profile.headline.is_none());
        let names: Vec<&str> = record.skills.iter().map(SkillEntry::name).collect();
        assert_eq!(names, vec!["Go", "Rust", ""]);
        assert_eq!(record.responsibilities.len(), 2);
        assert_eq!(record.custom_profession.as_deref(), Some("Platform Engineer"));
        assert!(record.experience.is_empty());
    }

    #[test]
    fn test_empty_object_is_default_record() {
        let record: ContentRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, ContentRecord::default());
    }

    #[test]
    fn test_project_tags_accept_null() {
        let project: ProjectItem =
            serde_json::from_str(r#"{ "title": "CLI", "tags": null }"#).unwrap();
        assert!(project.tags.is_none());
    }
}
