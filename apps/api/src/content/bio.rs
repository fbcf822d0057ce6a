use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

/// Substitutes `{name}`-style placeholders in a user-written bio.
///
/// Keys match case-insensitively. A `None` value, or a placeholder with no matching key,
/// becomes the empty string. An empty template yields `""`.
pub fn compose(template: &str, replacements: &[(&str, Option<&str>)]) -> String {
    if template.is_empty() {
        return String::new();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = caps[1].trim();
            replacements
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, v)| *v)
                .unwrap_or_default()
                .to_string()
        })
        .into_owned()
}

/// Generated sentence used when a composed bio comes out blank.
pub fn fallback_bio(name: &str, profession_title: &str, joined_skills: &str) -> String {
    let skills = if joined_skills.trim().is_empty() {
        "various technologies"
    } else {
        joined_skills
    };
    format!("I am {name} specializing in {profession_title}. My expertise includes {skills}.")
}
