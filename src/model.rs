//! Resume data model and lenient ingestion of API payloads.
//!
//! The API hands back loosely-typed JSON. Every field here is optional and
//! falls back to its default when missing, `null` or of the wrong type, so
//! the export code never has to probe for absent nested values.

use crate::error::{IngestError, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Category label used for skills saved without one.
pub const UNCATEGORIZED_SKILLS: &str = "Other";

/// Lowest and highest skill level accepted on export.
pub const SKILL_LEVEL_RANGE: (u8, u8) = (1, 5);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeData {
    #[serde(deserialize_with = "lenient")]
    pub personal_info: PersonalInfo,
    #[serde(deserialize_with = "text")]
    pub summary: String,
    #[serde(deserialize_with = "list")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(deserialize_with = "list")]
    pub education: Vec<EducationEntry>,
    #[serde(deserialize_with = "list")]
    pub skills: Vec<Skill>,
    #[serde(deserialize_with = "list")]
    pub projects: Vec<ProjectEntry>,
    #[serde(deserialize_with = "list")]
    pub certifications: Vec<Certification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(deserialize_with = "text")]
    pub full_name: String,
    #[serde(deserialize_with = "text")]
    pub email: String,
    #[serde(deserialize_with = "text")]
    pub phone: String,
    #[serde(deserialize_with = "text")]
    pub location: String,
    #[serde(deserialize_with = "text")]
    pub website: String,
    #[serde(deserialize_with = "text")]
    pub linkedin: String,
    #[serde(deserialize_with = "text")]
    pub github: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(deserialize_with = "text", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub company: String,
    #[serde(deserialize_with = "text")]
    pub position: String,
    #[serde(deserialize_with = "text")]
    pub start_date: String,
    #[serde(deserialize_with = "text")]
    pub end_date: String,
    #[serde(deserialize_with = "flag")]
    pub current: bool,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "text_list")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(deserialize_with = "text", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub institution: String,
    #[serde(deserialize_with = "text")]
    pub degree: String,
    #[serde(deserialize_with = "text")]
    pub field: String,
    #[serde(deserialize_with = "text")]
    pub start_date: String,
    #[serde(deserialize_with = "text")]
    pub end_date: String,
    #[serde(deserialize_with = "flag")]
    pub current: bool,
    #[serde(deserialize_with = "text")]
    pub gpa: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Skill {
    #[serde(deserialize_with = "text", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub category: String,
    #[serde(deserialize_with = "integer")]
    pub level: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectEntry {
    #[serde(deserialize_with = "text", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "text_list")]
    pub technologies: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Certification {
    #[serde(deserialize_with = "text", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub issuer: String,
    #[serde(deserialize_with = "text")]
    pub date: String,
    #[serde(deserialize_with = "text")]
    pub link: String,
}

/// Body sections in their fixed document order. The header is always present
/// and is not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl Section {
    pub const ORDER: [Section; 6] = [
        Section::Summary,
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Projects,
        Section::Certifications,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Summary => "Professional Summary",
            Section::Experience => "Work Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Projects => "Projects",
            Section::Certifications => "Certifications",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Skills sharing a category, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillGroup<'a> {
    pub category: &'a str,
    pub skills: Vec<&'a Skill>,
}

impl SkillGroup<'_> {
    /// `"Rust (5/5), Go (3/5)"`
    pub fn summary(&self) -> String {
        self.skills
            .iter()
            .map(|skill| format!("{} ({}/{})", skill.name.trim(), skill.level(), SKILL_LEVEL_RANGE.1))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ResumeData {
    /// Parses an API response body or a bare resume object.
    ///
    /// Only input that is not JSON at all is rejected; everything else is
    /// coerced into a (possibly empty) resume.
    pub fn from_json(body: &str) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(value))
    }

    /// Unwraps the `{ "data": { ... } }` envelope when present.
    pub fn from_value(value: Value) -> Self {
        let inner = match value {
            Value::Object(mut map) => match map.remove("data") {
                Some(data @ Value::Object(_)) => data,
                Some(_) => Value::Object(Default::default()),
                None => Value::Object(map),
            },
            _ => return Self::default(),
        };
        Self::deserialize(inner).unwrap_or_default()
    }

    /// Caller-side check run before an export is requested.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.personal_info.full_name.trim().is_empty() {
            return Err(ValidationError::MissingFullName);
        }
        Ok(())
    }

    pub fn full_name(&self) -> &str {
        self.personal_info.full_name.trim()
    }

    /// Sections with content, in document order.
    pub fn sections(&self) -> Vec<Section> {
        Section::ORDER
            .into_iter()
            .filter(|section| self.has_section(*section))
            .collect()
    }

    pub fn has_section(&self, section: Section) -> bool {
        match section {
            Section::Summary => !is_blank(&self.summary),
            Section::Experience => self.experience.iter().any(|e| !e.is_empty()),
            Section::Education => self.education.iter().any(|e| !e.is_empty()),
            Section::Skills => self.skills.iter().any(|s| !is_blank(&s.name)),
            Section::Projects => self.projects.iter().any(|p| !p.is_empty()),
            Section::Certifications => self.certifications.iter().any(|c| !c.is_empty()),
        }
    }

    pub fn skill_groups(&self) -> Vec<SkillGroup<'_>> {
        let mut groups: Vec<SkillGroup<'_>> = Vec::new();
        for skill in self.skills.iter().filter(|s| !is_blank(&s.name)) {
            let category = match skill.category.trim() {
                "" => UNCATEGORIZED_SKILLS,
                category => category,
            };
            match groups.iter_mut().find(|g| g.category == category) {
                Some(group) => group.skills.push(skill),
                None => groups.push(SkillGroup {
                    category,
                    skills: vec![skill],
                }),
            }
        }
        groups
    }
}

impl PersonalInfo {
    /// Non-empty contact fields in display order.
    pub fn contact_parts(&self) -> Vec<&str> {
        [
            &self.email,
            &self.phone,
            &self.location,
            &self.website,
            &self.linkedin,
            &self.github,
        ]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect()
    }

    pub fn contact_line(&self) -> Option<String> {
        let parts = self.contact_parts();
        (!parts.is_empty()).then(|| parts.join(" | "))
    }
}

impl ExperienceEntry {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.position) && is_blank(&self.company) && is_blank(&self.description)
    }

    /// `current` wins over any stored end date.
    pub fn date_range(&self) -> Option<String> {
        date_range(&self.start_date, &self.end_date, self.current)
    }
}

impl EducationEntry {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.degree) && is_blank(&self.field) && is_blank(&self.institution)
    }

    /// `"BSc in Computer Science"`, or whichever half is present.
    pub fn title(&self) -> String {
        match (self.degree.trim(), self.field.trim()) {
            ("", field) => field.to_string(),
            (degree, "") => degree.to_string(),
            (degree, field) => format!("{degree} in {field}"),
        }
    }

    pub fn date_range(&self) -> Option<String> {
        date_range(&self.start_date, &self.end_date, self.current)
    }
}

impl Skill {
    /// Stored level clamped into `1..=5`.
    pub fn level(&self) -> u8 {
        let (min, max) = SKILL_LEVEL_RANGE;
        self.level.clamp(min as i64, max as i64) as u8
    }
}

impl ProjectEntry {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.name) && is_blank(&self.description)
    }
}

impl Certification {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.name) && is_blank(&self.issuer)
    }
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Joins the non-blank entries of a technology list.
pub(crate) fn join_technologies(technologies: &[String]) -> Option<String> {
    let names: Vec<&str> = technologies
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

fn date_range(start: &str, end: &str, current: bool) -> Option<String> {
    let end = if current { "Present" } else { end.trim() };
    match (start.trim(), end) {
        ("", "") => None,
        (start, "") => Some(start.to_string()),
        ("", end) => Some(end.to_string()),
        (start, end) => Some(format!("{start} - {end}")),
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .filter(|item| !item.is_empty())
            .collect(),
        // Comma-separated strings show up from older form versions.
        Value::String(joined) => joined
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unwraps_api_envelope() {
        let body = r#"{"data":{"personalInfo":{"fullName":"Jane Q. Public","email":"jane@example.com"},
            "summary":"Builds things."}}"#;
        let resume = ResumeData::from_json(body).unwrap();

        assert_eq!(resume.full_name(), "Jane Q. Public");
        assert_eq!(resume.personal_info.email, "jane@example.com");
        assert_eq!(resume.summary, "Builds things.");
    }

    #[test]
    fn test_malformed_fields_become_absent() {
        let resume = ResumeData::from_value(json!({
            "personalInfo": "not an object",
            "summary": null,
            "experience": [{"company": 42, "current": "true", "technologies": "Rust, Go"}, 7, null],
            "education": {"institution": "MIT"},
            "skills": [{"name": "Rust", "level": "9"}, {"name": "Go", "level": -2}, {"name": "C", "level": 3.6}],
            "projects": null,
        }));

        assert_eq!(resume.personal_info, PersonalInfo::default());
        assert_eq!(resume.summary, "");
        assert_eq!(resume.experience.len(), 1);
        assert_eq!(resume.experience[0].company, "42");
        assert!(resume.experience[0].current);
        assert_eq!(resume.experience[0].technologies, vec!["Rust", "Go"]);
        assert!(resume.education.is_empty());
        assert!(resume.projects.is_empty());
        let levels: Vec<u8> = resume.skills.iter().map(Skill::level).collect();
        assert_eq!(levels, vec![5, 1, 4]);
    }

    #[test]
    fn test_non_object_payload_is_empty_resume() {
        assert_eq!(ResumeData::from_value(json!([1, 2])), ResumeData::default());
        assert_eq!(ResumeData::from_value(json!({"data": null})), ResumeData::default());
        assert!(ResumeData::from_json("<html>").is_err());
    }

    #[test]
    fn test_validate_requires_full_name() {
        let mut resume = ResumeData::default();
        resume.personal_info.full_name = "   ".to_string();
        assert_eq!(resume.validate(), Err(ValidationError::MissingFullName));

        resume.personal_info.full_name = "Alex".to_string();
        assert_eq!(resume.validate(), Ok(()));
    }

    #[test]
    fn test_current_overrides_end_date() {
        let entry = ExperienceEntry {
            start_date: "2021-03".to_string(),
            end_date: "2022-01".to_string(),
            current: true,
            ..Default::default()
        };
        assert_eq!(entry.date_range().as_deref(), Some("2021-03 - Present"));

        let entry = ExperienceEntry::default();
        assert_eq!(entry.date_range(), None);
    }

    #[test]
    fn test_skill_groups_keep_first_seen_order() {
        let resume = ResumeData::from_value(json!({
            "skills": [
                {"name": "Rust", "category": "Languages", "level": 5},
                {"name": "Docker", "category": "Tools", "level": 4},
                {"name": "Go", "category": "Languages", "level": 3},
                {"name": "Writing", "level": 2},
                {"name": " ", "category": "Tools", "level": 2},
            ]
        }));

        let groups = resume.skill_groups();
        let categories: Vec<&str> = groups.iter().map(|g| g.category).collect();
        assert_eq!(categories, vec!["Languages", "Tools", UNCATEGORIZED_SKILLS]);
        assert_eq!(groups[0].summary(), "Rust (5/5), Go (3/5)");
        assert_eq!(groups[1].skills.len(), 1);
    }

    #[test]
    fn test_sections_skip_empty_lists() {
        let resume = ResumeData::from_value(json!({
            "personalInfo": {"fullName": "Alex"},
            "experience": [{}],
            "certifications": [{"name": "CKA", "issuer": "CNCF"}],
        }));

        assert_eq!(resume.sections(), vec![Section::Certifications]);
    }

    #[test]
    fn test_contact_line_skips_blank_parts() {
        let info = PersonalInfo {
            email: "a@b.c".to_string(),
            phone: " ".to_string(),
            github: "github.com/a".to_string(),
            ..Default::default()
        };
        assert_eq!(info.contact_line().as_deref(), Some("a@b.c | github.com/a"));
        assert_eq!(PersonalInfo::default().contact_line(), None);
    }
}
