use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RemoteStatus {
    Remote,
    Hybrid,
    OnSite,
}

/// Case-folds a raw enum value and strips separators so that
/// "Full-Time", "full time" and "FULL_TIME" compare equal.
fn fold_variant(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Maps a free-form employment type to its variant.
pub fn parse_employment_type(raw: &str) -> Result<EmploymentType, AppError> {
    match fold_variant(raw).as_str() {
        "fulltime" | "permanent" | "ft" => Ok(EmploymentType::FullTime),
        "parttime" | "pt" => Ok(EmploymentType::PartTime),
        "contract" | "contractor" | "freelance" | "c2c" => Ok(EmploymentType::Contract),
        "internship" | "intern" => Ok(EmploymentType::Internship),
        "temporary" | "temp" | "seasonal" => Ok(EmploymentType::Temporary),
        _ => Err(AppError::Schema {
            field: "employment_type",
            value: raw.to_string(),
        }),
    }
}

/// Maps a free-form remote status to its variant.
pub fn parse_remote_status(raw: &str) -> Result<RemoteStatus, AppError> {
    match fold_variant(raw).as_str() {
        "remote" | "fullyremote" | "remotefirst" | "wfh" => Ok(RemoteStatus::Remote),
        "hybrid" => Ok(RemoteStatus::Hybrid),
        "onsite" | "inoffice" | "office" | "inperson" => Ok(RemoteStatus::OnSite),
        _ => Err(AppError::Schema {
            field: "remote_status",
            value: raw.to_string(),
        }),
    }
}

impl FromStr for EmploymentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_employment_type(s)
    }
}

impl TryFrom<String> for EmploymentType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_employment_type(&value)
    }
}

impl FromStr for RemoteStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_remote_status(s)
    }
}

impl TryFrom<String> for RemoteStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_remote_status(&value)
    }
}

/// Ordered academic level. Comparison follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    /// Infers the level named in a degree or requirement string, if any.
    /// Highest level wins when several are mentioned ("BS/MS" → Master).
    pub fn infer(text: &str) -> Option<EducationLevel> {
        let lower = text.to_lowercase().replace('.', "");
        let words: Vec<String> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let has = |w: &str| words.iter().any(|x| x == w);

        if lower.contains("doctor") || has("phd") || has("dphil") {
            Some(EducationLevel::Doctorate)
        } else if lower.contains("master") || has("ms") || has("msc") || has("mba") || has("ma") {
            Some(EducationLevel::Master)
        } else if lower.contains("bachelor") || has("bs") || has("bsc") || has("ba") || has("beng") {
            Some(EducationLevel::Bachelor)
        } else if lower.contains("associate") {
            Some(EducationLevel::Associate)
        } else if lower.contains("high school") || has("ged") || lower.contains("diploma") {
            Some(EducationLevel::HighSchool)
        } else {
            None
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EducationLevel::HighSchool => "high school",
            EducationLevel::Associate => "associate",
            EducationLevel::Bachelor => "bachelor",
            EducationLevel::Master => "master",
            EducationLevel::Doctorate => "doctorate",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Qualifications {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub preferred: Vec<String>,
}

/// A structured job posting.
///
/// `title`, `qualifications`, `responsibilities` and `keywords` must be present in
/// the source document; empty lists are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredJob {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub employment_type: Option<EmploymentType>,
    #[serde(default)]
    pub remote_status: Option<RemoteStatus>,
    pub qualifications: Qualifications,
    pub responsibilities: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub education_requirement: Option<String>,
}

impl StructuredJob {
    /// Whole job posting flattened into one document, used for embeddings.
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        parts.extend(self.qualifications.required.iter().map(String::as_str));
        parts.extend(self.qualifications.preferred.iter().map(String::as_str));
        parts.extend(self.responsibilities.iter().map(String::as_str));
        parts.extend(self.keywords.iter().map(String::as_str));
        parts.extend(self.education_requirement.as_deref());
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employment_type_spelling_variants() {
        for raw in ["Full-Time", "full time", "FULL_TIME", "fulltime"] {
            assert_eq!(parse_employment_type(raw).unwrap(), EmploymentType::FullTime);
        }
        assert_eq!(parse_employment_type("Intern").unwrap(), EmploymentType::Internship);
    }

    #[test]
    fn test_unknown_employment_type_is_typed_error() {
        match parse_employment_type("gig") {
            Err(AppError::Schema { field, value }) => {
                assert_eq!(field, "employment_type");
                assert_eq!(value, "gig");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_status_variants() {
        assert_eq!(parse_remote_status("On-Site").unwrap(), RemoteStatus::OnSite);
        assert_eq!(parse_remote_status("in office").unwrap(), RemoteStatus::OnSite);
        assert_eq!(parse_remote_status("HYBRID").unwrap(), RemoteStatus::Hybrid);
        assert!(parse_remote_status("moon base").is_err());
    }

    #[test]
    fn test_job_deserializes_with_loose_enums() {
        let json = r#"{
            "title": "Platform Engineer",
            "employment_type": "Full Time",
            "remote_status": "remote",
            "qualifications": {"required": ["Python"]},
            "responsibilities": [],
            "keywords": ["python"]
        }"#;
        let job: StructuredJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.employment_type, Some(EmploymentType::FullTime));
        assert_eq!(job.remote_status, Some(RemoteStatus::Remote));
        assert!(job.qualifications.preferred.is_empty());
    }

    #[test]
    fn test_job_with_unknown_enum_fails() {
        let json = r#"{
            "title": "X", "employment_type": "gig",
            "qualifications": {}, "responsibilities": [], "keywords": []
        }"#;
        let result: Result<StructuredJob, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_education_level_inference_and_order() {
        assert_eq!(
            EducationLevel::infer("B.S. Computer Science"),
            Some(EducationLevel::Bachelor)
        );
        assert_eq!(
            EducationLevel::infer("Master of Science"),
            Some(EducationLevel::Master)
        );
        assert_eq!(EducationLevel::infer("PhD in ML"), Some(EducationLevel::Doctorate));
        assert_eq!(EducationLevel::infer("BS/MS preferred"), Some(EducationLevel::Master));
        assert_eq!(EducationLevel::infer("Bootcamp"), None);
        assert!(EducationLevel::Doctorate > EducationLevel::Bachelor);
    }
}
