//! Normalized scoring signals extracted from structured resumes and jobs.
//!
//! Everything here is a set or a deduplicated list, so downstream overlap
//! computations never depend on the order of list-valued inputs.

use std::collections::HashSet;

use crate::matching::normalizer::{is_tech_term, TextNormalizer};
use crate::models::job::{EducationLevel, StructuredJob};
use crate::models::resume::StructuredResume;

#[derive(Debug, Clone, Default)]
pub struct ResumeSignals {
    /// Every token of the resume.
    pub tokens: HashSet<String>,
    /// Tokens of the skill list and all listed technologies.
    pub skill_tokens: HashSet<String>,
    /// Titles, descriptions and bullets of work experience.
    pub experience_tokens: HashSet<String>,
    /// Names, descriptions and bullets of projects.
    pub project_tokens: HashSet<String>,
    pub highest_education: Option<EducationLevel>,
    pub has_education: bool,
}

/// A stated education requirement; `level` is `None` when the text names no degree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EducationRequirement {
    pub level: Option<EducationLevel>,
}

#[derive(Debug, Clone, Default)]
pub struct JobSignals {
    /// Canonical keyword phrases, deduplicated in first-seen order.
    pub keywords: Vec<String>,
    /// Canonical keywords plus technical terms named in the qualifications.
    pub skills: HashSet<String>,
    /// Title and responsibility tokens.
    pub relevance_tokens: HashSet<String>,
    /// One token set per required qualification.
    pub required_qualifications: Vec<HashSet<String>>,
    pub education: Option<EducationRequirement>,
}

fn tokens_of<'a, I>(normalizer: &dyn TextNormalizer, fragments: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    fragments
        .into_iter()
        .flat_map(|f| normalizer.normalize(f))
        .collect()
}

/// Canonicalizes a list of phrases, dropping empties and duplicates, keeping first-seen order.
pub fn canonical_phrases<'a, I>(normalizer: &dyn TextNormalizer, phrases: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    phrases
        .into_iter()
        .map(|p| normalizer.canonical_phrase(p))
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

impl ResumeSignals {
    pub fn extract(resume: &StructuredResume, normalizer: &dyn TextNormalizer) -> Self {
        let tokens = tokens_of(normalizer, resume.text_fragments());

        let technologies = resume
            .work_experience
            .iter()
            .flat_map(|e| e.technologies.iter())
            .chain(resume.projects.iter().flat_map(|p| p.technologies.iter()))
            .map(String::as_str);
        let skill_tokens = tokens_of(
            normalizer,
            resume.skills.iter().map(String::as_str).chain(technologies),
        );

        let experience_tokens = tokens_of(
            normalizer,
            resume.work_experience.iter().flat_map(|e| {
                std::iter::once(e.title.as_str())
                    .chain(e.description.as_deref())
                    .chain(e.bullets.iter().map(String::as_str))
            }),
        );

        let project_tokens = tokens_of(
            normalizer,
            resume.projects.iter().flat_map(|p| {
                std::iter::once(p.name.as_str())
                    .chain(p.description.as_deref())
                    .chain(p.bullets.iter().map(String::as_str))
            }),
        );

        let highest_education = resume
            .education
            .iter()
            .filter_map(|e| EducationLevel::infer(&e.degree))
            .max();

        ResumeSignals {
            tokens,
            skill_tokens,
            experience_tokens,
            project_tokens,
            highest_education,
            has_education: !resume.education.is_empty(),
        }
    }
}

impl JobSignals {
    pub fn extract(job: &StructuredJob, normalizer: &dyn TextNormalizer) -> Self {
        let keywords = canonical_phrases(normalizer, job.keywords.iter().map(String::as_str));

        let qualification_tech = tokens_of(
            normalizer,
            job.qualifications
                .required
                .iter()
                .chain(job.qualifications.preferred.iter())
                .map(String::as_str),
        )
        .into_iter()
        .filter(|t| is_tech_term(t));

        let skills: HashSet<String> = keywords.iter().cloned().chain(qualification_tech).collect();

        let relevance_tokens = tokens_of(
            normalizer,
            std::iter::once(job.title.as_str()).chain(job.responsibilities.iter().map(String::as_str)),
        );

        let required_qualifications = job
            .qualifications
            .required
            .iter()
            .map(|q| normalizer.normalize(q).into_iter().collect::<HashSet<_>>())
            .filter(|set| !set.is_empty())
            .collect();

        let education = job
            .education_requirement
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| EducationRequirement {
                level: EducationLevel::infer(r),
            });

        JobSignals {
            keywords,
            skills,
            relevance_tokens,
            required_qualifications,
            education,
        }
    }
}
