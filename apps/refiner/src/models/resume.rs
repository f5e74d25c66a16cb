use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// `None` for a current position.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub graduation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A structured resume. The same schema is used for the master (ground truth)
/// resume and for every tailored version produced by refinement.
///
/// Refinement never edits a resume in place: each accepted pass produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResume {
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub summary: Option<String>,
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl StructuredResume {
    /// Every free-text fragment of the resume, in document order.
    /// Feeds token extraction for scoring and gap analysis.
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        out.extend(self.summary.as_deref());
        for exp in &self.work_experience {
            out.push(&exp.title);
            out.push(&exp.company);
            out.extend(exp.description.as_deref());
            out.extend(exp.bullets.iter().map(String::as_str));
            out.extend(exp.technologies.iter().map(String::as_str));
        }
        for edu in &self.education {
            out.push(&edu.degree);
            out.extend(edu.field.as_deref());
        }
        for project in &self.projects {
            out.push(&project.name);
            out.extend(project.description.as_deref());
            out.extend(project.bullets.iter().map(String::as_str));
            out.extend(project.technologies.iter().map(String::as_str));
        }
        out.extend(self.skills.iter().map(String::as_str));
        out.extend(self.certifications.iter().map(String::as_str));
        out.extend(self.keywords.iter().map(String::as_str));
        out
    }

    /// The whole resume flattened into one document, used for embeddings.
    pub fn full_text(&self) -> String {
        self.text_fragments().join("\n")
    }

    /// Applies `f` to every prose field (summary, descriptions, bullets).
    /// Factual fields (names, companies, skills, technologies) are left untouched.
    pub fn map_prose<F>(&self, mut f: F) -> StructuredResume
    where
        F: FnMut(&str) -> String,
    {
        let mut next = self.clone();
        next.summary = self.summary.as_deref().map(&mut f);
        for exp in &mut next.work_experience {
            exp.description = exp.description.as_deref().map(&mut f);
            exp.bullets = exp.bullets.iter().map(|b| f(b.as_str())).collect();
        }
        for project in &mut next.projects {
            project.description = project.description.as_deref().map(&mut f);
            project.bullets = project.bullets.iter().map(|b| f(b.as_str())).collect();
        }
        next
    }
}
