//! Master alignment: detects claims in a tailored resume that the master resume cannot back.
//!
//! Values are compared by canonical phrase, so "K8s" in a tailored resume is grounded by
//! "Kubernetes" in the master. A value the master only mentions in prose is a warning; a value
//! the master never mentions is critical.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::matching::gap::phrase_present;
use crate::matching::normalizer::TextNormalizer;
use crate::matching::signals::ResumeSignals;
use crate::models::resume::StructuredResume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    FabricatedSkill,
    FabricatedCert,
    FabricatedCompany,
    InventedContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Checked against a master resume.
    Grounded,
    /// No master resume: nothing can be proven fabricated, so nothing is critical.
    WarningOnly,
}

/// Location of a checked value inside a `StructuredResume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Skill(usize),
    Certification(usize),
    Company(usize),
    Title(usize),
    ExperienceTechnology { experience: usize, index: usize },
    ProjectTechnology { project: usize, index: usize },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Skill(i) => write!(f, "skills[{i}]"),
            FieldPath::Certification(i) => write!(f, "certifications[{i}]"),
            FieldPath::Company(i) => write!(f, "work_experience[{i}].company"),
            FieldPath::Title(i) => write!(f, "work_experience[{i}].title"),
            FieldPath::ExperienceTechnology { experience, index } => {
                write!(f, "work_experience[{experience}].technologies[{index}]")
            }
            FieldPath::ProjectTechnology { project, index } => {
                write!(f, "projects[{project}].technologies[{index}]")
            }
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentViolation {
    pub field_path: FieldPath,
    pub violation_type: ViolationType,
    pub value: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentReport {
    /// True iff no violation is critical.
    pub is_aligned: bool,
    pub violations: Vec<AlignmentViolation>,
    /// 1 − critical / checked, clamped to [0, 1].
    pub confidence_score: f64,
    pub mode: AlignmentMode,
    pub notes: Vec<String>,
}

impl AlignmentReport {
    pub fn critical_violations(&self) -> impl Iterator<Item = &AlignmentViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
    }

    pub fn has_critical(&self) -> bool {
        self.critical_violations().next().is_some()
    }
}

/// One field changed by the corrective merge. `to == None` means the value was removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRevert {
    pub field_path: FieldPath,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Canonicalized facts of the master resume.
struct MasterFacts {
    /// Skills plus every listed technology.
    claims: HashSet<String>,
    certifications: HashSet<String>,
    companies: HashSet<String>,
    titles_by_company: HashMap<String, HashSet<String>>,
    tokens: HashSet<String>,
}

pub struct AlignmentValidator {
    normalizer: Arc<dyn TextNormalizer>,
}

impl AlignmentValidator {
    pub fn new(normalizer: Arc<dyn TextNormalizer>) -> Self {
        Self { normalizer }
    }

    fn canonical(&self, value: &str) -> String {
        self.normalizer.canonical_phrase(value)
    }

    /// Identity of a company or title. Names made only of stop words (or blank) have no
    /// canonical form and compare by their trimmed, case-folded text instead.
    fn fact_key(&self, value: &str) -> String {
        let canonical = self.canonical(value);
        if canonical.is_empty() {
            value.trim().to_lowercase()
        } else {
            canonical
        }
    }

    fn canonical_set<'a, I>(&self, values: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        values
            .into_iter()
            .map(|v| self.canonical(v))
            .filter(|v| !v.is_empty())
            .collect()
    }

    fn master_facts(&self, master: &StructuredResume) -> MasterFacts {
        let technologies = master
            .work_experience
            .iter()
            .flat_map(|e| e.technologies.iter())
            .chain(master.projects.iter().flat_map(|p| p.technologies.iter()));

        let mut titles_by_company: HashMap<String, HashSet<String>> = HashMap::new();
        for exp in &master.work_experience {
            titles_by_company
                .entry(self.fact_key(&exp.company))
                .or_default()
                .insert(self.fact_key(&exp.title));
        }

        MasterFacts {
            claims: self.canonical_set(master.skills.iter().chain(technologies)),
            certifications: self.canonical_set(&master.certifications),
            companies: master
                .work_experience
                .iter()
                .map(|e| self.fact_key(&e.company))
                .collect(),
            titles_by_company,
            tokens: ResumeSignals::extract(master, self.normalizer.as_ref()).tokens,
        }
    }

    /// Diffs `tailored` against `master`. Without a master the report is warning-only and
    /// says so in `mode` and `notes`.
    pub fn validate(
        &self,
        tailored: &StructuredResume,
        master: Option<&StructuredResume>,
    ) -> AlignmentReport {
        match master {
            Some(master) => self.validate_grounded(tailored, master),
            None => self.validate_warning_only(tailored),
        }
    }

    fn validate_grounded(
        &self,
        tailored: &StructuredResume,
        master: &StructuredResume,
    ) -> AlignmentReport {
        let facts = self.master_facts(master);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        // A claim named in master prose but not listed is an embellishment, not a fabrication.
        let mut check_claim = |path: FieldPath, value: &str, kind: ViolationType| {
            let canonical = self.canonical(value);
            if canonical.is_empty() {
                return;
            }
            checked += 1;
            if facts.claims.contains(&canonical) {
                return;
            }
            let severity = if phrase_present(&canonical, &facts.tokens) {
                Severity::Warning
            } else {
                Severity::Critical
            };
            violations.push(AlignmentViolation {
                field_path: path,
                violation_type: kind,
                value: value.to_string(),
                severity,
            });
        };

        for (i, skill) in tailored.skills.iter().enumerate() {
            check_claim(FieldPath::Skill(i), skill, ViolationType::FabricatedSkill);
        }
        for (e, exp) in tailored.work_experience.iter().enumerate() {
            for (index, tech) in exp.technologies.iter().enumerate() {
                check_claim(
                    FieldPath::ExperienceTechnology { experience: e, index },
                    tech,
                    ViolationType::InventedContent,
                );
            }
        }
        for (p, project) in tailored.projects.iter().enumerate() {
            for (index, tech) in project.technologies.iter().enumerate() {
                check_claim(
                    FieldPath::ProjectTechnology { project: p, index },
                    tech,
                    ViolationType::InventedContent,
                );
            }
        }

        for (i, cert) in tailored.certifications.iter().enumerate() {
            let canonical = self.canonical(cert);
            if canonical.is_empty() {
                continue;
            }
            checked += 1;
            if !facts.certifications.contains(&canonical) {
                violations.push(AlignmentViolation {
                    field_path: FieldPath::Certification(i),
                    violation_type: ViolationType::FabricatedCert,
                    value: cert.clone(),
                    severity: Severity::Critical,
                });
            }
        }

        for (i, exp) in tailored.work_experience.iter().enumerate() {
            let company = self.fact_key(&exp.company);
            checked += 1;
            if !facts.companies.contains(&company) {
                violations.push(AlignmentViolation {
                    field_path: FieldPath::Company(i),
                    violation_type: ViolationType::FabricatedCompany,
                    value: exp.company.clone(),
                    severity: Severity::Critical,
                });
                continue;
            }
            checked += 1;
            let title_known = facts
                .titles_by_company
                .get(&company)
                .is_some_and(|titles| titles.contains(&self.fact_key(&exp.title)));
            if !title_known {
                violations.push(AlignmentViolation {
                    field_path: FieldPath::Title(i),
                    violation_type: ViolationType::InventedContent,
                    value: exp.title.clone(),
                    severity: Severity::Warning,
                });
            }
        }

        let critical = violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count();
        let confidence_score = if checked == 0 {
            1.0
        } else {
            (1.0 - critical as f64 / checked as f64).clamp(0.0, 1.0)
        };

        AlignmentReport {
            is_aligned: critical == 0,
            violations,
            confidence_score,
            mode: AlignmentMode::Grounded,
            notes: Vec::new(),
        }
    }

    /// Self-consistency only: technologies the resume never lists as skills are flagged.
    fn validate_warning_only(&self, tailored: &StructuredResume) -> AlignmentReport {
        let skills = self.canonical_set(&tailored.skills);
        let mut violations = Vec::new();

        let experience_techs = tailored.work_experience.iter().enumerate().flat_map(|(e, exp)| {
            exp.technologies.iter().enumerate().map(move |(index, tech)| {
                (FieldPath::ExperienceTechnology { experience: e, index }, tech)
            })
        });
        let project_techs = tailored.projects.iter().enumerate().flat_map(|(p, project)| {
            project.technologies.iter().enumerate().map(move |(index, tech)| {
                (FieldPath::ProjectTechnology { project: p, index }, tech)
            })
        });

        for (path, tech) in experience_techs.chain(project_techs) {
            let canonical = self.canonical(tech);
            if !canonical.is_empty() && !skills.contains(&canonical) {
                violations.push(AlignmentViolation {
                    field_path: path,
                    violation_type: ViolationType::InventedContent,
                    value: tech.clone(),
                    severity: Severity::Warning,
                });
            }
        }

        AlignmentReport {
            is_aligned: true,
            violations,
            confidence_score: 1.0,
            mode: AlignmentMode::WarningOnly,
            notes: vec![
                "No master resume supplied: fabricated skills, certifications and companies \
                 cannot be detected, so no violation is reported as critical."
                    .to_string(),
            ],
        }
    }
}

fn without_indices<T>(items: Vec<T>, drop: &HashSet<usize>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains(i))
        .map(|(_, item)| item)
        .collect()
}

/// Merges last known-truthful values over `candidate` for every critical violation.
///
/// Listed claims (skills, certifications, technologies) did not exist truthfully, so they are
/// removed. A fabricated company is restored from `last_truthful` at the same position, or the
/// whole experience entry is dropped when there is none. Warnings are left alone.
pub fn revert_fields(
    candidate: &StructuredResume,
    last_truthful: &StructuredResume,
    violations: &[AlignmentViolation],
) -> (StructuredResume, Vec<FieldRevert>) {
    let mut merged = candidate.clone();
    let mut audit = Vec::new();

    let mut drop_skills = HashSet::new();
    let mut drop_certs = HashSet::new();
    let mut drop_experiences = HashSet::new();
    let mut drop_experience_techs = HashSet::new();
    let mut drop_project_techs = HashSet::new();

    let removed = |path: FieldPath, value: &str| FieldRevert {
        field_path: path,
        from: Some(value.to_string()),
        to: None,
    };

    for violation in violations
        .iter()
        .filter(|v| v.severity == Severity::Critical)
    {
        let path = violation.field_path;
        match path {
            FieldPath::Skill(i) => {
                drop_skills.insert(i);
                audit.push(removed(path, &violation.value));
            }
            FieldPath::Certification(i) => {
                drop_certs.insert(i);
                audit.push(removed(path, &violation.value));
            }
            FieldPath::ExperienceTechnology { experience, index } => {
                drop_experience_techs.insert((experience, index));
                audit.push(removed(path, &violation.value));
            }
            FieldPath::ProjectTechnology { project, index } => {
                drop_project_techs.insert((project, index));
                audit.push(removed(path, &violation.value));
            }
            FieldPath::Company(i) => {
                let prior = last_truthful.work_experience.get(i);
                match (prior, merged.work_experience.get_mut(i)) {
                    (Some(prior), Some(entry)) => {
                        audit.push(FieldRevert {
                            field_path: path,
                            from: Some(entry.company.clone()),
                            to: Some(prior.company.clone()),
                        });
                        entry.company = prior.company.clone();
                    }
                    (None, Some(_)) => {
                        drop_experiences.insert(i);
                        audit.push(removed(path, &violation.value));
                    }
                    (_, None) => {}
                }
            }
            FieldPath::Title(_) => {}
        }
    }

    merged.skills = without_indices(merged.skills, &drop_skills);
    merged.certifications = without_indices(merged.certifications, &drop_certs);
    for (e, exp) in merged.work_experience.iter_mut().enumerate() {
        let drop: HashSet<usize> = drop_experience_techs
            .iter()
            .filter(|(experience, _)| *experience == e)
            .map(|(_, index)| *index)
            .collect();
        exp.technologies = without_indices(std::mem::take(&mut exp.technologies), &drop);
    }
    for (p, project) in merged.projects.iter_mut().enumerate() {
        let drop: HashSet<usize> = drop_project_techs
            .iter()
            .filter(|(proj, _)| *proj == p)
            .map(|(_, index)| *index)
            .collect();
        project.technologies = without_indices(std::mem::take(&mut project.technologies), &drop);
    }
    merged.work_experience = without_indices(merged.work_experience, &drop_experiences);

    (merged, audit)
}
