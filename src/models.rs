use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: i32,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub enrollment_year: i32,
    pub course_batch: String,
    pub city: String,
    pub graduation_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgrammingMetrics {
    pub language: String,
    pub problems_solved: i32,
    pub assessments_completed: i32,
    pub mini_projects: i32,
    pub certifications_earned: i32,
    pub latest_project_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftSkillScores {
    pub communication: i32,
    pub teamwork: i32,
    pub presentation: i32,
    pub leadership: i32,
    pub critical_thinking: i32,
    pub interpersonal_skills: i32,
}

impl SoftSkillScores {
    pub fn as_array(&self) -> [i32; 6] {
        [
            self.communication,
            self.teamwork,
            self.presentation,
            self.leadership,
            self.critical_thinking,
            self.interpersonal_skills,
        ]
    }

    /// Unrounded mean of the six scores. Thresholds compare against this value.
    pub fn raw_average(&self) -> f64 {
        let total: i32 = self.as_array().iter().sum();
        total as f64 / 6.0
    }

    /// Mean of the six scores rounded to two decimals, as shown in reports.
    pub fn average(&self) -> f64 {
        round2(self.raw_average())
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Where a student stands in the placement process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementStatus {
    Ready,
    #[serde(rename = "Not Ready")]
    NotReady,
    Placed,
}

impl PlacementStatus {
    pub const ALL: [PlacementStatus; 3] = [Self::Ready, Self::NotReady, Self::Placed];

    /// The exact string stored in `placements.placement_status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "Not Ready",
            Self::Placed => "Placed",
        }
    }
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        match normalized.as_str() {
            "ready" => Ok(Self::Ready),
            "notready" => Ok(Self::NotReady),
            "placed" => Ok(Self::Placed),
            _ => Err(format!(
                "unknown placement status '{s}' (expected Ready, Not Ready or Placed)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub mock_interview_score: i32,
    pub internships_completed: i32,
    pub placement_status: PlacementStatus,
    pub company_name: Option<String>,
    pub placement_package: Option<f64>,
    pub interview_rounds_cleared: i32,
    pub placement_date: Option<NaiveDate>,
}

/// One student joined across all four tables.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentProfile {
    pub student: StudentRecord,
    pub programming: ProgrammingMetrics,
    pub soft_skills: SoftSkillScores,
    pub placement: PlacementRecord,
}

/// Flat CSV layout of a [`StudentProfile`], used by import and snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub student_id: i32,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub enrollment_year: i32,
    pub course_batch: String,
    pub city: String,
    pub graduation_year: i32,
    pub language: String,
    pub problems_solved: i32,
    pub assessments_completed: i32,
    pub mini_projects: i32,
    pub certifications_earned: i32,
    pub latest_project_score: i32,
    pub communication: i32,
    pub teamwork: i32,
    pub presentation: i32,
    pub leadership: i32,
    pub critical_thinking: i32,
    pub interpersonal_skills: i32,
    pub mock_interview_score: i32,
    pub internships_completed: i32,
    pub placement_status: PlacementStatus,
    pub company_name: Option<String>,
    pub placement_package: Option<f64>,
    pub interview_rounds_cleared: i32,
    pub placement_date: Option<NaiveDate>,
}

impl From<ProfileRow> for StudentProfile {
    fn from(row: ProfileRow) -> Self {
        StudentProfile {
            student: StudentRecord {
                student_id: row.student_id,
                name: row.name,
                age: row.age,
                gender: row.gender,
                email: row.email,
                phone: row.phone,
                enrollment_year: row.enrollment_year,
                course_batch: row.course_batch,
                city: row.city,
                graduation_year: row.graduation_year,
            },
            programming: ProgrammingMetrics {
                language: row.language,
                problems_solved: row.problems_solved,
                assessments_completed: row.assessments_completed,
                mini_projects: row.mini_projects,
                certifications_earned: row.certifications_earned,
                latest_project_score: row.latest_project_score,
            },
            soft_skills: SoftSkillScores {
                communication: row.communication,
                teamwork: row.teamwork,
                presentation: row.presentation,
                leadership: row.leadership,
                critical_thinking: row.critical_thinking,
                interpersonal_skills: row.interpersonal_skills,
            },
            placement: PlacementRecord {
                mock_interview_score: row.mock_interview_score,
                internships_completed: row.internships_completed,
                placement_status: row.placement_status,
                company_name: row.company_name.filter(|c| !c.trim().is_empty()),
                placement_package: row.placement_package,
                interview_rounds_cleared: row.interview_rounds_cleared,
                placement_date: row.placement_date,
            },
        }
    }
}

/// Thresholds and filters for one eligibility search. `None` or an empty
/// batch list means the filter is not applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityCriteria {
    pub min_problems: i32,
    pub min_soft_avg: f64,
    pub min_mock: i32,
    pub batches: Vec<String>,
    pub language: Option<String>,
    pub status: Option<PlacementStatus>,
}

impl Default for EligibilityCriteria {
    fn default() -> Self {
        Self {
            min_problems: 50,
            min_soft_avg: 75.0,
            min_mock: 60,
            batches: Vec::new(),
            language: None,
            status: None,
        }
    }
}

impl EligibilityCriteria {
    pub fn new(min_problems: i32, min_soft_avg: f64, min_mock: i32) -> Self {
        Self {
            min_problems,
            min_soft_avg,
            min_mock,
            ..Default::default()
        }
    }

    pub fn with_batches<I, S>(mut self, batches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.batches = batches.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_status(mut self, status: PlacementStatus) -> Self {
        self.status = Some(status);
        self
    }
}
