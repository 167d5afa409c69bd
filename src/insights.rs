//! Fixed insight reports.
//!
//! Ten static aggregate queries with no runtime parameters. Averages are cast to
//! `float8` so they decode as numbers rather than `NUMERIC`.

use std::fmt;
use std::str::FromStr;

use crate::query::BuiltQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Insight {
    TotalStudents,
    ProgrammingByBatch,
    TopMockInterviews,
    SoftSkillAverages,
    TopCertifications,
    PlacementStatusCounts,
    PackageByBatch,
    NoInternships,
    StrongSoftSkills,
    TopHiringCompanies,
}

impl Insight {
    pub const ALL: [Insight; 10] = [
        Self::TotalStudents,
        Self::ProgrammingByBatch,
        Self::TopMockInterviews,
        Self::SoftSkillAverages,
        Self::TopCertifications,
        Self::PlacementStatusCounts,
        Self::PackageByBatch,
        Self::NoInternships,
        Self::StrongSoftSkills,
        Self::TopHiringCompanies,
    ];

    /// 1-based position in the report.
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|i| i == self)
            .map(|p| p + 1)
            .unwrap_or_default()
    }

    pub fn from_number(number: usize) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::TotalStudents => "Total number of students",
            Self::ProgrammingByBatch => "Average programming performance per batch",
            Self::TopMockInterviews => "Top 5 students by mock interview score",
            Self::SoftSkillAverages => "Average score per soft skill",
            Self::TopCertifications => "Students with the most programming certifications",
            Self::PlacementStatusCounts => "Students per placement status",
            Self::PackageByBatch => "Average placement package per batch",
            Self::NoInternships => "Students with no internships completed",
            Self::StrongSoftSkills => {
                "Students scoring at least 70 in communication, teamwork and presentation"
            }
            Self::TopHiringCompanies => "Companies that hired the most students",
        }
    }

    /// Column to use as the category axis when the result is charted.
    pub fn chart_key(&self) -> Option<&'static str> {
        match self {
            Self::ProgrammingByBatch | Self::PackageByBatch => Some("course_batch"),
            Self::PlacementStatusCounts => Some("placement_status"),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::TotalStudents => "SELECT COUNT(*) AS total_students FROM students",
            Self::ProgrammingByBatch => {
                "SELECT s.course_batch, \
                 AVG(p.problems_solved)::float8 AS avg_problems_solved, \
                 AVG(p.assessments_completed)::float8 AS avg_assessments, \
                 AVG(p.latest_project_score)::float8 AS avg_project_score \
                 FROM students s \
                 JOIN programming p ON s.student_id = p.student_id \
                 GROUP BY s.course_batch \
                 ORDER BY s.course_batch"
            }
            Self::TopMockInterviews => {
                "SELECT s.name, pl.mock_interview_score, pl.internships_completed \
                 FROM students s \
                 JOIN placements pl ON s.student_id = pl.student_id \
                 ORDER BY pl.mock_interview_score DESC \
                 LIMIT 5"
            }
            Self::SoftSkillAverages => {
                "SELECT AVG(communication)::float8 AS avg_communication, \
                 AVG(teamwork)::float8 AS avg_teamwork, \
                 AVG(presentation)::float8 AS avg_presentation, \
                 AVG(leadership)::float8 AS avg_leadership, \
                 AVG(critical_thinking)::float8 AS avg_critical_thinking, \
                 AVG(interpersonal_skills)::float8 AS avg_interpersonal \
                 FROM soft_skills"
            }
            Self::TopCertifications => {
                "SELECT s.name, p.certifications_earned \
                 FROM students s \
                 JOIN programming p ON s.student_id = p.student_id \
                 ORDER BY p.certifications_earned DESC \
                 LIMIT 10"
            }
            Self::PlacementStatusCounts => {
                "SELECT placement_status, COUNT(*) AS total_students \
                 FROM placements \
                 GROUP BY placement_status \
                 ORDER BY placement_status"
            }
            Self::PackageByBatch => {
                "SELECT s.course_batch, AVG(pl.placement_package)::float8 AS avg_package \
                 FROM students s \
                 JOIN placements pl ON s.student_id = pl.student_id \
                 WHERE pl.placement_status = 'Placed' \
                 GROUP BY s.course_batch \
                 ORDER BY s.course_batch"
            }
            Self::NoInternships => {
                "SELECT s.name, s.email, pl.internships_completed \
                 FROM students s \
                 JOIN placements pl ON s.student_id = pl.student_id \
                 WHERE pl.internships_completed = 0"
            }
            Self::StrongSoftSkills => {
                "SELECT s.name, ss.communication, ss.teamwork, ss.presentation \
                 FROM students s \
                 JOIN soft_skills ss ON s.student_id = ss.student_id \
                 WHERE ss.communication >= 70 \
                 AND ss.teamwork >= 70 \
                 AND ss.presentation >= 70"
            }
            Self::TopHiringCompanies => {
                "SELECT company_name, COUNT(*) AS total_hired \
                 FROM placements \
                 WHERE placement_status = 'Placed' \
                 GROUP BY company_name \
                 ORDER BY total_hired DESC \
                 LIMIT 5"
            }
        }
    }

    pub fn query(&self) -> BuiltQuery {
        BuiltQuery::fixed(self.sql())
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {}", self.number(), self.title())
    }
}

impl FromStr for Insight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<usize>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| format!("insight must be a number from 1 to {}", Self::ALL.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        for (index, insight) in Insight::ALL.iter().enumerate() {
            assert_eq!(insight.number(), index + 1);
            assert_eq!(Insight::from_number(index + 1), Some(*insight));
        }
        assert_eq!(Insight::from_number(0), None);
        assert_eq!(Insight::from_number(11), None);
    }

    #[test]
    fn every_insight_is_a_parameterless_select() {
        for insight in Insight::ALL {
            let query = insight.query();
            assert!(query.sql.starts_with("SELECT"), "{insight}");
            assert!(query.params.is_empty());
            assert!(!query.sql.contains('$'));
        }
    }

    #[test]
    fn averages_are_cast_to_float() {
        for insight in Insight::ALL {
            let sql = insight.sql();
            assert_eq!(
                sql.matches("AVG(").count(),
                sql.matches(")::float8").count(),
                "{insight}"
            );
        }
    }

    #[test]
    fn parses_from_number_text() {
        assert_eq!("3".parse::<Insight>(), Ok(Insight::TopMockInterviews));
        assert!("eleven".parse::<Insight>().is_err());
    }

    #[test]
    fn display_includes_number() {
        assert_eq!(
            Insight::TotalStudents.to_string(),
            "1) Total number of students"
        );
    }
}
