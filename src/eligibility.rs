use std::cmp::Ordering;
use std::path::Path;

use crate::db::{ColumnInfo, ResultTable, Value};
use crate::error::Result;
use crate::models::{EligibilityCriteria, ProfileRow, StudentProfile};
use crate::query::EligibilityQuery;

/// Column holding the cohort used for the per-batch summary.
pub const BATCH_COLUMN: &str = "course_batch";

/// Result of one eligibility search: the matching students plus how many of
/// them fall in each batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityOutcome {
    pub table: ResultTable,
    pub by_batch: Vec<BatchCount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCount {
    pub course_batch: String,
    pub eligible_count: usize,
}

impl EligibilityOutcome {
    pub fn from_table(table: ResultTable) -> Self {
        let by_batch = table
            .group_count(BATCH_COLUMN)
            .unwrap_or_default()
            .into_iter()
            .map(|(course_batch, eligible_count)| BatchCount {
                course_batch,
                eligible_count,
            })
            .collect();

        Self { table, by_batch }
    }

    pub fn eligible_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn summary_line(&self) -> String {
        match self.eligible_count() {
            1 => "Found 1 eligible student".to_string(),
            n => format!("Found {n} eligible students"),
        }
    }
}

/// Report ordering: mock interview score descending, then problems solved
/// descending, then student id for a deterministic result.
pub fn compare_rank(a: &StudentProfile, b: &StudentProfile) -> Ordering {
    b.placement
        .mock_interview_score
        .cmp(&a.placement.mock_interview_score)
        .then_with(|| {
            b.programming
                .problems_solved
                .cmp(&a.programming.problems_solved)
        })
        .then_with(|| a.student.student_id.cmp(&b.student.student_id))
}

/// Applies `criteria` to in-memory profiles with the same predicates and
/// ordering as the SQL statement.
pub fn rank_profiles(
    criteria: &EligibilityCriteria,
    profiles: &[StudentProfile],
) -> Vec<StudentProfile> {
    let query = EligibilityQuery::from_criteria(criteria);
    let mut eligible: Vec<StudentProfile> = profiles
        .iter()
        .filter(|profile| query.matches(profile))
        .cloned()
        .collect();
    eligible.sort_by(compare_rank);
    eligible
}

/// Reads a CSV snapshot laid out as [`ProfileRow`].
pub fn load_snapshot(path: &Path) -> Result<Vec<StudentProfile>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut profiles = Vec::new();

    for record in reader.deserialize::<ProfileRow>() {
        profiles.push(StudentProfile::from(record?));
    }

    Ok(profiles)
}

/// Lays profiles out with the same columns the eligibility statement selects.
pub fn profiles_to_table(profiles: &[StudentProfile]) -> ResultTable {
    let columns = [
        ("student_id", "INT4"),
        ("name", "TEXT"),
        ("age", "INT4"),
        ("gender", "TEXT"),
        ("email", "TEXT"),
        ("phone", "TEXT"),
        ("course_batch", "TEXT"),
        ("language", "TEXT"),
        ("problems_solved", "INT4"),
        ("assessments_completed", "INT4"),
        ("mini_projects", "INT4"),
        ("latest_project_score", "INT4"),
        ("soft_avg", "FLOAT8"),
        ("mock_interview_score", "INT4"),
        ("internships_completed", "INT4"),
        ("placement_status", "TEXT"),
    ]
    .into_iter()
    .map(|(name, data_type)| ColumnInfo::new(name, data_type))
    .collect();

    let rows = profiles
        .iter()
        .map(|p| {
            vec![
                Value::from(p.student.student_id),
                Value::from(p.student.name.as_str()),
                Value::from(p.student.age),
                Value::from(p.student.gender.as_str()),
                Value::from(p.student.email.as_str()),
                Value::from(p.student.phone.as_str()),
                Value::from(p.student.course_batch.as_str()),
                Value::from(p.programming.language.as_str()),
                Value::from(p.programming.problems_solved),
                Value::from(p.programming.assessments_completed),
                Value::from(p.programming.mini_projects),
                Value::from(p.programming.latest_project_score),
                Value::from(p.soft_skills.average()),
                Value::from(p.placement.mock_interview_score),
                Value::from(p.placement.internships_completed),
                Value::from(p.placement.placement_status.as_str()),
            ]
        })
        .collect();

    ResultTable::with_data(columns, rows)
}

/// Offline counterpart of the database search.
pub fn evaluate_snapshot(
    criteria: &EligibilityCriteria,
    profiles: &[StudentProfile],
) -> EligibilityOutcome {
    EligibilityOutcome::from_table(profiles_to_table(&rank_profiles(criteria, profiles)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup::sample_profiles;
    use crate::models::{PlacementStatus, SoftSkillScores};

    fn profile(id: i32, batch: &str, problems: i32, skill: i32, mock: i32) -> StudentProfile {
        let mut profile = sample_profiles().unwrap().remove(0);
        profile.student.student_id = id;
        profile.student.course_batch = batch.to_string();
        profile.programming.problems_solved = problems;
        profile.soft_skills = SoftSkillScores {
            communication: skill,
            teamwork: skill,
            presentation: skill,
            leadership: skill,
            critical_thinking: skill,
            interpersonal_skills: skill,
        };
        profile.placement.mock_interview_score = mock;
        profile
    }

    fn ids(profiles: &[StudentProfile]) -> Vec<i32> {
        profiles.iter().map(|p| p.student.student_id).collect()
    }

    #[test]
    fn higher_mock_score_ranks_first() {
        let profiles = vec![
            profile(1, "2023A", 100, 80, 85),
            profile(2, "2023A", 60, 80, 90),
        ];
        let ranked = rank_profiles(&EligibilityCriteria::default(), &profiles);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn equal_mock_scores_fall_back_to_problems_solved() {
        let profiles = vec![
            profile(1, "2023A", 70, 80, 90),
            profile(2, "2023A", 120, 80, 90),
            profile(3, "2023A", 70, 80, 90),
        ];
        let ranked = rank_profiles(&EligibilityCriteria::default(), &profiles);
        assert_eq!(ids(&ranked), vec![2, 1, 3]);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let profiles = vec![
            profile(1, "2023A", 50, 75, 60),
            profile(2, "2023A", 49, 75, 60),
            profile(3, "2023A", 50, 74, 60),
            profile(4, "2023A", 50, 75, 59),
        ];
        let ranked = rank_profiles(&EligibilityCriteria::default(), &profiles);
        assert_eq!(ids(&ranked), vec![1]);
    }

    #[test]
    fn soft_skill_threshold_uses_unrounded_mean() {
        // 449 / 6 = 74.8333..., displayed as 74.83
        let mut student = profile(1, "2023A", 80, 75, 80);
        student.soft_skills.interpersonal_skills = 74;
        let criteria = EligibilityCriteria::new(50, 74.833, 60);
        assert_eq!(ids(&rank_profiles(&criteria, &[student])), vec![1]);
    }

    #[test]
    fn batch_filter_keeps_only_listed_batches() {
        let profiles = vec![
            profile(1, "2023A", 80, 80, 80),
            profile(2, "2023B", 80, 80, 80),
            profile(3, "2024A", 80, 80, 80),
        ];
        let criteria = EligibilityCriteria::default().with_batches(["2023A", "2023B"]);
        let ranked = rank_profiles(&criteria, &profiles);
        assert_eq!(ids(&ranked), vec![1, 2]);
    }

    #[test]
    fn language_and_status_filters() {
        let mut python = profile(1, "2023A", 80, 80, 80);
        python.programming.language = "Python".to_string();
        python.placement.placement_status = PlacementStatus::Ready;
        let mut java = profile(2, "2023A", 80, 80, 80);
        java.programming.language = "Java".to_string();
        java.placement.placement_status = PlacementStatus::Ready;

        let criteria = EligibilityCriteria::default().with_language("Java");
        assert_eq!(ids(&rank_profiles(&criteria, &[python.clone(), java.clone()])), vec![2]);

        let criteria = EligibilityCriteria::default().with_status(PlacementStatus::Placed);
        assert!(rank_profiles(&criteria, &[python, java]).is_empty());
    }

    #[test]
    fn no_matches_is_zero_eligible_not_an_error() {
        let profiles = vec![profile(1, "2023A", 10, 40, 20)];
        let outcome = evaluate_snapshot(&EligibilityCriteria::default(), &profiles);
        assert_eq!(outcome.eligible_count(), 0);
        assert!(outcome.by_batch.is_empty());
        assert_eq!(outcome.summary_line(), "Found 0 eligible students");
        assert_eq!(outcome.table.columns.len(), 16);
    }

    #[test]
    fn outcome_groups_by_batch() {
        let profiles = vec![
            profile(1, "2023B", 80, 80, 80),
            profile(2, "2023A", 80, 80, 81),
            profile(3, "2023B", 80, 80, 82),
        ];
        let outcome = evaluate_snapshot(&EligibilityCriteria::default(), &profiles);
        assert_eq!(outcome.summary_line(), "Found 3 eligible students");
        assert_eq!(
            outcome.by_batch,
            vec![
                BatchCount {
                    course_batch: "2023A".to_string(),
                    eligible_count: 1
                },
                BatchCount {
                    course_batch: "2023B".to_string(),
                    eligible_count: 2
                },
            ]
        );
    }

    #[test]
    fn table_rows_carry_rounded_average() {
        let sample = sample_profiles().unwrap();
        let table = profiles_to_table(&sample[..1]);
        let index = table.column_index("soft_avg").unwrap();
        assert_eq!(table.rows[0][index], Value::Float(73.33));
    }
}
