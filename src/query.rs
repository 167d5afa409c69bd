//! Eligibility query builder.
//!
//! Criteria are turned into a list of [`Predicate`]s, each carrying its own bound
//! values. SQL text is only assembled in [`EligibilityQuery::build`], where every
//! value becomes a positional placeholder (`$1`, `$2`, ...). No caller-supplied
//! value is ever written into the statement text.

use crate::models::{EligibilityCriteria, PlacementStatus, StudentProfile};

/// Sum of the six soft-skill columns of the `ss` alias.
const SOFT_SKILL_SUM: &str = "(ss.communication + ss.teamwork + ss.presentation \
     + ss.leadership + ss.critical_thinking + ss.interpersonal_skills)";

const ELIGIBLE_SELECT: &str = "SELECT s.student_id, s.name, s.age, s.gender, s.email, s.phone, \
     s.course_batch, p.language, \
     p.problems_solved, p.assessments_completed, p.mini_projects, p.latest_project_score";

const ELIGIBLE_FROM: &str = "FROM students s \
     JOIN programming p ON s.student_id = p.student_id \
     JOIN soft_skills ss ON s.student_id = ss.student_id \
     JOIN placements pl ON s.student_id = pl.student_id";

const ELIGIBLE_ORDER: &str =
    "ORDER BY pl.mock_interview_score DESC, p.problems_solved DESC, s.student_id";

/// A value bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Statement text plus its bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl BuiltQuery {
    /// A statement with no placeholders.
    pub fn fixed(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// One condition of the eligibility filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    MinProblemsSolved(i32),
    MinSoftSkillAverage(f64),
    MinMockInterviewScore(i32),
    BatchIn(Vec<String>),
    LanguageEquals(String),
    StatusEquals(PlacementStatus),
}

impl Predicate {
    /// Values bound by this predicate, in the order its placeholders appear.
    pub fn params(&self) -> Vec<SqlParam> {
        match self {
            Self::MinProblemsSolved(n) | Self::MinMockInterviewScore(n) => {
                vec![SqlParam::Int(i64::from(*n))]
            }
            Self::MinSoftSkillAverage(avg) => vec![SqlParam::Float(*avg)],
            Self::BatchIn(batches) => batches.iter().cloned().map(SqlParam::Text).collect(),
            Self::LanguageEquals(language) => vec![SqlParam::Text(language.clone())],
            Self::StatusEquals(status) => vec![SqlParam::Text(status.as_str().to_string())],
        }
    }

    /// Renders the condition with placeholders numbered from `first`.
    fn render(&self, first: usize) -> String {
        match self {
            Self::MinProblemsSolved(_) => format!("p.problems_solved >= ${first}"),
            Self::MinSoftSkillAverage(_) => format!("{SOFT_SKILL_SUM} / 6.0 >= ${first}"),
            Self::MinMockInterviewScore(_) => format!("pl.mock_interview_score >= ${first}"),
            Self::BatchIn(batches) if batches.is_empty() => "TRUE".to_string(),
            Self::BatchIn(batches) => {
                let placeholders: Vec<String> =
                    (first..first + batches.len()).map(|i| format!("${i}")).collect();
                format!("s.course_batch IN ({})", placeholders.join(", "))
            }
            Self::LanguageEquals(_) => format!("p.language = ${first}"),
            Self::StatusEquals(_) => format!("pl.placement_status = ${first}"),
        }
    }

    /// Evaluates the condition against an already-joined profile.
    pub fn matches(&self, profile: &StudentProfile) -> bool {
        match self {
            Self::MinProblemsSolved(n) => profile.programming.problems_solved >= *n,
            Self::MinSoftSkillAverage(avg) => profile.soft_skills.raw_average() >= *avg,
            Self::MinMockInterviewScore(n) => profile.placement.mock_interview_score >= *n,
            Self::BatchIn(batches) => {
                batches.is_empty() || batches.contains(&profile.student.course_batch)
            }
            Self::LanguageEquals(language) => profile.programming.language == *language,
            Self::StatusEquals(status) => profile.placement.placement_status == *status,
        }
    }
}

/// The predicate list for one eligibility search.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityQuery {
    predicates: Vec<Predicate>,
}

impl EligibilityQuery {
    /// The three thresholds are always present. Batch, language and status
    /// predicates are added only when set; an empty batch list adds nothing.
    pub fn from_criteria(criteria: &EligibilityCriteria) -> Self {
        let mut predicates = vec![
            Predicate::MinProblemsSolved(criteria.min_problems),
            Predicate::MinSoftSkillAverage(criteria.min_soft_avg),
            Predicate::MinMockInterviewScore(criteria.min_mock),
        ];

        if !criteria.batches.is_empty() {
            predicates.push(Predicate::BatchIn(criteria.batches.clone()));
        }
        if let Some(language) = &criteria.language {
            predicates.push(Predicate::LanguageEquals(language.clone()));
        }
        if let Some(status) = criteria.status {
            predicates.push(Predicate::StatusEquals(status));
        }

        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, profile: &StudentProfile) -> bool {
        self.predicates.iter().all(|p| p.matches(profile))
    }

    pub fn build(&self) -> BuiltQuery {
        let mut params = Vec::new();
        let mut conditions = Vec::with_capacity(self.predicates.len());

        for predicate in &self.predicates {
            conditions.push(predicate.render(params.len() + 1));
            params.extend(predicate.params());
        }

        let sql = format!(
            "{ELIGIBLE_SELECT}, ROUND({SOFT_SKILL_SUM} / 6.0, 2)::float8 AS soft_avg, \
             pl.mock_interview_score, pl.internships_completed, pl.placement_status \
             {ELIGIBLE_FROM} WHERE {} {ELIGIBLE_ORDER}",
            conditions.join(" AND ")
        );

        BuiltQuery { sql, params }
    }
}

/// Builds the parameterized eligibility statement for `criteria`.
pub fn eligibility_query(criteria: &EligibilityCriteria) -> BuiltQuery {
    EligibilityQuery::from_criteria(criteria).build()
}

/// Distinct, non-null batch identifiers in ascending order.
pub fn batches_query() -> BuiltQuery {
    BuiltQuery::fixed(
        "SELECT DISTINCT course_batch FROM students \
         WHERE course_batch IS NOT NULL ORDER BY course_batch",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_batch_params(query: &BuiltQuery, batches: &[&str]) -> usize {
        query
            .params
            .iter()
            .filter(|p| matches!(p, SqlParam::Text(t) if batches.contains(&t.as_str())))
            .count()
    }

    #[test]
    fn required_predicates_always_present() {
        let all_filters = EligibilityCriteria::default()
            .with_batches(["2023A"])
            .with_language("Python")
            .with_status(PlacementStatus::Ready);

        for criteria in [EligibilityCriteria::default(), all_filters] {
            let query = eligibility_query(&criteria);
            assert!(query.sql.contains("p.problems_solved >= $1"));
            assert!(query.sql.contains("/ 6.0 >= $2"));
            assert!(query.sql.contains("pl.mock_interview_score >= $3"));
            assert_eq!(query.params[0], SqlParam::Int(50));
            assert_eq!(query.params[1], SqlParam::Float(75.0));
            assert_eq!(query.params[2], SqlParam::Int(60));
        }
    }

    #[test]
    fn empty_batch_set_omits_batch_clause() {
        let query = eligibility_query(&EligibilityCriteria::default());
        assert!(!query.sql.contains("course_batch IN"));
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn each_batch_is_bound_separately() {
        let batches = ["2023A", "2023B", "2024A"];
        let query = eligibility_query(&EligibilityCriteria::default().with_batches(batches));

        assert!(query.sql.contains("s.course_batch IN ($4, $5, $6)"));
        assert_eq!(count_batch_params(&query, &batches), batches.len());
        for batch in batches {
            assert!(!query.sql.contains(batch));
        }
    }

    #[test]
    fn optional_filters_number_placeholders_in_order() {
        let criteria = EligibilityCriteria::new(10, 60.0, 50)
            .with_batches(["2023A", "2023B"])
            .with_language("SQL")
            .with_status(PlacementStatus::NotReady);
        let query = eligibility_query(&criteria);

        assert!(query.sql.contains("s.course_batch IN ($4, $5)"));
        assert!(query.sql.contains("p.language = $6"));
        assert!(query.sql.contains("pl.placement_status = $7"));
        assert_eq!(
            query.params[3..],
            [
                SqlParam::Text("2023A".to_string()),
                SqlParam::Text("2023B".to_string()),
                SqlParam::Text("SQL".to_string()),
                SqlParam::Text("Not Ready".to_string()),
            ]
        );
    }

    #[test]
    fn language_and_status_without_batches() {
        let criteria = EligibilityCriteria::default()
            .with_language("Java")
            .with_status(PlacementStatus::Placed);
        let query = eligibility_query(&criteria);

        assert!(query.sql.contains("p.language = $4"));
        assert!(query.sql.contains("pl.placement_status = $5"));
        assert_eq!(query.params.len(), 5);
    }

    #[test]
    fn hostile_values_never_reach_statement_text() {
        let hostile = "2023A') OR 1=1; DROP TABLE students; --";
        let criteria = EligibilityCriteria::default()
            .with_batches([hostile])
            .with_language(hostile);
        let query = eligibility_query(&criteria);

        assert!(!query.sql.contains("DROP TABLE"));
        assert!(!query.sql.contains('\''));
        assert_eq!(count_batch_params(&query, &[hostile]), 2);
    }

    #[test]
    fn orders_by_mock_score_then_problems() {
        let query = eligibility_query(&EligibilityCriteria::default());
        assert!(query
            .sql
            .ends_with("ORDER BY pl.mock_interview_score DESC, p.problems_solved DESC, s.student_id"));
    }

    #[test]
    fn selects_rounded_soft_skill_average() {
        let query = eligibility_query(&EligibilityCriteria::default());
        assert!(query.sql.contains("ROUND("));
        assert!(query.sql.contains("AS soft_avg"));
    }

    #[test]
    fn empty_batch_predicate_renders_as_tautology() {
        assert_eq!(Predicate::BatchIn(Vec::new()).render(4), "TRUE");
        assert!(Predicate::BatchIn(Vec::new()).params().is_empty());
    }

    #[test]
    fn batches_query_has_no_params() {
        let query = batches_query();
        assert!(query.params.is_empty());
        assert!(query.sql.contains("DISTINCT course_batch"));
    }
}
