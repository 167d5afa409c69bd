//! Schema creation and data loading.
//!
//! These are the only code paths that write to the store. They share a small
//! pool instead of the per-query connections used by reports.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::models::{
    PlacementRecord, PlacementStatus, ProfileRow, ProgrammingMetrics, SoftSkillScores,
    StudentProfile, StudentRecord,
};

pub async fn connect_pool(config: &ConnectionConfig) -> anyhow::Result<PgPool> {
    let options = config.connect_options()?;
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to {}", config.display_string()))
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts or refreshes one student across all four tables in a single transaction.
pub async fn upsert_profile(pool: &PgPool, profile: &StudentProfile) -> anyhow::Result<()> {
    let student = &profile.student;
    let programming = &profile.programming;
    let skills = &profile.soft_skills;
    let placement = &profile.placement;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO students
        (student_id, name, age, gender, email, phone, enrollment_year, course_batch, city, graduation_year)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (student_id) DO UPDATE
        SET name = EXCLUDED.name, age = EXCLUDED.age, gender = EXCLUDED.gender,
            email = EXCLUDED.email, phone = EXCLUDED.phone,
            enrollment_year = EXCLUDED.enrollment_year, course_batch = EXCLUDED.course_batch,
            city = EXCLUDED.city, graduation_year = EXCLUDED.graduation_year
        "#,
    )
    .bind(student.student_id)
    .bind(&student.name)
    .bind(student.age)
    .bind(&student.gender)
    .bind(&student.email)
    .bind(&student.phone)
    .bind(student.enrollment_year)
    .bind(&student.course_batch)
    .bind(&student.city)
    .bind(student.graduation_year)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO programming
        (student_id, language, problems_solved, assessments_completed, mini_projects,
         certifications_earned, latest_project_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (student_id) DO UPDATE
        SET language = EXCLUDED.language, problems_solved = EXCLUDED.problems_solved,
            assessments_completed = EXCLUDED.assessments_completed,
            mini_projects = EXCLUDED.mini_projects,
            certifications_earned = EXCLUDED.certifications_earned,
            latest_project_score = EXCLUDED.latest_project_score
        "#,
    )
    .bind(student.student_id)
    .bind(&programming.language)
    .bind(programming.problems_solved)
    .bind(programming.assessments_completed)
    .bind(programming.mini_projects)
    .bind(programming.certifications_earned)
    .bind(programming.latest_project_score)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO soft_skills
        (student_id, communication, teamwork, presentation, leadership,
         critical_thinking, interpersonal_skills)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (student_id) DO UPDATE
        SET communication = EXCLUDED.communication, teamwork = EXCLUDED.teamwork,
            presentation = EXCLUDED.presentation, leadership = EXCLUDED.leadership,
            critical_thinking = EXCLUDED.critical_thinking,
            interpersonal_skills = EXCLUDED.interpersonal_skills
        "#,
    )
    .bind(student.student_id)
    .bind(skills.communication)
    .bind(skills.teamwork)
    .bind(skills.presentation)
    .bind(skills.leadership)
    .bind(skills.critical_thinking)
    .bind(skills.interpersonal_skills)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO placements
        (student_id, mock_interview_score, internships_completed, placement_status,
         company_name, placement_package, interview_rounds_cleared, placement_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (student_id) DO UPDATE
        SET mock_interview_score = EXCLUDED.mock_interview_score,
            internships_completed = EXCLUDED.internships_completed,
            placement_status = EXCLUDED.placement_status,
            company_name = EXCLUDED.company_name,
            placement_package = EXCLUDED.placement_package,
            interview_rounds_cleared = EXCLUDED.interview_rounds_cleared,
            placement_date = EXCLUDED.placement_date
        "#,
    )
    .bind(student.student_id)
    .bind(placement.mock_interview_score)
    .bind(placement.internships_completed)
    .bind(placement.placement_status.as_str())
    .bind(&placement.company_name)
    .bind(placement.placement_package)
    .bind(placement.interview_rounds_cleared)
    .bind(placement.placement_date)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let profiles = sample_profiles()?;
    for profile in &profiles {
        upsert_profile(pool, profile).await?;
    }
    info!("Seeded {} students", profiles.len());
    Ok(profiles.len())
}

/// Upserts every profile in a CSV file laid out as [`ProfileRow`].
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("cannot open {}", csv_path.display()))?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<ProfileRow>().enumerate() {
        let row = result.with_context(|| format!("invalid record {}", line + 1))?;
        upsert_profile(pool, &StudentProfile::from(row)).await?;
        written += 1;
    }

    info!("Imported {written} students from {}", csv_path.display());
    Ok(written)
}

/// A small cohort spread across two batches, three languages and every status.
pub fn sample_profiles() -> anyhow::Result<Vec<StudentProfile>> {
    let placed_on = NaiveDate::from_ymd_opt(2024, 6, 15).context("invalid date")?;
    let rows = [
        (1, "Asha Rao", "2023A", "Python", 142, [80, 70, 90, 60, 75, 65], 88, 2, PlacementStatus::Placed, Some(("Infosys", 6.5))),
        (2, "Rahul Menon", "2023A", "Java", 95, [82, 85, 78, 80, 84, 79], 91, 1, PlacementStatus::Ready, None),
        (3, "Meera Iyer", "2023B", "SQL", 61, [76, 80, 74, 72, 79, 81], 67, 0, PlacementStatus::NotReady, None),
        (4, "Vikram Das", "2023B", "Python", 210, [90, 88, 92, 85, 91, 87], 95, 3, PlacementStatus::Placed, Some(("TCS", 7.2))),
        (5, "Neha Kapoor", "2024A", "Java", 48, [70, 72, 68, 65, 74, 71], 58, 0, PlacementStatus::NotReady, None),
        (6, "Arjun Nair", "2024A", "Python", 130, [78, 76, 80, 77, 79, 75], 91, 1, PlacementStatus::Ready, None),
        (7, "Kavya Pillai", "2023A", "SQL", 88, [85, 83, 86, 80, 82, 84], 74, 2, PlacementStatus::Placed, Some(("Infosys", 5.8))),
    ];

    Ok(rows
        .into_iter()
        .map(
            |(id, name, batch, language, problems, skills, mock, internships, status, offer)| {
                let email = format!("{}@students.example.com", name.to_lowercase().replace(' ', "."));
                StudentProfile {
                    student: StudentRecord {
                        student_id: id,
                        name: name.to_string(),
                        age: 21 + id % 4,
                        gender: if id % 2 == 0 { "Male" } else { "Female" }.to_string(),
                        email,
                        phone: format!("555-01{id:02}"),
                        enrollment_year: 2022,
                        course_batch: batch.to_string(),
                        city: ["Pune", "Chennai", "Kochi", "Delhi"][(id % 4) as usize].to_string(),
                        graduation_year: 2024,
                    },
                    programming: ProgrammingMetrics {
                        language: language.to_string(),
                        problems_solved: problems,
                        assessments_completed: problems / 15,
                        mini_projects: 1 + id % 3,
                        certifications_earned: problems / 40,
                        latest_project_score: 70 + (id * 7) % 25,
                    },
                    soft_skills: SoftSkillScores {
                        communication: skills[0],
                        teamwork: skills[1],
                        presentation: skills[2],
                        leadership: skills[3],
                        critical_thinking: skills[4],
                        interpersonal_skills: skills[5],
                    },
                    placement: PlacementRecord {
                        mock_interview_score: mock,
                        internships_completed: internships,
                        placement_status: status,
                        company_name: offer.map(|(company, _)| company.to_string()),
                        placement_package: offer.map(|(_, package)| package),
                        interview_rounds_cleared: if offer.is_some() { 4 } else { 1 },
                        placement_date: offer.map(|_| placed_on),
                    },
                }
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_profiles_are_consistent() {
        let profiles = sample_profiles().unwrap();
        assert_eq!(profiles.len(), 7);

        for profile in &profiles {
            let placed = profile.placement.placement_status == PlacementStatus::Placed;
            assert_eq!(placed, profile.placement.company_name.is_some());
            assert_eq!(placed, profile.placement.placement_date.is_some());
            assert!(profile
                .soft_skills
                .as_array()
                .iter()
                .all(|s| (0..=100).contains(s)));
        }
    }

    #[test]
    fn sample_profiles_have_unique_ids_and_emails() {
        let profiles = sample_profiles().unwrap();
        let mut ids: Vec<i32> = profiles.iter().map(|p| p.student.student_id).collect();
        let mut emails: Vec<&str> = profiles.iter().map(|p| p.student.email.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        emails.sort();
        emails.dedup();
        assert_eq!(ids.len(), profiles.len());
        assert_eq!(emails.len(), profiles.len());
        assert_eq!(profiles[0].student.email, "asha.rao@students.example.com");
    }
}
