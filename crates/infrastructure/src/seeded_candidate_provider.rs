use std::collections::HashMap;

use async_trait::async_trait;
use capstan_application::CandidateProvider;
use capstan_core::AppResult;
use serde_json::{Value, json};

/// Deterministic in-memory candidate provider.
///
/// Stands in for a real datastore behind the provider port: datasets are
/// generated once at construction from index arithmetic (no randomness), so
/// every query sees the same snapshot and repeated executions are
/// reproducible. The structure is immutable after seeding, which makes
/// concurrent readers trivially safe.
#[derive(Debug)]
pub struct SeededCandidateProvider {
    datasets: HashMap<String, Vec<Value>>,
}

impl SeededCandidateProvider {
    /// Seeds every entity dataset.
    #[must_use]
    pub fn new() -> Self {
        let mut datasets = HashMap::new();
        datasets.insert("students".to_owned(), student_rows());
        datasets.insert("mentors".to_owned(), mentor_rows());
        datasets.insert("projects".to_owned(), project_rows());
        datasets.insert("companies".to_owned(), company_rows());
        datasets.insert("users".to_owned(), user_rows());
        datasets.insert("courses".to_owned(), course_rows());

        Self { datasets }
    }
}

impl Default for SeededCandidateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateProvider for SeededCandidateProvider {
    async fn candidate_rows(&self, entity: &str) -> AppResult<Vec<Value>> {
        Ok(self.datasets.get(entity).cloned().unwrap_or_default())
    }
}

const PROGRAMS: [&str; 4] = [
    "Computer Science",
    "Business Administration",
    "Engineering",
    "MBA",
];
const SPECIALIZATIONS: [&str; 4] = [
    "Software Development",
    "Data Science",
    "Cybersecurity",
    "AI/ML",
];
const INDUSTRIES: [&str; 5] = [
    "Technology",
    "Finance",
    "Healthcare",
    "Manufacturing",
    "Consulting",
];
const COMPANY_INDUSTRIES: [&str; 5] = [
    "Technology",
    "Finance",
    "Healthcare",
    "Manufacturing",
    "Retail",
];

fn created_at(index: usize) -> String {
    format!(
        "2024-{:02}-{:02}T08:00:00Z",
        1 + (index % 12),
        1 + (index % 28)
    )
}

/// GPA distribution for the 150 seeded students: four of every fifteen rows
/// land strictly above 3.5, giving exactly 40 high performers.
fn student_gpa(index: usize) -> f64 {
    let position = index % 15;
    if position < 4 {
        3.55 + position as f64 * 0.1
    } else {
        2.0 + ((index * 7) % 140) as f64 / 100.0
    }
}

fn student_rows() -> Vec<Value> {
    (0..150)
        .map(|index| {
            let first_name = format!("Student{}", index + 1);
            let last_name = format!("Lastname{}", index + 1);
            let email = format!("student{}@westcliff.edu", index + 1);
            let status = match index % 10 {
                7 => "graduated",
                8 => "inactive",
                _ => "active",
            };
            let skills = match index % 3 {
                0 => r#"["JavaScript","Python","React"]"#,
                1 => r#"["Python","SQL","Pandas"]"#,
                _ => r#"["Java","Spring","PostgreSQL"]"#,
            };
            let enrollment_date =
                ["2022-09-01", "2023-01-15", "2023-09-01", "2024-01-15"][index % 4];
            let expected_graduation_date =
                ["2025-06-15", "2025-12-15", "2026-06-15", "2026-12-15"][index % 4];

            json!({
                "id": 1000 + index,
                "student_id": format!("WU{}", 20_240_000 + index),
                "first_name": first_name,
                "last_name": last_name,
                "email": email,
                "program": PROGRAMS[index % 4],
                "specialization": SPECIALIZATIONS[index % 4],
                "gpa": student_gpa(index),
                "status": status,
                "enrollment_date": enrollment_date,
                "expected_graduation_date": expected_graduation_date,
                "skills": skills,
                "ai_ranking_score": 50.0 + (index % 50) as f64,
                "created_at": created_at(index),
                "user": {
                    "id": 1000 + index,
                    "email": format!("student{}@westcliff.edu", index + 1),
                    "first_name": format!("Student{}", index + 1),
                    "last_name": format!("Lastname{}", index + 1),
                    "role": "student",
                },
            })
        })
        .collect()
}

fn mentor_rows() -> Vec<Value> {
    const COMPANIES: [&str; 4] = ["TechCorp", "InnovateInc", "StartupXYZ", "DataWorks"];
    const JOB_TITLES: [&str; 4] = [
        "Software Engineer",
        "Data Scientist",
        "Product Manager",
        "VP Engineering",
    ];
    const DEPARTMENTS: [&str; 4] = ["Engineering", "Data", "Product", "Leadership"];

    (0..40)
        .map(|index| {
            json!({
                "id": 2000 + index,
                "first_name": format!("Mentor{}", index + 1),
                "last_name": format!("Expert{}", index + 1),
                "email": format!("mentor{}@{}.com", index + 1, COMPANIES[index % 4].to_lowercase()),
                "company_name": COMPANIES[index % 4],
                "job_title": JOB_TITLES[index % 4],
                "department": DEPARTMENTS[index % 4],
                "industry": INDUSTRIES[index % 5],
                "years_of_experience": 2 + (index % 18),
                "expertise_areas": r#"["Software Development","Mentoring"]"#,
                "status": if index % 8 == 7 { "inactive" } else { "active" },
                "max_students": 2 + (index % 4),
                "current_students": index % 3,
                "created_at": created_at(index),
                "user": {
                    "id": 2000 + index,
                    "email": format!("mentor{}@{}.com", index + 1, COMPANIES[index % 4].to_lowercase()),
                    "first_name": format!("Mentor{}", index + 1),
                    "last_name": format!("Expert{}", index + 1),
                    "role": "mentor",
                },
            })
        })
        .collect()
}

fn project_rows() -> Vec<Value> {
    const PROJECT_TYPES: [&str; 5] = [
        "web_development",
        "mobile_app",
        "data_analysis",
        "ai_ml",
        "research",
    ];
    const DIFFICULTIES: [&str; 3] = ["beginner", "intermediate", "advanced"];
    const TECHNOLOGIES: [&str; 3] = [
        "React, Node.js, PostgreSQL",
        "Python, Pandas, scikit-learn",
        "Kotlin, Swift, Firebase",
    ];

    (0..60)
        .map(|index| {
            let status = match index % 6 {
                0 | 1 | 2 => "open",
                3 | 4 => "in_progress",
                _ => "completed",
            };

            json!({
                "id": 3000 + index,
                "title": format!("Capstone Project {}", index + 1),
                "description": format!(
                    "A {} capstone project covering {}",
                    DIFFICULTIES[index % 3],
                    PROJECT_TYPES[index % 5].replace('_', " ")
                ),
                "project_type": PROJECT_TYPES[index % 5],
                "difficulty_level": DIFFICULTIES[index % 3],
                "status": status,
                "start_date": format!("2025-{:02}-01", 1 + (index % 12)),
                "end_date": format!("2026-{:02}-01", 1 + (index % 12)),
                "duration_weeks": 4 + (index % 12),
                "max_students": 1 + (index % 5),
                "current_students": index % 3,
                "required_skills": TECHNOLOGIES[index % 3],
                "technologies": TECHNOLOGIES[index % 3],
                "ai_matching_score": 60.0 + (index % 40) as f64,
                "created_at": created_at(index),
                "company": {
                    "id": 4000 + (index % 25),
                    "name": format!("Company {}", (index % 25) + 1),
                    "industry": COMPANY_INDUSTRIES[index % 5],
                },
                "mentor": {
                    "id": 2000 + (index % 40),
                    "first_name": format!("Mentor{}", (index % 40) + 1),
                    "last_name": format!("Expert{}", (index % 40) + 1),
                },
            })
        })
        .collect()
}

fn company_rows() -> Vec<Value> {
    const SIZES: [&str; 5] = ["startup", "small", "medium", "large", "enterprise"];
    const PARTNERSHIP_LEVELS: [&str; 4] = ["standard", "silver", "gold", "platinum"];

    (0..25)
        .map(|index| {
            json!({
                "id": 4000 + index,
                "name": format!("Company {}", index + 1),
                "description": format!(
                    "{} company partnering on capstone projects",
                    COMPANY_INDUSTRIES[index % 5]
                ),
                "industry": COMPANY_INDUSTRIES[index % 5],
                "size": SIZES[index % 5],
                "status": if index % 9 == 8 { "inactive" } else { "active" },
                "founded_year": 1990 + (index % 35),
                "partnership_level": PARTNERSHIP_LEVELS[index % 4],
                "created_at": created_at(index),
            })
        })
        .collect()
}

fn user_rows() -> Vec<Value> {
    (0..50)
        .map(|index| {
            let role = match index % 10 {
                0 => "admin",
                1 | 2 => "mentor",
                3 => "company_rep",
                _ => "student",
            };
            let last_login = if index % 6 == 5 {
                Value::Null
            } else {
                Value::String(created_at(index + 30))
            };

            json!({
                "id": 1 + index,
                "email": format!("user{}@westcliff.edu", index + 1),
                "first_name": format!("User{}", index + 1),
                "last_name": format!("Person{}", index + 1),
                "role": role,
                "is_active": index % 7 != 6,
                "email_verified": index % 5 != 4,
                "created_at": created_at(index),
                "last_login": last_login,
            })
        })
        .collect()
}

fn course_rows() -> Vec<Value> {
    const DEPARTMENTS: [&str; 3] = ["Computer Science", "Business", "Engineering"];

    (0..30)
        .map(|index| {
            json!({
                "id": 5000 + index,
                "course_code": format!("CAP{}", 400 + index),
                "course_name": format!("Capstone Seminar {}", index + 1),
                "description": format!(
                    "{} capstone preparation course",
                    DEPARTMENTS[index % 3]
                ),
                "credits": 2 + (index % 4),
                "department": DEPARTMENTS[index % 3],
                "level": if index % 2 == 0 { "undergraduate" } else { "graduate" },
                "is_capstone_eligible": index % 3 != 2,
                "status": if index % 10 == 9 { "retired" } else { "active" },
                "skills_covered": r#"["Research","Writing","Presentation"]"#,
                "created_at": created_at(index),
            })
        })
        .collect()
}
