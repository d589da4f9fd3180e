//! Seeded entity schemas: fields, operators, picker groups, and presets.
//!
//! Built once at startup; the registry never changes at request time.

use capstan_application::EntitySchema;
use capstan_core::AppResult;
use capstan_domain::{
    FieldDefinition, FieldOption, FieldType, FilterCondition, FilterGroup, FilterPreset,
    SearchOperator, SortCondition, SortOrder,
};
use chrono::{Days, Utc};
use serde_json::json;

/// Returns the searchable schemas for every seeded entity.
pub fn seeded_entity_schemas() -> AppResult<Vec<EntitySchema>> {
    Ok(vec![
        students_schema()?,
        mentors_schema()?,
        projects_schema()?,
        companies_schema()?,
        users_schema()?,
        courses_schema()?,
    ])
}

fn string_operators() -> Vec<SearchOperator> {
    vec![
        SearchOperator::Equals,
        SearchOperator::NotEquals,
        SearchOperator::Contains,
        SearchOperator::NotContains,
        SearchOperator::StartsWith,
        SearchOperator::EndsWith,
        SearchOperator::In,
        SearchOperator::IsNull,
        SearchOperator::IsNotNull,
    ]
}

fn numeric_operators() -> Vec<SearchOperator> {
    vec![
        SearchOperator::Equals,
        SearchOperator::NotEquals,
        SearchOperator::GreaterThan,
        SearchOperator::GreaterOrEqual,
        SearchOperator::LessThan,
        SearchOperator::LessOrEqual,
        SearchOperator::Between,
        SearchOperator::In,
        SearchOperator::IsNull,
        SearchOperator::IsNotNull,
    ]
}

fn date_operators() -> Vec<SearchOperator> {
    vec![
        SearchOperator::Equals,
        SearchOperator::GreaterThan,
        SearchOperator::GreaterOrEqual,
        SearchOperator::LessThan,
        SearchOperator::LessOrEqual,
        SearchOperator::Between,
        SearchOperator::IsNull,
        SearchOperator::IsNotNull,
    ]
}

fn boolean_operators() -> Vec<SearchOperator> {
    vec![
        SearchOperator::Equals,
        SearchOperator::NotEquals,
        SearchOperator::IsNull,
        SearchOperator::IsNotNull,
    ]
}

fn enum_operators() -> Vec<SearchOperator> {
    vec![
        SearchOperator::Equals,
        SearchOperator::NotEquals,
        SearchOperator::In,
        SearchOperator::NotIn,
        SearchOperator::IsNull,
        SearchOperator::IsNotNull,
    ]
}

fn string_field(field: &str, display_name: &str) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::String,
        string_operators(),
        None,
        None,
        None,
        SearchOperator::Contains,
    )
}

fn integer_field(field: &str, display_name: &str, min: f64, max: f64) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::Integer,
        numeric_operators(),
        Some(min),
        Some(max),
        None,
        SearchOperator::GreaterOrEqual,
    )
}

fn float_field(field: &str, display_name: &str, min: f64, max: f64) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::Float,
        numeric_operators(),
        Some(min),
        Some(max),
        None,
        SearchOperator::GreaterOrEqual,
    )
}

fn date_field(field: &str, display_name: &str) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::Date,
        date_operators(),
        None,
        None,
        None,
        SearchOperator::GreaterOrEqual,
    )
}

fn datetime_field(field: &str, display_name: &str) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::DateTime,
        date_operators(),
        None,
        None,
        None,
        SearchOperator::GreaterOrEqual,
    )
}

fn boolean_field(field: &str, display_name: &str) -> AppResult<FieldDefinition> {
    FieldDefinition::new(
        field,
        display_name,
        FieldType::Boolean,
        boolean_operators(),
        None,
        None,
        None,
        SearchOperator::Equals,
    )
}

fn enum_field(
    field: &str,
    display_name: &str,
    options: &[(&str, u64)],
) -> AppResult<FieldDefinition> {
    let options = options
        .iter()
        .map(|(value, count)| FieldOption {
            value: (*value).to_owned(),
            label: title_label(value),
            count: Some(*count),
        })
        .collect();

    FieldDefinition::new(
        field,
        display_name,
        FieldType::Enum,
        enum_operators(),
        None,
        None,
        Some(options),
        SearchOperator::Equals,
    )
}

fn title_label(value: &str) -> String {
    value
        .split('_')
        .map(|word| {
            let mut characters = word.chars();
            match characters.next() {
                Some(first) => first.to_uppercase().collect::<String>() + characters.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn group(
    name: &str,
    display_name: &str,
    filters: Vec<FieldDefinition>,
) -> AppResult<FilterGroup> {
    FilterGroup::new(name, display_name, filters)
}

fn condition(
    field: &str,
    operator: SearchOperator,
    value: serde_json::Value,
    data_type: FieldType,
) -> FilterCondition {
    FilterCondition {
        field: field.to_owned(),
        operator,
        value,
        data_type,
    }
}

fn sort_desc(field: &str) -> SortCondition {
    SortCondition {
        field: field.to_owned(),
        order: SortOrder::Desc,
    }
}

/// Date `days` days from now, formatted for date-typed filter values.
fn upcoming_date(days: u64) -> String {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(days))
        .unwrap_or_else(|| Utc::now().date_naive())
        .format("%Y-%m-%d")
        .to_string()
}

fn students_schema() -> AppResult<EntitySchema> {
    let student_id = string_field("student_id", "Student Id")?;
    let first_name = string_field("first_name", "First Name")?;
    let last_name = string_field("last_name", "Last Name")?;
    let email = string_field("email", "Email")?;
    let program = enum_field(
        "program",
        "Program",
        &[
            ("Computer Science", 38),
            ("Business Administration", 38),
            ("Engineering", 37),
            ("MBA", 37),
        ],
    )?;
    let specialization = string_field("specialization", "Specialization")?;
    let gpa = float_field("gpa", "GPA", 0.0, 4.0)?;
    let status = enum_field(
        "status",
        "Status",
        &[
            ("active", 120),
            ("graduated", 15),
            ("inactive", 15),
            ("withdrawn", 0),
        ],
    )?;
    let enrollment_date = date_field("enrollment_date", "Enrollment Date")?;
    let expected_graduation_date =
        date_field("expected_graduation_date", "Expected Graduation Date")?;
    let skills = string_field("skills", "Skills")?;
    let ai_ranking_score = float_field("ai_ranking_score", "AI Ranking Score", 0.0, 100.0)?;
    let created_at = datetime_field("created_at", "Created At")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![
                student_id.clone(),
                first_name.clone(),
                last_name.clone(),
                email.clone(),
            ],
        )?,
        group(
            "categories",
            "Categories & Status",
            vec![program.clone(), specialization.clone(), status.clone()],
        )?,
        group(
            "numeric",
            "Numeric & Ranges",
            vec![gpa.clone(), ai_ranking_score.clone()],
        )?,
        group(
            "dates",
            "Dates & Time",
            vec![
                enrollment_date.clone(),
                expected_graduation_date.clone(),
                created_at.clone(),
            ],
        )?,
    ];

    let presets = vec![
        FilterPreset {
            name: "active_students".to_owned(),
            display_name: "Active Students".to_owned(),
            description: "Students currently enrolled".to_owned(),
            entity: "students".to_owned(),
            filters: vec![condition(
                "status",
                SearchOperator::Equals,
                json!("active"),
                FieldType::String,
            )],
            sort: vec![sort_desc("gpa")],
        },
        FilterPreset {
            name: "high_performers".to_owned(),
            display_name: "High Performers".to_owned(),
            description: "Active students with GPA >= 3.5".to_owned(),
            entity: "students".to_owned(),
            filters: vec![
                condition(
                    "gpa",
                    SearchOperator::GreaterOrEqual,
                    json!(3.5),
                    FieldType::Float,
                ),
                condition(
                    "status",
                    SearchOperator::Equals,
                    json!("active"),
                    FieldType::String,
                ),
            ],
            sort: vec![sort_desc("gpa")],
        },
        FilterPreset {
            name: "graduating_soon".to_owned(),
            display_name: "Graduating Soon".to_owned(),
            description: "Students graduating within 6 months".to_owned(),
            entity: "students".to_owned(),
            filters: vec![condition(
                "expected_graduation_date",
                SearchOperator::LessOrEqual,
                json!(upcoming_date(182)),
                FieldType::Date,
            )],
            sort: Vec::new(),
        },
    ];

    EntitySchema::new(
        "students",
        "Students",
        vec![
            student_id,
            first_name,
            last_name,
            email,
            program,
            specialization,
            gpa,
            status,
            enrollment_date,
            expected_graduation_date,
            skills,
            ai_ranking_score,
            created_at,
        ],
        vec![
            "first_name".to_owned(),
            "last_name".to_owned(),
            "email".to_owned(),
            "specialization".to_owned(),
        ],
        filter_groups,
        presets,
    )
}

fn mentors_schema() -> AppResult<EntitySchema> {
    let first_name = string_field("first_name", "First Name")?;
    let last_name = string_field("last_name", "Last Name")?;
    let email = string_field("email", "Email")?;
    let company_name = string_field("company_name", "Company Name")?;
    let job_title = string_field("job_title", "Job Title")?;
    let department = string_field("department", "Department")?;
    let industry = enum_field(
        "industry",
        "Industry",
        &[
            ("Technology", 8),
            ("Finance", 8),
            ("Healthcare", 8),
            ("Manufacturing", 8),
            ("Consulting", 8),
        ],
    )?;
    let years_of_experience = integer_field("years_of_experience", "Years Of Experience", 0.0, 50.0)?;
    let expertise_areas = string_field("expertise_areas", "Expertise Areas")?;
    let status = enum_field("status", "Status", &[("active", 35), ("inactive", 5)])?;
    let max_students = integer_field("max_students", "Max Students", 1.0, 20.0)?;
    let current_students = integer_field("current_students", "Current Students", 0.0, 20.0)?;
    let created_at = datetime_field("created_at", "Created At")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![
                first_name.clone(),
                last_name.clone(),
                email.clone(),
                company_name.clone(),
                job_title.clone(),
            ],
        )?,
        group(
            "categories",
            "Categories & Status",
            vec![department.clone(), industry.clone(), status.clone()],
        )?,
        group(
            "numeric",
            "Numeric & Ranges",
            vec![
                years_of_experience.clone(),
                max_students.clone(),
                current_students.clone(),
            ],
        )?,
        group("dates", "Dates & Time", vec![created_at.clone()])?,
    ];

    let presets = vec![
        FilterPreset {
            name: "available_mentors".to_owned(),
            display_name: "Available Mentors".to_owned(),
            description: "Mentors with capacity for more students".to_owned(),
            entity: "mentors".to_owned(),
            filters: vec![condition(
                "status",
                SearchOperator::Equals,
                json!("active"),
                FieldType::String,
            )],
            sort: Vec::new(),
        },
        FilterPreset {
            name: "senior_mentors".to_owned(),
            display_name: "Senior Mentors".to_owned(),
            description: "Mentors with 5+ years experience".to_owned(),
            entity: "mentors".to_owned(),
            filters: vec![condition(
                "years_of_experience",
                SearchOperator::GreaterOrEqual,
                json!(5),
                FieldType::Integer,
            )],
            sort: vec![sort_desc("years_of_experience")],
        },
    ];

    EntitySchema::new(
        "mentors",
        "Mentors",
        vec![
            first_name,
            last_name,
            email,
            company_name,
            job_title,
            department,
            industry,
            years_of_experience,
            expertise_areas,
            status,
            max_students,
            current_students,
            created_at,
        ],
        vec![
            "first_name".to_owned(),
            "last_name".to_owned(),
            "job_title".to_owned(),
            "company_name".to_owned(),
        ],
        filter_groups,
        presets,
    )
}

fn projects_schema() -> AppResult<EntitySchema> {
    let title = string_field("title", "Title")?;
    let description = string_field("description", "Description")?;
    let project_type = enum_field(
        "project_type",
        "Project Type",
        &[
            ("web_development", 12),
            ("mobile_app", 12),
            ("data_analysis", 12),
            ("ai_ml", 12),
            ("research", 12),
        ],
    )?;
    let difficulty_level = enum_field(
        "difficulty_level",
        "Difficulty Level",
        &[("beginner", 20), ("intermediate", 20), ("advanced", 20)],
    )?;
    let status = enum_field(
        "status",
        "Status",
        &[
            ("open", 30),
            ("in_progress", 20),
            ("completed", 10),
            ("cancelled", 0),
        ],
    )?;
    let start_date = date_field("start_date", "Start Date")?;
    let end_date = date_field("end_date", "End Date")?;
    let duration_weeks = integer_field("duration_weeks", "Duration Weeks", 1.0, 52.0)?;
    let max_students = integer_field("max_students", "Max Students", 1.0, 20.0)?;
    let current_students = integer_field("current_students", "Current Students", 0.0, 20.0)?;
    let required_skills = string_field("required_skills", "Required Skills")?;
    let technologies = string_field("technologies", "Technologies")?;
    let ai_matching_score = float_field("ai_matching_score", "AI Matching Score", 0.0, 100.0)?;
    let created_at = datetime_field("created_at", "Created At")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![title.clone(), description.clone()],
        )?,
        group(
            "categories",
            "Categories & Status",
            vec![
                project_type.clone(),
                difficulty_level.clone(),
                status.clone(),
            ],
        )?,
        group(
            "numeric",
            "Numeric & Ranges",
            vec![
                duration_weeks.clone(),
                max_students.clone(),
                current_students.clone(),
                ai_matching_score.clone(),
            ],
        )?,
        group(
            "dates",
            "Dates & Time",
            vec![start_date.clone(), end_date.clone(), created_at.clone()],
        )?,
    ];

    let presets = vec![
        FilterPreset {
            name: "open_projects".to_owned(),
            display_name: "Open Projects".to_owned(),
            description: "Projects accepting applications".to_owned(),
            entity: "projects".to_owned(),
            filters: vec![condition(
                "status",
                SearchOperator::Equals,
                json!("open"),
                FieldType::String,
            )],
            sort: Vec::new(),
        },
        FilterPreset {
            name: "beginner_friendly".to_owned(),
            display_name: "Beginner Friendly".to_owned(),
            description: "Entry-level projects".to_owned(),
            entity: "projects".to_owned(),
            filters: vec![condition(
                "difficulty_level",
                SearchOperator::In,
                json!(["beginner"]),
                FieldType::String,
            )],
            sort: Vec::new(),
        },
        FilterPreset {
            name: "starting_soon".to_owned(),
            display_name: "Starting Soon".to_owned(),
            description: "Projects starting within 30 days".to_owned(),
            entity: "projects".to_owned(),
            filters: vec![condition(
                "start_date",
                SearchOperator::LessOrEqual,
                json!(upcoming_date(30)),
                FieldType::Date,
            )],
            sort: Vec::new(),
        },
    ];

    EntitySchema::new(
        "projects",
        "Projects",
        vec![
            title,
            description,
            project_type,
            difficulty_level,
            status,
            start_date,
            end_date,
            duration_weeks,
            max_students,
            current_students,
            required_skills,
            technologies,
            ai_matching_score,
            created_at,
        ],
        vec!["title".to_owned(), "description".to_owned()],
        filter_groups,
        presets,
    )
}

fn companies_schema() -> AppResult<EntitySchema> {
    let name = string_field("name", "Name")?;
    let description = string_field("description", "Description")?;
    let industry = enum_field(
        "industry",
        "Industry",
        &[
            ("Technology", 5),
            ("Finance", 5),
            ("Healthcare", 5),
            ("Manufacturing", 5),
            ("Retail", 5),
        ],
    )?;
    let size = enum_field(
        "size",
        "Size",
        &[
            ("startup", 5),
            ("small", 5),
            ("medium", 5),
            ("large", 5),
            ("enterprise", 5),
        ],
    )?;
    let status = enum_field("status", "Status", &[("active", 22), ("inactive", 3)])?;
    let founded_year = integer_field("founded_year", "Founded Year", 1900.0, 2026.0)?;
    let partnership_level = enum_field(
        "partnership_level",
        "Partnership Level",
        &[
            ("standard", 7),
            ("silver", 6),
            ("gold", 6),
            ("platinum", 6),
        ],
    )?;
    let created_at = datetime_field("created_at", "Created At")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![name.clone(), description.clone()],
        )?,
        group(
            "categories",
            "Categories & Status",
            vec![
                industry.clone(),
                size.clone(),
                partnership_level.clone(),
                status.clone(),
            ],
        )?,
        group("numeric", "Numeric & Ranges", vec![founded_year.clone()])?,
        group("dates", "Dates & Time", vec![created_at.clone()])?,
    ];

    EntitySchema::new(
        "companies",
        "Companies",
        vec![
            name,
            description,
            industry,
            size,
            status,
            founded_year,
            partnership_level,
            created_at,
        ],
        vec!["name".to_owned(), "description".to_owned()],
        filter_groups,
        Vec::new(),
    )
}

fn users_schema() -> AppResult<EntitySchema> {
    let email = string_field("email", "Email")?;
    let first_name = string_field("first_name", "First Name")?;
    let last_name = string_field("last_name", "Last Name")?;
    let role = enum_field(
        "role",
        "Role",
        &[
            ("admin", 5),
            ("student", 30),
            ("mentor", 10),
            ("company_rep", 5),
        ],
    )?;
    let is_active = boolean_field("is_active", "Is Active")?;
    let email_verified = boolean_field("email_verified", "Email Verified")?;
    let created_at = datetime_field("created_at", "Created At")?;
    let last_login = datetime_field("last_login", "Last Login")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![email.clone(), first_name.clone(), last_name.clone()],
        )?,
        group("categories", "Categories & Status", vec![role.clone()])?,
        group(
            "account",
            "Account Flags",
            vec![is_active.clone(), email_verified.clone()],
        )?,
        group(
            "dates",
            "Dates & Time",
            vec![created_at.clone(), last_login.clone()],
        )?,
    ];

    EntitySchema::new(
        "users",
        "Users",
        vec![
            email,
            first_name,
            last_name,
            role,
            is_active,
            email_verified,
            created_at,
            last_login,
        ],
        vec![
            "email".to_owned(),
            "first_name".to_owned(),
            "last_name".to_owned(),
        ],
        filter_groups,
        Vec::new(),
    )
}

fn courses_schema() -> AppResult<EntitySchema> {
    let course_code = string_field("course_code", "Course Code")?;
    let course_name = string_field("course_name", "Course Name")?;
    let description = string_field("description", "Description")?;
    let credits = integer_field("credits", "Credits", 1.0, 6.0)?;
    let department = string_field("department", "Department")?;
    let level = enum_field(
        "level",
        "Level",
        &[("undergraduate", 15), ("graduate", 15)],
    )?;
    let is_capstone_eligible = boolean_field("is_capstone_eligible", "Is Capstone Eligible")?;
    let status = enum_field("status", "Status", &[("active", 27), ("retired", 3)])?;
    let created_at = datetime_field("created_at", "Created At")?;

    let filter_groups = vec![
        group(
            "basic",
            "Basic Information",
            vec![
                course_code.clone(),
                course_name.clone(),
                description.clone(),
            ],
        )?,
        group(
            "categories",
            "Categories & Status",
            vec![department.clone(), level.clone(), status.clone()],
        )?,
        group("numeric", "Numeric & Ranges", vec![credits.clone()])?,
        group("dates", "Dates & Time", vec![created_at.clone()])?,
    ];

    EntitySchema::new(
        "courses",
        "Courses",
        vec![
            course_code,
            course_name,
            description,
            credits,
            department,
            level,
            is_capstone_eligible,
            status,
            created_at,
        ],
        vec!["course_code".to_owned(), "course_name".to_owned()],
        filter_groups,
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use capstan_application::FieldRegistry;

    use super::seeded_entity_schemas;

    #[test]
    fn schemas_build_into_a_registry() {
        let schemas = seeded_entity_schemas().unwrap_or_else(|_| unreachable!());
        let registry = FieldRegistry::new(schemas).unwrap_or_else(|_| unreachable!());

        assert_eq!(
            registry.entities(),
            vec![
                "students",
                "mentors",
                "projects",
                "companies",
                "users",
                "courses"
            ]
        );
    }

    #[test]
    fn every_entity_has_quick_search_fields() {
        let schemas = seeded_entity_schemas().unwrap_or_else(|_| unreachable!());
        for schema in &schemas {
            assert!(
                !schema.quick_search_fields().is_empty(),
                "entity '{}' lacks quick-search fields",
                schema.entity().as_str()
            );
        }
    }

    #[test]
    fn preset_conditions_compile_against_their_entity() {
        let schemas = seeded_entity_schemas().unwrap_or_else(|_| unreachable!());
        let registry = FieldRegistry::new(schemas).unwrap_or_else(|_| unreachable!());

        for entity in registry.entities() {
            for preset in registry.presets(entity) {
                for condition in &preset.filters {
                    let field = registry
                        .field_definition(entity, condition.field.as_str())
                        .unwrap_or_else(|| unreachable!());
                    let compiled =
                        capstan_domain::CompiledPredicate::compile(condition, field);
                    assert!(
                        compiled.is_ok(),
                        "preset '{}' condition on '{}' does not compile",
                        preset.name,
                        condition.field
                    );
                }
            }
        }
    }

    #[test]
    fn field_order_is_stable_across_lookups() {
        let schemas = seeded_entity_schemas().unwrap_or_else(|_| unreachable!());
        let registry = FieldRegistry::new(schemas).unwrap_or_else(|_| unreachable!());

        let first = registry.field_names("students");
        let second = registry.field_names("students");
        assert_eq!(first, second);
        assert_eq!(first.first().map(String::as_str), Some("student_id"));
    }
}
