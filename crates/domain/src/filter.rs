use std::cmp::Ordering;

use capstan_core::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{FieldDefinition, FieldType, SearchOperator};

/// One field-operator-value predicate as received on the wire.
///
/// The `value` is untyped at this boundary; the compiler performs the single
/// tag-driven parse into a [`CompiledPredicate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Field identifier the predicate targets.
    pub field: String,
    /// Comparison operator.
    pub operator: SearchOperator,
    /// Untyped wire value, interpreted according to `data_type`.
    #[serde(default)]
    pub value: Value,
    /// Declared value type driving the parse.
    pub data_type: FieldType,
}

/// A typed scalar produced by the filter compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// UTF-8 text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Point in time.
    DateTime(DateTime<Utc>),
}

impl ScalarValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        if let (Some(left), Some(right)) = (self.as_f64(), other.as_f64()) {
            return left.partial_cmp(&right);
        }

        match (self, other) {
            (Self::Text(left), Self::Text(right)) => Some(left.cmp(right)),
            (Self::Boolean(left), Self::Boolean(right)) => Some(left.cmp(right)),
            (Self::Date(left), Self::Date(right)) => Some(left.cmp(right)),
            (Self::DateTime(left), Self::DateTime(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }
}

/// Typed comparison carried by a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateTest {
    /// Equality against one scalar.
    Equals(ScalarValue),
    /// Inequality against one scalar.
    NotEquals(ScalarValue),
    /// Substring match.
    Contains(String),
    /// Negated substring match.
    NotContains(String),
    /// Prefix match.
    StartsWith(String),
    /// Suffix match.
    EndsWith(String),
    /// Ordered greater-than comparison.
    GreaterThan(ScalarValue),
    /// Ordered greater-than-or-equal comparison.
    GreaterOrEqual(ScalarValue),
    /// Ordered less-than comparison.
    LessThan(ScalarValue),
    /// Ordered less-than-or-equal comparison.
    LessOrEqual(ScalarValue),
    /// Inclusive range test, low bound first.
    Between(ScalarValue, ScalarValue),
    /// Membership in a non-empty value set.
    In(Vec<ScalarValue>),
    /// Negated membership in a non-empty value set.
    NotIn(Vec<ScalarValue>),
    /// Field value is absent or null.
    IsNull,
    /// Field value is present and non-null.
    IsNotNull,
}

/// A validated, typed predicate ready for row evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    field: String,
    field_type: FieldType,
    test: PredicateTest,
}

impl CompiledPredicate {
    /// Compiles one wire condition against its field definition.
    ///
    /// This is the only place the `data_type` tag drives a parse; evaluation
    /// never re-inspects raw wire values.
    pub fn compile(condition: &FilterCondition, field: &FieldDefinition) -> AppResult<Self> {
        if !field.operators().contains(&condition.operator) {
            return Err(AppError::UnsupportedOperator(format!(
                "operator '{}' is not valid for field '{}'",
                condition.operator.as_str(),
                field.field().as_str()
            )));
        }

        let field_type = field.field_type();
        let declared = condition.data_type;
        let tags_compatible = declared == field_type
            || (matches!(declared, FieldType::String | FieldType::Enum)
                && matches!(field_type, FieldType::String | FieldType::Enum));
        if !tags_compatible {
            return Err(AppError::InvalidValue(format!(
                "data_type '{}' does not match field '{}' of type '{}'",
                declared.as_str(),
                field.field().as_str(),
                field_type.as_str()
            )));
        }

        let test = match condition.operator {
            SearchOperator::IsNull => PredicateTest::IsNull,
            SearchOperator::IsNotNull => PredicateTest::IsNotNull,
            SearchOperator::Between => {
                let bounds = condition.value.as_array().ok_or_else(|| {
                    AppError::InvalidValue(format!(
                        "'between' on field '{}' requires a two-element list",
                        field.field().as_str()
                    ))
                })?;
                if bounds.len() != 2 {
                    return Err(AppError::InvalidValue(format!(
                        "'between' on field '{}' requires exactly two bounds, got {}",
                        field.field().as_str(),
                        bounds.len()
                    )));
                }

                let low = parse_scalar(&bounds[0], field)?;
                let high = parse_scalar(&bounds[1], field)?;
                if low.compare(&high) == Some(Ordering::Greater) {
                    return Err(AppError::InvalidValue(format!(
                        "'between' bounds for field '{}' must be ordered low to high",
                        field.field().as_str()
                    )));
                }

                PredicateTest::Between(low, high)
            }
            SearchOperator::In | SearchOperator::NotIn => {
                let values = condition.value.as_array().ok_or_else(|| {
                    AppError::InvalidValue(format!(
                        "'{}' on field '{}' requires a list of values",
                        condition.operator.as_str(),
                        field.field().as_str()
                    ))
                })?;
                if values.is_empty() {
                    return Err(AppError::InvalidValue(format!(
                        "'{}' on field '{}' requires a non-empty list",
                        condition.operator.as_str(),
                        field.field().as_str()
                    )));
                }

                let parsed = values
                    .iter()
                    .map(|value| parse_scalar(value, field))
                    .collect::<AppResult<Vec<_>>>()?;
                if condition.operator == SearchOperator::In {
                    PredicateTest::In(parsed)
                } else {
                    PredicateTest::NotIn(parsed)
                }
            }
            SearchOperator::Contains
            | SearchOperator::NotContains
            | SearchOperator::StartsWith
            | SearchOperator::EndsWith => {
                let needle = match parse_scalar(&condition.value, field)? {
                    ScalarValue::Text(text) => text,
                    _ => {
                        return Err(AppError::InvalidValue(format!(
                            "'{}' on field '{}' requires a text value",
                            condition.operator.as_str(),
                            field.field().as_str()
                        )));
                    }
                };
                match condition.operator {
                    SearchOperator::Contains => PredicateTest::Contains(needle),
                    SearchOperator::NotContains => PredicateTest::NotContains(needle),
                    SearchOperator::StartsWith => PredicateTest::StartsWith(needle),
                    _ => PredicateTest::EndsWith(needle),
                }
            }
            SearchOperator::Equals => PredicateTest::Equals(parse_scalar(&condition.value, field)?),
            SearchOperator::NotEquals => {
                PredicateTest::NotEquals(parse_scalar(&condition.value, field)?)
            }
            SearchOperator::GreaterThan => {
                PredicateTest::GreaterThan(parse_scalar(&condition.value, field)?)
            }
            SearchOperator::GreaterOrEqual => {
                PredicateTest::GreaterOrEqual(parse_scalar(&condition.value, field)?)
            }
            SearchOperator::LessThan => {
                PredicateTest::LessThan(parse_scalar(&condition.value, field)?)
            }
            SearchOperator::LessOrEqual => {
                PredicateTest::LessOrEqual(parse_scalar(&condition.value, field)?)
            }
        };

        Ok(Self {
            field: field.field().as_str().to_owned(),
            field_type,
            test,
        })
    }

    /// Returns the targeted field identifier.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the field type the predicate was compiled against.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the typed comparison.
    #[must_use]
    pub fn test(&self) -> &PredicateTest {
        &self.test
    }

    /// Evaluates the predicate against one row object.
    ///
    /// Missing or null field values fail every test except `is_null`.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        let stored = row
            .as_object()
            .and_then(|object| object.get(self.field.as_str()))
            .filter(|value| !value.is_null());

        match &self.test {
            PredicateTest::IsNull => stored.is_none(),
            PredicateTest::IsNotNull => stored.is_some(),
            test => {
                let Some(stored) = stored.and_then(|value| row_scalar(value, self.field_type))
                else {
                    return false;
                };

                match test {
                    PredicateTest::Equals(expected) => {
                        stored.compare(expected) == Some(Ordering::Equal)
                    }
                    PredicateTest::NotEquals(expected) => {
                        stored.compare(expected) != Some(Ordering::Equal)
                    }
                    PredicateTest::Contains(needle) => {
                        scalar_text(&stored).is_some_and(|text| text.contains(needle.as_str()))
                    }
                    PredicateTest::NotContains(needle) => {
                        scalar_text(&stored).is_some_and(|text| !text.contains(needle.as_str()))
                    }
                    PredicateTest::StartsWith(needle) => {
                        scalar_text(&stored).is_some_and(|text| text.starts_with(needle.as_str()))
                    }
                    PredicateTest::EndsWith(needle) => {
                        scalar_text(&stored).is_some_and(|text| text.ends_with(needle.as_str()))
                    }
                    PredicateTest::GreaterThan(bound) => {
                        stored.compare(bound) == Some(Ordering::Greater)
                    }
                    PredicateTest::GreaterOrEqual(bound) => matches!(
                        stored.compare(bound),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    PredicateTest::LessThan(bound) => stored.compare(bound) == Some(Ordering::Less),
                    PredicateTest::LessOrEqual(bound) => {
                        matches!(stored.compare(bound), Some(Ordering::Less | Ordering::Equal))
                    }
                    PredicateTest::Between(low, high) => {
                        matches!(
                            stored.compare(low),
                            Some(Ordering::Greater | Ordering::Equal)
                        ) && matches!(stored.compare(high), Some(Ordering::Less | Ordering::Equal))
                    }
                    PredicateTest::In(expected) => expected
                        .iter()
                        .any(|candidate| stored.compare(candidate) == Some(Ordering::Equal)),
                    PredicateTest::NotIn(expected) => expected
                        .iter()
                        .all(|candidate| stored.compare(candidate) != Some(Ordering::Equal)),
                    // Presence tests are handled by the outer match.
                    PredicateTest::IsNull | PredicateTest::IsNotNull => false,
                }
            }
        }
    }
}

fn scalar_text(scalar: &ScalarValue) -> Option<&str> {
    match scalar {
        ScalarValue::Text(text) => Some(text.as_str()),
        _ => None,
    }
}

/// Parses an untyped wire value into the field's scalar type.
fn parse_scalar(value: &Value, field: &FieldDefinition) -> AppResult<ScalarValue> {
    let field_name = field.field().as_str();

    match field.field_type() {
        FieldType::String => match value {
            Value::String(text) => Ok(ScalarValue::Text(text.clone())),
            Value::Number(number) => Ok(ScalarValue::Text(number.to_string())),
            _ => Err(AppError::InvalidValue(format!(
                "field '{field_name}' expects a string value"
            ))),
        },
        FieldType::Enum => {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                _ => {
                    return Err(AppError::InvalidValue(format!(
                        "field '{field_name}' expects an enum value"
                    )));
                }
            };

            if let Some(options) = field.options()
                && !options.is_empty()
                && !options.iter().any(|option| option.value == text)
            {
                return Err(AppError::InvalidValue(format!(
                    "value '{text}' is not one of the options for field '{field_name}'"
                )));
            }

            Ok(ScalarValue::Text(text))
        }
        FieldType::Integer => match value {
            Value::Number(number) if number.as_i64().is_some() => {
                Ok(ScalarValue::Integer(number.as_i64().unwrap_or_default()))
            }
            Value::String(text) => text.trim().parse::<i64>().map(ScalarValue::Integer).map_err(
                |_| {
                    AppError::InvalidValue(format!(
                        "value '{text}' is not a valid integer for field '{field_name}'"
                    ))
                },
            ),
            _ => Err(AppError::InvalidValue(format!(
                "field '{field_name}' expects an integer value"
            ))),
        },
        FieldType::Float => {
            let parsed = match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            };

            match parsed {
                Some(number) if number.is_finite() => Ok(ScalarValue::Float(number)),
                _ => Err(AppError::InvalidValue(format!(
                    "field '{field_name}' expects a finite numeric value"
                ))),
            }
        }
        FieldType::Boolean => match value {
            Value::Bool(flag) => Ok(ScalarValue::Boolean(*flag)),
            Value::String(text) if text == "true" => Ok(ScalarValue::Boolean(true)),
            Value::String(text) if text == "false" => Ok(ScalarValue::Boolean(false)),
            _ => Err(AppError::InvalidValue(format!(
                "field '{field_name}' expects a boolean value"
            ))),
        },
        FieldType::Date => match value.as_str() {
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(ScalarValue::Date)
                .map_err(|_| {
                    AppError::InvalidValue(format!(
                        "value '{text}' is not an ISO date for field '{field_name}'"
                    ))
                }),
            None => Err(AppError::InvalidValue(format!(
                "field '{field_name}' expects an ISO date string"
            ))),
        },
        FieldType::DateTime => match value.as_str() {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|parsed| ScalarValue::DateTime(parsed.with_timezone(&Utc)))
                .map_err(|_| {
                    AppError::InvalidValue(format!(
                        "value '{text}' is not an RFC 3339 timestamp for field '{field_name}'"
                    ))
                }),
            None => Err(AppError::InvalidValue(format!(
                "field '{field_name}' expects an RFC 3339 timestamp string"
            ))),
        },
    }
}

/// Interprets a stored row value as the field's scalar type.
fn row_scalar(value: &Value, field_type: FieldType) -> Option<ScalarValue> {
    match field_type {
        FieldType::String | FieldType::Enum => match value {
            Value::String(text) => Some(ScalarValue::Text(text.clone())),
            Value::Number(number) => Some(ScalarValue::Text(number.to_string())),
            _ => None,
        },
        FieldType::Integer | FieldType::Float => value.as_f64().map(ScalarValue::Float),
        FieldType::Boolean => value.as_bool().map(ScalarValue::Boolean),
        FieldType::Date => value
            .as_str()
            .and_then(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
            .map(ScalarValue::Date),
        FieldType::DateTime => value
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|parsed| ScalarValue::DateTime(parsed.with_timezone(&Utc))),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::{CompiledPredicate, FilterCondition};
    use crate::field::{FieldDefinition, FieldOption, FieldType, SearchOperator};

    fn float_field(name: &str) -> FieldDefinition {
        FieldDefinition::new(
            name,
            name,
            FieldType::Float,
            vec![
                SearchOperator::Equals,
                SearchOperator::GreaterThan,
                SearchOperator::GreaterOrEqual,
                SearchOperator::LessThan,
                SearchOperator::Between,
                SearchOperator::In,
                SearchOperator::IsNull,
            ],
            Some(0.0),
            Some(4.0),
            None,
            SearchOperator::GreaterOrEqual,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn string_field(name: &str) -> FieldDefinition {
        FieldDefinition::new(
            name,
            name,
            FieldType::String,
            vec![
                SearchOperator::Equals,
                SearchOperator::Contains,
                SearchOperator::StartsWith,
                SearchOperator::EndsWith,
                SearchOperator::In,
                SearchOperator::IsNull,
                SearchOperator::IsNotNull,
            ],
            None,
            None,
            None,
            SearchOperator::Contains,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn status_field() -> FieldDefinition {
        FieldDefinition::new(
            "status",
            "Status",
            FieldType::Enum,
            vec![
                SearchOperator::Equals,
                SearchOperator::NotEquals,
                SearchOperator::In,
            ],
            None,
            None,
            Some(vec![
                FieldOption {
                    value: "active".to_owned(),
                    label: "Active".to_owned(),
                    count: None,
                },
                FieldOption {
                    value: "inactive".to_owned(),
                    label: "Inactive".to_owned(),
                    count: None,
                },
            ]),
            SearchOperator::Equals,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        let condition = FilterCondition {
            field: "status".to_owned(),
            operator: SearchOperator::Contains,
            value: json!("act"),
            data_type: FieldType::String,
        };
        let result = CompiledPredicate::compile(&condition, &status_field());
        assert!(matches!(
            result,
            Err(capstan_core::AppError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn numeric_string_parses_for_float_field() {
        let condition = FilterCondition {
            field: "gpa".to_owned(),
            operator: SearchOperator::GreaterThan,
            value: json!("3.5"),
            data_type: FieldType::Float,
        };
        let predicate = CompiledPredicate::compile(&condition, &float_field("gpa"))
            .unwrap_or_else(|_| unreachable!());

        assert!(predicate.matches(&json!({"gpa": 3.6})));
        assert!(!predicate.matches(&json!({"gpa": 3.5})));
        assert!(!predicate.matches(&json!({"gpa": 2.1})));
    }

    #[test]
    fn non_numeric_value_fails_float_field() {
        let condition = FilterCondition {
            field: "gpa".to_owned(),
            operator: SearchOperator::Equals,
            value: json!("not-a-number"),
            data_type: FieldType::Float,
        };
        let result = CompiledPredicate::compile(&condition, &float_field("gpa"));
        assert!(matches!(
            result,
            Err(capstan_core::AppError::InvalidValue(_))
        ));
    }

    #[test]
    fn empty_in_list_fails_compilation() {
        let condition = FilterCondition {
            field: "skills".to_owned(),
            operator: SearchOperator::In,
            value: json!([]),
            data_type: FieldType::String,
        };
        let result = CompiledPredicate::compile(&condition, &string_field("skills"));
        assert!(matches!(
            result,
            Err(capstan_core::AppError::InvalidValue(_))
        ));
    }

    #[test]
    fn between_requires_ordered_bounds() {
        let reversed = FilterCondition {
            field: "gpa".to_owned(),
            operator: SearchOperator::Between,
            value: json!([3.5, 2.0]),
            data_type: FieldType::Float,
        };
        assert!(CompiledPredicate::compile(&reversed, &float_field("gpa")).is_err());

        let ordered = FilterCondition {
            field: "gpa".to_owned(),
            operator: SearchOperator::Between,
            value: json!([2.0, 3.5]),
            data_type: FieldType::Float,
        };
        let predicate = CompiledPredicate::compile(&ordered, &float_field("gpa"))
            .unwrap_or_else(|_| unreachable!());
        assert!(predicate.matches(&json!({"gpa": 2.0})));
        assert!(predicate.matches(&json!({"gpa": 3.5})));
        assert!(!predicate.matches(&json!({"gpa": 3.51})));
    }

    #[test]
    fn null_operators_ignore_the_value() {
        for value in [json!("anything"), json!(42), json!(null), json!([1, 2])] {
            let condition = FilterCondition {
                field: "gpa".to_owned(),
                operator: SearchOperator::IsNull,
                value,
                data_type: FieldType::Float,
            };
            let predicate = CompiledPredicate::compile(&condition, &float_field("gpa"))
                .unwrap_or_else(|_| unreachable!());

            assert!(predicate.matches(&json!({})));
            assert!(predicate.matches(&json!({"gpa": null})));
            assert!(!predicate.matches(&json!({"gpa": 3.0})));
        }
    }

    #[test]
    fn enum_value_must_be_a_known_option() {
        let condition = FilterCondition {
            field: "status".to_owned(),
            operator: SearchOperator::Equals,
            value: json!("archived"),
            data_type: FieldType::String,
        };
        let result = CompiledPredicate::compile(&condition, &status_field());
        assert!(matches!(
            result,
            Err(capstan_core::AppError::InvalidValue(_))
        ));
    }

    #[test]
    fn date_predicates_compare_chronologically() {
        let field = FieldDefinition::new(
            "enrollment_date",
            "Enrollment Date",
            FieldType::Date,
            vec![SearchOperator::LessOrEqual, SearchOperator::Equals],
            None,
            None,
            None,
            SearchOperator::Equals,
        )
        .unwrap_or_else(|_| unreachable!());

        let condition = FilterCondition {
            field: "enrollment_date".to_owned(),
            operator: SearchOperator::LessOrEqual,
            value: json!("2024-06-30"),
            data_type: FieldType::Date,
        };
        let predicate =
            CompiledPredicate::compile(&condition, &field).unwrap_or_else(|_| unreachable!());

        assert!(predicate.matches(&json!({"enrollment_date": "2023-09-01"})));
        assert!(!predicate.matches(&json!({"enrollment_date": "2024-07-01"})));
        assert!(!predicate.matches(&json!({"enrollment_date": "not-a-date"})));
    }

    #[test]
    fn datetime_comparison_ignores_offset_formatting() {
        let field = FieldDefinition::new(
            "created_at",
            "Created At",
            FieldType::DateTime,
            vec![SearchOperator::GreaterOrEqual],
            None,
            None,
            None,
            SearchOperator::GreaterOrEqual,
        )
        .unwrap_or_else(|_| unreachable!());

        let condition = FilterCondition {
            field: "created_at".to_owned(),
            operator: SearchOperator::GreaterOrEqual,
            value: json!("2024-03-01T00:00:00+00:00"),
            data_type: FieldType::DateTime,
        };
        let predicate =
            CompiledPredicate::compile(&condition, &field).unwrap_or_else(|_| unreachable!());

        assert!(predicate.matches(&json!({"created_at": "2024-03-01T08:00:00Z"})));
        assert!(!predicate.matches(&json!({"created_at": "2024-02-29T23:59:59Z"})));
    }

    proptest! {
        #[test]
        fn compiled_integer_equality_matches_only_the_same_number(value in -1_000_000i64..1_000_000) {
            let field = FieldDefinition::new(
                "credits",
                "Credits",
                FieldType::Integer,
                vec![SearchOperator::Equals],
                None,
                None,
                None,
                SearchOperator::Equals,
            )
            .unwrap_or_else(|_| unreachable!());

            let condition = FilterCondition {
                field: "credits".to_owned(),
                operator: SearchOperator::Equals,
                value: json!(value.to_string()),
                data_type: FieldType::Integer,
            };
            let predicate =
                CompiledPredicate::compile(&condition, &field).unwrap_or_else(|_| unreachable!());

            prop_assert!(predicate.matches(&json!({"credits": value})), "credits should match value");
            prop_assert!(!predicate.matches(&json!({"credits": value + 1})), "credits should not match value + 1");
        }

        #[test]
        fn contains_matches_any_embedding(needle in "[a-z]{1,8}", prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
            let condition = FilterCondition {
                field: "program".to_owned(),
                operator: SearchOperator::Contains,
                value: json!(needle.clone()),
                data_type: FieldType::String,
            };
            let predicate = CompiledPredicate::compile(&condition, &string_field("program"))
                .unwrap_or_else(|_| unreachable!());

            let haystack = format!("{prefix}{needle}{suffix}");
            prop_assert!(predicate.matches(&json!({"program": haystack})), "program should contain needle");
        }
    }
}
