use std::str::FromStr;

use capstan_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Supported field value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string field.
    String,
    /// Whole-number field.
    Integer,
    /// Floating-point field.
    Float,
    /// Boolean field.
    Boolean,
    /// Date-only field (ISO-8601 `YYYY-MM-DD`).
    Date,
    /// Date-time field (RFC 3339).
    #[serde(rename = "datetime")]
    DateTime,
    /// Enumerated field with a bounded value domain.
    Enum,
}

impl FieldType {
    /// Returns the stable wire value for the field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Enum => "enum",
        }
    }

    /// Returns whether the type carries a numeric value.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "enum" => Ok(Self::Enum),
            _ => Err(AppError::Validation(format!(
                "unknown field type '{value}'"
            ))),
        }
    }
}

/// Predicate comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOperator {
    /// Equality comparison.
    Equals,
    /// Inequality comparison.
    NotEquals,
    /// Substring match.
    Contains,
    /// Negated substring match.
    NotContains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Ordered greater-than comparison.
    #[serde(rename = "gt")]
    GreaterThan,
    /// Ordered greater-than-or-equal comparison.
    #[serde(rename = "gte")]
    GreaterOrEqual,
    /// Ordered less-than comparison.
    #[serde(rename = "lt")]
    LessThan,
    /// Ordered less-than-or-equal comparison.
    #[serde(rename = "lte")]
    LessOrEqual,
    /// Inclusive range test against two bounds.
    Between,
    /// Membership in a value set.
    In,
    /// Negated membership in a value set.
    NotIn,
    /// Field value is absent or null.
    IsNull,
    /// Field value is present and non-null.
    IsNotNull,
}

impl SearchOperator {
    /// Returns the stable wire value for the operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::GreaterThan => "gt",
            Self::GreaterOrEqual => "gte",
            Self::LessThan => "lt",
            Self::LessOrEqual => "lte",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Returns whether the operator ignores the condition value.
    #[must_use]
    pub fn is_presence_test(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl FromStr for SearchOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "gt" => Ok(Self::GreaterThan),
            "gte" => Ok(Self::GreaterOrEqual),
            "lt" => Ok(Self::LessThan),
            "lte" => Ok(Self::LessOrEqual),
            "between" => Ok(Self::Between),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "is_null" => Ok(Self::IsNull),
            "is_not_null" => Ok(Self::IsNotNull),
            _ => Err(AppError::Validation(format!(
                "unknown search operator '{value}'"
            ))),
        }
    }
}

/// One selectable value of an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Stable stored value.
    pub value: String,
    /// Human-friendly label.
    pub label: String,
    /// Optional occurrence count in the seeded data.
    pub count: Option<u64>,
}

/// Immutable metadata describing one searchable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    field: NonEmptyString,
    display_name: NonEmptyString,
    field_type: FieldType,
    operators: Vec<SearchOperator>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    options: Option<Vec<FieldOption>>,
    default_operator: SearchOperator,
}

impl FieldDefinition {
    /// Creates a validated field definition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        field: impl Into<String>,
        display_name: impl Into<String>,
        field_type: FieldType,
        operators: Vec<SearchOperator>,
        min_value: Option<f64>,
        max_value: Option<f64>,
        options: Option<Vec<FieldOption>>,
        default_operator: SearchOperator,
    ) -> AppResult<Self> {
        if operators.is_empty() {
            return Err(AppError::Validation(
                "field definitions require at least one operator".to_owned(),
            ));
        }

        if !operators.contains(&default_operator) {
            return Err(AppError::Validation(format!(
                "default operator '{}' is not in the field's operator set",
                default_operator.as_str()
            )));
        }

        if (min_value.is_some() || max_value.is_some()) && !field_type.is_numeric() {
            return Err(AppError::Validation(
                "min/max bounds are only allowed for numeric fields".to_owned(),
            ));
        }

        if let (Some(min), Some(max)) = (min_value, max_value)
            && min > max
        {
            return Err(AppError::Validation(
                "field min_value must not exceed max_value".to_owned(),
            ));
        }

        if options.is_some() && field_type != FieldType::Enum {
            return Err(AppError::Validation(
                "options are only allowed for enum fields".to_owned(),
            ));
        }

        Ok(Self {
            field: NonEmptyString::new(field)?,
            display_name: NonEmptyString::new(display_name)?,
            field_type,
            operators,
            min_value,
            max_value,
            options,
            default_operator,
        })
    }

    /// Returns the stable field identifier.
    #[must_use]
    pub fn field(&self) -> &NonEmptyString {
        &self.field
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the field value type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the operators valid for this field, in display order.
    #[must_use]
    pub fn operators(&self) -> &[SearchOperator] {
        &self.operators
    }

    /// Returns the lower bound for numeric fields.
    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// Returns the upper bound for numeric fields.
    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Returns the bounded value domain for enum fields.
    #[must_use]
    pub fn options(&self) -> Option<&[FieldOption]> {
        self.options.as_deref()
    }

    /// Returns the operator pre-selected in filter pickers.
    #[must_use]
    pub fn default_operator(&self) -> SearchOperator {
        self.default_operator
    }
}

/// Named group of field definitions driving category-based filter pickers.
///
/// Purely organizational; has no effect on query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    name: NonEmptyString,
    display_name: NonEmptyString,
    filters: Vec<FieldDefinition>,
}

impl FilterGroup {
    /// Creates a validated filter group.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        filters: Vec<FieldDefinition>,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            display_name: NonEmptyString::new(display_name)?,
            filters,
        })
    }

    /// Returns the stable group name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the grouped field definitions.
    #[must_use]
    pub fn filters(&self) -> &[FieldDefinition] {
        &self.filters
    }
}
