use std::collections::{BTreeMap, HashSet};

use capstan_core::{AppError, AppResult, NonEmptyString};
use capstan_domain::{FieldDefinition, FilterGroup, FilterPreset};

/// Searchable schema for one entity: fields, quick-search targets, picker
/// groups, and presets.
///
/// Defined once at startup and never mutated at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    entity: NonEmptyString,
    display_name: NonEmptyString,
    fields: Vec<FieldDefinition>,
    quick_search_fields: Vec<String>,
    filter_groups: Vec<FilterGroup>,
    presets: Vec<FilterPreset>,
}

impl EntitySchema {
    /// Creates a validated entity schema.
    pub fn new(
        entity: impl Into<String>,
        display_name: impl Into<String>,
        fields: Vec<FieldDefinition>,
        quick_search_fields: Vec<String>,
        filter_groups: Vec<FilterGroup>,
        presets: Vec<FilterPreset>,
    ) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.field().as_str().to_owned()) {
                return Err(AppError::Validation(format!(
                    "duplicate field '{}' in entity schema",
                    field.field().as_str()
                )));
            }
        }

        for quick_field in &quick_search_fields {
            if !seen.contains(quick_field.as_str()) {
                return Err(AppError::Validation(format!(
                    "quick-search field '{quick_field}' is not defined on the entity"
                )));
            }
        }

        Ok(Self {
            entity: NonEmptyString::new(entity)?,
            display_name: NonEmptyString::new(display_name)?,
            fields,
            quick_search_fields,
            filter_groups,
            presets,
        })
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn entity(&self) -> &NonEmptyString {
        &self.entity
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the field definitions in display order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Returns the fields scanned by quick search.
    #[must_use]
    pub fn quick_search_fields(&self) -> &[String] {
        &self.quick_search_fields
    }

    /// Returns the filter picker groups.
    #[must_use]
    pub fn filter_groups(&self) -> &[FilterGroup] {
        &self.filter_groups
    }

    /// Returns the preset bundles.
    #[must_use]
    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }
}

/// Static per-entity field metadata consulted by the rest of the pipeline.
///
/// The registry is advisory: an unknown entity returns empty collections
/// rather than failing, because its consumers build UI state from it and an
/// unknown entity is a "no results" condition there, not a fault.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    schemas: Vec<EntitySchema>,
    index: BTreeMap<String, usize>,
}

impl FieldRegistry {
    /// Builds a registry from entity schemas, preserving their order.
    pub fn new(schemas: Vec<EntitySchema>) -> AppResult<Self> {
        let mut index = BTreeMap::new();
        for (position, schema) in schemas.iter().enumerate() {
            if index
                .insert(schema.entity().as_str().to_owned(), position)
                .is_some()
            {
                return Err(AppError::Validation(format!(
                    "duplicate entity '{}' in field registry",
                    schema.entity().as_str()
                )));
            }
        }

        Ok(Self { schemas, index })
    }

    fn schema(&self, entity: &str) -> Option<&EntitySchema> {
        self.index
            .get(entity)
            .and_then(|position| self.schemas.get(*position))
    }

    /// Returns every registered entity identifier in seeded order.
    #[must_use]
    pub fn entities(&self) -> Vec<&str> {
        self.schemas
            .iter()
            .map(|schema| schema.entity().as_str())
            .collect()
    }

    /// Returns whether an entity is registered.
    #[must_use]
    pub fn contains_entity(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    /// Returns the entity's field identifiers in stable display order.
    #[must_use]
    pub fn field_names(&self, entity: &str) -> Vec<String> {
        self.schema(entity)
            .map(|schema| {
                schema
                    .fields()
                    .iter()
                    .map(|field| field.field().as_str().to_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the entity's field definitions.
    #[must_use]
    pub fn field_definitions(&self, entity: &str) -> &[FieldDefinition] {
        self.schema(entity)
            .map(EntitySchema::fields)
            .unwrap_or_default()
    }

    /// Looks up one field definition.
    #[must_use]
    pub fn field_definition(&self, entity: &str, field: &str) -> Option<&FieldDefinition> {
        self.field_definitions(entity)
            .iter()
            .find(|definition| definition.field().as_str() == field)
    }

    /// Returns the entity's quick-search fields.
    #[must_use]
    pub fn quick_search_fields(&self, entity: &str) -> &[String] {
        self.schema(entity)
            .map(EntitySchema::quick_search_fields)
            .unwrap_or_default()
    }

    /// Returns the entity's filter picker groups.
    #[must_use]
    pub fn filter_groups(&self, entity: &str) -> &[FilterGroup] {
        self.schema(entity)
            .map(EntitySchema::filter_groups)
            .unwrap_or_default()
    }

    /// Returns the entity's preset bundles.
    #[must_use]
    pub fn presets(&self, entity: &str) -> &[FilterPreset] {
        self.schema(entity)
            .map(EntitySchema::presets)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use capstan_domain::{FieldDefinition, FieldType, SearchOperator};

    use super::{EntitySchema, FieldRegistry};

    fn schema(entity: &str) -> EntitySchema {
        let field = FieldDefinition::new(
            "name",
            "Name",
            FieldType::String,
            vec![SearchOperator::Equals, SearchOperator::Contains],
            None,
            None,
            None,
            SearchOperator::Contains,
        )
        .unwrap_or_else(|_| unreachable!());

        EntitySchema::new(
            entity,
            entity,
            vec![field],
            vec!["name".to_owned()],
            Vec::new(),
            Vec::new(),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn unknown_entity_degrades_to_empty_collections() {
        let registry =
            FieldRegistry::new(vec![schema("students")]).unwrap_or_else(|_| unreachable!());

        assert!(registry.field_names("aliens").is_empty());
        assert!(registry.filter_groups("aliens").is_empty());
        assert!(registry.presets("aliens").is_empty());
        assert!(!registry.contains_entity("aliens"));
    }

    #[test]
    fn entity_order_is_the_seeded_order() {
        let registry = FieldRegistry::new(vec![schema("students"), schema("mentors")])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(registry.entities(), vec!["students", "mentors"]);
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let result = FieldRegistry::new(vec![schema("students"), schema("students")]);
        assert!(result.is_err());
    }

    #[test]
    fn quick_search_fields_must_exist_on_the_entity() {
        let field = FieldDefinition::new(
            "name",
            "Name",
            FieldType::String,
            vec![SearchOperator::Equals],
            None,
            None,
            None,
            SearchOperator::Equals,
        )
        .unwrap_or_else(|_| unreachable!());

        let result = EntitySchema::new(
            "students",
            "Students",
            vec![field],
            vec!["missing".to_owned()],
            Vec::new(),
            Vec::new(),
        );
        assert!(result.is_err());
    }
}
