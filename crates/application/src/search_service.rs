use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capstan_core::{AppError, AppResult};
use capstan_domain::{
    CompiledPredicate, FieldType, MAX_PAGE_SIZE, QueryInfo, SearchQuery, SearchResult,
    SortCondition, SortOrder,
};
use serde_json::Value;
use tracing::debug;

use crate::aggregate::aggregate_rows;
use crate::field_registry::FieldRegistry;
use crate::search_ports::CandidateProvider;

/// Query executor for the entity-agnostic search pipeline.
///
/// Stateless per call: every execution is a pure function of the query value
/// against the provider's current snapshot, so concurrent searches need no
/// coordination.
#[derive(Clone)]
pub struct SearchService {
    registry: Arc<FieldRegistry>,
    provider: Arc<dyn CandidateProvider>,
    call_timeout: Duration,
}

impl SearchService {
    /// Creates a search service over a registry and candidate provider.
    #[must_use]
    pub fn new(
        registry: Arc<FieldRegistry>,
        provider: Arc<dyn CandidateProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            provider,
            call_timeout,
        }
    }

    /// Returns the field registry backing this service.
    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Executes a structured search query.
    ///
    /// Fails with `MalformedQuery` for structural problems and `NotFound`
    /// for an unknown entity; a page window past the available data returns
    /// an empty page with the true `total_count`, never an error.
    pub async fn execute(&self, query: &SearchQuery) -> AppResult<SearchResult> {
        tokio::time::timeout(self.call_timeout, self.execute_inner(query))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "search on '{}' exceeded {} ms",
                    query.entity,
                    self.call_timeout.as_millis()
                ))
            })?
    }

    /// Free-text quick search across the entity's designated fields.
    ///
    /// Unlike [`SearchService::execute`], an unknown entity degrades to an
    /// empty result here, matching the registry's permissive stance.
    pub async fn quick_search(
        &self,
        entity: &str,
        search_text: &str,
        search_fields: Vec<String>,
        limit: usize,
    ) -> AppResult<SearchResult> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);

        if !self.registry.contains_entity(entity) {
            debug!(entity = %entity, "quick search on unknown entity");
            return Ok(SearchResult {
                data: Vec::new(),
                total_count: 0,
                page: 1,
                page_size,
                total_pages: 0,
                aggregations: BTreeMap::new(),
                execution_time_ms: 0.0,
                query_info: QueryInfo {
                    entity: entity.to_owned(),
                    filters_applied: 0,
                    full_text_search: true,
                    relations_included: false,
                },
            });
        }

        let mut query = SearchQuery::for_entity(entity)
            .with_search_text(Some(search_text.to_owned()));
        query.search_fields = search_fields;
        query.page_size = page_size;
        query.include_relations = false;

        self.execute(&query).await
    }

    /// Runs filtering and sorting without pagination, returning the full
    /// ordered match set. This is the row set behind `total_count`,
    /// aggregation, and export.
    pub async fn unpaged_rows(&self, query: &SearchQuery) -> AppResult<Vec<Value>> {
        tokio::time::timeout(self.call_timeout, self.collect_unpaged(query))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "search on '{}' exceeded {} ms",
                    query.entity,
                    self.call_timeout.as_millis()
                ))
            })?
    }

    /// Returns the distinct stored values of one field, sorted, optionally
    /// narrowed by a case-insensitive substring. Unknown entities and fields
    /// yield an empty list.
    pub async fn distinct_field_values(
        &self,
        entity: &str,
        field: &str,
        search: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<String>> {
        if self.registry.field_definition(entity, field).is_none() {
            return Ok(Vec::new());
        }

        let rows = self.provider.candidate_rows(entity).await?;
        let needle = search.map(str::to_lowercase);

        let mut values: Vec<String> = rows
            .iter()
            .filter_map(|row| row.as_object().and_then(|object| object.get(field)))
            .filter_map(scalar_to_text)
            .collect();
        values.sort();
        values.dedup();

        if let Some(needle) = needle {
            values.retain(|value| value.to_lowercase().contains(needle.as_str()));
        }

        values.truncate(limit);
        Ok(values)
    }

    async fn execute_inner(&self, query: &SearchQuery) -> AppResult<SearchResult> {
        let started = Instant::now();
        let rows = self.collect_unpaged(query).await?;

        let total_count = rows.len();
        let aggregations = if query.aggregate_functions.is_empty() {
            BTreeMap::new()
        } else {
            aggregate_rows(&rows, &query.aggregate_functions)
        };

        let total_pages = total_count.div_ceil(query.page_size);
        let offset = (query.page - 1) * query.page_size;
        let mut data: Vec<Value> = rows
            .into_iter()
            .skip(offset)
            .take(query.page_size)
            .collect();

        if !query.include_relations {
            for row in &mut data {
                strip_relation_fields(row);
            }
        }

        let quick_mode = is_quick_search(query);
        let result = SearchResult {
            total_count,
            page: query.page,
            page_size: query.page_size,
            total_pages,
            aggregations,
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            query_info: QueryInfo {
                entity: query.entity.clone(),
                filters_applied: if quick_mode { 0 } else { query.filters.len() },
                full_text_search: quick_mode,
                relations_included: query.include_relations,
            },
            data,
        };

        debug!(
            entity = %query.entity,
            total_count = result.total_count,
            page = result.page,
            execution_time_ms = result.execution_time_ms,
            "search executed"
        );

        Ok(result)
    }

    async fn collect_unpaged(&self, query: &SearchQuery) -> AppResult<Vec<Value>> {
        query.validate()?;

        if !self.registry.contains_entity(query.entity.as_str()) {
            return Err(AppError::NotFound(format!(
                "unknown entity '{}'",
                query.entity
            )));
        }

        let candidates = self.provider.candidate_rows(query.entity.as_str()).await?;

        let mut rows = if is_quick_search(query) {
            self.apply_quick_search(query, candidates)
        } else {
            self.apply_filters(query, candidates)?
        };

        self.apply_sort(query, &mut rows);
        Ok(rows)
    }

    /// Quick search keeps a row iff any designated field contains the text,
    /// case-insensitively. Structured filters are ignored in this mode; the
    /// two modes are mutually exclusive per request.
    fn apply_quick_search(&self, query: &SearchQuery, candidates: Vec<Value>) -> Vec<Value> {
        let needle = query
            .search_text
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        let fields: Vec<String> = if query.search_fields.is_empty() {
            self.registry
                .quick_search_fields(query.entity.as_str())
                .to_vec()
        } else {
            query.search_fields.clone()
        };

        candidates
            .into_iter()
            .filter(|row| {
                fields.iter().any(|field| {
                    row.as_object()
                        .and_then(|object| object.get(field.as_str()))
                        .and_then(scalar_to_text)
                        .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
                })
            })
            .collect()
    }

    fn apply_filters(&self, query: &SearchQuery, candidates: Vec<Value>) -> AppResult<Vec<Value>> {
        let mut predicates = Vec::with_capacity(query.filters.len());
        for condition in &query.filters {
            let field = self
                .registry
                .field_definition(query.entity.as_str(), condition.field.as_str())
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "unknown filter field '{}' for entity '{}'",
                        condition.field, query.entity
                    ))
                })?;
            predicates.push(CompiledPredicate::compile(condition, field)?);
        }

        Ok(candidates
            .into_iter()
            .filter(|row| predicates.iter().all(|predicate| predicate.matches(row)))
            .collect())
    }

    /// Stable multi-key sort; rows that compare equal keep their original
    /// candidate order.
    fn apply_sort(&self, query: &SearchQuery, rows: &mut [Value]) {
        let keys: Vec<(&SortCondition, FieldType)> = query
            .sort
            .iter()
            .filter_map(|sort| {
                match self
                    .registry
                    .field_definition(query.entity.as_str(), sort.field.as_str())
                {
                    Some(definition) => Some((sort, definition.field_type())),
                    None => {
                        debug!(entity = %query.entity, field = %sort.field, "skipping unknown sort field");
                        None
                    }
                }
            })
            .collect();

        if keys.is_empty() {
            return;
        }

        rows.sort_by(|left, right| {
            for (sort, field_type) in &keys {
                let ordering = compare_row_values(
                    left.as_object().and_then(|object| object.get(sort.field.as_str())),
                    right.as_object().and_then(|object| object.get(sort.field.as_str())),
                    *field_type,
                );
                let ordering = if sort.order == SortOrder::Desc {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }

            Ordering::Equal
        });
    }
}

fn is_quick_search(query: &SearchQuery) -> bool {
    query
        .search_text
        .as_deref()
        .is_some_and(|text| !text.is_empty())
}

fn scalar_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn compare_row_values(
    left: Option<&Value>,
    right: Option<&Value>,
    field_type: FieldType,
) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => match field_type {
            FieldType::Integer | FieldType::Float => left
                .as_f64()
                .zip(right.as_f64())
                .and_then(|(left, right)| left.partial_cmp(&right))
                .unwrap_or(Ordering::Equal),
            FieldType::Boolean => left
                .as_bool()
                .zip(right.as_bool())
                .map(|(left, right)| left.cmp(&right))
                .unwrap_or(Ordering::Equal),
            FieldType::String | FieldType::Enum | FieldType::Date | FieldType::DateTime => left
                .as_str()
                .zip(right.as_str())
                .map(|(left, right)| left.cmp(right))
                .unwrap_or(Ordering::Equal),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn strip_relation_fields(row: &mut Value) {
    if let Value::Object(object) = row {
        object.retain(|_, value| !value.is_object());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use capstan_core::{AppError, AppResult};
    use capstan_domain::{
        FieldDefinition, FieldType, FilterCondition, SearchOperator, SearchQuery, SortCondition,
        SortOrder,
    };
    use serde_json::{Value, json};

    use super::SearchService;
    use crate::field_registry::{EntitySchema, FieldRegistry};
    use crate::search_ports::CandidateProvider;

    struct StubProvider {
        rows: Vec<Value>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CandidateProvider for StubProvider {
        async fn candidate_rows(&self, entity: &str) -> AppResult<Vec<Value>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if entity == "students" {
                Ok(self.rows.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn student_registry() -> FieldRegistry {
        let fields = vec![
            FieldDefinition::new(
                "first_name",
                "First Name",
                FieldType::String,
                vec![SearchOperator::Equals, SearchOperator::Contains],
                None,
                None,
                None,
                SearchOperator::Contains,
            )
            .unwrap_or_else(|_| unreachable!()),
            FieldDefinition::new(
                "program",
                "Program",
                FieldType::String,
                vec![SearchOperator::Equals, SearchOperator::Contains],
                None,
                None,
                None,
                SearchOperator::Equals,
            )
            .unwrap_or_else(|_| unreachable!()),
            FieldDefinition::new(
                "gpa",
                "GPA",
                FieldType::Float,
                vec![
                    SearchOperator::Equals,
                    SearchOperator::GreaterThan,
                    SearchOperator::GreaterOrEqual,
                    SearchOperator::LessOrEqual,
                    SearchOperator::Between,
                ],
                Some(0.0),
                Some(4.0),
                None,
                SearchOperator::GreaterOrEqual,
            )
            .unwrap_or_else(|_| unreachable!()),
        ];

        let schema = EntitySchema::new(
            "students",
            "Students",
            fields,
            vec!["first_name".to_owned(), "program".to_owned()],
            Vec::new(),
            Vec::new(),
        )
        .unwrap_or_else(|_| unreachable!());

        FieldRegistry::new(vec![schema]).unwrap_or_else(|_| unreachable!())
    }

    fn sample_rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "first_name": "Ada", "program": "Computer Science", "gpa": 3.9, "user": {"email": "ada@example.edu"}}),
            json!({"id": 2, "first_name": "Grace", "program": "Computer Science", "gpa": 3.6, "user": {"email": "grace@example.edu"}}),
            json!({"id": 3, "first_name": "Alan", "program": "Engineering", "gpa": 3.2, "user": {"email": "alan@example.edu"}}),
            json!({"id": 4, "first_name": "Edsger", "program": "Engineering", "gpa": 2.8, "user": {"email": "edsger@example.edu"}}),
            json!({"id": 5, "first_name": "Barbara", "program": "Business Administration", "gpa": 3.6, "user": {"email": "barbara@example.edu"}}),
        ]
    }

    fn service_with(rows: Vec<Value>) -> SearchService {
        SearchService::new(
            Arc::new(student_registry()),
            Arc::new(StubProvider { rows, delay: None }),
            Duration::from_secs(5),
        )
    }

    fn gpa_above(value: f64) -> FilterCondition {
        FilterCondition {
            field: "gpa".to_owned(),
            operator: SearchOperator::GreaterThan,
            value: json!(value),
            data_type: FieldType::Float,
        }
    }

    #[tokio::test]
    async fn filters_and_counts_the_unpaged_set() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students").with_filter(gpa_above(3.0));
        query.page_size = 2;

        let result = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(result.total_count, 4);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.data.len(), 2);
    }

    #[tokio::test]
    async fn repeated_execution_is_deterministic() {
        let service = service_with(sample_rows());
        let query = SearchQuery::for_entity("students").with_filter(gpa_above(3.0));

        let first = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());
        let second = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(first.data, second.data);
        assert_eq!(first.total_count, second.total_count);
        assert_eq!(first.aggregations, second.aggregations);
    }

    #[tokio::test]
    async fn aggregations_ignore_the_page_window() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students").with_filter(gpa_above(3.0));
        query.page_size = 2;
        query
            .aggregate_functions
            .insert("gpa".to_owned(), "avg".to_owned());

        let page_one = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());
        query.page = 2;
        let page_two = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(page_one.aggregations, page_two.aggregations);
        assert_eq!(page_one.total_count, page_two.total_count);
    }

    #[tokio::test]
    async fn page_past_the_end_returns_empty_data() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students");
        query.page = 9;

        let result = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(result.data.is_empty());
        assert_eq!(result.total_count, 5);
    }

    #[tokio::test]
    async fn quick_search_is_case_insensitive_and_ignores_filters() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students")
            .with_filter(gpa_above(3.95))
            .with_search_text(Some("GRACE".to_owned()));
        query.include_relations = false;

        let result = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(result.total_count, 1);
        assert!(result.query_info.full_text_search);
        assert_eq!(result.query_info.filters_applied, 0);
    }

    #[tokio::test]
    async fn empty_quick_search_text_is_an_unfiltered_query() {
        let service = service_with(sample_rows());
        let result = service
            .quick_search("students", "", Vec::new(), 3)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(result.total_count, 5);
        assert_eq!(result.data.len(), 3);
    }

    #[tokio::test]
    async fn quick_search_on_unknown_entity_is_empty_not_an_error() {
        let service = service_with(sample_rows());
        let result = service
            .quick_search("aliens", "ada", Vec::new(), 10)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.total_count, 0);
        assert!(result.data.is_empty());
    }

    #[tokio::test]
    async fn structured_query_on_unknown_entity_fails_hard() {
        let service = service_with(sample_rows());
        let query = SearchQuery::for_entity("aliens");
        let result = service.execute(&query).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn sort_applies_keys_in_order_with_stable_ties() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students");
        query.sort = vec![
            SortCondition {
                field: "gpa".to_owned(),
                order: SortOrder::Desc,
            },
            SortCondition {
                field: "first_name".to_owned(),
                order: SortOrder::Asc,
            },
        ];

        let result = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());
        let names: Vec<&str> = result
            .data
            .iter()
            .filter_map(|row| row.get("first_name").and_then(Value::as_str))
            .collect();

        assert_eq!(names, vec!["Ada", "Barbara", "Grace", "Alan", "Edsger"]);
    }

    #[tokio::test]
    async fn relations_are_stripped_when_not_requested() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students");
        query.include_relations = false;

        let result = service
            .execute(&query)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(result.data.iter().all(|row| row.get("user").is_none()));
    }

    #[tokio::test]
    async fn malformed_query_is_rejected_before_execution() {
        let service = service_with(sample_rows());
        let mut query = SearchQuery::for_entity("students");
        query.page_size = 0;
        let result = service.execute(&query).await;
        assert!(matches!(result, Err(AppError::MalformedQuery(_))));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let service = SearchService::new(
            Arc::new(student_registry()),
            Arc::new(StubProvider {
                rows: sample_rows(),
                delay: Some(Duration::from_millis(200)),
            }),
            Duration::from_millis(20),
        );

        let query = SearchQuery::for_entity("students");
        let result = service.execute(&query).await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn distinct_values_are_sorted_and_narrowed() {
        let service = service_with(sample_rows());
        let values = service
            .distinct_field_values("students", "program", None, 50)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            values,
            vec![
                "Business Administration",
                "Computer Science",
                "Engineering"
            ]
        );

        let narrowed = service
            .distinct_field_values("students", "program", Some("engineer"), 50)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(narrowed, vec!["Engineering"]);
    }
}
