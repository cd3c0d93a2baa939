//! AWS DynamoDB store implementation.
//!
//! Table layout: partition key `specialtyKey` (S), sort key `siteId` (S).
//! Filters are translated to DynamoDB filter expressions over the shadow
//! attributes, so matching happens server side.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};

use crate::error::{AppError, Result};
use crate::models::{RotationSite, SiteKey, normalize};
use crate::storage::{Combine, Condition, PutMode, ScanFilter, SiteStore, SiteUpdate, item};

type Row = HashMap<String, AttributeValue>;

/// DynamoDB-backed site store.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Create a new DynamoDB store over an existing client.
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Create a store from the ambient AWS configuration.
    pub async fn from_env(table: &str) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self::new(Client::new(&config), table))
    }

    fn decode_rows(rows: Vec<Row>) -> Result<Vec<RotationSite>> {
        rows.into_iter()
            .map(|row| item::from_item(Value::Object(json_from_row(row))))
            .collect()
    }
}

#[async_trait]
impl SiteStore for DynamoStore {
    async fn query(
        &self,
        specialty: &str,
        filter: Option<&ScanFilter>,
    ) -> Result<Vec<RotationSite>> {
        let expression = filter.and_then(FilterExpression::build);
        let mut rows = Vec::new();
        let mut start_key: Option<Row> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", item::SPECIALTY_KEY)
                .expression_attribute_values(":pk", AttributeValue::S(normalize(specialty)))
                .set_exclusive_start_key(start_key.take());

            if let Some(expr) = &expression {
                request = request.filter_expression(&expr.expression);
                for (name, attribute) in &expr.names {
                    request = request.expression_attribute_names(name, *attribute);
                }
                for (placeholder, value) in &expr.values {
                    request = request
                        .expression_attribute_values(placeholder, AttributeValue::S(value.clone()));
                }
            }

            let output = request
                .send()
                .await
                .map_err(|e| AppError::store(DisplayErrorContext(&e)))?;

            rows.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!("Query {} returned {} rows", specialty, rows.len());
        Self::decode_rows(rows)
    }

    async fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<RotationSite>> {
        let expression = filter.and_then(FilterExpression::build);
        let mut rows = Vec::new();
        let mut start_key: Option<Row> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take());

            if let Some(expr) = &expression {
                request = request.filter_expression(&expr.expression);
                for (name, attribute) in &expr.names {
                    request = request.expression_attribute_names(name, *attribute);
                }
                for (placeholder, value) in &expr.values {
                    request = request
                        .expression_attribute_values(placeholder, AttributeValue::S(value.clone()));
                }
            }

            let output = request
                .send()
                .await
                .map_err(|e| AppError::store(DisplayErrorContext(&e)))?;

            rows.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!("Scan returned {} rows", rows.len());
        Self::decode_rows(rows)
    }

    async fn put(&self, site: &RotationSite, mode: PutMode) -> Result<()> {
        let key = site.key().to_string();
        let row = row_from_json(item::to_item(site)?);

        let mut request = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(row));

        if mode == PutMode::CreateOnly {
            request = request
                .condition_expression("attribute_not_exists(#sk)")
                .expression_attribute_names("#sk", item::SITE_ID);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    Err(AppError::conflict(key, "row already exists"))
                } else {
                    Err(AppError::store(DisplayErrorContext(&service_err)))
                }
            }
        }
    }

    async fn update(&self, key: &SiteKey, update: &SiteUpdate) -> Result<()> {
        let review = match serde_json::to_value(&update.review)? {
            Value::Object(map) => AttributeValue::M(row_from_json(map)),
            other => attribute_from_json(other),
        };

        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(item::SPECIALTY_KEY, AttributeValue::S(key.specialty_key.clone()))
            .key(item::SITE_ID, AttributeValue::S(key.site_id.clone()))
            .update_expression(
                "SET #total = :next, #avg = :avg, \
                 #reviews = list_append(if_not_exists(#reviews, :empty), :review)",
            )
            .condition_expression("#total = :expected")
            .expression_attribute_names("#total", item::TOTAL_REVIEWS)
            .expression_attribute_names("#avg", item::AVERAGE_RATING)
            .expression_attribute_names("#reviews", item::REVIEWS)
            .expression_attribute_values(
                ":next",
                AttributeValue::N((update.expected_total + 1).to_string()),
            )
            .expression_attribute_values(
                ":expected",
                AttributeValue::N(update.expected_total.to_string()),
            )
            .expression_attribute_values(":avg", AttributeValue::N(update.average_rating.to_string()))
            .expression_attribute_values(":review", AttributeValue::L(vec![review]))
            .expression_attribute_values(":empty", AttributeValue::L(Vec::new()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    Err(AppError::conflict(
                        key.to_string(),
                        format!("totalReviews is no longer {}", update.expected_total),
                    ))
                } else {
                    Err(AppError::store(DisplayErrorContext(&service_err)))
                }
            }
        }
    }
}

/// A filter rendered as a DynamoDB filter expression.
#[derive(Debug, Clone, PartialEq)]
struct FilterExpression {
    expression: String,
    names: Vec<(String, &'static str)>,
    values: Vec<(String, String)>,
}

impl FilterExpression {
    fn build(filter: &ScanFilter) -> Option<Self> {
        if filter.conditions.is_empty() {
            return None;
        }

        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut clauses = Vec::new();

        for (i, condition) in filter.conditions.iter().enumerate() {
            let name = format!("#f{i}");
            let placeholder = format!(":v{i}");
            let (field, value, clause) = match condition {
                Condition::Contains { field, value } => {
                    (field, value, format!("contains({name}, {placeholder})"))
                }
                Condition::Equals { field, value } => {
                    (field, value, format!("{name} = {placeholder}"))
                }
            };
            names.push((name, field.attribute()));
            values.push((placeholder, value.clone()));
            clauses.push(clause);
        }

        let joiner = match filter.combine {
            Combine::All => " AND ",
            Combine::Any => " OR ",
        };

        Some(Self {
            expression: clauses.join(joiner),
            names,
            values,
        })
    }
}

fn row_from_json(map: Map<String, Value>) -> Row {
    map.into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect()
}

fn attribute_from_json(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => {
            AttributeValue::L(items.into_iter().map(attribute_from_json).collect())
        }
        Value::Object(map) => AttributeValue::M(row_from_json(map)),
    }
}

fn json_from_row(row: Row) -> Map<String, Value> {
    row.into_iter()
        .map(|(k, v)| (k, json_from_attribute(v)))
        .collect()
}

fn json_from_attribute(value: AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => number_from_str(&n),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::L(items) => Value::Array(items.into_iter().map(json_from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(json_from_row(map)),
        AttributeValue::Ss(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| number_from_str(n)).collect()),
        _ => Value::Null,
    }
}

fn number_from_str(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Review};
    use crate::storage::Field;

    #[test]
    fn fallback_filter_expression() {
        let filter = ScanFilter::any(vec![
            Condition::contains(Field::HospitalName, "St. Mary"),
            Condition::contains(Field::Location, "St. Mary"),
        ]);
        let expr = FilterExpression::build(&filter).unwrap();

        assert_eq!(expr.expression, "contains(#f0, :v0) OR contains(#f1, :v1)");
        assert_eq!(expr.names[0], ("#f0".to_string(), "hospitalNameKey"));
        assert_eq!(expr.names[1], ("#f1".to_string(), "locationKey"));
        assert_eq!(expr.values[0], (":v0".to_string(), "st. mary".to_string()));
    }

    #[test]
    fn equality_filter_expression() {
        let filter = ScanFilter::all(vec![
            Condition::equals(Field::HospitalName, "St. Mary"),
            Condition::contains(Field::State, "MA"),
        ]);
        let expr = FilterExpression::build(&filter).unwrap();
        assert_eq!(expr.expression, "#f0 = :v0 AND contains(#f1, :v1)");
    }

    #[test]
    fn empty_filter_has_no_expression() {
        assert!(FilterExpression::build(&ScanFilter::all(Vec::new())).is_none());
    }

    #[test]
    fn numbers_keep_integer_form() {
        assert_eq!(number_from_str("2"), Value::from(2));
        assert_eq!(number_from_str("3.5"), Value::from(3.5));
        assert_eq!(number_from_str("nan-ish"), Value::Null);
    }

    #[test]
    fn site_row_converts_through_attributes() {
        let site = RotationSite::from_first_review(
            "Cardiology",
            "St. Mary",
            Location::parse("Boston, MA"),
            Review::imported("r1", 4.5),
        );
        let row = row_from_json(item::to_item(&site).unwrap());

        assert_eq!(
            row.get(item::SPECIALTY_KEY),
            Some(&AttributeValue::S("cardiology".into()))
        );
        assert_eq!(row.get(item::TOTAL_REVIEWS), Some(&AttributeValue::N("1".into())));

        let decoded = item::from_item(Value::Object(json_from_row(row))).unwrap();
        assert_eq!(decoded, site);
    }
}
