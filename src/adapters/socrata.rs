use crate::config::{SocrataConfig, SocrataFieldMapping};
use crate::domain::{AdapterResult, Permit, PermitAdapter, PermitQuery};
use crate::utils::error::{PermitError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

const DEFAULT_MAX_RESULTS: u32 = 50;

/// Permit adapter for a Socrata open-data resource (the City of Austin
/// issued-permits dataset by default). Builds a SoQL `$where` clause from
/// the query and maps each returned row through the configured columns.
pub struct SocrataPermitAdapter {
    name: String,
    portal: String,
    endpoint: String,
    app_token: Option<String>,
    max_results: u32,
    promote_for_county: Option<String>,
    fields: SocrataFieldMapping,
    client: Client,
}

impl SocrataPermitAdapter {
    pub fn new(config: &SocrataConfig, client: Client) -> Self {
        Self {
            name: config.name.clone(),
            portal: config.portal.clone(),
            endpoint: config.endpoint.clone(),
            app_token: config.resolved_app_token().map(str::to_string),
            max_results: config.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            promote_for_county: config.promote_for_county.clone(),
            fields: config.field_mapping.clone(),
            client,
        }
    }

    /// SoQL filter for the query, or `None` when there is nothing to match on.
    pub fn build_where(&self, query: &PermitQuery) -> Option<String> {
        let mut clauses = Vec::new();

        if let Some(parcel) = query.parcel_id.as_deref() {
            clauses.push(format!("{} = '{}'", self.fields.parcel, soql_escape(parcel)));
        } else if let Some(street) = query.street() {
            // `%` and `_` are LIKE wildcards; a term made of them matches every row
            let street = street
                .replace(['%', '_'], " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !street.chars().any(char::is_alphanumeric) {
                return None;
            }
            clauses.push(format!(
                "upper({}) like '%{}%'",
                self.fields.address,
                soql_escape(&street.to_uppercase())
            ));
        } else {
            return None;
        }

        if let Some(after) = query.issued_after {
            clauses.push(format!(
                "{} >= '{}T00:00:00'",
                self.fields.issued_date,
                after.format("%Y-%m-%d")
            ));
        }
        // exclusive bound on the next day keeps sub-second timestamps of the last day
        if let Some(next_day) = query.issued_before.and_then(|before| before.succ_opt()) {
            clauses.push(format!(
                "{} < '{}T00:00:00'",
                self.fields.issued_date,
                next_day.format("%Y-%m-%d")
            ));
        }

        Some(clauses.join(" AND "))
    }

    fn map_row(&self, row: &Value) -> Option<Permit> {
        if !row.is_object() {
            return None;
        }

        Some(Permit {
            jurisdiction: self.name.clone(),
            portal: self.portal.clone(),
            permit_number: text_field(row, &self.fields.permit_number),
            permit_type: text_field(row, &self.fields.permit_type),
            status: text_field(row, &self.fields.status),
            description: text_field(row, &self.fields.description),
            address: text_field(row, &self.fields.address),
            issued_date: date_field(row, &self.fields.issued_date),
            applied_date: date_field(row, &self.fields.applied_date),
            link: link_field(row, &self.fields.link),
            raw: Some(row.clone()),
        })
    }
}

fn soql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

fn text_field(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD` or a floating timestamp such as `2024-01-05T00:00:00.000`.
fn date_field(row: &Value, column: &str) -> Option<NaiveDate> {
    let raw = row.get(column)?.as_str()?;
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Socrata URL columns come back either as a bare string or as `{ "url": ... }`.
fn link_field(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl PermitAdapter for SocrataPermitAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn portal(&self) -> &str {
        &self.portal
    }

    fn promote_for_county(&self) -> Option<&str> {
        self.promote_for_county.as_deref()
    }

    async fn search(&self, query: &PermitQuery) -> Result<AdapterResult> {
        let Some(filter) = self.build_where(query) else {
            tracing::debug!("{}: nothing to match on, skipping request", self.name);
            return Ok(AdapterResult::Empty);
        };

        tracing::debug!("Making Socrata request to {} with $where={}", self.endpoint, filter);

        let limit = self.max_results.to_string();
        let order = format!("{} DESC", self.fields.issued_date);
        let mut request = self.client.get(&self.endpoint).query(&[
            ("$where", filter.as_str()),
            ("$limit", limit.as_str()),
            ("$order", order.as_str()),
        ]);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("{} response status: {}", self.name, status);

        if !status.is_success() {
            return Err(PermitError::UpstreamStatus {
                adapter: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        let Value::Array(rows) = body else {
            return Err(PermitError::UnexpectedResponse {
                source_name: self.name.clone(),
                message: "expected a JSON array of rows".to_string(),
            });
        };

        let permits: Vec<Permit> = rows.iter().filter_map(|row| self.map_row(row)).collect();
        tracing::debug!("{} returned {} permits", self.name, permits.len());

        Ok(AdapterResult::from_permits(permits))
    }
}
