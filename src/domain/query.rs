use crate::domain::model::{PermitQuery, ResolvedLocation};
use crate::utils::error::{PermitError, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Raw query-string parameters, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub address: Option<String>,
    pub parcel: Option<String>,
    pub issued_after: Option<String>,
    pub issued_before: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                PermitError::invalid_query(format!("{} must be a date in YYYY-MM-DD form", field))
            }),
    }
}

impl PermitQuery {
    pub fn parse(params: SearchParams) -> Result<Self> {
        let address = non_blank(params.address);
        let parcel_id = non_blank(params.parcel);

        if address.is_none() && parcel_id.is_none() {
            return Err(PermitError::invalid_query("address or parcel is required"));
        }

        let issued_after = parse_date("issued_after", params.issued_after)?;
        let issued_before = parse_date("issued_before", params.issued_before)?;

        if let (Some(after), Some(before)) = (issued_after, issued_before) {
            if after > before {
                return Err(PermitError::invalid_query(
                    "issued_after must not be later than issued_before",
                ));
            }
        }

        Ok(Self {
            address,
            parcel_id,
            issued_after,
            issued_before,
            location: ResolvedLocation::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(address: Option<&str>, parcel: Option<&str>) -> SearchParams {
        SearchParams {
            address: address.map(str::to_string),
            parcel: parcel.map(str::to_string),
            ..SearchParams::default()
        }
    }

    #[test]
    fn test_address_is_trimmed() {
        let query = PermitQuery::parse(params(Some("  100 Congress Ave, Austin, TX "), None)).unwrap();
        assert_eq!(query.address.as_deref(), Some("100 Congress Ave, Austin, TX"));
        assert_eq!(query.street(), Some("100 Congress Ave"));
        assert!(query.parcel_id.is_none());
    }

    #[test]
    fn test_parcel_alone_is_enough() {
        let query = PermitQuery::parse(params(None, Some("0206030101"))).unwrap();
        assert_eq!(query.parcel_id.as_deref(), Some("0206030101"));
        assert!(query.street().is_none());
    }

    #[test]
    fn test_blank_address_and_parcel_rejected() {
        let err = PermitQuery::parse(params(Some("   "), Some(""))).unwrap_err();
        assert!(matches!(err, PermitError::InvalidQuery { .. }));
    }

    #[test]
    fn test_date_bounds() {
        let mut p = params(Some("1 Main St"), None);
        p.issued_after = Some("2024-01-01".to_string());
        p.issued_before = Some("2024-06-30".to_string());
        let query = PermitQuery::parse(p).unwrap();
        assert_eq!(query.issued_after, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.issued_before, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_inverted_date_bounds_rejected() {
        let mut p = params(Some("1 Main St"), None);
        p.issued_after = Some("2024-07-01".to_string());
        p.issued_before = Some("2024-06-30".to_string());
        assert!(PermitQuery::parse(p).is_err());
    }

    #[test]
    fn test_malformed_date_rejected() {
        let mut p = params(Some("1 Main St"), None);
        p.issued_after = Some("06/30/2024".to_string());
        let err = PermitQuery::parse(p).unwrap_err();
        assert!(err.to_string().contains("issued_after"));
    }
}
