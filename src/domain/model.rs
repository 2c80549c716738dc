use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One building permit, normalized across jurisdictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    pub jurisdiction: String,
    pub portal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit_number: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub permit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Permit {
    pub fn new(jurisdiction: impl Into<String>, portal: impl Into<String>) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            portal: portal.into(),
            permit_number: None,
            permit_type: None,
            status: None,
            description: None,
            address: None,
            issued_date: None,
            applied_date: None,
            link: None,
            raw: None,
        }
    }

    pub fn with_number(mut self, permit_number: impl Into<String>) -> Self {
        self.permit_number = Some(permit_number.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// City/county resolved from the free-form address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub city: Option<String>,
    pub county: Option<String>,
}

/// Search criteria for a single request. Build it with [`PermitQuery::parse`]
/// so that the address/parcel and date-order rules are enforced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermitQuery {
    pub address: Option<String>,
    pub parcel_id: Option<String>,
    pub issued_after: Option<NaiveDate>,
    pub issued_before: Option<NaiveDate>,
    pub location: ResolvedLocation,
}

impl PermitQuery {
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Street portion of the address: text before the first comma, without a
    /// trailing state/ZIP and without anything after the last street suffix
    /// ("100 Congress Ave Austin TX 78701" -> "100 Congress Ave").
    pub fn street(&self) -> Option<&str> {
        let segment = self.address.as_deref()?.split(',').next()?.trim();
        let words = word_ends(segment);
        if words.is_empty() {
            return None;
        }

        let mut keep = words.len();
        while keep > 1 && is_state_or_zip(words[keep - 1].1) {
            keep -= 1;
        }

        // 門牌號碼之後至少要有一個街名字，才把後面的字當成街道類型
        let named_from = words.iter().position(|(_, w)| !w.chars().all(|c| c.is_ascii_digit()));
        if let Some(named_from) = named_from {
            if let Some(last_suffix) = (named_from + 1..keep).rev().find(|&i| is_street_suffix(words[i].1)) {
                keep = last_suffix + 1;
            }
        }

        Some(&segment[..words[keep - 1].0])
    }
}

const STREET_SUFFIXES: &[&str] = &[
    "st", "street", "ave", "av", "avenue", "blvd", "boulevard", "rd", "road", "dr", "drive", "ln",
    "lane", "ct", "court", "way", "pkwy", "parkway", "hwy", "highway", "trl", "trail", "cir",
    "circle", "pl", "place", "loop", "cv", "cove", "ter", "terrace", "xing", "sq", "fwy",
];

/// (byte offset just past the word, word) for each whitespace-separated word.
fn word_ends(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((i, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((text.len(), &text[s..]));
    }
    words
}

fn is_state_or_zip(word: &str) -> bool {
    let word = word.trim_end_matches('.');
    if word.eq_ignore_ascii_case("tx") || word.eq_ignore_ascii_case("texas") {
        return true;
    }
    let (zip, plus4) = word.split_once('-').unwrap_or((word, ""));
    zip.len() == 5
        && zip.chars().all(|c| c.is_ascii_digit())
        && (plus4.is_empty() || (plus4.len() == 4 && plus4.chars().all(|c| c.is_ascii_digit())))
}

fn is_street_suffix(word: &str) -> bool {
    let word = word.trim_end_matches('.');
    STREET_SUFFIXES.iter().any(|suffix| suffix.eq_ignore_ascii_case(word))
}

/// What one jurisdiction's adapter produced for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterResult {
    Permits(Vec<Permit>),
    Empty,
    ManualCheck { url: String },
}

impl AdapterResult {
    /// Collapses an empty permit list into [`AdapterResult::Empty`].
    pub fn from_permits(permits: Vec<Permit>) -> Self {
        if permits.is_empty() {
            Self::Empty
        } else {
            Self::Permits(permits)
        }
    }
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub permits: Vec<Permit>,
    pub manual_check_urls: Vec<String>,
    pub checked: Vec<String>,
}

/// JSON body of `GET /search_permits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub permits: Vec<Permit>,
    pub manual_check_urls: Vec<String>,
    pub address_input: Option<String>,
    pub parcel_id: Option<String>,
    pub resolved_city: Option<String>,
    pub resolved_county: Option<String>,
    pub checked: Vec<String>,
}

impl SearchResponse {
    pub fn new(query: &PermitQuery, outcome: SearchOutcome) -> Self {
        Self {
            permits: outcome.permits,
            manual_check_urls: outcome.manual_check_urls,
            address_input: query.address.clone(),
            parcel_id: query.parcel_id.clone(),
            resolved_city: query.location.city.clone(),
            resolved_county: query.location.county.clone(),
            checked: outcome.checked,
        }
    }
}
