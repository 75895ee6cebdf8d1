//! Decoding of OpenSearch JSON feed pages.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::types::{CatalogError, Snapshot};

/// One decoded page.
#[derive(Debug)]
pub struct FeedPage {
    /// `opensearch:totalResults`, when present.
    pub total: Option<u64>,
    pub entries: Vec<Snapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: Option<String>,
    rel: Option<String>,
    content: Option<Value>,
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    link: OneOrMany<RawField>,
    #[serde(default, rename = "str")]
    strings: OneOrMany<RawField>,
    #[serde(default)]
    date: OneOrMany<RawField>,
    #[serde(default)]
    double: OneOrMany<RawField>,
}

/// Look up a field by `name` (returning its content) or by `rel`
/// (returning its href).
fn lookup(fields: &[RawField], key: &str) -> Option<String> {
    fields.iter().find_map(|field| {
        if field.name.as_deref() == Some(key) {
            field.content.as_ref().map(content_to_string)
        } else if field.rel.as_deref() == Some(key) {
            field.href.clone()
        } else {
            None
        }
    })
}

fn content_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse catalog timestamps: RFC 3339, or naive ISO-8601 taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_total(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a page. `Ok(None)` means the response has no entries at all,
/// which ends pagination.
pub fn parse_feed(body: &Value) -> Result<Option<FeedPage>, CatalogError> {
    let Some(feed) = body.get("feed") else {
        return Ok(None);
    };
    let total = feed.get("opensearch:totalResults").and_then(parse_total);

    let raw_entries = match feed.get("entry") {
        None => return Ok(None),
        Some(Value::Array(items)) => items.as_slice(),
        Some(object @ Value::Object(_)) => std::slice::from_ref(object),
        Some(other) => {
            return Err(CatalogError::MalformedResponse(format!(
                "unexpected feed entry type: {}",
                other
            )))
        }
    };

    let entries = raw_entries
        .iter()
        .map(parse_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(FeedPage { total, entries }))
}

/// Decode one entry into a [`Snapshot`].
pub fn parse_entry(value: &Value) -> Result<Snapshot, CatalogError> {
    let hint = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();
    let invalid = |reason: String| CatalogError::InvalidEntry {
        id: hint.clone(),
        reason,
    };

    let raw: RawEntry =
        serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;

    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("missing id".to_string()))?;
    let title = raw
        .title
        .ok_or_else(|| invalid("missing title".to_string()))?;
    let link = raw
        .link
        .as_slice()
        .first()
        .and_then(|l| l.href.clone())
        .ok_or_else(|| invalid("missing link".to_string()))?;
    let icon = lookup(raw.link.as_slice(), "icon");

    let strings = raw.strings.as_slice();
    let dates = raw.date.as_slice();

    let date = |key: &str| -> Result<Option<DateTime<Utc>>, CatalogError> {
        match lookup(dates, key) {
            None => Ok(None),
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| invalid(format!("unparseable {}: {}", key, raw))),
        }
    };

    let begin_position =
        date("beginposition")?.ok_or_else(|| invalid("missing beginposition".to_string()))?;
    let end_position =
        date("endposition")?.ok_or_else(|| invalid("missing endposition".to_string()))?;
    if begin_position > end_position {
        return Err(invalid(format!(
            "beginposition {} is after endposition {}",
            begin_position, end_position
        )));
    }

    let cloud_coverage = lookup(raw.double.as_slice(), "cloudcoverpercentage")
        .and_then(|c| c.trim().parse::<f64>().ok());

    Ok(Snapshot {
        id,
        link,
        icon,
        size: lookup(strings, "size"),
        title,
        footprint: lookup(strings, "footprint"),
        begin_position,
        end_position,
        ingestion_date: date("ingestiondate")?,
        cloud_coverage,
        instrument: lookup(strings, "instrumentshortname"),
    })
}
