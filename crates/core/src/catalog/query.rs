//! Typed catalog search query.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::types::CatalogError;

/// Default page size.
pub const DEFAULT_ROWS: u32 = 100;

/// Catalog predicates recognized by the OpenSearch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryField {
    PlatformName,
    BeginPosition,
    EndPosition,
    IngestionDate,
    Collection,
    Filename,
    Footprint,
    OrbitNumber,
    LastOrbitNumber,
    RelativeOrbitNumber,
    LastRelativeOrbitNumber,
    OrbitDirection,
    PolarisationMode,
    ProductType,
    SensorOperationalMode,
    SwathIdentifier,
    CloudCoverPercentage,
    Timeliness,
}

impl QueryField {
    pub const ALL: [QueryField; 18] = [
        QueryField::PlatformName,
        QueryField::BeginPosition,
        QueryField::EndPosition,
        QueryField::IngestionDate,
        QueryField::Collection,
        QueryField::Filename,
        QueryField::Footprint,
        QueryField::OrbitNumber,
        QueryField::LastOrbitNumber,
        QueryField::RelativeOrbitNumber,
        QueryField::LastRelativeOrbitNumber,
        QueryField::OrbitDirection,
        QueryField::PolarisationMode,
        QueryField::ProductType,
        QueryField::SensorOperationalMode,
        QueryField::SwathIdentifier,
        QueryField::CloudCoverPercentage,
        QueryField::Timeliness,
    ];

    /// Name used in the `q` predicate.
    pub fn api_name(&self) -> &'static str {
        match self {
            QueryField::PlatformName => "platformname",
            QueryField::BeginPosition => "beginposition",
            QueryField::EndPosition => "endposition",
            QueryField::IngestionDate => "ingestiondate",
            QueryField::Collection => "collection",
            QueryField::Filename => "filename",
            QueryField::Footprint => "footprint",
            QueryField::OrbitNumber => "orbitnumber",
            QueryField::LastOrbitNumber => "lastorbitnumber",
            QueryField::RelativeOrbitNumber => "relativeorbitnumber",
            QueryField::LastRelativeOrbitNumber => "lastrelativeorbitnumber",
            QueryField::OrbitDirection => "orbitdirection",
            QueryField::PolarisationMode => "polarisationmode",
            QueryField::ProductType => "producttype",
            QueryField::SensorOperationalMode => "sensoroperationalmode",
            QueryField::SwathIdentifier => "swathidentifier",
            QueryField::CloudCoverPercentage => "cloudcoverpercentage",
            QueryField::Timeliness => "timeliness",
        }
    }

    /// Case-insensitive lookup (`platformName`, `PLATFORMNAME`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.api_name() == lower)
    }
}

/// Predefined search filters.
pub struct Filters;

impl Filters {
    pub fn radar() -> Vec<(QueryField, &'static str)> {
        vec![
            (QueryField::PlatformName, "Sentinel-1"),
            (QueryField::ProductType, "SLC"),
        ]
    }

    pub fn rgb() -> Vec<(QueryField, &'static str)> {
        vec![
            (QueryField::PlatformName, "Sentinel-2"),
            (QueryField::ProductType, "S2MSI2A"),
        ]
    }

    pub fn sentinel3() -> Vec<(QueryField, &'static str)> {
        vec![(QueryField::PlatformName, "Sentinel-3")]
    }
}

type PropertyMap = BTreeMap<String, Value>;

/// A catalog search: predicates, paging and the optional filename list.
///
/// When `filenames` is non-empty the search is driven by filename chunks
/// and every other predicate, footprint included, is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PropertyMap", into = "PropertyMap")]
pub struct SearchQuery {
    pub predicates: BTreeMap<QueryField, String>,
    pub filenames: Vec<String>,
    pub start: u32,
    pub rows: u32,
    pub orderby: Option<String>,
    /// Fields the catalog client does not recognize.
    pub extra: BTreeMap<String, String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            predicates: BTreeMap::new(),
            filenames: Vec::new(),
            start: 0,
            rows: DEFAULT_ROWS,
            orderby: None,
            extra: BTreeMap::new(),
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style predicate setter.
    pub fn with(mut self, field: QueryField, value: impl Into<String>) -> Self {
        self.predicates.insert(field, value.into());
        self
    }

    /// Apply a predefined filter.
    pub fn with_filter(mut self, filter: &[(QueryField, &str)]) -> Self {
        for (field, value) in filter {
            self.predicates.insert(*field, (*value).to_string());
        }
        self
    }

    pub fn with_filenames(mut self, filenames: Vec<String>) -> Self {
        self.filenames = filenames;
        self
    }

    /// The platform discriminator, if any.
    pub fn platform(&self) -> Option<&str> {
        self.predicates
            .get(&QueryField::PlatformName)
            .map(String::as_str)
    }

    /// Set one field by its catalog name. Returns `false` for keys that
    /// ended up in `extra`.
    pub fn set(&mut self, key: &str, value: &Value) -> bool {
        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "filenames" => {
                self.filenames = match value {
                    Value::Array(items) => items.iter().map(value_to_string).collect(),
                    _ => Vec::new(),
                };
                true
            }
            "start" => {
                if let Some(start) = value_to_u32(value) {
                    self.start = start;
                }
                true
            }
            "rows" => {
                // A zero page size would never advance `start`.
                match value_to_u32(value) {
                    Some(0) => warn!(field = %key, "Ignoring zero page size"),
                    Some(rows) => self.rows = rows,
                    None => {}
                }
                true
            }
            "orderby" => {
                self.orderby = Some(value_to_string(value));
                true
            }
            _ => match QueryField::parse(&lower) {
                Some(field) => {
                    self.predicates.insert(field, value_to_string(value));
                    true
                }
                None => {
                    self.extra.insert(key.to_string(), value_to_string(value));
                    false
                }
            },
        }
    }

    /// Copy of this query with area properties layered on top.
    pub fn merged_with<'a, I>(&self, properties: I) -> SearchQuery
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut query = self.clone();
        for (key, value) in properties {
            if !query.set(key, value) {
                debug!(field = %key, "Unrecognized search field kept as extra");
            }
        }
        query
    }

    /// Set the footprint from a WKT `POINT` or `POLYGON`.
    ///
    /// Other geometry types are rejected and the footprint is left as it was.
    pub fn set_area(&mut self, wkt: &str) -> Result<(), CatalogError> {
        let trimmed = wkt.trim();
        let mut split = trimmed.splitn(2, |c: char| c.is_whitespace() || c == '(');
        let kind = split.next().unwrap_or_default().to_ascii_lowercase();
        let rest = &trimmed[kind.len()..];

        if rest.trim().is_empty() {
            return Err(CatalogError::UnsupportedArea(trimmed.to_string()));
        }

        let footprint = match kind.as_str() {
            "polygon" => format!("\"Intersects({})\"", trimmed),
            "point" => format!("\"Intersects{}\"", rest.trim()),
            _ => return Err(CatalogError::UnsupportedArea(trimmed.to_string())),
        };
        self.predicates.insert(QueryField::Footprint, footprint);
        Ok(())
    }

    /// Compose the `q` predicate: ORed filenames for a chunk, otherwise the
    /// ANDed recognized predicates.
    pub fn compose_predicate(&self, chunk: Option<&[String]>, forward_extra: bool) -> String {
        if let Some(chunk) = chunk.filter(|c| !c.is_empty()) {
            return chunk
                .iter()
                .map(|name| format!("filename:{}", name))
                .collect::<Vec<_>>()
                .join(" OR ");
        }

        let mut parts: Vec<String> = self
            .predicates
            .iter()
            .map(|(field, value)| format!("{}:{}", field.api_name(), value))
            .collect();

        if forward_extra {
            parts.extend(self.extra.iter().map(|(k, v)| format!("{}:{}", k, v)));
        } else if !self.extra.is_empty() {
            debug!(fields = ?self.extra.keys().collect::<Vec<_>>(), "Dropping unrecognized search fields");
        }

        parts.join(" AND ")
    }

    /// Full request parameters for one page.
    pub fn request_params(
        &self,
        chunk: Option<&[String]>,
        start: u32,
        forward_extra: bool,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), self.compose_predicate(chunk, forward_extra)),
            ("start".to_string(), start.to_string()),
            ("rows".to_string(), self.rows.to_string()),
        ];
        if let Some(orderby) = &self.orderby {
            params.push(("orderby".to_string(), orderby.clone()));
        }
        params.push(("format".to_string(), "json".to_string()));
        params
    }
}

impl From<PropertyMap> for SearchQuery {
    fn from(map: PropertyMap) -> Self {
        SearchQuery::default().merged_with(map.iter())
    }
}

impl From<SearchQuery> for PropertyMap {
    fn from(query: SearchQuery) -> Self {
        let mut map = PropertyMap::new();
        for (field, value) in query.predicates {
            map.insert(field.api_name().to_string(), Value::String(value));
        }
        if !query.filenames.is_empty() {
            map.insert(
                "filenames".to_string(),
                Value::Array(query.filenames.into_iter().map(Value::String).collect()),
            );
        }
        map.insert("start".to_string(), Value::from(query.start));
        map.insert("rows".to_string(), Value::from(query.rows));
        if let Some(orderby) = query.orderby {
            map.insert("orderby".to_string(), Value::String(orderby));
        }
        for (key, value) in query.extra {
            map.entry(key).or_insert(Value::String(value));
        }
        map
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_parse_is_case_insensitive() {
        assert_eq!(QueryField::parse("platformName"), Some(QueryField::PlatformName));
        assert_eq!(QueryField::parse("CLOUDCOVERPERCENTAGE"), Some(QueryField::CloudCoverPercentage));
        assert_eq!(QueryField::parse("colour"), None);
    }

    #[test]
    fn test_set_partitions_fields() {
        let mut query = SearchQuery::new();
        assert!(query.set("platformName", &json!("Sentinel-2")));
        assert!(query.set("rows", &json!(20)));
        assert!(query.set("start", &json!("40")));
        assert!(query.set("orderby", &json!("beginposition asc")));
        assert!(query.set("relativeOrbitNumber", &json!(42)));
        assert!(!query.set("colour", &json!("blue")));

        assert_eq!(query.platform(), Some("Sentinel-2"));
        assert_eq!(query.rows, 20);
        assert_eq!(query.start, 40);
        assert_eq!(query.orderby.as_deref(), Some("beginposition asc"));
        assert_eq!(
            query.predicates.get(&QueryField::RelativeOrbitNumber).map(String::as_str),
            Some("42")
        );
        assert_eq!(query.extra.get("colour").map(String::as_str), Some("blue"));
    }

    #[test]
    fn test_filenames_require_a_list() {
        let mut query = SearchQuery::new();
        query.set("filenames", &json!(["a*", "b*"]));
        assert_eq!(query.filenames, vec!["a*", "b*"]);

        query.set("filenames", &json!("a*"));
        assert!(query.filenames.is_empty());
    }

    #[test]
    fn test_zero_rows_keeps_page_size() {
        let mut query = SearchQuery::new();
        query.set("rows", &json!(0));
        assert_eq!(query.rows, DEFAULT_ROWS);

        query.set("rows", &json!("0"));
        assert_eq!(query.rows, DEFAULT_ROWS);

        query.set("rows", &json!(25));
        assert_eq!(query.rows, 25);
    }

    #[test]
    fn test_merged_with_overrides_template() {
        let template = SearchQuery::new()
            .with(QueryField::PlatformName, "Sentinel-1")
            .with(QueryField::ProductType, "GRD");
        let properties = serde_json::Map::from_iter([
            ("platformName".to_string(), json!("Sentinel-2")),
            ("cloudCoverPercentage".to_string(), json!("[0 TO 30]")),
        ]);

        let merged = template.merged_with(properties.iter());
        assert_eq!(merged.platform(), Some("Sentinel-2"));
        assert_eq!(
            merged.predicates.get(&QueryField::ProductType).map(String::as_str),
            Some("GRD")
        );
        // Template untouched
        assert_eq!(template.platform(), Some("Sentinel-1"));
    }

    #[test]
    fn test_set_area_polygon_and_point() {
        let mut query = SearchQuery::new();
        query.set_area("POLYGON((0 0,1 0,1 1,0 0))").unwrap();
        assert_eq!(
            query.predicates.get(&QueryField::Footprint).unwrap(),
            "\"Intersects(POLYGON((0 0,1 0,1 1,0 0)))\""
        );

        query.set_area("POINT (10.5 20.25)").unwrap();
        assert_eq!(
            query.predicates.get(&QueryField::Footprint).unwrap(),
            "\"Intersects(10.5 20.25)\""
        );
    }

    #[test]
    fn test_set_area_rejects_other_geometries() {
        let mut query = SearchQuery::new().with(QueryField::Footprint, "\"Intersects(1 2)\"");
        let err = query.set_area("LINESTRING(0 0, 1 1)").unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedArea(_)));
        assert!(query.set_area("POLYGON").is_err());
        // Previous footprint retained
        assert_eq!(
            query.predicates.get(&QueryField::Footprint).unwrap(),
            "\"Intersects(1 2)\""
        );
    }

    #[test]
    fn test_compose_predicate_and() {
        let query = SearchQuery::new()
            .with(QueryField::PlatformName, "Sentinel-2")
            .with(QueryField::CloudCoverPercentage, "[0 TO 50]");
        assert_eq!(
            query.compose_predicate(None, false),
            "platformname:Sentinel-2 AND cloudcoverpercentage:[0 TO 50]"
        );
    }

    #[test]
    fn test_compose_predicate_chunk_ignores_footprint() {
        let query = SearchQuery::new()
            .with(QueryField::Footprint, "\"Intersects(1 2)\"")
            .with_filenames(vec!["A*".to_string(), "B*".to_string()]);
        let chunk = vec!["A*".to_string(), "B*".to_string()];
        assert_eq!(
            query.compose_predicate(Some(&chunk), false),
            "filename:A* OR filename:B*"
        );
    }

    #[test]
    fn test_extra_fields_forwarded_only_when_enabled() {
        let mut query = SearchQuery::new().with(QueryField::PlatformName, "Sentinel-3");
        query.set("instrumentshortname", &json!("OLCI"));

        assert_eq!(query.compose_predicate(None, false), "platformname:Sentinel-3");
        assert_eq!(
            query.compose_predicate(None, true),
            "platformname:Sentinel-3 AND instrumentshortname:OLCI"
        );
    }

    #[test]
    fn test_request_params_force_json() {
        let query = SearchQuery {
            orderby: Some("beginposition desc".to_string()),
            ..SearchQuery::new().with(QueryField::PlatformName, "Sentinel-1")
        };
        let params = query.request_params(None, 200, false);
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("start"), Some("200"));
        assert_eq!(get("rows"), Some("100"));
        assert_eq!(get("orderby"), Some("beginposition desc"));
        assert_eq!(get("format"), Some("json"));
    }

    #[test]
    fn test_serde_round_trip_through_map() {
        let json = r#"{"platformName": "Sentinel-2", "rows": 10, "filenames": ["x"], "foo": 1}"#;
        let query: SearchQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.platform(), Some("Sentinel-2"));
        assert_eq!(query.rows, 10);
        assert_eq!(query.filenames, vec!["x"]);
        assert_eq!(query.extra.get("foo").map(String::as_str), Some("1"));

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["platformname"], "Sentinel-2");
        assert_eq!(value["rows"], 10);
    }

    #[test]
    fn test_filters() {
        let query = SearchQuery::new().with_filter(&Filters::rgb());
        assert_eq!(query.platform(), Some("Sentinel-2"));
        assert_eq!(
            query.predicates.get(&QueryField::ProductType).map(String::as_str),
            Some("S2MSI2A")
        );
        let radar = SearchQuery::new().with_filter(&Filters::radar());
        assert_eq!(radar.platform(), Some("Sentinel-1"));
    }
}
