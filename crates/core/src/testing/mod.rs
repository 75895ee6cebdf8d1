//! Testing utilities and mock implementations.
//!
//! Every external seam (catalog, feed transport, object store, origin
//! downloader, processors) has an in-memory double here so a whole cycle
//! can run without network access or GDAL.
//!
//! # Example
//!
//! ```rust,ignore
//! use gps_core::testing::{fixtures, MockCatalog, MockBlobStore};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_results(vec![fixtures::snapshot("a", "S2A_A", "2021-01-01T00:00:00Z")]).await;
//!
//! let store = MockBlobStore::new();
//! store.insert("input/field/area.geojson", b"{}".to_vec()).await;
//! ```

mod mock_catalog;
mod mock_downloader;
mod mock_processor;
mod mock_store;
mod scripted_transport;

pub use mock_catalog::{MockCatalog, RecordedSearch};
pub use mock_downloader::MockOriginDownloader;
pub use mock_processor::MockProcessor;
pub use mock_store::MockBlobStore;
pub use scripted_transport::ScriptedTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};

    use crate::catalog::Snapshot;

    fn timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|e| panic!("bad fixture timestamp {}: {}", raw, e))
    }

    /// A snapshot acquired over ten seconds starting at `begin`.
    pub fn snapshot(id: &str, title: &str, begin: &str) -> Snapshot {
        let begin_position = timestamp(begin);
        Snapshot {
            id: id.to_string(),
            link: format!("https://catalog.test/odata/v1/Products('{}')/$value", id),
            icon: None,
            size: Some("1.09 GB".to_string()),
            title: title.to_string(),
            footprint: None,
            begin_position,
            end_position: begin_position + chrono::TimeDelta::seconds(10),
            ingestion_date: None,
            cloud_coverage: None,
            instrument: None,
        }
    }

    /// One feed entry in the catalog's JSON shape.
    pub fn feed_entry(id: &str, title: &str, begin: &str) -> Value {
        let end = (timestamp(begin) + chrono::TimeDelta::seconds(10)).to_rfc3339();
        json!({
            "id": id,
            "title": title,
            "link": [
                {"href": format!("https://catalog.test/odata/v1/Products('{}')/$value", id)},
                {"rel": "icon", "href": format!("https://catalog.test/icon/{}", id)}
            ],
            "str": [
                {"name": "size", "content": "1.09 GB"},
                {"name": "footprint", "content": "MULTIPOLYGON (((55.0 25.0, 56.0 25.0, 56.0 26.0, 55.0 25.0)))"},
                {"name": "instrumentshortname", "content": "MSI"}
            ],
            "double": {"name": "cloudcoverpercentage", "content": 12.5},
            "date": [
                {"name": "beginposition", "content": begin},
                {"name": "endposition", "content": end},
                {"name": "ingestiondate", "content": end}
            ]
        })
    }

    /// A feed page with one entry per id and the given total.
    pub fn feed_page(ids: &[&str], total: u64) -> Value {
        let entries: Vec<Value> = ids
            .iter()
            .map(|id| feed_entry(id, &format!("S2A_MSIL1C_{}", id), "2021-01-01T10:00:00Z"))
            .collect();
        json!({
            "feed": {
                "opensearch:totalResults": total.to_string(),
                "entry": entries
            }
        })
    }

    /// Value of a request parameter.
    pub fn param(params: &[(String, String)], key: &str) -> Option<String> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}
