//! Catalog search properties: chunk coverage, pagination bounds and retries.

use std::collections::BTreeSet;

use gps_core::{
    catalog::{Catalog, CatalogError, DataHubClient, QueryField, SearchQuery, Snapshot},
    config::{CatalogConfig, Credentials},
    testing::{fixtures, ScriptedTransport},
};

fn config() -> CatalogConfig {
    CatalogConfig {
        retry_delay_secs: 0,
        ..CatalogConfig::default()
    }
}

fn client(config: CatalogConfig, transport: &ScriptedTransport) -> DataHubClient {
    DataHubClient::with_transport(config, Credentials::new("user", "pass"), transport.clone())
}

fn ids(found: &[Snapshot]) -> Vec<&str> {
    found.iter().map(|s| s.id.as_str()).collect()
}

#[tokio::test]
async fn test_chunk_coverage() {
    let filenames: Vec<String> = (0..7).map(|i| format!("S1A_IW_{:02}*", i)).collect();
    let transport = ScriptedTransport::new(vec![
        Ok(fixtures::feed_page(&["a"], 1)),
        Ok(fixtures::feed_page(&["b"], 1)),
        Ok(fixtures::feed_page(&["c"], 1)),
        Ok(fixtures::feed_page(&["unexpected"], 1)),
    ]);
    let client = client(
        CatalogConfig {
            chunk_size: 3,
            ..config()
        },
        &transport,
    );
    let query = SearchQuery::new().with_filenames(filenames.clone());

    let found = client.search(&query, None).await.unwrap();
    assert_eq!(ids(&found), vec!["a", "b", "c"]);

    // ceil(7 / 3) requests, covering every filename exactly once
    let requests = transport.requests().await;
    assert_eq!(requests.len(), 3);

    let queried: Vec<String> = requests
        .iter()
        .flat_map(|params| {
            fixtures::param(params, "q")
                .unwrap()
                .split(" OR ")
                .map(|term| term.trim_start_matches("filename:").to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(queried, filenames);
    assert_eq!(queried.iter().collect::<BTreeSet<_>>().len(), 7);
}

#[tokio::test]
async fn test_pagination_never_starts_past_total() {
    let transport = ScriptedTransport::new(vec![
        Ok(fixtures::feed_page(&["a", "b"], 5)),
        Ok(fixtures::feed_page(&["c", "d"], 5)),
        Ok(fixtures::feed_page(&["e"], 5)),
        Ok(fixtures::feed_page(&["unexpected"], 5)),
    ]);
    let client = client(config(), &transport);
    let query = SearchQuery {
        rows: 2,
        ..SearchQuery::new()
    };

    let found = client.search(&query, None).await.unwrap();
    assert_eq!(found.len(), 5);

    let requests = transport.requests().await;
    assert_eq!(requests.len(), 3);
    for params in &requests {
        let start: u64 = fixtures::param(params, "start").unwrap().parse().unwrap();
        assert!(start < 5);
    }
}

#[tokio::test]
async fn test_connectivity_errors_do_not_change_results() {
    let pages = || {
        vec![
            Ok(fixtures::feed_page(&["a", "b"], 4)),
            Ok(fixtures::feed_page(&["c", "d"], 4)),
        ]
    };
    let query = SearchQuery {
        rows: 2,
        ..SearchQuery::new()
    };

    let clean = ScriptedTransport::new(pages());
    let baseline = client(config(), &clean).search(&query, None).await.unwrap();

    let mut script: Vec<Result<_, CatalogError>> = (0..3)
        .map(|_| Err(CatalogError::Connectivity("timed out".to_string())))
        .collect();
    script.extend(pages());
    let flaky = ScriptedTransport::new(script);
    let retried = client(config(), &flaky).search(&query, None).await.unwrap();

    assert_eq!(ids(&retried), ids(&baseline));
    assert_eq!(ids(&retried), vec!["a", "b", "c", "d"]);
    assert_eq!(flaky.request_count().await, 5);
}

#[tokio::test]
async fn test_sample_scenario_stops_at_max_records() {
    let transport = ScriptedTransport::new(vec![
        Ok(fixtures::feed_page(&["A", "B", "C"], 3)),
        Ok(fixtures::feed_page(&["unexpected"], 3)),
    ]);
    let client = client(
        CatalogConfig {
            max_records: 3,
            ..config()
        },
        &transport,
    );
    let query = SearchQuery::new().with(QueryField::PlatformName, "X");

    let found = client
        .search(&query, Some("POLYGON((55 25,56 25,56 26,55 25))"))
        .await
        .unwrap();

    assert_eq!(ids(&found), vec!["A", "B", "C"]);
    let requests = transport.requests().await;
    assert_eq!(requests.len(), 1);

    let q = fixtures::param(&requests[0], "q").unwrap();
    assert!(q.contains("platformname:X"));
    assert!(q.contains("footprint:\"Intersects(POLYGON((55 25,56 25,56 26,55 25)))\""));
    assert_eq!(fixtures::param(&requests[0], "format").as_deref(), Some("json"));
}

#[tokio::test]
async fn test_filenames_take_precedence_over_area() {
    let transport = ScriptedTransport::new(vec![Ok(fixtures::feed_page(&["a"], 1))]);
    let client = client(config(), &transport);
    let query = SearchQuery::new()
        .with(QueryField::PlatformName, "Sentinel-2")
        .with_filenames(vec!["S2A_X*".to_string()]);

    client
        .search(&query, Some("POINT (55 25)"))
        .await
        .unwrap();

    let requests = transport.requests().await;
    assert_eq!(fixtures::param(&requests[0], "q").unwrap(), "filename:S2A_X*");
}
