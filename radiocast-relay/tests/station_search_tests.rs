//! radio-browser client against a local stand-in directory
//!
//! Serves canned `json/stations/search` responses from an axum server on an
//! ephemeral port and checks what the client asks for and what it keeps.

use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use radiocast_relay::search::{RadioBrowserClient, StationDirectory, StationSearch, MAX_RESULTS};
use radiocast_relay::Error;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SEARCH_PATH: &str = "/json/stations/search";

type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Twelve matching stations, one of them without a resolved URL
fn directory_listing(name: &str) -> Value {
    let mut stations: Vec<Value> = (1..=11)
        .map(|i| {
            json!({
                "changeuuid": format!("c-{}", i),
                "name": format!("{} {}", name, i),
                "url": format!("http://stations.example/{}.pls", i),
                "url_resolved": format!("http://stream.example/{}", i),
                "codec": "MP3",
                "bitrate": 128,
            })
        })
        .collect();
    stations.insert(
        1,
        json!({"name": format!("{} dead", name), "url": "http://stations.example/dead.pls", "url_resolved": ""}),
    );
    Value::Array(stations)
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}{}", addr, SEARCH_PATH)
}

async fn start_directory() -> (String, SeenQueries) {
    let seen: SeenQueries = Arc::default();
    let recorded = Arc::clone(&seen);
    let router = Router::new().route(
        SEARCH_PATH,
        get(move |Query(params): Query<HashMap<String, String>>| {
            let recorded = Arc::clone(&recorded);
            async move {
                let name = params.get("name").cloned().unwrap_or_default();
                recorded.lock().unwrap().push(params);
                Json(directory_listing(&name))
            }
        }),
    );
    (serve(router).await, seen)
}

#[tokio::test]
async fn test_client_sends_name_and_limit() {
    let (endpoint, seen) = start_directory().await;
    let client = RadioBrowserClient::new(endpoint, Duration::from_secs(5)).unwrap();

    let hits = client.search("jazz fm", MAX_RESULTS).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("name").map(String::as_str), Some("jazz fm"));
    assert_eq!(seen[0].get("limit").map(String::as_str), Some("10"));

    assert_eq!(hits.len(), MAX_RESULTS);
    assert_eq!(hits[0].name, "jazz fm 1");
    assert_eq!(hits[0].url, "http://stream.example/1");
}

#[tokio::test]
async fn test_search_keeps_ten_playable_results_in_order() {
    let (endpoint, _) = start_directory().await;
    let client = RadioBrowserClient::new(endpoint, Duration::from_secs(5)).unwrap();
    let search = StationSearch::new(Arc::new(client));

    let hits = search.search("listener", "samba").await.unwrap();

    // The entry without a stream URL is dropped, the rest keep their order
    assert_eq!(hits.len(), MAX_RESULTS - 1);
    assert_eq!(hits[0].url, "http://stream.example/1");
    assert_eq!(hits[1].url, "http://stream.example/2");
    assert_eq!(search.pick("listener", 2).unwrap().name, "samba 2");
}

#[tokio::test]
async fn test_directory_error_status_is_search_failure() {
    let router = Router::new().route(
        SEARCH_PATH,
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let endpoint = serve(router).await;
    let client = RadioBrowserClient::new(endpoint, Duration::from_secs(5)).unwrap();

    match client.search("anything", MAX_RESULTS).await {
        Err(Error::SearchFailed(reason)) => {
            assert!(reason.contains("503"), "{}", reason);
            assert!(reason.contains("maintenance"), "{}", reason);
        }
        other => panic!("expected SearchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreadable_directory_body_is_search_failure() {
    let router = Router::new().route(SEARCH_PATH, get(|| async { "<html>not json</html>" }));
    let endpoint = serve(router).await;
    let client = RadioBrowserClient::new(endpoint, Duration::from_secs(5)).unwrap();

    assert!(matches!(
        client.search("anything", MAX_RESULTS).await,
        Err(Error::SearchFailed(_))
    ));
}

#[tokio::test]
async fn test_slow_directory_times_out() {
    let router = Router::new().route(
        SEARCH_PATH,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let endpoint = serve(router).await;
    let client = RadioBrowserClient::new(endpoint, Duration::from_millis(100)).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.search("anything", MAX_RESULTS),
    )
    .await
    .expect("client timeout did not fire");
    assert!(matches!(result, Err(Error::SearchFailed(_))));
}
