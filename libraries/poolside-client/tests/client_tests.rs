//! Tests for the Poolside client.
//!
//! These tests use mock servers to verify request construction, status
//! handling and timeouts without touching the real API.

use poolside_client::{ClientConfig, ClientError, PoolsideClient};
use poolside_playback::{Catalog, PlaybackError, Remote};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_PATH: &str = "/v1/get_tracks_by_playlist";
const STREAM_PATH: &str = "/v2/get_sc_mp3_stream";

fn client_for(server: &MockServer) -> PoolsideClient {
    let config = ClientConfig {
        catalog_url: format!("{}{}", server.uri(), CATALOG_PATH),
        stream_url: format!("{}{}", server.uri(), STREAM_PATH),
        catalog_timeout: Duration::from_millis(500),
        stream_timeout: Some(Duration::from_millis(500)),
        ..ClientConfig::default()
    };
    PoolsideClient::new(config).unwrap()
}

fn catalog_body() -> serde_json::Value {
    serde_json::json!({
        "payload": [
            {
                "name": "Poolside FM",
                "slug": "poolside-fm",
                "order": 0,
                "isCustom": false,
                "total_tracks": 1,
                "tracks_in_order": [
                    { "soundcloud_id": 42, "artist": "Artist", "title": "Title" }
                ]
            }
        ]
    })
}

// =============================================================================
// Catalog Tests
// =============================================================================

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_fetches_catalog_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CATALOG_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).fetch_catalog().await.unwrap();
        let catalog = Catalog::from_json(&body).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.playlists()[0].tracks[0].id, 42);
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CATALOG_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client.catalog().await {
            Err(ClientError::ServerError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }

        let result = client.fetch_catalog().await;
        assert!(matches!(result, Err(PlaybackError::Network(_))));
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CATALOG_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(catalog_body())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        match client_for(&server).catalog().await {
            Err(ClientError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let config = ClientConfig {
            catalog_url: "http://127.0.0.1:9/v1/get_tracks_by_playlist".into(),
            catalog_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let client = PoolsideClient::new(config).unwrap();

        let result = client.fetch_catalog().await;
        assert!(matches!(result, Err(PlaybackError::Network(_))));
    }
}

// =============================================================================
// Track Stream Tests
// =============================================================================

mod track_stream {
    use super::*;

    #[tokio::test]
    async fn test_passes_track_id_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STREAM_PATH))
            .and(query_param("track_id", "123456"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFB, 0x90, 0x00]))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).fetch_track(123_456).await.unwrap();

        assert_eq!(body.as_ref(), &[0xFF, 0xFB, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_missing_track_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_track(1).await;

        match result {
            Err(PlaybackError::Network(msg)) => assert!(msg.contains("404")),
            other => panic!("Expected network error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn test_configured_stream_timeout_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_track(7).await;
        assert!(matches!(result, Err(PlaybackError::Network(_))));
    }
}
