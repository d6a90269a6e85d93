//! Integration tests for the crawler
//!
//! These tests use wiremock to serve search pages and media files and run
//! the full crawl cycle end-to-end.

use serde_json::{json, Value};
use std::path::Path;
use tag_down::config::{parse_config, Config};
use tag_down::crawler::{run_tag_down, SEARCH_TIMELINE_PATH};
use tag_down::feed::TerminalReason;
use tag_down::output::StopReason;
use tag_down::{CredentialsError, TagDownError};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches search requests by the cursor in their `variables` parameter
struct CursorIs(&'static str);

impl Match for CursorIs {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .find(|(key, _)| key == "variables")
            .and_then(|(_, raw)| serde_json::from_str::<Value>(&raw).ok())
            .map_or(false, |vars| vars["cursor"] == self.0)
    }
}

fn create_test_config(server: &MockServer, root: &Path, search: &str) -> Config {
    parse_config(&format!(
        r#"
[search]
{search}

[auth]
cookie = "auth_token=token; ct0=csrf123;"

[download]
max-concurrent-requests = 4
output-root = "{root}"

[api]
base-url = "{base}"
"#,
        search = search,
        root = root.display(),
        base = server.uri()
    ))
    .expect("Failed to parse test config")
}

fn tweet(id: &str, media: Option<Value>) -> Value {
    let mut legacy = json!({
        "favorite_count": 5,
        "retweet_count": 1,
        "reply_count": 0,
        "conversation_id_str": id,
        "full_text": format!("post {} https://t.co/xyz", id)
    });
    if let Some(media) = media {
        legacy["extended_entities"] = json!({ "media": media });
    }

    json!({
        "core": { "user_results": { "result": { "legacy": {
            "name": "Poster",
            "screen_name": "poster"
        } } } },
        "edit_control": { "editable_until_msecs": "1700003600000" },
        "legacy": legacy
    })
}

fn image(base: &str, name: &str) -> Value {
    json!([{ "media_url_https": format!("{}/media/{}", base, name) }])
}

fn timeline_entry(entry_id: &str, tweet: Value) -> Value {
    json!({
        "entryId": entry_id,
        "content": { "itemContent": { "tweet_results": { "result": tweet } } }
    })
}

fn grid_item(tweet: Value) -> Value {
    json!({ "item": { "itemContent": { "tweet_results": { "result": tweet } } } })
}

fn cursor_entry(kind: &str, value: &str) -> Value {
    json!({ "entryId": format!("cursor-{}-0", kind), "content": { "value": value } })
}

fn response(instructions: Value) -> Value {
    json!({
        "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
            "instructions": instructions
        } } } }
    })
}

/// First page of the latest feed
fn latest_first_page(entries: Vec<Value>, next: &str) -> Value {
    let mut all = entries;
    all.push(cursor_entry("top", "TOP"));
    all.push(cursor_entry("bottom", next));
    response(json!([{ "type": "TimelineAddEntries", "entries": all }]))
}

/// A continuation page with nothing left
fn empty_continuation() -> Value {
    response(json!([
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("top", "TOP") },
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("bottom", "END") }
    ]))
}

async fn mount_page(server: &MockServer, cursor: &'static str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(SEARCH_TIMELINE_PATH))
        .and(CursorIs(cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex("^/media/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media-bytes".to_vec()))
        .mount(server)
        .await;
}

/// Data rows of the result log, after the banner and header rows
fn read_log(path: &Path) -> Vec<csv::StringRecord> {
    let content = std::fs::read(path).expect("Failed to read log");
    let content = content.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(&content);
    let rows: Vec<_> = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content)
        .records()
        .map(|r| r.expect("Invalid CSV row"))
        .collect();
    rows[2..].to_vec()
}

#[tokio::test]
async fn test_top_mode_single_page_covers_count() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = TempDir::new().unwrap();

    let first = response(json!([
        { "type": "TimelineAddEntries", "entries": [
            { "entryId": "search-grid-0", "content": { "items": [
                grid_item(tweet("1", Some(image(&base, "1.jpg")))),
                grid_item(tweet("2", Some(image(&base, "2.jpg")))),
                grid_item(tweet("3", Some(image(&base, "3.jpg")))),
            ] } },
            cursor_entry("top", "TOP"),
            cursor_entry("bottom", "NEXT"),
        ] }
    ]));

    Mock::given(method("GET"))
        .and(path(SEARCH_TIMELINE_PATH))
        .and(CursorIs(""))
        .and(header("x-csrf-token", "csrf123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .expect(1)
        .mount(&server)
        .await;
    mount_media(&server).await;

    let config = create_test_config(&server, root.path(), "tag = \"#cats\"\ndown-count = 50");
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.output_dir, root.path().join("#cats"));
    assert_eq!(outcome.stats.pages_requested, 1);
    assert_eq!(outcome.stats.downloads_completed, 3);
    assert_eq!(outcome.stats.stop_reason, StopReason::PageBudgetExhausted);

    let rows = read_log(&outcome.log_path);
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), 11);
        assert_eq!(&row[4], "Image");
        assert!(row[7].starts_with("post ") && !row[7].contains("t.co"));
        let saved = Path::new(&row[6]);
        assert!(saved.starts_with(&outcome.output_dir));
        assert_eq!(std::fs::read(saved).unwrap(), b"media-bytes");
    }

    // Full-resolution query on image requests
    let requests = server.received_requests().await.unwrap();
    let media_requests: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path().starts_with("/media/"))
        .collect();
    assert_eq!(media_requests.len(), 3);
    assert!(media_requests
        .iter()
        .all(|r| r.url.query() == Some("format=png&name=4096x4096")));
}

#[tokio::test]
async fn test_top_mode_follows_module_cursor() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = TempDir::new().unwrap();

    let first = response(json!([
        { "type": "TimelineAddEntries", "entries": [
            { "entryId": "search-grid-0", "content": { "items": [
                grid_item(tweet("1", Some(image(&base, "1.jpg")))),
            ] } },
            cursor_entry("top", "TOP"),
            cursor_entry("bottom", "PAGE2"),
        ] }
    ]));
    let second = response(json!([
        { "type": "TimelineAddToModule", "moduleItems": [
            { "entryId": "search-grid-0-tweet-2", "item": { "itemContent": { "tweet_results": {
                "result": tweet("2", Some(image(&base, "2.jpg")))
            } } } }
        ] },
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("top", "TOP") },
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("bottom", "PAGE3") }
    ]));

    mount_page(&server, "", first, 1).await;
    mount_page(&server, "PAGE2", second, 1).await;
    mount_media(&server).await;

    let config = create_test_config(&server, root.path(), "tag = \"#cats\"\ndown-count = 100");
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.pages_requested, 2);
    assert_eq!(outcome.stats.downloads_completed, 2);
    assert_eq!(read_log(&outcome.log_path).len(), 2);
}

#[tokio::test]
async fn test_terminal_continuation_stops_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = TempDir::new().unwrap();

    let video = json!([{
        "media_url_https": format!("{}/media/thumb.jpg", base),
        "video_info": { "variants": [
            { "bitrate": 500, "url": format!("{}/media/low.mp4", base) },
            { "bitrate": 1200, "url": format!("{}/media/high.mp4", base) }
        ] }
    }]);
    let first = latest_first_page(
        vec![
            timeline_entry("tweet-1", tweet("1", Some(video))),
            timeline_entry("tweet-2", tweet("2", None)),
        ],
        "C1",
    );

    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty_continuation(), 1).await;
    mount_media(&server).await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 100\nlatest = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.pages_requested, 2);
    assert_eq!(outcome.stats.without_media, 1);
    assert_eq!(
        outcome.stats.stop_reason,
        StopReason::TerminalPage(TerminalReason::NoResults)
    );

    let rows = read_log(&outcome.log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][4], "Video");
    assert_eq!(&rows[0][5], format!("{}/media/high.mp4", base));
    assert!(rows[0][6].ends_with(".mp4"));
}

#[tokio::test]
async fn test_text_mode_unwraps_nested_tweet() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let wrapped = json!({
        "__typename": "TweetWithVisibilityResults",
        "tweet": tweet("10", None)
    });
    let malformed = json!({ "legacy": { "full_text": "no author" } });
    let first = latest_first_page(
        vec![
            timeline_entry("tweet-10", wrapped),
            timeline_entry("promoted-tweet-11", tweet("11", None)),
            timeline_entry("tweet-12", malformed),
        ],
        "C1",
    );

    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty_continuation(), 1).await;

    let config = create_test_config(
        &server,
        root.path(),
        "filter = \"since:2025-03-27\"\ndown-count = 100\ntext-only = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.output_dir, root.path().join("since20250327"));
    assert_eq!(outcome.stats.entries_seen, 3);
    assert_eq!(outcome.stats.promoted_skipped, 1);
    assert_eq!(outcome.stats.malformed_skipped, 1);
    assert_eq!(outcome.stats.records_written, 1);

    let rows = read_log(&outcome.log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 8);
    assert_eq!(&rows[0][2], "@poster");
    assert_eq!(&rows[0][3], "https://twitter.com/@poster/status/10");
    assert_eq!(&rows[0][4], "post 10 ");
}

#[tokio::test]
async fn test_flaky_download_logged_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = TempDir::new().unwrap();

    let first = latest_first_page(
        vec![timeline_entry(
            "tweet-1",
            tweet("1", Some(image(&base, "flaky.jpg"))),
        )],
        "C1",
    );
    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty_continuation(), 1).await;

    Mock::given(method("GET"))
        .and(path("/media/flaky.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/flaky.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"finally".to_vec()))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 40\nlatest = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.downloads_completed, 1);
    assert_eq!(outcome.stats.download_retries, 2);

    let rows = read_log(&outcome.log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(std::fs::read(&rows[0][6]).unwrap(), b"finally");
}

#[tokio::test]
async fn test_invalid_cookie_fails_before_network() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let mut config = create_test_config(&server, root.path(), "tag = \"#cats\"\ndown-count = 50");
    config.auth.cookie = "auth_token=token;".to_string();

    let result = run_tag_down(&config).await;
    assert!(matches!(
        result,
        Err(TagDownError::Credentials(CredentialsError::MissingField("ct0")))
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!root.path().join("#cats").exists());
}

#[tokio::test]
async fn test_failed_page_request_still_closes_log() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = create_test_config(&server, root.path(), "tag = \"#cats\"\ndown-count = 50");
    let result = run_tag_down(&config).await;
    assert!(matches!(result, Err(TagDownError::Status { status: 401, .. })));

    let logs: Vec<_> = std::fs::read_dir(root.path().join("#cats"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(read_log(&logs[0]).is_empty());
}

#[tokio::test]
async fn test_unrecognized_response_ends_gracefully() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_page(
        &server,
        "",
        json!({ "errors": [{ "message": "Something changed" }] }),
        1,
    )
    .await;

    let config = create_test_config(&server, root.path(), "tag = \"#cats\"\ndown-count = 100");
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(
        outcome.stats.stop_reason,
        StopReason::TerminalPage(TerminalReason::UnrecognizedShape)
    );
    assert_eq!(outcome.stats.records_written, 0);
}

/// Catches any search request no other mock claimed
async fn mount_unexpected_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SEARCH_TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_continuation()))
        .with_priority(10)
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_media_page_without_media_stops_crawl() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let first = latest_first_page(
        vec![
            timeline_entry("tweet-1", tweet("1", None)),
            timeline_entry("tweet-2", tweet("2", None)),
        ],
        "C1",
    );
    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty_continuation(), 0).await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 100\nlatest = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.stop_reason, StopReason::NoMedia);
    assert_eq!(outcome.stats.pages_requested, 1);
    assert_eq!(outcome.stats.without_media, 2);
    assert!(read_log(&outcome.log_path).is_empty());
}

#[tokio::test]
async fn test_page_without_cursor_stops_crawl() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let first = response(json!([
        { "type": "TimelineAddEntries", "entries": [
            timeline_entry("tweet-1", tweet("1", None)),
            cursor_entry("top", "TOP"),
            { "entryId": "cursor-bottom-0", "content": {} },
        ] }
    ]));
    Mock::given(method("GET"))
        .and(path(SEARCH_TIMELINE_PATH))
        .and(CursorIs(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unexpected_pages(&server).await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 100\ntext-only = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.stop_reason, StopReason::NoCursor);
    assert_eq!(outcome.stats.pages_requested, 1);
    assert_eq!(outcome.stats.records_written, 1);
    assert_eq!(read_log(&outcome.log_path).len(), 1);
}

#[tokio::test]
async fn test_page_without_entries_stops_crawl() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let first = latest_first_page(vec![timeline_entry("tweet-1", tweet("1", None))], "C1");
    let empty = response(json!([
        { "type": "TimelineAddEntries", "entries": [] },
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("top", "TOP") },
        { "type": "TimelineReplaceEntry", "entry": cursor_entry("bottom", "C2") }
    ]));
    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty, 1).await;
    mount_page(&server, "C2", empty_continuation(), 0).await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 100\ntext-only = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.stop_reason, StopReason::NoEntries);
    assert_eq!(outcome.stats.pages_requested, 2);
    assert_eq!(outcome.stats.records_written, 1);
}

#[tokio::test]
async fn test_unresolvable_video_keeps_sibling_image() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = TempDir::new().unwrap();

    let media = json!([
        { "media_url_https": format!("{}/media/kept.jpg", base) },
        { "video_info": { "variants": [
            { "url": format!("{}/media/a.m3u8", base) },
            { "url": format!("{}/media/b.m3u8", base) }
        ] } }
    ]);
    let first = latest_first_page(vec![timeline_entry("tweet-1", tweet("1", Some(media)))], "C1");
    mount_page(&server, "", first, 1).await;
    mount_page(&server, "C1", empty_continuation(), 1).await;
    mount_media(&server).await;

    let config = create_test_config(
        &server,
        root.path(),
        "tag = \"#cats\"\ndown-count = 40\nlatest = true",
    );
    let outcome = run_tag_down(&config).await.expect("Crawl failed");

    assert_eq!(outcome.stats.downloads_completed, 1);
    assert_eq!(outcome.stats.media_unresolved, 1);
    assert_eq!(outcome.stats.malformed_skipped, 0);

    let rows = read_log(&outcome.log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][4], "Image");
    assert_eq!(&rows[0][5], format!("{}/media/kept.jpg", base));
}
