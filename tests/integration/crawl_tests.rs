//! End-to-end crawl tests
//!
//! These tests use wiremock to serve pages and run real engines over a
//! file-backed database until the queue drains.

use crate::common::{page_linking_to, test_engine, TestDatabase};
use hostgraph::config::SchedulingMode;
use hostgraph::requests::{crawl_results, crawl_status, create_crawl_request};
use hostgraph::storage::{lock, share, Storage};
use hostgraph::TaskStatus;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn expected(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs
        .iter()
        .map(|(host, count)| (host.to_string(), *count))
        .collect()
}

async fn mount_page(server: &MockServer, page: &str, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_linking_to(hrefs)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_one_level_crawl_counts_linked_hosts() {
    for scheduling in [SchedulingMode::Batch, SchedulingMode::Continuous] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_linking_to(&["http://b.test/", "http://c.test/"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let db = TestDatabase::new();
        let mut storage = db.open();
        let id = create_crawl_request(&mut storage, &server.uri(), 1).unwrap();
        let storage = share(storage);

        let summary = test_engine(&storage, scheduling)
            .run_until_idle(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.claimed, 3);
        assert_eq!(summary.completed, 3);

        let storage = lock(&storage);
        let tasks = storage.list_tasks(id).unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
        assert!(tasks[1..].iter().all(|t| t.current_level == 1));

        let status = crawl_status(&*storage, id).unwrap();
        assert_eq!(status.completed, 1);
        assert_eq!(status.failed, 0);
        assert_eq!(status.total, 1);

        let results = crawl_results(&*storage, id).unwrap();
        assert_eq!(results, expected(&[("b.test", 1), ("c.test", 1)]));
    }
}

#[tokio::test]
async fn test_depth_zero_never_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, &server.uri(), 0).unwrap();
    let storage = share(storage);

    test_engine(&storage, SchedulingMode::Batch)
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();

    let storage = lock(&storage);
    let tasks = storage.list_tasks(id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Completed);
    assert_eq!(storage.count_pages().unwrap(), 0);

    // The root task sits at the bound, so nothing counts as progress
    assert_eq!(crawl_status(&*storage, id).unwrap().total, 0);
    assert!(crawl_results(&*storage, id).unwrap().is_empty());
}

#[tokio::test]
async fn test_second_request_reuses_graph() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page_linking_to(&["http://b.test/"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let db = TestDatabase::new();
    let storage = share(db.open());
    let engine = test_engine(&storage, SchedulingMode::Batch);

    let first = create_crawl_request(&mut *lock(&storage), &server.uri(), 1).unwrap();
    engine
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();

    let second = create_crawl_request(&mut *lock(&storage), &server.uri(), 1).unwrap();
    engine
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();

    let storage = lock(&storage);
    assert_eq!(storage.count_edges().unwrap(), 1);
    for id in [first, second] {
        let results = crawl_results(&*storage, id).unwrap();
        assert_eq!(results, expected(&[("b.test", 1)]));
    }
}

#[tokio::test]
async fn test_failed_root_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, &server.uri(), 2).unwrap();
    let storage = share(storage);

    let summary = test_engine(&storage, SchedulingMode::Batch)
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);

    let storage = lock(&storage);
    let status = crawl_status(&*storage, id).unwrap();
    assert_eq!(status.failed, 1);
    assert_eq!(status.completed, 0);
    assert_eq!(status.total, 1);

    // Failed work is terminal, so results are available (and empty)
    assert!(crawl_results(&*storage, id).unwrap().is_empty());
    assert_eq!(storage.list_tasks(id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_links_back_to_origin_are_not_counted() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/about", "http://b.test/", "/#top"]).await;

    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, &server.uri(), 1).unwrap();
    let storage = share(storage);

    test_engine(&storage, SchedulingMode::Batch)
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();

    let storage = lock(&storage);
    let tasks = storage.list_tasks(id).unwrap();
    assert_eq!(tasks.len(), 4);

    // "/#top" resolves to the root itself, which this request already has
    let root_again = &tasks[3];
    assert_eq!(root_again.page_url, tasks[0].page_url);
    assert!(root_again.seen_url);

    let results = crawl_results(&*storage, id).unwrap();
    assert_eq!(results, expected(&[("b.test", 1)]));
}

#[tokio::test]
async fn test_two_level_crawl_marks_seen_children() {
    let server = MockServer::start().await;
    let page1 = format!("{}/page1", server.uri());
    mount_page(&server, "/", &[&page1, "/page1#again"]).await;
    mount_page(&server, "/page1", &["http://d.test/"]).await;

    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, &server.uri(), 2).unwrap();
    let storage = share(storage);

    test_engine(&storage, SchedulingMode::Continuous)
        .run_until_idle(CancellationToken::new())
        .await
        .unwrap();

    let storage = lock(&storage);
    let tasks = storage.list_tasks(id).unwrap();

    let level1: Vec<_> = tasks.iter().filter(|t| t.current_level == 1).collect();
    assert_eq!(level1.len(), 2);
    assert_eq!(level1.iter().filter(|t| t.seen_url).count(), 1);

    let level2: Vec<_> = tasks.iter().filter(|t| t.current_level == 2).collect();
    assert_eq!(level2.len(), 2);
    assert!(level2.iter().all(|t| t.page_url == "http://d.test/"));
    assert_eq!(level2.iter().filter(|t| t.seen_url).count(), 1);

    let status = crawl_status(&*storage, id).unwrap();
    assert_eq!(status.completed, 3);
    assert_eq!(status.total, 3);

    let results = crawl_results(&*storage, id).unwrap();
    assert_eq!(results, expected(&[("d.test", 2)]));
}

#[tokio::test]
async fn test_results_unavailable_until_processed() {
    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, "http://a.test", 1).unwrap();

    let result = crawl_results(&storage, id);
    assert!(matches!(
        result,
        Err(hostgraph::CrawlError::Aggregate(
            hostgraph::output::AggregateError::NotCompleted { .. }
        ))
    ));
}

#[tokio::test]
async fn test_shutdown_releases_in_flight_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let db = TestDatabase::new();
    let mut storage = db.open();
    let id = create_crawl_request(&mut storage, &server.uri(), 1).unwrap();
    let storage = share(storage);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(4),
        test_engine(&storage, SchedulingMode::Batch).run(cancel),
    )
    .await
    .expect("engine should stop promptly")
    .unwrap();
    assert_eq!(summary.released, 1);

    let tasks = lock(&storage).list_tasks(id).unwrap();
    assert_eq!(tasks[0].status, TaskStatus::NotStarted);
    assert!(tasks[0].claimed_by.is_none());
}
