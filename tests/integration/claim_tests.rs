//! Claim exclusivity and recovery across separate connections
//!
//! Each thread opens its own connection to one database file, the way
//! separate engine processes would.

use crate::common::{open_at, TestDatabase};
use chrono::Utc;
use hostgraph::storage::{NewTask, Storage};
use hostgraph::TaskStatus;
use std::collections::HashSet;
use std::thread;

const CLAIMANTS: usize = 4;
const EXTRA_TASKS: usize = 200;

#[test]
fn test_concurrent_claims_are_exclusive() {
    let db = TestDatabase::new();
    let id = {
        let mut storage = db.open();
        let id = storage.create_crawl_request("http://a.test/", 3).unwrap();
        let tasks: Vec<NewTask> = (0..EXTRA_TASKS)
            .map(|i| NewTask {
                url: format!("http://a.test/page{}", i),
                seen: false,
            })
            .collect();
        storage.create_tasks(id, 1, &tasks).unwrap();
        id
    };

    let handles: Vec<_> = (0..CLAIMANTS)
        .map(|n| {
            let path = db.path.clone();
            thread::spawn(move || {
                let mut storage = open_at(&path);
                let claimant = format!("claimant-{}", n);
                let mut claimed = Vec::new();
                while let Some(task) = storage.claim_next_task(&claimant).unwrap() {
                    assert_eq!(task.claimed_by.as_deref(), Some(claimant.as_str()));
                    claimed.push(task.id);
                }
                claimed
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(all.len(), EXTRA_TASKS + 1, "every task claimed exactly once");
    assert_eq!(unique.len(), all.len(), "no task claimed twice");

    let storage = db.open();
    let tasks = storage.list_tasks(id).unwrap();
    assert!(tasks.iter().all(|t| t.status == TaskStatus::InProgress));
}

#[test]
fn test_claims_follow_creation_order_across_connections() {
    let db = TestDatabase::new();
    let mut writer = db.open();
    let first = writer.create_crawl_request("http://a.test/", 1).unwrap();
    let second = writer.create_crawl_request("http://b.test/", 1).unwrap();

    let mut reader = db.open();
    let task = reader.claim_next_task("other").unwrap().unwrap();
    assert_eq!(task.crawl_request_id, first);

    let task = writer.claim_next_task("writer").unwrap().unwrap();
    assert_eq!(task.crawl_request_id, second);

    assert!(reader.claim_next_task("other").unwrap().is_none());
}

#[test]
fn test_orphaned_claims_are_recovered_by_another_connection() {
    let db = TestDatabase::new();
    let id = {
        let mut crashed = db.open();
        let id = crashed.create_crawl_request("http://a.test/", 1).unwrap();
        crashed.claim_next_task("crashed-engine").unwrap().unwrap();
        id
    };

    let mut survivor = db.open();
    assert!(survivor.claim_next_task("survivor").unwrap().is_none());

    let requeued = survivor
        .requeue_stale_tasks(Utc::now() + chrono::Duration::seconds(1))
        .unwrap();
    assert_eq!(requeued, 1);

    let task = survivor.claim_next_task("survivor").unwrap().unwrap();
    assert_eq!(task.crawl_request_id, id);
    assert_eq!(task.claimed_by.as_deref(), Some("survivor"));
}

#[test]
fn test_terminal_status_survives_reopen() {
    let db = TestDatabase::new();
    let task_id = {
        let mut storage = db.open();
        storage.create_crawl_request("http://a.test/", 1).unwrap();
        let task = storage.claim_next_task("engine").unwrap().unwrap();
        storage
            .set_task_status(task.id, TaskStatus::Completed)
            .unwrap();
        task.id
    };

    let mut storage = db.open();
    assert!(storage
        .set_task_status(task_id, TaskStatus::Failed)
        .is_err());
    assert!(storage.release_task(task_id).is_err());
    assert_eq!(
        storage
            .requeue_stale_tasks(Utc::now() + chrono::Duration::seconds(1))
            .unwrap(),
        0
    );
}
