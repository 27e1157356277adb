//! Shared-state behaviour under concurrent tasks.

use chrono::TimeDelta;
use std::collections::HashSet;
use std::sync::Arc;

use natter_api::access::Permissions;
use natter_api::clock::{Clock, ManualClock};
use natter_api::security::RateLimiter;
use natter_api::session::{MemoryTokenStore, TokenStore};
use natter_api::store::{MemoryStore, PermissionStore, SpaceStore};

mod common;
use common::epoch;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_token_create_and_revoke() {
    let clock = Arc::new(ManualClock::new(epoch()));
    let store = Arc::new(MemoryTokenStore::new(clock.clone()));
    let expiry = clock.now() + TimeDelta::minutes(10);

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let mut kept = Vec::new();
            for i in 0..50 {
                let id = store.create(&format!("user-{worker}"), expiry).unwrap();
                // Every other token is revoked straight away.
                if i % 2 == 0 {
                    store.revoke(&id);
                } else {
                    kept.push(id);
                }
            }
            kept
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(ids.insert(id), "token id issued twice");
        }
    }

    assert_eq!(ids.len(), 8 * 25);
    assert_eq!(store.len(), 8 * 25);
    for id in &ids {
        assert!(store.read(id).is_some());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_grants_on_one_space() {
    let store = Arc::new(MemoryStore::new());
    let space = store.create_space("acme", "alice").unwrap().id;

    let mut tasks = Vec::new();
    for n in 0..64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.put_grant(space, &format!("member-{n}"), Permissions::READ).unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for n in 0..64 {
        assert_eq!(
            store.get_grant(space, &format!("member-{n}")).unwrap(),
            Some(Permissions::READ)
        );
    }
    assert_eq!(store.get_grant(space, "alice").unwrap(), Some(Permissions::ALL));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_acquires_never_exceed_burst() {
    let clock = Arc::new(ManualClock::new(epoch()));
    let limiter = Arc::new(RateLimiter::new(2.0, 5, 2, clock.clone()));
    let now = clock.now();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let limiter = limiter.clone();
        tasks.push(tokio::spawn(async move {
            (0..10).filter(|_| limiter.try_acquire_at(now)).count()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        admitted += task.await.unwrap();
    }
    assert_eq!(admitted, 5);
}
