use chrono::Utc;
use lib_feed::cache::SharedCache;
use lib_feed::configs::CacheSettings;
use lib_feed::connections::MemoryCacheStore;
use lib_feed::queue::{JobQueue, SignalQueue, SignalTopic, SummaryJob};
use lib_feed::store::TargetKind;
use std::sync::Arc;
use std::time::Duration;

fn memory_cache() -> SharedCache {
    SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default())
}

#[tokio::test]
async fn test_duplicate_signal_queues_once() {
    let signals = SignalQueue::new(memory_cache());

    assert!(signals.signal(SignalTopic::InterestRefill, 7).await);
    assert!(!signals.signal(SignalTopic::InterestRefill, 7).await);
    assert_eq!(signals.queued(SignalTopic::InterestRefill).await, 1);

    // Topics are independent.
    assert!(signals.signal(SignalTopic::CommentFetch, 7).await);
    assert_eq!(signals.queued(SignalTopic::CommentFetch).await, 1);

    let got = signals
        .await_signal(SignalTopic::InterestRefill, Duration::from_millis(100))
        .await;
    assert_eq!(got, Some(7));
    assert_eq!(signals.queued(SignalTopic::InterestRefill).await, 0);

    // Once consumed the key may be raised again.
    assert!(signals.signal(SignalTopic::InterestRefill, 7).await);
}

#[tokio::test]
async fn test_signals_are_served_oldest_first() {
    let signals = SignalQueue::new(memory_cache());
    for key in [3, 1, 2] {
        signals.signal(SignalTopic::CommentFetch, key).await;
    }
    let mut order = Vec::new();
    while let Some(key) = signals
        .await_signal(SignalTopic::CommentFetch, Duration::from_millis(10))
        .await
    {
        order.push(key);
    }
    assert_eq!(order, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_wait_wakes_on_signal() {
    let signals = SignalQueue::new(memory_cache());
    let waiter = {
        let signals = signals.clone();
        tokio::spawn(async move {
            signals
                .await_signal(SignalTopic::InterestRefill, Duration::from_secs(5))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    signals.signal(SignalTopic::InterestRefill, 42).await;

    let got = waiter.await.expect("Waiter panicked");
    assert_eq!(got, Some(42));
}

#[tokio::test]
async fn test_disabled_cache_drops_signals() {
    let signals = SignalQueue::new(SharedCache::disabled());
    assert!(!signals.signal(SignalTopic::InterestRefill, 1).await);
    assert_eq!(signals.queued(SignalTopic::InterestRefill).await, 0);
    assert_eq!(
        signals
            .await_signal(SignalTopic::InterestRefill, Duration::from_millis(10))
            .await,
        None
    );
}

#[tokio::test]
async fn test_job_queue_drains_in_order() {
    let jobs: JobQueue<SummaryJob> = JobQueue::new(memory_cache());
    for hn_id in [10, 20, 30] {
        jobs.push(&SummaryJob {
            hn_id,
            kind: TargetKind::Story,
            user_id: "u1".to_string(),
            requested_at: Utc::now(),
        })
        .await
        .expect("Push failed");
    }
    assert_eq!(jobs.len().await.expect("Length failed"), 3);

    let drained = jobs.drain(2).await.expect("Drain failed");
    assert_eq!(drained.iter().map(|j| j.hn_id).collect::<Vec<_>>(), vec![10, 20]);
    assert_eq!(jobs.len().await.expect("Length failed"), 1);
}
