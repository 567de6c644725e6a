//! Tests for components/lifecycle.rs

use std::sync::Arc;
use std::time::Duration;

use kodegen_notify_enrich::{
    CompletionGuard, FinalizePath, Invocation, InvocationId, InvocationState, NotificationContent,
};
use uuid::Uuid;

use crate::support::Capture;

#[test]
fn test_state_transitions() {
    use InvocationState::*;

    assert!(Idle.can_transition_to(&Enriching));
    assert!(Idle.can_transition_to(&Finalized(FinalizePath::Expired)));
    assert!(Enriching.can_transition_to(&Finalized(FinalizePath::Completed)));
    assert!(Enriching.can_transition_to(&Finalized(FinalizePath::Expired)));
    assert!(!Enriching.can_transition_to(&Idle));
    assert!(!Finalized(FinalizePath::Completed).can_transition_to(&Enriching));
    assert!(!Finalized(FinalizePath::Completed).can_transition_to(&Finalized(FinalizePath::Expired)));

    assert!(Finalized(FinalizePath::Expired).is_terminal());
    assert!(!Enriching.is_terminal());
}

#[test]
fn test_guard_completes_once() {
    let capture = Capture::new();
    let guard = CompletionGuard::new(capture.handler());

    assert!(!guard.is_finalized());
    assert!(guard.complete(NotificationContent::new("first", "")));
    assert!(!guard.complete(NotificationContent::new("second", "")));
    assert!(guard.claim().is_none());

    assert!(guard.is_finalized());
    assert_eq!(capture.calls(), 1);
    assert_eq!(capture.content().unwrap().title, "first");
}

#[test]
fn test_guard_races_across_threads() {
    let capture = Capture::new();
    let guard = Arc::new(CompletionGuard::new(capture.handler()));

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let guard = Arc::clone(&guard);
            std::thread::spawn(move || guard.complete(NotificationContent::new(format!("t{i}"), "")))
        })
        .collect();

    let winners = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(capture.calls(), 1);
}

#[test]
fn test_invocation_completion_then_expiry_is_noop() {
    let capture = Capture::new();
    let invocation = Invocation::new(NotificationContent::new("orig", "body"), capture.handler());

    assert_eq!(invocation.state(), InvocationState::Idle);
    assert!(invocation.begin());
    assert_eq!(invocation.state(), InvocationState::Enriching);

    assert!(invocation.finalize(FinalizePath::Completed, NotificationContent::new("done", "")));
    assert!(!invocation.expire());

    assert_eq!(invocation.state(), InvocationState::Finalized(FinalizePath::Completed));
    assert_eq!(capture.calls(), 1);
    assert_eq!(capture.content().unwrap().title, "done");
}

#[test]
fn test_expiry_delivers_best_attempt() {
    let capture = Capture::new();
    let invocation = Invocation::new(NotificationContent::new("orig", "body"), capture.handler());
    assert!(invocation.begin());

    invocation.update_content(|content| content.title = "Ann".to_string());
    assert!(invocation.expire());
    assert!(!invocation.finalize(FinalizePath::Completed, NotificationContent::new("late", "")));

    assert_eq!(invocation.state(), InvocationState::Finalized(FinalizePath::Expired));
    assert_eq!(capture.calls(), 1);
    let delivered = capture.content().unwrap();
    assert_eq!(delivered.title, "Ann");
    assert_eq!(delivered.body, "body");
}

#[test]
fn test_expiry_before_begin() {
    let capture = Capture::new();
    let invocation = Invocation::new(NotificationContent::new("orig", "body"), capture.handler());

    assert!(invocation.expire());
    assert!(!invocation.begin());
    assert!(invocation.is_finalized());
    assert_eq!(capture.calls(), 1);
}

#[test]
fn test_expired_future_resolves_after_expire() {
    let invocation = Invocation::new(NotificationContent::default(), |_| {});
    invocation.expire();

    // The notification permit is stored, so a later waiter still wakes
    tokio_test::block_on(async {
        tokio::time::timeout(Duration::from_secs(1), invocation.expired())
            .await
            .expect("expired() should resolve");
    });
}

#[tokio::test]
async fn test_expired_future_wakes_pending_waiter() {
    let invocation = Arc::new(Invocation::new(NotificationContent::default(), |_| {}));

    let waiter = {
        let invocation = Arc::clone(&invocation);
        tokio::spawn(async move { invocation.expired().await })
    };
    tokio::task::yield_now().await;

    invocation.expire();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should wake")
        .unwrap();
}

#[test]
fn test_invocation_id_round_trip() {
    let uuid = Uuid::new_v4();
    let id = InvocationId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
    assert_eq!(id.to_string(), uuid.to_string());
    assert_eq!(id.to_string().parse::<InvocationId>().unwrap(), id);
    assert!("not-a-uuid".parse::<InvocationId>().is_err());

    assert_ne!(InvocationId::generate(), InvocationId::generate());
    let invocation = Invocation::new(NotificationContent::new("t", "b"), |_| {});
    assert_ne!(invocation.id().as_uuid(), Uuid::nil());
}
