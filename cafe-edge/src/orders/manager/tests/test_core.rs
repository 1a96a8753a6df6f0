use super::*;
use crate::orders::retry::RetryPolicy;
use std::time::Duration;

#[test]
fn test_open_then_grow() {
    let manager = create_test_manager();

    let first = send(&manager, 12, vec![coffee(2)]).unwrap();
    assert_eq!(first.kind, OpenOrGrowKind::Created);
    assert_eq!(first.order.total, Decimal::from(60));

    let second = send(&manager, 12, vec![cake(1)]).unwrap();
    assert_eq!(second.kind, OpenOrGrowKind::Grown);
    assert_eq!(second.order.order_id, first.order.order_id);
    assert_eq!(second.order.start_time, first.order.start_time);
    assert_eq!(second.order.lines.len(), 2);
    assert_eq!(second.order.total, Decimal::from(105));
}

#[test]
fn test_open_then_close_returns_opened_snapshot() {
    let manager = create_test_manager();
    let opened = send(&manager, 3, vec![coffee(1), cake(2)]).unwrap().order;

    let closed = manager.close(TableNumber(3)).unwrap();
    assert!(!closed.active);
    assert_eq!(closed.order_id, opened.order_id);
    assert_eq!(closed.lines, opened.lines);
    assert_eq!(closed.total, opened.total);
    assert_eq!(closed.start_time, opened.start_time);

    assert!(manager.get(TableNumber(3)).unwrap().is_none());
    assert!(manager.snapshot().unwrap().is_empty());
}

#[test]
fn test_close_empty_table_is_not_found() {
    let manager = create_test_manager();
    let err = manager.close(TableNumber(4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_closed_table_reopens_with_new_order() {
    let manager = create_test_manager();
    let first = send(&manager, 9, vec![coffee(1)]).unwrap().order;
    manager.close(TableNumber(9)).unwrap();

    let reopened = send(&manager, 9, vec![cake(1)]).unwrap();
    assert_eq!(reopened.kind, OpenOrGrowKind::Created);
    assert_ne!(reopened.order.order_id, first.order_id);
    assert_eq!(reopened.order.lines, vec![cake(1)]);
}

#[test]
fn test_amounts_past_decimal_range_are_rejected() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    let mut huge = coffee(2);
    huge.unit_price = Decimal::MAX;
    let err = manager
        .open_or_grow(TableNumber(1), vec![huge], Decimal::MAX)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(manager.get(TableNumber(1)).unwrap().is_none());

    // each send fits, the running total would not
    let mut max = coffee(1);
    max.unit_price = Decimal::MAX;
    let opened = manager
        .open_or_grow(TableNumber(2), vec![max.clone()], Decimal::MAX)
        .unwrap()
        .order;
    let err = manager
        .open_or_grow(TableNumber(2), vec![max], Decimal::MAX)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(manager.get(TableNumber(2)).unwrap().unwrap(), opened);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn test_validation_rejects_without_mutation() {
    let manager = create_test_manager();
    send(&manager, 1, vec![coffee(1)]).unwrap();
    let before = manager.snapshot().unwrap();

    // total mismatch
    let err = manager
        .open_or_grow(TableNumber(1), vec![cake(1)], Decimal::from(44))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // empty lines
    let err = manager
        .open_or_grow(TableNumber(2), vec![], Decimal::ZERO)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // zero quantity
    let err = send(&manager, 2, vec![coffee(0)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // table out of range
    let err = send(&manager, 51, vec![coffee(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = send(&manager, 0, vec![coffee(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn test_events_follow_mutations() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    send(&manager, 12, vec![coffee(2)]).unwrap();
    send(&manager, 12, vec![cake(1)]).unwrap();
    manager.transfer(TableNumber(12), TableNumber(7)).unwrap();
    manager.close(TableNumber(7)).unwrap();
    // failed operations emit nothing
    let _ = manager.close(TableNumber(7));
    let _ = send(&manager, 99, vec![coffee(1)]);

    let kinds: Vec<_> = drain(&mut rx).iter().map(TableEvent::kind).collect();
    use shared::order::TableEventKind::*;
    assert_eq!(kinds, vec![Created, Grown, Transferred, Closed]);
}

#[test]
fn test_grown_event_carries_added_lines() {
    let manager = create_test_manager();
    send(&manager, 5, vec![coffee(1)]).unwrap();
    let mut rx = manager.subscribe();
    send(&manager, 5, vec![cake(2)]).unwrap();

    match drain(&mut rx).pop() {
        Some(TableEvent::Grown { order, added }) => {
            assert_eq!(added, vec![cake(2)]);
            assert_eq!(order.total, Decimal::from(120));
        }
        other => panic!("expected Grown, got {:?}", other),
    }
}

#[test]
fn test_no_receivers_is_not_an_error() {
    let manager = create_test_manager();
    assert!(send(&manager, 1, vec![coffee(1)]).is_ok());
}

#[test]
fn test_store_unavailable_is_reported_and_nothing_changes() {
    let manager = TableOrderManager::new(Arc::new(FlakyStore::new(1)), 50);
    let mut rx = manager.subscribe();

    let err = send(&manager, 4, vec![coffee(1)]).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert!(manager.snapshot().unwrap().is_empty());
    assert!(drain(&mut rx).is_empty());

    // next call goes through
    let ok = send(&manager, 4, vec![coffee(1)]).unwrap();
    assert_eq!(ok.kind, OpenOrGrowKind::Created);
}

#[tokio::test]
async fn test_retry_policy_appends_exactly_once() {
    let store = Arc::new(FlakyStore::new(0));
    let manager = TableOrderManager::new(store.clone(), 50);
    send(&manager, 6, vec![coffee(1)]).unwrap();

    // the next two writes fail, the third commits
    store.failures.store(2, Ordering::SeqCst);
    let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_secs(5));
    let result = policy
        .run(|| manager.open_or_grow(TableNumber(6), vec![cake(1)], Decimal::from(45)))
        .await
        .unwrap();

    assert_eq!(result.kind, OpenOrGrowKind::Grown);
    assert_eq!(result.order.lines.len(), 2);
    assert_eq!(result.order.total, Decimal::from(75));
}

#[tokio::test]
async fn test_retry_policy_gives_up_after_cap() {
    let manager = TableOrderManager::new(Arc::new(FlakyStore::new(10)), 50);
    let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_secs(5));

    let err = policy
        .run(|| send(&manager, 2, vec![coffee(1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::StoreUnavailable(_)));
    assert_eq!(manager.store().write_calls.load(Ordering::SeqCst), 3);
    assert!(manager.snapshot().unwrap().is_empty());
}

#[test]
fn test_cafe_scenario() {
    // table 12: coffee x2 @30, then cake x1 @45, move to 7, close 7
    let manager = create_test_manager();

    let opened = send(&manager, 12, vec![coffee(2)]).unwrap();
    assert_eq!(opened.order.total, Decimal::from(60));

    let grown = send(&manager, 12, vec![cake(1)]).unwrap();
    assert_eq!(grown.order.total, Decimal::from(105));
    assert_eq!(grown.order.lines.len(), 2);

    let moved = manager.transfer(TableNumber(12), TableNumber(7)).unwrap();
    assert_eq!(moved.table_number, TableNumber(7));
    assert!(manager.get(TableNumber(12)).unwrap().is_none());

    let closed = manager.close(TableNumber(7)).unwrap();
    assert_eq!(closed.total, Decimal::from(105));
    assert_eq!(closed.lines.len(), 2);
    assert!(manager.snapshot().unwrap().is_empty());
}
