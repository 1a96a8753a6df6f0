use super::*;
use std::thread;

#[test]
fn test_concurrent_open_creates_exactly_once() {
    let manager = Arc::new(create_test_manager());
    let mut rx = manager.subscribe();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || send(&*manager, 5, vec![coffee(1)]).unwrap().kind)
        })
        .collect();
    let kinds: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(
        kinds.iter().filter(|k| **k == OpenOrGrowKind::Created).count(),
        1
    );
    assert_eq!(
        kinds.iter().filter(|k| **k == OpenOrGrowKind::Grown).count(),
        15
    );

    let events = drain(&mut rx);
    assert_eq!(events.len(), 16);
    assert!(matches!(events[0], TableEvent::Created { .. }));
    assert!(
        events[1..]
            .iter()
            .all(|e| matches!(e, TableEvent::Grown { .. }))
    );

    let order = manager.get(TableNumber(5)).unwrap().unwrap();
    assert_eq!(order.lines.len(), 16);
    assert_eq!(order.total, Decimal::from(16 * 30));
    assert!(order.is_consistent());
}

#[test]
fn test_different_tables_proceed_independently() {
    let manager = Arc::new(create_test_manager());

    let handles: Vec<_> = (1..=10)
        .map(|table| {
            let manager = manager.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    send(&*manager, table, vec![coffee(1)]).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.len(), 10);
    for order in snapshot.values() {
        assert_eq!(order.lines.len(), 5);
        assert_eq!(order.total, Decimal::from(150));
    }
}

#[test]
fn test_opposite_transfers_never_duplicate() {
    let manager = Arc::new(create_test_manager());
    send(&*manager, 3, vec![coffee(1)]).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = manager.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let (a, b) = if i % 2 == 0 { (3, 4) } else { (4, 3) };
                    let _ = manager.transfer(TableNumber(a), TableNumber(b));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.len(), 1);
    let (table, order) = snapshot.iter().next().unwrap();
    assert_eq!(order.table_number, *table);
}
