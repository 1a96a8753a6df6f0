//! Randomized operation sequences against a reference model

use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TABLES: u32 = 4;

/// table -> (order_id, total)
type Model = BTreeMap<TableNumber, (String, Decimal)>;

fn random_lines(rng: &mut StdRng) -> Vec<OrderLine> {
    let count = rng.gen_range(0..=3);
    (0..count)
        .map(|_| {
            let product = rng.gen_range(1..=5);
            line(product, "Item", rng.gen_range(0..=3), product * 10)
        })
        .collect()
}

fn check_invariants(manager: &TableOrderManager, model: &Model) {
    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.len(), model.len());
    for (table, order) in &snapshot {
        assert_eq!(order.table_number, *table);
        assert!(order.active);
        assert!(order.is_consistent(), "total drifted on table {}", table);
        let (order_id, total) = &model[table];
        assert_eq!(&order.order_id, order_id);
        assert_eq!(&order.total, total);
    }
    // an order id is active on one table only
    let mut ids: Vec<_> = snapshot.values().map(|o| o.order_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), snapshot.len());
}

fn run_sequence(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let manager = TableOrderManager::new(Arc::new(OrderStorage::open_in_memory().unwrap()), TABLES);
    let mut model = Model::new();

    for _ in 0..steps {
        let table = TableNumber(rng.gen_range(1..=TABLES));
        match rng.gen_range(0..4) {
            0 | 1 => {
                let lines = random_lines(&mut rng);
                let total = shared::order::lines_total(&lines).unwrap();
                let valid = !lines.is_empty() && lines.iter().all(|l| l.quantity > 0);
                let result = manager.open_or_grow(table, lines, total);
                match (valid, result) {
                    (true, Ok(outcome)) => {
                        let expected_kind = if model.contains_key(&table) {
                            OpenOrGrowKind::Grown
                        } else {
                            OpenOrGrowKind::Created
                        };
                        assert_eq!(outcome.kind, expected_kind);
                        let entry = model
                            .entry(table)
                            .or_insert((outcome.order.order_id.clone(), Decimal::ZERO));
                        entry.1 += total;
                    }
                    (false, Err(e)) => assert_eq!(e.kind(), ErrorKind::Validation),
                    (valid, other) => panic!("valid={} got {:?}", valid, other),
                }
            }
            2 => {
                let result = manager.close(table);
                match model.remove(&table) {
                    Some((order_id, total)) => {
                        let closed = result.unwrap();
                        assert_eq!(closed.order_id, order_id);
                        assert_eq!(closed.total, total);
                    }
                    None => assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound),
                }
            }
            _ => {
                let target = TableNumber(rng.gen_range(1..=TABLES));
                let result = manager.transfer(table, target);
                if table == target {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
                } else if !model.contains_key(&table) {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
                } else if model.contains_key(&target) {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
                } else {
                    let moved = result.unwrap();
                    assert_eq!(moved.table_number, target);
                    if let Some(entry) = model.remove(&table) {
                        model.insert(target, entry);
                    }
                }
            }
        }
        check_invariants(&manager, &model);
    }
}

#[test]
fn test_random_sequences_hold_invariants() {
    for seed in 0..20 {
        run_sequence(seed, 200);
    }
}
