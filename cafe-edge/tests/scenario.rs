//! A full service: two terminals fill table 12, it moves to table 7, table 7 pays.
//! A phone watching the floor sees every step.

use std::sync::Arc;
use std::time::Duration;

use cafe_edge::catalog::{Catalog, CatalogSeed};
use cafe_edge::orders::OpenOrGrowKind;
use cafe_edge::{Config, ObserverClient, ServerState};
use rust_decimal::Decimal;
use shared::models::{Category, PaymentInput, Product, SaleSource};
use shared::order::TableNumber;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(3);

fn menu() -> CatalogSeed {
    CatalogSeed {
        categories: vec![Category {
            id: 1,
            name: "Counter".to_string(),
            sort_order: 0,
        }],
        products: vec![
            Product {
                id: 1,
                name: "Coffee".to_string(),
                price: Decimal::from(30),
                category_id: 1,
                sizes: vec![],
                is_active: true,
            },
            Product {
                id: 2,
                name: "Cake".to_string(),
                price: Decimal::from(45),
                category_id: 1,
                sizes: vec![],
                is_active: true,
            },
        ],
    }
}

#[tokio::test]
async fn test_service_from_cart_to_sale() {
    let state = ServerState::in_memory(Config::with_overrides("/tmp/cafe-edge-test", 0, 0)).unwrap();
    state.catalog.import(menu()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let bus = state.message_bus.clone();
    tokio::spawn(async move {
        let _ = bus.serve(listener).await;
    });
    let shutdown = CancellationToken::new();
    tokio::spawn(Arc::clone(&state.mirror).run(shutdown.clone()));

    let phone = ObserverClient::connect(&addr, "phone").await.unwrap();
    assert!(phone.wait_until(WAIT, |v| v.is_empty()).await);

    let coffee = state.catalog.get_product(1).unwrap();
    let cake = state.catalog.get_product(2).unwrap();

    // terminal A: 2 coffees to table 12
    {
        let mut cart = state.carts.open("pos-a").await;
        cart.add_item(&coffee, None, 1).unwrap();
        cart.add_item(&coffee, None, 1).unwrap();
        assert_eq!(cart.total(), Decimal::from(60));
        let result = cart
            .send_to_table(TableNumber(12), &*state.orders, &state.retry)
            .await
            .unwrap();
        assert_eq!(result.kind, OpenOrGrowKind::Created);
        assert!(cart.is_finalized());
    }
    assert!(phone.wait_until(WAIT, |v| v.is_occupied(TableNumber(12))).await);

    // terminal B: a cake to the same table
    let order_id = {
        let mut cart = state.carts.open("pos-b").await;
        cart.add_item(&cake, None, 1).unwrap();
        let result = cart
            .send_to_table(TableNumber(12), &*state.orders, &state.retry)
            .await
            .unwrap();
        assert_eq!(result.kind, OpenOrGrowKind::Grown);
        assert_eq!(result.order.total, Decimal::from(105));
        result.order.order_id
    };
    assert!(
        phone
            .wait_until(WAIT, |v| v
                .get(TableNumber(12))
                .is_some_and(|o| o.total == Decimal::from(105)))
            .await
    );

    // the guests move
    state.orders.transfer(TableNumber(12), TableNumber(7)).unwrap();
    assert!(
        phone
            .wait_until(WAIT, |v| !v.is_occupied(TableNumber(12)) && v.is_occupied(TableNumber(7)))
            .await
    );
    let moved = state.orders.get(TableNumber(7)).unwrap().unwrap();
    assert_eq!(moved.order_id, order_id);

    let sale = state
        .checkout
        .settle_table(TableNumber(7), &PaymentInput::Cash {
            tendered: Decimal::from(200),
        })
        .await
        .unwrap();
    assert_eq!(sale.total, Decimal::from(105));
    assert_eq!(sale.payment.change, Decimal::from(95));
    assert_eq!(sale.source, SaleSource::Table);
    assert_eq!(sale.order_id.as_deref(), Some(order_id.as_str()));
    assert_eq!(sale.table_number, Some(7));
    assert_eq!(sale.items.len(), 2);

    assert!(phone.wait_until(WAIT, |v| v.is_empty()).await);
    assert!(state.orders.snapshot().unwrap().is_empty());
    assert_eq!(state.sales.list_recent(10).unwrap(), vec![sale]);

    // both terminals start over with empty carts
    assert!(state.carts.open("pos-a").await.is_empty());
    assert!(!state.carts.open("pos-b").await.is_finalized());

    shutdown.cancel();
    state.message_bus.shutdown();
}
