//! Carts by terminal
//!
//! Each terminal (cashier screen, tablet) owns one cart. The map only hands
//! out `Arc`s; the cart itself sits behind an async mutex so a finalization
//! that awaits the order store keeps the cart locked without holding a map
//! shard.

use super::CartSession;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct CartRegistry {
    carts: DashMap<String, Arc<Mutex<CartSession>>>,
}

impl CartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the terminal's cart, creating it on first use.
    /// A finalized cart is swapped for a fresh one.
    pub async fn open(&self, terminal: &str) -> OwnedMutexGuard<CartSession> {
        let cart = self
            .carts
            .entry(terminal.to_string())
            .or_default()
            .value()
            .clone();

        let mut guard = cart.lock_owned().await;
        if guard.is_finalized() {
            tracing::debug!(terminal = %terminal, "Replacing finalized cart");
            *guard = CartSession::new();
        }
        guard
    }

    /// Drop the terminal's cart
    pub fn remove(&self, terminal: &str) -> bool {
        self.carts.remove(terminal).is_some()
    }

    pub fn terminals(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.carts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::SalesStorage;
    use rust_decimal::Decimal;
    use shared::models::{PaymentInput, Product};

    fn espresso() -> Product {
        Product {
            id: 5,
            name: "Espresso".to_string(),
            price: Decimal::from(25),
            category_id: 1,
            sizes: vec![],
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_carts_are_per_terminal() {
        let registry = CartRegistry::new();
        registry.open("pos-1").await.add_item(&espresso(), None, 1).unwrap();
        registry.open("pos-2").await.add_item(&espresso(), None, 3).unwrap();

        assert_eq!(registry.open("pos-1").await.item_count(), 1);
        assert_eq!(registry.open("pos-2").await.item_count(), 3);
        assert_eq!(registry.terminals(), vec!["pos-1", "pos-2"]);

        assert!(registry.remove("pos-2"));
        assert!(!registry.remove("pos-2"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_finalized_cart_is_replaced() {
        let registry = CartRegistry::new();
        let sales = SalesStorage::open_in_memory().unwrap();
        {
            let mut cart = registry.open("pos-1").await;
            cart.add_item(&espresso(), None, 2).unwrap();
            cart.checkout_direct(&PaymentInput::Card, &sales).unwrap();
            assert!(cart.is_finalized());
        }

        let mut cart = registry.open("pos-1").await;
        assert!(!cart.is_finalized());
        assert!(cart.is_empty());
        cart.add_item(&espresso(), None, 1).unwrap();
    }
}
