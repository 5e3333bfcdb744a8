//! Cart draft backed by durable client storage.
//!
//! The draft is stored under `cart` as a bare JSON array of line items.
//! Mutations land on a working copy first (`SyncState::Pending`). A successful
//! write commits it; a failed write restores the last committed cart.

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use super::storage::{DraftStorage, StorageError, CART_KEY, PROMO_CODE_KEY};
use crate::domain::aggregates::{Cart, CartError, CartItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState { Synced, Pending, Failed }

#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("could not save cart: {0}")]
    Storage(#[from] StorageError),
}

pub struct CartStore {
    storage: Arc<dyn DraftStorage>,
    committed: Cart,
    working: Cart,
    state: SyncState,
    promo_code: Option<String>,
}

impl CartStore {
    /// Loads the saved draft. Unreadable drafts are dropped rather than blocking the shop.
    pub fn open(storage: Arc<dyn DraftStorage>) -> Self {
        let cart = match storage.get(CART_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartItem>>(&raw) {
                Ok(items) => Cart::from_items(items),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable cart draft");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(error = %e, "cart storage unavailable, starting empty");
                Cart::new()
            }
        };
        let promo_code = storage.get(PROMO_CODE_KEY).ok().flatten()
            .and_then(|raw| serde_json::from_str::<String>(&raw).ok());
        Self { storage, committed: cart.clone(), working: cart, state: SyncState::Synced, promo_code }
    }

    pub fn cart(&self) -> &Cart { &self.working }
    pub fn sync_state(&self) -> SyncState { self.state }
    pub fn promo_code(&self) -> Option<&str> { self.promo_code.as_deref() }

    /// Whether checkout should offer the pay-half-now option. The server
    /// re-decides once the promo is applied.
    pub fn offers_half_payment(&self) -> bool {
        self.working.is_partial_payment_eligible() && !self.working.subtotal().half_floor().is_zero()
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartStoreError> {
        self.mutate(|cart| cart.add_item(item))
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartStoreError> {
        self.mutate(|cart| cart.update_quantity(product_id, quantity))
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartStoreError> {
        self.mutate(|cart| cart.remove_item(product_id))
    }

    pub fn clear(&mut self) -> Result<(), CartStoreError> {
        self.mutate(|cart| { cart.clear(); Ok(()) })
    }

    /// Remembers the last code the buyer typed, verbatim.
    pub fn set_promo_code(&mut self, code: &str) -> Result<(), CartStoreError> {
        let code = code.trim();
        if code.is_empty() { return self.clear_promo_code(); }
        self.storage.set(PROMO_CODE_KEY, &serde_json::to_string(code).map_err(StorageError::from)?)?;
        self.promo_code = Some(code.to_string());
        Ok(())
    }

    pub fn clear_promo_code(&mut self) -> Result<(), CartStoreError> {
        self.storage.remove(PROMO_CODE_KEY)?;
        self.promo_code = None;
        Ok(())
    }

    /// Empties the draft after checkout; both keys are attempted even if one fails.
    pub fn clear_after_checkout(&mut self) -> Result<(), CartStoreError> {
        let cart = self.clear();
        let promo = self.clear_promo_code();
        cart.and(promo)
    }

    fn mutate<F>(&mut self, f: F) -> Result<(), CartStoreError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError>,
    {
        let mut next = self.working.clone();
        f(&mut next)?;
        self.working = next;
        self.state = SyncState::Pending;
        self.persist()
    }

    fn persist(&mut self) -> Result<(), CartStoreError> {
        let write = serde_json::to_string(self.working.items())
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.set(CART_KEY, &raw));
        match write {
            Ok(()) => {
                self.committed = self.working.clone();
                self.state = SyncState::Synced;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "cart write rejected, rolling back");
                self.working = self.committed.clone();
                self.state = SyncState::Failed;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;
    use crate::domain::value_objects::{Money, Quantity};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn item(id: &str, qty: u32) -> CartItem {
        CartItem { product_id: id.into(), name: id.into(), unit_price: Money::new(350), quantity: Quantity::new(qty).unwrap(), image: None, allow_partial_payment: true }
    }

    #[derive(Default)]
    struct FlakyStorage { inner: MemoryStorage, fail: AtomicBool }

    impl DraftStorage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> { self.inner.get(key) }
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail.load(Ordering::SeqCst) { return Err(StorageError::Unavailable); }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> { self.inner.remove(key) }
    }

    #[test]
    fn test_draft_persisted_and_reloaded() {
        let storage: Arc<dyn DraftStorage> = Arc::new(MemoryStorage::new());
        let mut store = CartStore::open(storage.clone());
        store.add_item(item("P1", 2)).unwrap();
        store.set_promo_code(" freshers2025 ").unwrap();
        assert_eq!(store.sync_state(), SyncState::Synced);
        let reopened = CartStore::open(storage);
        assert_eq!(reopened.cart().subtotal(), Money::new(700));
        assert_eq!(reopened.promo_code(), Some("freshers2025"));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let storage = Arc::new(FlakyStorage::default());
        let mut store = CartStore::open(storage.clone());
        store.add_item(item("P1", 1)).unwrap();
        storage.fail.store(true, Ordering::SeqCst);
        assert!(matches!(store.add_item(item("P2", 1)), Err(CartStoreError::Storage(_))));
        assert_eq!(store.sync_state(), SyncState::Failed);
        assert_eq!(store.cart().item_count(), 1);
        storage.fail.store(false, Ordering::SeqCst);
        store.add_item(item("P2", 1)).unwrap();
        assert_eq!(store.cart().item_count(), 2);
    }

    #[test]
    fn test_draft_stored_as_item_array() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = CartStore::open(storage.clone());
        store.add_item(item("P1", 1)).unwrap();
        let stored: serde_json::Value = serde_json::from_str(&storage.get(CART_KEY).unwrap().unwrap()).unwrap();
        assert!(stored.is_array());
        assert_eq!(stored[0]["product_id"], "P1");
        assert_eq!(stored[0]["quantity"], 1);
    }

    #[test]
    fn test_array_draft_loads() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_KEY, r#"[{"product_id":"P1","name":"Coat","unit_price":350,"quantity":1}]"#).unwrap();
        let store = CartStore::open(storage);
        assert_eq!(store.cart().item_count(), 1);
        assert_eq!(store.cart().subtotal(), Money::new(350));
    }

    #[test]
    fn test_half_payment_offer_follows_cart() {
        let mut store = CartStore::open(Arc::new(MemoryStorage::new()));
        assert!(!store.offers_half_payment());
        store.add_item(item("P1", 1)).unwrap();
        assert!(store.offers_half_payment());
        let mut fixed = item("P2", 1);
        fixed.allow_partial_payment = false;
        store.add_item(fixed).unwrap();
        assert!(!store.offers_half_payment());
        store.clear().unwrap();
        let mut cheap = item("P3", 1);
        cheap.unit_price = Money::new(1);
        store.add_item(cheap).unwrap();
        assert!(!store.offers_half_payment());
    }

    #[test]
    fn test_corrupt_draft_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_KEY, "{not json").unwrap();
        let store = CartStore::open(storage);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_domain_error_leaves_state() {
        let mut store = CartStore::open(Arc::new(MemoryStorage::new()));
        assert!(matches!(store.remove_item("missing"), Err(CartStoreError::Cart(CartError::ItemNotFound))));
        assert_eq!(store.sync_state(), SyncState::Synced);
    }
}
