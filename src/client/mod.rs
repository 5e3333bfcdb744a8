//! Buyer-side pieces: the local cart draft and the payment widget bridge.

pub mod bridge;
pub mod cart_store;
pub mod storage;

pub use bridge::{BridgeError, CheckoutWidget, Confirmation, HttpPaymentApi, PaymentApi, PaymentBridge, WidgetOptions, WidgetOutcome};
pub use cart_store::{CartStore, CartStoreError, SyncState};
pub use storage::{DraftStorage, JsonFileStorage, MemoryStorage, StorageError};
