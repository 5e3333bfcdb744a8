//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod promo;
pub mod user;
pub mod settings;

pub use product::{Product, ProductDraft, ProductError};
pub use order::{BuyerDetails, LineItem, Order, OrderError, OrderStatus, PartialPayment, PaymentMode, PaymentStatus};
pub use cart::{Cart, CartError, CartItem};
pub use promo::{PaymentOption, Promo, PromoDraft, PromoError};
pub use user::{Role, UserProfile};
pub use settings::FeaturedOffer;
