//! Domain models.
//!
//! Each entity carries a `version` that the store bumps on every write; the
//! table controller in [`crate::view`] uses it to reconcile local edits with
//! fresh snapshots.

pub mod brand;
pub mod order;
pub mod product;
pub mod user;

pub use brand::{Brand, BrandInput, NewBrand};
pub use order::{
    NewNote, NewOrder, Note, Order, OrderChange, OrderCommit, OrderDraft, OrderInput,
    OrderItem, OrderItemInput, OrderUpdate, ProductSnapshot, ShippedAtChange,
};
pub use product::{Product, ProductChange, ProductFields, ProductInput};
pub use user::{NewUser, User};
