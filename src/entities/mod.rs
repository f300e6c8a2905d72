// Wallet entities
//
// Each entity describes its own persisted attributes through a
// SerializationAccessor. Entities that other entities point at by id are
// Linkable:
// - account      (user-chosen id)
// - transaction  (UUID)
// - document     (UUID)

pub mod account;
pub mod account_group;
pub mod cabinet;
pub mod category;
pub mod document;
pub mod filter;
pub mod tag;
pub mod transaction;
pub mod wallet;

pub use account::{Account, ACCOUNT_TYPE};
pub use account_group::AccountGroup;
pub use cabinet::{Cabinet, CABINET_ROOT};
pub use category::Category;
pub use document::{Document, DOCUMENT_TYPE};
pub use filter::Filter;
pub use tag::Tag;
pub use transaction::{Transaction, TRANSACTION_TYPE};
pub use wallet::Wallet;
