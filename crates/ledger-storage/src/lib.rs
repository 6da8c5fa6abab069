//! Durable storage for the ledger.
//!
//! Layout (one `sled` tree per table, rows encoded with `bincode`):
//!
//! ```text
//! blocks              index (u64 BE)                 -> BlockRow
//! transactions        id (uuid string)               -> TransactionRow
//! block_transactions  index (u64 BE) ‖ pos (u32 BE)  -> transaction id
//! pending             sequence (u64 BE)              -> transaction id
//! meta                tip_height / tip_hash
//! ```

mod rows;
pub mod sled_store;

pub use sled_store::SledStore;
