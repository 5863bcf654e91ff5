//! Database access for the admin service
//!
//! Read helpers accept any executor (pool or transaction); write helpers take
//! a `&mut SqliteConnection` so callers decide the transaction boundary.

pub mod cards;
pub mod ledger;
pub mod locations;
pub mod sets;
