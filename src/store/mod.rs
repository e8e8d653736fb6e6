//! Store Module - run results
//!
//! Key types:
//! - `ResultSet`: values returned by one run, plus the operations it executed

mod result_set;

pub use result_set::ResultSet;
