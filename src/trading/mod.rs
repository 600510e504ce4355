pub mod builder;

pub use builder::{PreparedTransaction, TransactionBuilder};
