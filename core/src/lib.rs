pub mod db;
pub mod energy;
pub mod error;
pub mod export;
pub mod history;
pub mod macro_split;
pub mod models;
pub mod service;

pub use error::{LedgerError, Result, ValidationError};
pub use service::LedgerService;
