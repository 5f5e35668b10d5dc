pub mod ai;
pub mod board;
pub mod card;
pub mod error;
pub mod history;
pub mod identity;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod storage;

pub use board::{Alerts, Board};
pub use error::{Error, Result};
