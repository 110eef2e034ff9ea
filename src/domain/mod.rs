pub mod catalog;
pub mod outcome;
pub mod ports;
pub mod transaction;
