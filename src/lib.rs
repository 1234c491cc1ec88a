pub mod cli;
pub mod dispatch;
pub mod extract;
pub mod filter;
pub mod models;
pub mod report;
pub mod source;
pub mod table;
