pub mod config;
pub mod documents;
pub mod health;
pub mod history;
pub mod indexes;
pub mod search;
