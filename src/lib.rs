pub mod collate;
pub mod config;
pub mod document;
pub mod error;
pub mod genbank;
pub mod identity;
pub mod igem;
pub mod import;
pub mod inventory;
pub mod output;
pub mod package;
pub mod reconcile;
pub mod retrieve;
pub mod synbiohub;
