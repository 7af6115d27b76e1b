pub mod backup;
pub mod collections;
pub mod db;
pub mod energy;
pub mod error;
pub mod memory;
pub mod models;
pub mod service;
pub mod session;
pub mod store;
