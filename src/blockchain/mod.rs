// src/blockchain/mod.rs

// Declare the `client` module for Somnia JSON-RPC access.
pub mod client;
// Declare the `models` module for blockchain-related data structures.
pub mod models;

pub mod services;
pub mod toolset;
