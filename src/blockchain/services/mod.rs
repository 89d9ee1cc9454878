pub mod balance;
pub mod transactions;
pub mod wallet;
