pub mod registry;
pub mod traits;

// API provider implementations
pub mod cryptocompare;
pub mod frankfurter;
pub mod yahoo;
