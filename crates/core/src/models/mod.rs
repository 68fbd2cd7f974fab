pub mod allocation;
pub mod dividend;
pub mod history;
pub mod ledger;
pub mod position;
pub mod price;
pub mod settings;
pub mod transaction;
