pub mod cost_basis;
pub mod diversification_service;
pub mod dividend_service;
pub mod fx_service;
pub mod history_service;
pub mod ledger_service;
pub mod position_service;
pub mod price_service;
