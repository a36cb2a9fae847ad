pub mod commands;
pub mod financials;
pub mod ledger;
pub mod lifecycle;
pub mod queries;
pub mod rates;
pub mod visibility;
