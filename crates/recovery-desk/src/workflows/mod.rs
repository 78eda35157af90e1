pub mod ledger_import;
pub mod risk;
