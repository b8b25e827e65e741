pub mod db_init;
pub mod screener;
pub mod groww;
pub mod discord;

pub mod rule_resolver;
pub mod alert_engine;
pub mod alert_monitor;

pub mod ipos_service;
pub mod alert_rules_service;
pub mod sectors_service;
pub mod portfolio_service;
