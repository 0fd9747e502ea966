//! `SeaORM` Entity prelude

pub use super::trading_plans::Entity as TradingPlans;
