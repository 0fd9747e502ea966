pub mod trading_plan;
