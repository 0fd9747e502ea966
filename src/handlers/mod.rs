pub mod alert;
pub mod channels;
pub mod health;
pub mod history;
