mod alert_rules;
mod helpers;
mod history_store;
