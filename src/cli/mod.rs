pub mod convert;
pub mod history;
pub mod rates;
pub mod settings;
pub mod setup;
pub mod ui;
