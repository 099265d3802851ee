pub mod convert;
pub mod setup;
pub mod ui;
pub mod wallet;
pub mod watch;
