pub mod account;
pub mod adb;
pub mod appium_server;
pub mod automation;
pub mod config;
pub mod console;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod panel;
pub mod polling;
pub mod rcu;
