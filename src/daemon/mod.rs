pub mod config;
pub mod controller;
pub mod events;
pub mod ipc;
pub mod run;
pub mod tasks;
pub mod watcher;
