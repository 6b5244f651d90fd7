pub mod backup;
pub mod cmd;
pub mod config;
pub mod display;
pub mod dumpsys;
pub mod error;
pub mod graphics;
pub mod overlay;
pub mod permission;
pub mod platform;
pub mod procfs;
pub mod qos;
pub mod reaper;
pub mod sampler;
pub mod store;
pub mod thermal;
pub mod wifi;
