pub mod analysis;
pub mod config;
pub mod congestion;
pub mod controller;
pub mod error;
pub mod id;
pub mod io;
pub mod logging;
pub mod network;
pub mod random;
pub mod routing;
pub mod scenario;
pub mod traffic;
pub mod voltage;
