pub mod logging;
pub mod port;
