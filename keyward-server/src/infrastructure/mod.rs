pub mod debug_mode;
pub mod logging;
pub mod settings;
