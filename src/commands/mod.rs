// Plugin lifecycle commands
pub mod plugin;
