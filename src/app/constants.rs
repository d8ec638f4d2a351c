/// Name given to an app when the caller does not pick one.
pub const DEFAULT_ENTRY_NAME: &str = "[DEFAULT]";
