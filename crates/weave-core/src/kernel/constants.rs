/// Application name
pub const APP_NAME: &str = "weave";

/// Default directory holding one sub-directory of fragments per named configuration
pub const DEFAULT_CONFIG_ROOT: &str = "config";

/// File stem of the fragment that merges into its own directory's level
pub const ROOT_CONFIG_STEM: &str = "config";

/// Top-level key selecting the configuration directory (`config=<name>`)
pub const CONFIG_SELECT_KEY: &str = "config";

/// Top-level key listing the feature modules to load, in order
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// Top-level key holding positional command-line arguments
pub const ARGS_KEY: &str = "args";

/// Top-level key holding the hot-reload orchestrator settings
pub const DYNAMO_KEY: &str = "dynamo";
