use std::path::PathBuf;

use clap::Parser;
use weave_core::config::CommandLine;
use weave_core::kernel::constants::DEFAULT_CONFIG_ROOT;

/// Weave: compose a program from feature modules and run it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory holding one sub-directory per named configuration
    #[arg(long, default_value = DEFAULT_CONFIG_ROOT)]
    pub config_root: PathBuf,

    /// Program arguments; `key=value` overrides a top-level config key
    /// (`config=<name>` selects the configuration)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CliArgs {
    pub fn command_line(&self) -> CommandLine {
        CommandLine::parse(&self.args)
    }
}
