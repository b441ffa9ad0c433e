use std::path::PathBuf;

pub type CmdResult<T> = relabel::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod apply;
pub mod check;
pub mod restore;

/// Expand `~` in a path argument.
pub(crate) fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (relabel::Result<serde_json::Value>, i32) {
    crate::tty::status("relabel is working...");

    match command {
        crate::Commands::Apply(args) => dispatch!(args, global, apply),
        crate::Commands::Check(args) => dispatch!(args, global, check),
        crate::Commands::Restore(args) => dispatch!(args, global, restore),
    }
}
