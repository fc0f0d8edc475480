use argh::FromArgs;
use log::warn;
use mini_shell::error::ConfigError;
use mini_shell::{Interpreter, ShellConfig, logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
/// A small interactive shell with pipelines, redirection and a few builtins.
struct Args {
    #[argh(option)]
    /// path to a TOML config file; defaults to $MINI_SHELL_CONFIG.
    config: Option<PathBuf>,

    #[argh(option)]
    /// log level (off, error, warn, info, debug, trace); overrides the config.
    log_level: Option<String>,

    #[argh(option)]
    /// write logs to this file instead of stderr.
    log_file: Option<PathBuf>,

    #[argh(option, short = 'c')]
    /// run one command line and exit.
    command: Option<String>,

    #[argh(positional)]
    /// run the commands in this file and exit.
    script: Option<PathBuf>,
}

fn load_config(args: &Args) -> (ShellConfig, Option<ConfigError>) {
    let (mut config, error) = match ShellConfig::load(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => {
            eprintln!("mini-shell: {e}; using defaults");
            (ShellConfig::default(), Some(e))
        }
    };
    if let Some(level) = &args.log_level {
        config.log.level = Some(level.clone());
    }
    if let Some(file) = &args.log_file {
        config.log.file = Some(file.clone());
    }
    (config, error)
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    let (config, config_error) = load_config(&args);
    if let Err(e) = logging::init(&config.log) {
        eprintln!("mini-shell: logging disabled: {e:#}");
    }
    if let Some(e) = config_error {
        warn!("config fallback to defaults: {e}");
    }

    let mut sh = Interpreter::new(config);
    if let Some(line) = &args.command {
        sh.execute_input(line);
    } else if let Some(script) = &args.script {
        if let Err(e) = sh.run_script(script) {
            eprintln!("{e}");
        }
    } else if let Err(e) = sh.repl() {
        eprintln!("mini-shell: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
