use clap::{Parser, Subcommand};
use std::ffi::OsString;

/// Atmos version manager
///
/// atmosenv installs Atmos releases side by side and picks one per
/// invocation: `ATMOSENV_ATMOS_VERSION` first, then the nearest
/// `.atmos-version`, then the global selection made with `atmosenv use`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install an Atmos version
    ///
    /// Without a version, installs the one selected for the current
    /// directory, or the latest release when nothing is selected.
    Install {
        /// Version to install (MAJOR.MINOR.PATCH or "latest")
        #[arg(value_name = "VERSION")]
        version: Option<String>,

        /// Make the installed version the global selection
        #[arg(long = "use")]
        activate: bool,
    },

    /// Remove an installed version
    Uninstall {
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Select the global version ("latest" means newest installed)
    Use {
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// List installed versions
    List,

    /// List versions available upstream
    ListRemote {
        /// Show at most this many versions
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Print the version selected for the current directory
    VersionName,

    /// Print the path of the binary the shim would run
    Which,

    /// Shell integration
    ///
    /// `eval "$(atmosenv init -)"` prepends the shim directory to PATH.
    /// Without `-`, prints setup instructions.
    Init {
        /// Print the init script instead of instructions
        #[arg(value_name = "-")]
        print: Option<String>,

        /// Shell type (auto-detects from $SHELL if not specified)
        #[arg(short, long, value_name = "SHELL")]
        shell: Option<String>,

        /// Skip the directory-change hook
        #[arg(long)]
        no_hook: bool,
    },

    /// Run the selected Atmos binary (used by the shim)
    #[command(hide = true)]
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<OsString>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exec_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["atmosenv", "exec", "--", "terraform", "plan", "-s", "dev"]).unwrap();
        match cli.command {
            Commands::Exec { args } => assert_eq!(args, ["terraform", "plan", "-s", "dev"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_accepts_dash() {
        let cli = Cli::try_parse_from(["atmosenv", "init", "-", "--shell", "fish", "--no-hook"]).unwrap();
        match cli.command {
            Commands::Init { print, shell, no_hook } => {
                assert_eq!(print.as_deref(), Some("-"));
                assert_eq!(shell.as_deref(), Some("fish"));
                assert!(no_hook);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn install_use_flag() {
        let cli = Cli::try_parse_from(["atmosenv", "install", "latest", "--use"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Install { version: Some(ref v), activate: true } if v == "latest"
        ));
    }
}
