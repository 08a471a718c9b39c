//! Shell init snippets: shim dir on `PATH` plus an optional `cd` hook.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::non_empty_var;

const HOOK_FN: &str = "_atmosenv_hook";

/// Shell type for init generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Posix,
}

impl Shell {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "posix" | "sh" | "dash" | "ksh" => Ok(Shell::Posix),
            _ => Err(Error::UnsupportedShell(name.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::Posix => "posix",
        }
    }

    /// Shell named by `$SHELL`, e.g. `/usr/bin/zsh`.
    pub fn detect() -> Result<Self> {
        let shell = non_empty_var("SHELL").ok_or_else(|| {
            Error::UnsupportedShell("$SHELL is not set; pass --shell".to_string())
        })?;
        let name = Path::new(&shell)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&shell);
        Self::from_name(name)
    }

    /// Profile file users typically add the init line to.
    pub fn rc_file(self) -> &'static str {
        match self {
            Shell::Bash => "~/.bashrc",
            Shell::Zsh => "~/.zshrc",
            Shell::Fish => "~/.config/fish/config.fish",
            Shell::Posix => "~/.profile",
        }
    }

    /// Line that evaluates the init snippet on shell startup.
    pub fn eval_line(self) -> String {
        match self {
            Shell::Fish => "atmosenv init - --shell fish | source".to_string(),
            other => format!("eval \"$(atmosenv init - --shell {})\"", other.as_str()),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub shim_dir: PathBuf,
    /// atmosenv executable the hook calls
    pub exe: PathBuf,
    /// Install the directory-change hook
    pub hook: bool,
}

/// Render the init snippet for `shell`. Pure.
pub fn emit(shell: Shell, options: &InitOptions) -> String {
    match shell {
        Shell::Fish => emit_fish(options),
        sh => emit_sh(sh, options),
    }
}

fn emit_sh(shell: Shell, options: &InitOptions) -> String {
    let shims = sh_quote(&options.shim_dir.to_string_lossy());
    let mut out = format!(
        "export ATMOSENV_SHELL={shell}\n\
         case \":${{PATH}}:\" in\n  \
           *:{shims}:*) ;;\n  \
           *) export PATH={shims}:\"${{PATH}}\" ;;\n\
         esac\n"
    );

    if !options.hook || shell == Shell::Posix {
        return out;
    }

    let exe = sh_quote(&options.exe.to_string_lossy());
    out.push_str(&format!(
        "{HOOK_FN}() {{\n  \
           [ \"${{_ATMOSENV_LAST_PWD:-}}\" = \"$PWD\" ] && return\n  \
           _ATMOSENV_LAST_PWD=\"$PWD\"\n  \
           ATMOSENV_ACTIVE_VERSION=\"$({exe} version-name 2>/dev/null)\"\n  \
           export ATMOSENV_ACTIVE_VERSION\n\
         }}\n"
    ));

    match shell {
        Shell::Zsh => out.push_str(&format!(
            "autoload -Uz add-zsh-hook\nadd-zsh-hook chpwd {HOOK_FN}\n"
        )),
        _ => out.push_str(&format!(
            "case \";${{PROMPT_COMMAND:-}};\" in\n  \
               *\";{HOOK_FN};\"*) ;;\n  \
               *) PROMPT_COMMAND=\"{HOOK_FN}${{PROMPT_COMMAND:+;$PROMPT_COMMAND}}\" ;;\n\
             esac\n"
        )),
    }
    out.push_str(&format!("{HOOK_FN}\n"));
    out
}

fn emit_fish(options: &InitOptions) -> String {
    let shims = fish_quote(&options.shim_dir.to_string_lossy());
    let mut out = format!(
        "set -gx ATMOSENV_SHELL fish\n\
         if not contains -- {shims} $PATH\n    \
             set -gx PATH {shims} $PATH\n\
         end\n"
    );

    if options.hook {
        let exe = fish_quote(&options.exe.to_string_lossy());
        out.push_str(&format!(
            "function {HOOK_FN} --on-variable PWD\n    \
                 set -gx ATMOSENV_ACTIVE_VERSION ({exe} version-name 2>/dev/null)\n\
             end\n\
             {HOOK_FN}\n"
        ));
    }
    out
}

/// Single-quote for POSIX shells.
pub(crate) fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn fish_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
