//! Operator-facing output for the commit gate
//!
//! Everything here prints before the process exits so the operator can
//! diagnose a blocked commit without re-running the hook.

use owo_colors::OwoColorize;
use themegate_config::Config;
use themegate_engine::supervise::{Outcome, Verdict};

const RULE: &str = "────────────────────────────────────────";

/// Print the commit message between rule lines
pub fn print_commit_message(message: &str) {
    println!("Commit message and description:");
    println!("{RULE}");
    println!("{}", message.trim());
    println!("{RULE}");
}

/// Announce the bypass path
pub fn print_skip_notice(flag: &str) {
    println!(
        "{}: Found {} in commit message, theme validation will be skipped",
        "Warning".yellow(),
        flag.bold()
    );
    println!("Proceeding without theme development check...");
}

/// Announce the validation run
pub fn print_validation_start(config: &Config) {
    println!(
        "No skip flag found, running theme validation ({})",
        config.commands.dev.bold()
    );
}

/// Print the verdict with its diagnostics and any operator tips
pub fn print_outcome(outcome: &Outcome, config: &Config) {
    match outcome.verdict {
        Verdict::Allowed => {
            println!("{} Theme validation passed, commit proceeding", "OK".green());
        }
        Verdict::BlockedByError => {
            println!("{} Error detected during dev server startup:", "Blocked".red());
            print_diagnostics(&outcome.diagnostics);
            println!(
                "Tip: make sure no other development server is running on port {}",
                config.monitor.port
            );
            print_bypass_tip(config);
        }
        Verdict::BlockedByExitCode(code) => {
            println!(
                "{} Dev server exited with code {} before the check completed",
                "Blocked".red(),
                code
            );
            print_diagnostics(&outcome.diagnostics);
            print_bypass_tip(config);
        }
        Verdict::BlockedBySecondaryCheck(code) => {
            match code {
                Some(code) => println!(
                    "{} Theme check failed with code {}:",
                    "Blocked".red(),
                    code
                ),
                None => println!("{} Theme check was terminated:", "Blocked".red()),
            }
            print_diagnostics(&outcome.diagnostics);
            print_bypass_tip(config);
        }
    }
}

fn print_diagnostics(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!("{RULE}");
    for line in lines {
        println!("{line}");
    }
    println!("{RULE}");
}

fn print_bypass_tip(config: &Config) {
    let flags = config.gate.skip_flags.join(" or ");
    println!("To bypass the check, add {flags} to your commit message");
}
