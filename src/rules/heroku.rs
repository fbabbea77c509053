//! Heroku CLI analysis - flags commands that destroy apps or data.

use super::Invocation;
use crate::config::AnalyzerConfig;
use crate::decision::Verdict;

/// Analyze Heroku CLI commands for destructive operations.
pub fn analyze_heroku(invocation: &Invocation<'_>, _config: &AnalyzerConfig) -> Verdict {
    let words = invocation.words();
    if words.len() < 2 {
        return Verdict::allow();
    }

    // Check subcommand (words[1])
    match words[1] {
        // App and data destruction
        "apps:destroy" | "destroy" => Verdict::deny(
            "heroku.apps.destroy",
            "heroku apps:destroy permanently deletes the app",
        ),
        "pg:reset" => Verdict::deny(
            "heroku.pg.reset",
            "heroku pg:reset deletes all data in the database",
        ),
        "addons:destroy" => Verdict::deny(
            "heroku.addons.destroy",
            "heroku addons:destroy deletes the add-on and its data",
        ),

        // Disruptive but recoverable
        "pg:killall" => Verdict::warn(
            "heroku.pg.killall",
            "heroku pg:killall terminates every database connection",
        ),
        "releases:rollback" => Verdict::warn(
            "heroku.releases.rollback",
            "heroku releases:rollback redeploys an older release",
        ),
        "config:unset" => Verdict::warn(
            "heroku.config.unset",
            "heroku config:unset removes environment variables and restarts the app",
        ),

        // Allow all other commands
        _ => Verdict::allow(),
    }
}
