use std::time::Duration;

use colored::Colorize;

use crate::application::services::governor::Governor;
use crate::application::services::subprocess::{CommandSpec, SubprocessOutcome};
use crate::domain::value_objects::op_class::OpClass;

/// Exit code reported when the command was deferred or timed out, as `timeout(1)` does
pub const EXIT_TIMED_OUT: i32 = 124;
pub const EXIT_DEFERRED: i32 = 75;

/// Run `command` under `timeout`, after checking that `class` may run at the
/// current level. Returns the exit code to propagate.
///
/// # Errors
///
/// Returns an error if the command is empty or cannot be spawned.
pub async fn run_exec(
    governor: &Governor,
    command: &[String],
    timeout: Duration,
    class: OpClass,
    force: bool,
) -> anyhow::Result<i32> {
    let Some((program, args)) = command.split_first() else {
        anyhow::bail!("no command given");
    };

    let decision = governor.should_defer(class);
    if decision.defer {
        if force {
            tracing::warn!("{} (forced)", decision.reason);
        } else {
            eprintln!("{} {}", "deferred:".yellow().bold(), decision.reason);
            return Ok(EXIT_DEFERRED);
        }
    }

    let spec = CommandSpec::new(program.clone()).args(args.iter().cloned());
    let outcome = governor.run_subprocess_with_timeout(&spec, timeout).await?;
    print!("{}", outcome.stdout);
    eprint!("{}", outcome.stderr);
    report(&spec, timeout, &outcome);
    Ok(exit_code(&outcome))
}

fn report(spec: &CommandSpec, timeout: Duration, outcome: &SubprocessOutcome) {
    if outcome.timed_out {
        let how = if outcome.escalated { "killed" } else { "terminated" };
        eprintln!(
            "{} '{spec}' exceeded {timeout:?} and was {how}",
            "timeout:".red().bold()
        );
    } else {
        tracing::debug!(
            "'{spec}' finished in {:?} with {:?}",
            outcome.duration,
            outcome.exit_code
        );
    }
}

#[must_use]
pub fn exit_code(outcome: &SubprocessOutcome) -> i32 {
    if outcome.timed_out {
        return EXIT_TIMED_OUT;
    }
    match (outcome.exit_code, outcome.signal) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
