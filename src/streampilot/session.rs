//! Line-oriented session driver.
//!
//! Reads user input, hands it to the orchestrator, prints the outcome, and
//! loops until the reserved exit token or end of input. Orchestrator errors
//! are printed as visible messages and the loop keeps going — a provider
//! hiccup never ends the session.

use crate::streampilot::orchestrator::{Orchestrator, TurnOutcome};
use std::io::{self, BufRead, Write};

/// Reserved, case-insensitive token that terminates the session.
pub const EXIT_COMMAND: &str = "quit";

/// Run the interactive loop over the supplied streams.
///
/// Every input line other than the exit token — the empty string included —
/// is treated as conversational content. The exit token is only honored at
/// the line boundary; an in-flight round always finishes first.
pub async fn run_session<R: BufRead, W: Write>(
    orchestrator: &mut Orchestrator,
    input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(output, "--- streampilot ({}) ---", orchestrator.model_name())?;
    writeln!(
        output,
        "Ask me about the cluster. Type '{}' to exit.",
        EXIT_COMMAND
    )?;

    let mut lines = input.lines();
    loop {
        write!(output, "\nyou> ")?;
        output.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }

        match orchestrator.handle_message(&line).await {
            Ok(TurnOutcome::Answer(answer)) => {
                writeln!(output, "\n{}", answer)?;
            }
            Ok(TurnOutcome::NoResponse) => {
                writeln!(output, "\n[no response produced]")?;
            }
            Err(err) => {
                writeln!(output, "\n[error] {}", err)?;
            }
        }
    }

    writeln!(output, "bye.")?;
    Ok(())
}
