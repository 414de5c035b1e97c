//! Interactive confirmation.

use std::io::{self, BufRead, Write};

/// The only answer that counts as consent.
pub const ACCEPT: &str = "Y";

/// Ask `question` on stderr and read one line from stdin.
///
/// Only an exact `Y` confirms; anything else, including end of input, is a
/// refusal.
pub fn confirm(question: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let stderr = io::stderr();
    confirm_with(&mut stdin.lock(), &mut stderr.lock(), question)
}

/// [`confirm`] over arbitrary input and output streams.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(output, "{question} [{ACCEPT} to confirm] ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    Ok(answer.trim_end_matches(['\r', '\n']) == ACCEPT)
}
