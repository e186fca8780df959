use std::io::{BufRead, Write};

use anyhow::{bail, Result};

/// Print a numbered list and read a 1-based choice, asking again until it
/// is valid. Returns the 0-based index.
pub fn choose<R: BufRead, W: Write>(
    items: &[String],
    heading: &str,
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<usize> {
    if items.is_empty() {
        bail!("nothing to choose from: {}", heading);
    }

    writeln!(output, "\n{}", heading)?;
    for (idx, item) in items.iter().enumerate() {
        writeln!(output, "{}. {}", idx + 1, item)?;
    }

    loop {
        write!(output, "\n{}: ", prompt)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("input closed before a choice was made");
        }

        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=items.len()).contains(&choice) => return Ok(choice - 1),
            Ok(_) => writeln!(
                output,
                "Invalid choice. Please select a number between 1 and {}.",
                items.len()
            )?,
            Err(_) => writeln!(output, "Invalid input. Please enter a valid number.")?,
        }
    }
}
