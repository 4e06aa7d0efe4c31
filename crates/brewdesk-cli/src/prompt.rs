//! Terminal prompts. Typed input goes through the same per-character guards
//! a form field would apply.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use brewdesk_core::validation::{can_add_email_char, can_add_password_char};

/// Keep the characters `accept` allows, given how many are already kept
fn filter_input(raw: &str, accept: fn(usize, char) -> bool) -> String {
    let mut kept = String::new();
    let mut len = 0;
    for c in raw.chars() {
        if accept(len, c) {
            kept.push(c);
            len += 1;
        }
    }
    kept
}

pub fn email(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read email")?;
    Ok(filter_input(&line, can_add_email_char))
}

pub fn password(label: &str) -> Result<String> {
    let raw = rpassword::prompt_password(label).context("Failed to read password")?;
    Ok(filter_input(&raw, can_add_password_char))
}
