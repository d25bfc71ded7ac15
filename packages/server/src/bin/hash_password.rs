//! Print an argon2 PHC hash for a password, for use in `auth.users`.
//!
//! Usage: `hash-password <password>`, or pipe the password on stdin.

use std::io::BufRead;

use anyhow::{Context, bail};
use hashbin_server::utils::password::hash_password;

fn main() -> anyhow::Result<()> {
    let password = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => std::io::stdin()
            .lock()
            .lines()
            .next()
            .context("No password given")??,
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let hash =
        hash_password(&password).map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    println!("{hash}");
    Ok(())
}
