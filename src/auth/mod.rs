//! Primary API key management.
//!
//! `causerie auth` and `causerie deauth` manage the bearer credential
//! used for every chat request. The key lands in the settings store
//! (system keyring in normal operation); the conversation orchestrator
//! reads it back on each send.

use std::error::Error;
use std::io::{self, Write};

use crate::core::store::{keys, SettingsStore};

/// Prompt for an API key on stdin and store it.
pub fn run_auth(store: &dyn SettingsStore) -> Result<(), Box<dyn Error>> {
    print!("Enter your API key: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let token = input.trim();

    if token.is_empty() {
        return Err("No API key entered.".into());
    }

    store.set(keys::API_KEY, token)?;
    println!("✅ API key saved ({}).", mask_key(token));
    Ok(())
}

/// Remove the stored API key.
pub fn run_deauth(store: &dyn SettingsStore) -> Result<(), Box<dyn Error>> {
    match store.get(keys::API_KEY)? {
        Some(_) => {
            store.remove(keys::API_KEY)?;
            println!("✅ API key removed.");
        }
        None => println!("No API key is stored."),
    }
    Ok(())
}

/// Shorten a credential for display: first and last four characters
/// with the middle elided, or full masking for short values.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_are_fully_masked() {
        assert_eq!(mask_key("abcd"), "****");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn long_keys_keep_head_and_tail() {
        assert_eq!(mask_key("sk-proj-1234567890"), "sk-p…7890");
    }
}
