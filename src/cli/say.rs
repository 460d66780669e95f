//! TUI-less "say" command

use std::error::Error;

use crate::core::session::{ChatSession, SubmitOutcome};

/// Send one message through the normal orchestration path and print
/// the assistant reply to stdout.
pub async fn run_say(prompt: Vec<String>, mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: causerie say <prompt>");
        std::process::exit(2);
    }

    match session.submit(&prompt).await? {
        SubmitOutcome::Replied => {
            let reply = session
                .transcript()
                .last()
                .expect("a completed exchange has a reply");
            println!("{}", reply.content);
            Ok(())
        }
        SubmitOutcome::Ignored => Ok(()),
    }
}
