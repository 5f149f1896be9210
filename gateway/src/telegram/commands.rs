//! Inbound Message Parsing
//!
//! Turns raw messages into engine actions. Grammar problems with the
//! privileged commands are answered directly with usage strings; unknown
//! commands and non-text payloads are dropped. Any other text is a
//! redemption attempt.

use kg_common::{Action, AssetRef, Code};

use super::render::{DELETE_USAGE, UPLOAD_NEEDS_VIDEO, UPLOAD_USAGE};
use super::types::Message;

/// Codes are short tokens; anything longer is garbage, not a code.
const MAX_CODE_LEN: usize = 64;

/// What the gateway should do with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Hand the parsed action to the access engine.
    Invoke(Action),
    /// Usage feedback for a malformed privileged command. Shown only to
    /// users who could have run the command; everyone else gets the same
    /// silence as for the well-formed variant.
    PrivilegedReply(&'static str),
    /// Drop the message with no visible reaction.
    Ignore,
}

/// Parse one inbound message.
#[must_use]
pub fn parse_message(message: &Message, fold_code_case: bool) -> Command {
    if message.from.is_none() {
        return Command::Ignore;
    }
    let Some(text) = message.text.as_deref() else {
        return Command::Ignore;
    };
    let text = text.trim();
    if text.is_empty() {
        return Command::Ignore;
    }

    if let Some(rest) = text.strip_prefix('/') {
        return parse_command(rest, message, fold_code_case);
    }

    // Plain text is always treated as a redemption attempt; membership is
    // judged downstream, so there is no parser-level notion of a
    // "verified" sender.
    Command::Invoke(Action::RedeemCode(Code::from_input(text, fold_code_case)))
}

fn parse_command(rest: &str, message: &Message, fold_code_case: bool) -> Command {
    let mut tokens = rest.split_whitespace();
    let Some(name) = tokens.next() else {
        return Command::Ignore;
    };
    // Commands may carry the bot's username in group chats: `/start@SomeBot`.
    let name = name.split('@').next().unwrap_or(name);
    let args: Vec<&str> = tokens.collect();

    match name {
        "start" => Command::Invoke(Action::Start),
        "upload" => parse_upload(&args, message, fold_code_case),
        "delete" => parse_delete(&args, fold_code_case),
        _ => Command::Ignore,
    }
}

/// `/upload <code> <title...>`, sent as a reply to the video being
/// registered. The replied-to video is where the asset reference comes
/// from; without it there is nothing to register.
fn parse_upload(args: &[&str], message: &Message, fold_code_case: bool) -> Command {
    let video = message
        .reply_to_message
        .as_deref()
        .and_then(|replied| replied.video.as_ref());
    let Some(video) = video else {
        return Command::PrivilegedReply(UPLOAD_NEEDS_VIDEO);
    };

    if args.len() < 2 {
        return Command::PrivilegedReply(UPLOAD_USAGE);
    }

    let code = Code::from_input(args[0], fold_code_case);
    if !is_valid_code(code.as_str()) {
        return Command::PrivilegedReply(UPLOAD_USAGE);
    }

    Command::Invoke(Action::Upload {
        code,
        title: args[1..].join(" "),
        asset: AssetRef::new(video.file_id.clone()),
    })
}

fn parse_delete(args: &[&str], fold_code_case: bool) -> Command {
    if args.len() != 1 {
        return Command::PrivilegedReply(DELETE_USAGE);
    }

    let code = Code::from_input(args[0], fold_code_case);
    if !is_valid_code(code.as_str()) {
        return Command::PrivilegedReply(DELETE_USAGE);
    }

    Command::Invoke(Action::Delete(code))
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && !code.chars().any(|c| c.is_whitespace() || c.is_control())
}
