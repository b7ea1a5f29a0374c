//! nftables.conf profile extraction
//!
//! This is not a grammar for nftables. The file is lexed into a flat token
//! stream and three shapes are picked out of it wherever they appear:
//!
//! - `set allowed_ips_<name> { ... elements = { a, b } ... }`
//! - `set allowed_tcp_ports_<name> { ... elements = { 22, 443 } ... }`
//! - `ip saddr @allowed_ips_<name> tcp dport @allowed_tcp_ports_<name> accept comment "<text>"`
//!
//! Everything else (base rules, chain headers, hand-written additions) is
//! skipped. Profile names are the union of the three groups, in order of first
//! appearance. A rule whose two set references name different profiles
//! contributes nothing.

use crate::core::profiles::ProfileStore;
use crate::core::ruleset::{IP_SET_PREFIX, PORT_SET_PREFIX};
use logos::Logos;
use tracing::debug;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip(r"([ \t\r\n\f]+|#[^\n]*)", allow_greedy = true))]
enum Token<'s> {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token("=")]
    Equals,

    /// `@setname`, without the `@`
    #[regex(r"@[A-Za-z0-9_]+", |lex| &lex.slice()[1..])]
    SetRef(&'s str),

    /// Double-quoted string, without the quotes
    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Str(&'s str),

    /// Keywords, identifiers, addresses, ports
    #[regex(r"[A-Za-z0-9_./:\-]+", |lex| lex.slice())]
    Word(&'s str),
}

/// Which of the two per-profile sets a `set` block declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetKind {
    Ips,
    Ports,
}

/// Parses nftables.conf text into a profile store.
///
/// Never fails: unrecognised or malformed input simply yields fewer profiles.
pub fn parse_conf(text: &str) -> ProfileStore {
    let mut skipped = 0usize;
    let tokens: Vec<Token<'_>> = Token::lexer(text)
        .filter_map(|token| {
            if token.is_err() {
                skipped += 1;
            }
            token.ok()
        })
        .collect();

    if skipped > 0 {
        debug!("Skipped {} unrecognised fragment(s) while parsing config", skipped);
    }

    let mut store = ProfileStore::new();
    let mut i = 0;

    while i < tokens.len() {
        if let Some(consumed) = match_set(&tokens[i..], &mut store) {
            i += consumed;
        } else if let Some(consumed) = match_profile_rule(&tokens[i..], &mut store) {
            i += consumed;
        } else {
            i += 1;
        }
    }

    store
}

/// Splits a set name into its kind and profile name
fn classify_set(set_name: &str) -> Option<(SetKind, &str)> {
    let (kind, profile) = if let Some(rest) = set_name.strip_prefix(IP_SET_PREFIX) {
        (SetKind::Ips, rest)
    } else if let Some(rest) = set_name.strip_prefix(PORT_SET_PREFIX) {
        (SetKind::Ports, rest)
    } else {
        return None;
    };

    is_profile_name(profile).then_some((kind, profile))
}

fn is_profile_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Matches `set <name> { ... }` at the start of `tokens`.
///
/// Returns the number of tokens consumed when the set is one of ours.
fn match_set(tokens: &[Token<'_>], store: &mut ProfileStore) -> Option<usize> {
    let [Token::Word("set"), Token::Word(set_name), Token::LBrace, ..] = tokens else {
        return None;
    };
    let (kind, profile) = classify_set(set_name)?;

    let body_start = 3;
    let body_len = tokens[body_start..]
        .iter()
        .scan(1usize, |depth, token| {
            if *depth == 0 {
                return None;
            }
            match token {
                Token::LBrace => *depth += 1,
                Token::RBrace => *depth -= 1,
                _ => {}
            }
            Some(())
        })
        .count();
    // body_len includes the closing brace when the set is terminated
    let body = &tokens[body_start..body_start + body_len];

    let elements = find_elements(body).unwrap_or_default();
    let entry = store.entry(profile);
    match kind {
        SetKind::Ips => entry.ips = elements,
        SetKind::Ports => entry.ports = elements,
    }

    Some(body_start + body_len)
}

/// Finds `elements = { ... }` in a set body and returns its values.
///
/// Words between two commas are joined with a single space, so an element
/// that is not a single token survives as written.
fn find_elements(body: &[Token<'_>]) -> Option<Vec<String>> {
    let start = body.windows(3).position(|w| {
        matches!(
            w,
            [Token::Word("elements"), Token::Equals, Token::LBrace]
        )
    })? + 3;

    let mut elements = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for token in &body[start..] {
        match token {
            Token::RBrace => break,
            Token::Comma => {
                if !current.is_empty() {
                    elements.push(current.join(" "));
                    current.clear();
                }
            }
            Token::Word(value) | Token::Str(value) => current.push(*value),
            _ => {}
        }
    }
    if !current.is_empty() {
        elements.push(current.join(" "));
    }

    Some(elements)
}

/// Matches the per-profile accept rule at the start of `tokens`.
fn match_profile_rule(tokens: &[Token<'_>], store: &mut ProfileStore) -> Option<usize> {
    let [
        Token::Word("ip"),
        Token::Word("saddr"),
        Token::SetRef(ip_set),
        Token::Word("tcp"),
        Token::Word("dport"),
        Token::SetRef(port_set),
        Token::Word("accept"),
        Token::Word("comment"),
        Token::Str(comment),
        ..,
    ] = tokens
    else {
        return None;
    };

    let (SetKind::Ips, ip_profile) = classify_set(ip_set)? else {
        return None;
    };
    let (SetKind::Ports, port_profile) = classify_set(port_set)? else {
        return None;
    };

    if ip_profile != port_profile {
        debug!(
            "Ignoring rule comment: @{} and @{} name different profiles",
            ip_set, port_set
        );
        return None;
    }

    store.entry(ip_profile).comment = (*comment).to_string();
    Some(9)
}
