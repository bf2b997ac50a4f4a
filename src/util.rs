//! Command-line placeholder substitution and shell quoting (spec §4.7).
//!
//! No regex dependency is pulled in for this: the placeholder grammar is a
//! small fixed set of prefixes, cheaper to scan by hand than to compile a
//! pattern for.

use std::collections::HashMap;

use crate::error::{FlowError, Result};
use crate::ids::Oid;

/// Everything `substitute_placeholders` needs to resolve one command line,
/// already partitioned the way spec §4.7 describes: filesystem-backed
/// inputs/outputs in declaration order (by container path), and URL-backed
/// ones (by dataURL), plus whatever container IPs have been resolved so far.
pub struct PlaceholderContext<'a> {
    pub fs_inputs: &'a [String],
    pub fs_outputs: &'a [String],
    pub fs_input_uids: &'a [String],
    pub fs_output_uids: &'a [String],
    pub url_inputs: &'a [String],
    pub url_outputs: &'a [String],
    pub url_input_uids: &'a [String],
    pub url_output_uids: &'a [String],
    pub container_ips: &'a HashMap<Oid, String>,
}

fn index_by_position(values: &[String], idx: usize) -> Option<&str> {
    values.get(idx).map(String::as_str)
}

fn index_by_uid<'a>(values: &'a [String], uids: &[String], uid: &str) -> Option<&'a str> {
    uids.iter().position(|u| u == uid).and_then(|i| values.get(i)).map(String::as_str)
}

/// Substitutes every recognized placeholder in `command`. Unresolved
/// `%containerIp[OID]%` placeholders are an error: the caller is expected to
/// have already blocked on the relevant waiters (spec §4.7 Interest).
pub fn substitute_placeholders(command: &str, ctx: &PlaceholderContext) -> Result<String> {
    let bytes = command.as_bytes();
    let mut out = String::with_capacity(command.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let ch = command[i..].chars().next().expect("i is a valid char boundary");
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        if let Some((oid, consumed)) = try_container_ip(&command[i..]) {
            let ip = ctx
                .container_ips
                .get(&Oid::new(oid.to_string()))
                .ok_or_else(|| FlowError::invalid_state(format!("no containerIp published for {oid}")))?;
            out.push_str(ip);
            i += consumed;
            continue;
        }

        if let Some((rest, consumed)) = try_prefix(&command[i..], "%iDataURL") {
            out.push_str(resolve_url(rest, ctx.url_inputs, ctx.url_input_uids)?);
            i += consumed;
            continue;
        }
        if let Some((rest, consumed)) = try_prefix(&command[i..], "%oDataURL") {
            out.push_str(resolve_url(rest, ctx.url_outputs, ctx.url_output_uids)?);
            i += consumed;
            continue;
        }
        if let Some((rest, consumed)) = try_prefix(&command[i..], "%i") {
            out.push_str(resolve_path(rest, ctx.fs_inputs, ctx.fs_input_uids)?);
            i += consumed;
            continue;
        }
        if let Some((rest, consumed)) = try_prefix(&command[i..], "%o") {
            out.push_str(resolve_path(rest, ctx.fs_outputs, ctx.fs_output_uids)?);
            i += consumed;
            continue;
        }

        out.push('%');
        i += 1;
    }

    Ok(out)
}

/// Returns the rest of the placeholder body after `prefix` and how many
/// bytes of `text` the whole placeholder (prefix + body) consumes, where the
/// body is either a run of digits or a `[UID]` bracket.
fn try_prefix<'a>(text: &'a str, prefix: &str) -> Option<(PlaceholderBody<'a>, usize)> {
    let rest = text.strip_prefix(prefix)?;
    if let Some(inner) = rest.strip_prefix('[') {
        let end = inner.find(']')?;
        Some((PlaceholderBody::Uid(&inner[..end]), prefix.len() + end + 2))
    } else {
        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return None;
        }
        Some((PlaceholderBody::Index(&rest[..digits_len]), prefix.len() + digits_len))
    }
}

enum PlaceholderBody<'a> {
    Index(&'a str),
    Uid(&'a str),
}

fn resolve_path<'a>(body: PlaceholderBody<'a>, values: &'a [String], uids: &'a [String]) -> Result<&'a str> {
    match body {
        PlaceholderBody::Index(idx) => {
            let idx: usize = idx.parse().map_err(|_| FlowError::bad_descriptor("malformed index placeholder"))?;
            index_by_position(values, idx).ok_or_else(|| FlowError::invalid_config(format!("no filesystem binding at index {idx}")))
        }
        PlaceholderBody::Uid(uid) => {
            index_by_uid(values, uids, uid).ok_or_else(|| FlowError::invalid_config(format!("no filesystem binding for uid {uid}")))
        }
    }
}

fn resolve_url<'a>(body: PlaceholderBody<'a>, values: &'a [String], uids: &'a [String]) -> Result<&'a str> {
    resolve_path(body, values, uids)
}

fn try_container_ip(text: &str) -> Option<(&str, usize)> {
    let rest = text.strip_prefix("%containerIp[")?;
    let end = rest.find("]%")?;
    Some((&rest[..end], "%containerIp[".len() + end + 2))
}

/// Scans `command` for every `%containerIp[OID]%` placeholder and returns
/// the referenced OIDs in the order they first appear, deduplicated. Used at
/// container-process construction time to know which peers to register
/// interest in before `run` needs their addresses (spec §4.7 Interest).
pub fn extract_container_ip_oids(command: &str) -> Vec<Oid> {
    let mut found = Vec::new();
    let mut search_from = 0;
    while let Some(start) = command[search_from..].find("%containerIp[") {
        let absolute = search_from + start;
        if let Some((oid, consumed)) = try_container_ip(&command[absolute..]) {
            let oid = Oid::new(oid.to_string());
            if !found.contains(&oid) {
                found.push(oid);
            }
            search_from = absolute + consumed;
        } else {
            search_from = absolute + "%containerIp[".len();
        }
    }
    found
}

/// Wraps `s` in single quotes, escaping embedded single quotes the POSIX
/// way (`'"'"'`), so the whole command can be handed to `sh -c` uniformly.
pub fn shell_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("'\"'\"'");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        fs_inputs: &'a [String],
        fs_input_uids: &'a [String],
        fs_outputs: &'a [String],
        fs_output_uids: &'a [String],
        container_ips: &'a HashMap<Oid, String>,
    ) -> PlaceholderContext<'a> {
        PlaceholderContext {
            fs_inputs,
            fs_outputs,
            fs_input_uids,
            fs_output_uids,
            url_inputs: &[],
            url_outputs: &[],
            url_input_uids: &[],
            url_output_uids: &[],
            container_ips,
        }
    }

    #[test]
    fn substitutes_indexed_and_uid_placeholders() {
        let fs_inputs = vec!["/sandbox_root/in/a".to_string()];
        let fs_input_uids = vec!["uid-a1".to_string()];
        let fs_outputs = vec!["/sandbox_root/out".to_string()];
        let fs_output_uids = vec!["uid-b1".to_string()];
        let ips = HashMap::new();
        let context = ctx(&fs_inputs, &fs_input_uids, &fs_outputs, &fs_output_uids, &ips);

        let out = substitute_placeholders("run %i0 --out %o[uid-b1]", &context).unwrap();
        assert_eq!(out, "run /sandbox_root/in/a --out /sandbox_root/out");
    }

    #[test]
    fn substitutes_container_ip_exactly_once() {
        let fs_inputs: Vec<String> = Vec::new();
        let fs_input_uids: Vec<String> = Vec::new();
        let fs_outputs: Vec<String> = Vec::new();
        let fs_output_uids: Vec<String> = Vec::new();
        let mut ips = HashMap::new();
        ips.insert(Oid::new("p-oid"), "10.0.0.7".to_string());
        let context = ctx(&fs_inputs, &fs_input_uids, &fs_outputs, &fs_output_uids, &ips);

        let out = substitute_placeholders("connect %containerIp[p-oid]%", &context).unwrap();
        assert_eq!(out, "connect 10.0.0.7");
    }

    #[test]
    fn shell_quote_escapes_embedded_quotes() {
        assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
    }
}
