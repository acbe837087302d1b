//! Pluggable checkers for the `format` keyword
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::Url;

/// Checks whether a string conforms to a named format
pub trait FormatChecker: Send + Sync {
    fn check(&self, input: &str) -> bool;
}

impl<F> FormatChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn check(&self, input: &str) -> bool {
        self(input)
    }
}

/// Named format checkers; the default registry holds the built-in formats
#[derive(Clone)]
pub struct FormatRegistry {
    checkers: HashMap<String, Arc<dyn FormatChecker>>,
}

impl FormatRegistry {
    /// A registry without any checkers
    pub fn empty() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    /// Add or replace a checker
    pub fn register(&mut self, name: impl Into<String>, checker: impl FormatChecker + 'static) {
        self.checkers.insert(name.into(), Arc::new(checker));
    }

    pub fn get(&self, name: &str) -> Option<&dyn FormatChecker> {
        self.checkers.get(name).map(|checker| checker.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checkers.contains_key(name)
    }

    /// Registered format names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("date-time", is_date_time);
        registry.register("date", is_date);
        registry.register("time", is_time);
        registry.register("email", is_email);
        registry.register("idn-email", is_idn_email);
        registry.register("hostname", is_hostname);
        registry.register("idn-hostname", is_idn_hostname);
        registry.register("ipv4", is_ipv4);
        registry.register("ipv6", is_ipv6);
        registry.register("uri", is_uri);
        registry.register("uri-reference", is_uri_reference);
        registry.register("iri", is_uri);
        registry.register("iri-reference", is_uri_reference);
        registry.register("uri-template", is_uri_template);
        registry.register("json-pointer", is_json_pointer);
        registry.register("relative-json-pointer", is_relative_json_pointer);
        registry.register("regex", is_regex);
        registry.register("uuid", is_uuid);
        registry
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

fn is_date_time(input: &str) -> bool {
    DateTime::parse_from_rfc3339(input).is_ok()
}

fn is_date(input: &str) -> bool {
    input.len() == 10 && NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}

fn is_time(input: &str) -> bool {
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", input)).is_ok()
}

fn is_email(input: &str) -> bool {
    match input.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && local.len() <= 64
                && !local.starts_with('.')
                && !local.ends_with('.')
                && !local.contains("..")
                && local.chars().all(|c| c.is_ascii_graphic() && c != '@')
                && (is_hostname(domain) || is_bracketed_ip(domain))
        }
        None => false,
    }
}

fn is_idn_email(input: &str) -> bool {
    match input.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !local.chars().any(|c| c.is_whitespace() || c == '@')
                && (is_idn_hostname(domain) || is_bracketed_ip(domain))
        }
        None => false,
    }
}

fn is_bracketed_ip(domain: &str) -> bool {
    domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(|ip| is_ipv4(ip) || ip.strip_prefix("IPv6:").map_or(false, is_ipv6))
        .unwrap_or(false)
}

fn hostname_labels_valid(input: &str, label_char: impl Fn(char) -> bool) -> bool {
    let input = input.strip_suffix('.').unwrap_or(input);
    if input.is_empty() || input.len() > 253 {
        return false;
    }
    input.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(&label_char)
    })
}

fn is_hostname(input: &str) -> bool {
    hostname_labels_valid(input, |c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_idn_hostname(input: &str) -> bool {
    hostname_labels_valid(input, |c| c.is_alphanumeric() || c == '-')
}

fn is_ipv4(input: &str) -> bool {
    input.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(input: &str) -> bool {
    input.parse::<Ipv6Addr>().is_ok()
}

fn is_uri(input: &str) -> bool {
    !input.chars().any(char::is_whitespace) && Url::parse(input).is_ok()
}

fn is_uri_reference(input: &str) -> bool {
    if input.chars().any(|c| c.is_whitespace() || c == '\\') {
        return false;
    }
    Url::parse("json-schema:///")
        .and_then(|base| base.join(input))
        .is_ok()
}

fn is_uri_template(input: &str) -> bool {
    let mut open = false;
    for c in input.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

fn is_json_pointer(input: &str) -> bool {
    if input.is_empty() {
        return true;
    }
    input.starts_with('/') && escapes_valid(input)
}

fn is_relative_json_pointer(input: &str) -> bool {
    let digits = input.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && input.starts_with('0')) {
        return false;
    }
    let rest = &input[digits..];
    rest == "#" || is_json_pointer(rest)
}

fn escapes_valid(input: &str) -> bool {
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0') | Some('1')) {
            return false;
        }
    }
    true
}

fn is_regex(input: &str) -> bool {
    regex::Regex::new(input).is_ok()
}

fn is_uuid(input: &str) -> bool {
    let groups: Vec<&str> = input.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}
