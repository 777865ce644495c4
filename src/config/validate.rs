//! Configuration validation with unknown field detection.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::channels::{DISCORD_CHANNEL, WEB_CHANNEL, WHATSAPP_CHANNEL};

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &["channels", "logging"];

/// Known fields for each section.
const KNOWN_CHANNELS: &[&str] = &["web", "whatsapp", "discord", "webhooks"];
const KNOWN_WEB: &[&str] = &["enabled"];
const KNOWN_WHATSAPP: &[&str] = &["webhook_url", "auth_token", "timeout_secs"];
const KNOWN_DISCORD: &[&str] = &["webhook_url", "username", "timeout_secs"];
const KNOWN_WEBHOOK: &[&str] = &["name", "url", "timeout_secs", "headers"];
const KNOWN_LOGGING: &[&str] = &["format", "level", "file"];

/// Channel names the factory registers itself; generic webhooks may not reuse them.
const RESERVED_CHANNEL_NAMES: &[&str] = &[WEB_CHANNEL, WHATSAPP_CHANNEL, DISCORD_CHANNEL];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

impl Diagnostic {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warn(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            path: path.into(),
            message: message.into(),
        }
    }

    fn ok(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: message.into(),
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

/// Push an error for every key of `obj` not in `known`. Returns true if any
/// unknown key was found.
fn check_keys(
    obj: &Map<String, Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let known_set: HashSet<&str> = known.iter().copied().collect();
    let mut has_unknown = false;
    for key in obj.keys() {
        if known_set.contains(key.as_str()) {
            continue;
        }
        has_unknown = true;
        let msg = match suggest_field(key, known) {
            Some(suggestion) => format!("Unknown field '{}' ({})", key, suggestion),
            None => format!("Unknown field '{}'", key),
        };
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        diagnostics.push(Diagnostic::error(path, msg));
    }
    has_unknown
}

/// Checks that an optional URL field is an http(s) URL.
fn check_url(value: Option<&Value>, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Some(value) = value else { return };
    if value.is_null() {
        return;
    }
    let Some(raw) = value.as_str() else {
        diagnostics.push(Diagnostic::error(path, "Must be a string"));
        return;
    };
    match reqwest::Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => diagnostics.push(Diagnostic::error(
            path,
            format!("Unsupported URL scheme '{}'", url.scheme()),
        )),
        Err(e) => diagnostics.push(Diagnostic::error(path, format!("Invalid URL: {}", e))),
    }
}

fn check_timeout(obj: &Map<String, Value>, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if obj.get("timeout_secs").and_then(Value::as_u64) == Some(0) {
        diagnostics.push(Diagnostic::warn(
            format!("{}.timeout_secs", path),
            "Zero timeout, clamped to 1 second",
        ));
    }
}

/// Validate a raw JSON config value against known field names and channel
/// constraints.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let Some(obj) = raw.as_object() else {
        diagnostics.push(Diagnostic::error("", "Config must be a JSON object"));
        return diagnostics;
    };

    diagnostics.push(Diagnostic::ok("Valid JSON"));

    let mut has_unknown = check_keys(obj, KNOWN_TOP_LEVEL, "", &mut diagnostics);

    if let Some(logging) = obj.get("logging").and_then(Value::as_object) {
        has_unknown |= check_keys(logging, KNOWN_LOGGING, "logging", &mut diagnostics);
    }

    if let Some(channels) = obj.get("channels").and_then(Value::as_object) {
        has_unknown |= check_keys(channels, KNOWN_CHANNELS, "channels", &mut diagnostics);

        if let Some(web) = channels.get("web").and_then(Value::as_object) {
            has_unknown |= check_keys(web, KNOWN_WEB, "channels.web", &mut diagnostics);
        }
        if let Some(wa) = channels.get("whatsapp").and_then(Value::as_object) {
            has_unknown |= check_keys(wa, KNOWN_WHATSAPP, "channels.whatsapp", &mut diagnostics);
            check_url(
                wa.get("webhook_url"),
                "channels.whatsapp.webhook_url",
                &mut diagnostics,
            );
            check_timeout(wa, "channels.whatsapp", &mut diagnostics);
        }
        if let Some(discord) = channels.get("discord").and_then(Value::as_object) {
            has_unknown |=
                check_keys(discord, KNOWN_DISCORD, "channels.discord", &mut diagnostics);
            check_url(
                discord.get("webhook_url"),
                "channels.discord.webhook_url",
                &mut diagnostics,
            );
            check_timeout(discord, "channels.discord", &mut diagnostics);
        }
        if let Some(hooks) = channels.get("webhooks").and_then(Value::as_array) {
            has_unknown |= validate_webhooks(hooks, &mut diagnostics);
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::ok("All fields recognized"));
    }

    diagnostics
}

fn validate_webhooks(hooks: &[Value], diagnostics: &mut Vec<Diagnostic>) -> bool {
    let mut has_unknown = false;
    let mut seen = HashSet::new();

    for (i, hook) in hooks.iter().enumerate() {
        let path = format!("channels.webhooks[{}]", i);
        let Some(hook) = hook.as_object() else {
            diagnostics.push(Diagnostic::error(path, "Must be an object"));
            continue;
        };
        has_unknown |= check_keys(hook, KNOWN_WEBHOOK, &path, diagnostics);

        match hook.get("name").and_then(Value::as_str).map(str::trim) {
            None | Some("") => {
                diagnostics.push(Diagnostic::error(
                    format!("{}.name", path),
                    "Webhook name is required",
                ));
            }
            Some(name) if RESERVED_CHANNEL_NAMES.contains(&name) => {
                diagnostics.push(Diagnostic::error(
                    format!("{}.name", path),
                    format!("'{}' is a built-in channel name", name),
                ));
            }
            Some(name) => {
                if !seen.insert(name.to_string()) {
                    diagnostics.push(Diagnostic::error(
                        format!("{}.name", path),
                        format!(
                            "Duplicate webhook name '{}' (later entry replaces earlier)",
                            name
                        ),
                    ));
                }
            }
        }

        if hook.get("url").map_or(true, Value::is_null) {
            diagnostics.push(Diagnostic::warn(
                format!("{}.url", path),
                "No URL, channel will stay inactive",
            ));
        }
        check_url(hook.get("url"), &format!("{}.url", path), diagnostics);
        check_timeout(hook, &path, diagnostics);
    }
    has_unknown
}
