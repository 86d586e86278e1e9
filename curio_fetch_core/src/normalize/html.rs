//! Helpers for the pattern-extraction strategy
//!
//! Sources without a structured API are scraped with anchored regular
//! expressions over HTML. These helpers handle the parts regexes are bad
//! at: entity decoding and tag stripping.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Replace character entities with their literal characters.
///
/// Handles the named entities that actually occur in the scraped pages plus
/// decimal and hex numeric references; unknown entities pass through.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            if let Some(rest) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return decode_numeric(rest, 16).unwrap_or_else(|| caps[0].to_string());
            }
            if let Some(rest) = body.strip_prefix('#') {
                return decode_numeric(rest, 10).unwrap_or_else(|| caps[0].to_string());
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                "eacute" => "é".to_string(),
                "egrave" => "è".to_string(),
                "agrave" => "à".to_string(),
                "ccedil" => "ç".to_string(),
                "uuml" => "ü".to_string(),
                "ouml" => "ö".to_string(),
                "auml" => "ä".to_string(),
                "copy" => "©".to_string(),
                "reg" => "®".to_string(),
                "trade" => "™".to_string(),
                "hellip" => "…".to_string(),
                "ndash" => "–".to_string(),
                "mdash" => "—".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn decode_numeric(digits: &str, radix: u32) -> Option<String> {
    let code = u32::from_str_radix(digits, radix).ok()?;
    char::from_u32(code).map(|c| c.to_string())
}

/// Drop markup tags and collapse runs of whitespace.
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    WS_RE.replace_all(without_tags.trim(), " ").into_owned()
}

/// Decode entities and strip tags in one pass, for free-text fields.
pub fn clean_fragment(html: &str) -> String {
    decode_entities(&strip_tags(html))
}
