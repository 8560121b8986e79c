use crate::error::{Error, Result};

/// Trait for types parseable from a config-file value string. Mirrors the
/// grounding crate's `ConfigValue` trait, trimmed to the types this daemon
/// actually needs.
pub trait ConfigValue: Sized + Clone {
    fn parse_config_value(s: &str) -> Result<Self>;
    fn type_name() -> &'static str;
}

/// A byte count, accepting SI/IEC suffixes (K, M, G, KB, MB, GB, Ki, Mi, Gi).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size(pub u64);

impl ConfigValue for Size {
    fn parse_config_value(s: &str) -> Result<Self> {
        parse_size(s).map(Size)
    }
    fn type_name() -> &'static str {
        "size"
    }
}

/// A duration, accepting unit suffixes (us, ms, s, m, h).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration(pub std::time::Duration);

impl ConfigValue for Duration {
    fn parse_config_value(s: &str) -> Result<Self> {
        parse_duration(s).map(Duration)
    }
    fn type_name() -> &'static str {
        "duration"
    }
}

impl ConfigValue for bool {
    fn parse_config_value(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            other => Err(Error::Parse(format!("invalid bool: {other}"))),
        }
    }
    fn type_name() -> &'static str {
        "bool"
    }
}

impl ConfigValue for String {
    fn parse_config_value(s: &str) -> Result<Self> {
        Ok(s.trim().to_string())
    }
    fn type_name() -> &'static str {
        "string"
    }
}

impl ConfigValue for u32 {
    fn parse_config_value(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid u32: {s}")))
    }
    fn type_name() -> &'static str {
        "u32"
    }
}

impl ConfigValue for u64 {
    fn parse_config_value(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid u64: {s}")))
    }
    fn type_name() -> &'static str {
        "u64"
    }
}

/// Parse a plain or suffixed byte count, e.g. "64k", "512KB", "4Mi".
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let (digits, suffix) = split_numeric_suffix(s);
    let base: f64 = digits
        .parse()
        .map_err(|_| Error::Parse(format!("invalid size: {s}")))?;
    let multiplier: f64 = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1_000.0,
        "m" | "mb" => 1_000_000.0,
        "g" | "gb" => 1_000_000_000.0,
        "ki" | "kib" => 1024.0,
        "mi" | "mib" => 1024.0 * 1024.0,
        "gi" | "gib" => 1024.0 * 1024.0 * 1024.0,
        other => return Err(Error::Parse(format!("unknown size suffix: {other}"))),
    };
    Ok((base * multiplier).round() as u64)
}

/// Parse a plain or suffixed duration, e.g. "100us", "5ms", "2s", "1m".
pub fn parse_duration(s: &str) -> Result<std::time::Duration> {
    let s = s.trim();
    let (digits, suffix) = split_numeric_suffix(s);
    let base: f64 = digits
        .parse()
        .map_err(|_| Error::Parse(format!("invalid duration: {s}")))?;
    let secs: f64 = match suffix.to_ascii_lowercase().as_str() {
        "us" => base / 1_000_000.0,
        "ms" => base / 1_000.0,
        "" | "s" => base,
        "m" => base * 60.0,
        "h" => base * 3_600.0,
        other => return Err(Error::Parse(format!("unknown duration suffix: {other}"))),
    };
    Ok(std::time::Duration::from_secs_f64(secs.max(0.0)))
}

fn split_numeric_suffix(s: &str) -> (&str, &str) {
    let split_at = s
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .unwrap_or(s.len());
    s.split_at(split_at)
}
