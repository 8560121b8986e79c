use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::values::{parse_duration, parse_size};

const DEFAULT_CENTER_FREQUENCY_HZ: u64 = 435_000_000;
const DEFAULT_SAMPLE_RATE_HZ: u32 = 1_000_000;
const DEFAULT_FEC_BLOCKS: u8 = 0;
const DEFAULT_TX_DELAY_US: u32 = 0;
const DEFAULT_DATA_PORT: u16 = 9090;
const DEFAULT_CONTROL_PORT: u16 = 9091;

/// INI-style startup configuration file: `[section]` headers followed by
/// `key = value` lines. Mirrors the grounding crate's ceph.conf parser, with
/// SDR-specific accessors in place of Ceph's monitor/keyring ones.
#[derive(Debug, Default, Clone)]
pub struct DaemonConfig {
    sections: HashMap<String, HashMap<String, String>>,
}

impl DaemonConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = "global".to_string();
        sections.entry(current.clone()).or_default();

        for (lineno, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                current = stripped.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                Error::Parse(format!("line {}: expected key = value", lineno + 1))
            })?;
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self { sections })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(|s| s.as_str())
    }

    pub fn get_with_fallback(&self, sections: &[&str], key: &str) -> Option<&str> {
        sections.iter().find_map(|s| self.get(s, key))
    }

    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(|s| s.as_str()).collect()
    }

    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|m| m.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn center_frequency_hz(&self) -> u64 {
        self.get_with_fallback(&["sdr", "global"], "freq")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CENTER_FREQUENCY_HZ)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.get_with_fallback(&["sdr", "global"], "srate")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SAMPLE_RATE_HZ)
    }

    pub fn fec_blocks(&self) -> u8 {
        self.get_with_fallback(&["sdr", "global"], "fecblk")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FEC_BLOCKS)
    }

    pub fn tx_delay_us(&self) -> u32 {
        self.get_with_fallback(&["sdr", "global"], "txdelay")
            .map(|v| parse_duration(v).map(|d| d.as_micros() as u32).unwrap_or(DEFAULT_TX_DELAY_US))
            .unwrap_or(DEFAULT_TX_DELAY_US)
    }

    pub fn data_port(&self) -> u16 {
        self.get_with_fallback(&["sdr", "global"], "dataport")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DATA_PORT)
    }

    pub fn control_port(&self) -> u16 {
        self.get_with_fallback(&["sdr", "global"], "ctlport")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONTROL_PORT)
    }

    pub fn residual_buffer_payloads(&self) -> usize {
        self.get_with_fallback(&["sdr", "global"], "bufpayloads")
            .and_then(|v| parse_size(v).ok())
            .map(|v| v as usize)
            .unwrap_or(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_falls_back_to_global() {
        let cfg = DaemonConfig::parse(
            "freq = 100000000\n[sdr]\nsrate = 2000000\nfecblk = 16\n",
        )
        .unwrap();
        assert_eq!(cfg.center_frequency_hz(), 100_000_000);
        assert_eq!(cfg.sample_rate_hz(), 2_000_000);
        assert_eq!(cfg.fec_blocks(), 16);
    }

    #[test]
    fn missing_file_values_fall_back_to_defaults() {
        let cfg = DaemonConfig::parse("").unwrap();
        assert_eq!(cfg.center_frequency_hz(), DEFAULT_CENTER_FREQUENCY_HZ);
        assert_eq!(cfg.data_port(), DEFAULT_DATA_PORT);
        assert_eq!(cfg.control_port(), DEFAULT_CONTROL_PORT);
    }

    #[test]
    fn tx_delay_accepts_duration_suffix() {
        let cfg = DaemonConfig::parse("[sdr]\ntxdelay = 100us\n").unwrap();
        assert_eq!(cfg.tx_delay_us(), 100);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(DaemonConfig::parse("not a kv line").is_err());
    }
}
