use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

lazy_static! {
    #[allow(clippy::unwrap_used)]
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    #[allow(clippy::unwrap_used)]
    static ref MRN_REGEX: Regex = Regex::new(r"(?i)\bMRN[-:#\s]*[A-Z0-9]{4,}\b").unwrap();
    #[allow(clippy::unwrap_used)]
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    #[allow(clippy::unwrap_used)]
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap();
    #[allow(clippy::unwrap_used)]
    static ref IP_REGEX: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_mrns: bool,
    pub redact_ip_addresses: bool,
    pub hash_for_correlation: bool,
    pub preview_chars: usize,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_mrns: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            preview_chars: 80,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Pass-through configuration, used when redaction is switched off locally.
    pub fn disabled() -> Self {
        Self {
            redact_emails: false,
            redact_phones: false,
            redact_ssn: false,
            redact_mrns: false,
            redact_ip_addresses: false,
            hash_for_correlation: false,
            preview_chars: 80,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // MRNs and SSNs run before phones: both can look like digit runs.
        if self.config.redact_mrns {
            result = self.replace(&MRN_REGEX, &result, "MRN", "MRN[REDACTED]");
        }
        if self.config.redact_ssn {
            result = self.replace(&SSN_REGEX, &result, "SSN", "***-**-****");
        }
        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }
        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "(***) ***-****");
        }
        if self.config.redact_ip_addresses {
            result = self.replace(&IP_REGEX, &result, "IP", "***.***.***.***");
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redacted, length-bounded excerpt of free text for a log field.
    ///
    /// Newlines are flattened so a transcript excerpt stays on one log line.
    pub fn preview(&self, text: &str) -> String {
        let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let redacted = self.redact(&flattened);
        let limit = self.config.preview_chars;
        if redacted.chars().count() <= limit {
            return redacted;
        }
        let mut excerpt: String = redacted.chars().take(limit).collect();
        excerpt.push_str("...");
        excerpt
    }

    fn replace(&self, regex: &Regex, text: &str, tag: &str, mask: &str) -> String {
        regex
            .replace_all(text, |caps: &Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", tag, hash_value(matched(caps)))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &Captures| {
                let email = matched(caps);
                if self.config.hash_for_correlation {
                    return format!("EMAIL[{}]", hash_value(email));
                }
                match email.split_once('@') {
                    Some((local, domain)) => format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    ),
                    None => "***@***".to_string(),
                }
            })
            .to_string()
    }
}

fn matched<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(0).map_or("", |m| m.as_str())
}

/// Short correlation tag: base64 of the first 8 bytes of the SHA-256 digest.
fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let prefix: Vec<u8> = digest.iter().take(8).copied().collect();
    general_purpose::STANDARD.encode(prefix)
}
