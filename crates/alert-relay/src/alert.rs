//! Inbound alert documents.
//!
//! Alert sources disagree on where severity, timestamp and program live:
//! newer senders use `severity`/`time`/`program`, syslog-fed ones use the
//! `syslog_`-prefixed names. Both are decoded as-is and reconciled by
//! [`canonical`], preferring the primary field whenever it is non-empty.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Severity tier that pulls in a subscription's `Critical` list.
pub const CRITICAL_TIER: &str = "critical";

/// A single inbound alert, decoded from the webhook body.
///
/// Keys are matched case-insensitively, so `Team`, `team` and `TEAM` all
/// populate [`Alert::team`]. Unknown fields are ignored. Missing or `null`
/// fields decode to an empty string (or zero hits).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Alert {
    #[serde(rename = "team", deserialize_with = "null_as_default")]
    pub team: String,

    #[serde(rename = "alerttype", deserialize_with = "null_as_default")]
    pub alert_type: String,

    #[serde(rename = "host", deserialize_with = "null_as_default")]
    pub host: String,

    #[serde(rename = "message", deserialize_with = "null_as_default")]
    pub message: String,

    #[serde(rename = "num_hits", deserialize_with = "null_as_default")]
    pub hits: u64,

    #[serde(rename = "severity", deserialize_with = "null_as_default")]
    pub raw_severity: String,

    #[serde(rename = "time", deserialize_with = "null_as_default")]
    pub raw_timestamp: String,

    #[serde(rename = "program", deserialize_with = "null_as_default")]
    pub raw_program: String,

    #[serde(deserialize_with = "null_as_default")]
    pub syslog_severity: String,

    #[serde(deserialize_with = "null_as_default")]
    pub syslog_timestamp: String,

    #[serde(deserialize_with = "null_as_default")]
    pub syslog_program: String,
}

impl Alert {
    /// Decode an alert from a raw webhook body.
    ///
    /// Only the first JSON value in the body is read; anything after it is
    /// ignored.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value = serde_json::Deserializer::from_slice(body)
            .into_iter::<Value>()
            .next()
            .unwrap_or_else(|| serde_json::from_slice(body))?;
        Self::from_value(value)
    }

    /// Decode an alert from an already parsed JSON value.
    ///
    /// Keys are folded to lowercase before matching; when two keys fold to
    /// the same name the one appearing last in the document wins. A `null`
    /// document is an empty alert.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(fields) => {
                let folded: Map<String, Value> = fields
                    .into_iter()
                    .map(|(key, value)| (key.to_lowercase(), value))
                    .collect();
                serde_json::from_value(Value::Object(folded))
            }
            Value::Null => Ok(Self::default()),
            other => Err(serde_json::Error::custom(format!(
                "alert document must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Canonical severity.
    #[must_use]
    pub fn severity(&self) -> &str {
        canonical(&self.raw_severity, &self.syslog_severity)
    }

    /// Canonical timestamp, passed through verbatim.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        canonical(&self.raw_timestamp, &self.syslog_timestamp)
    }

    /// Canonical program, the key into the subscription table.
    #[must_use]
    pub fn program(&self) -> &str {
        canonical(&self.raw_program, &self.syslog_program)
    }

    /// Whether the canonical severity is the critical tier, ignoring case.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.severity().to_lowercase() == CRITICAL_TIER
    }
}

/// Pick the primary value when it is non-empty, the legacy one otherwise.
#[must_use]
pub fn canonical<'a>(primary: &'a str, legacy: &'a str) -> &'a str {
    if primary.is_empty() {
        legacy
    } else {
        primary
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(json: serde_json::Value) -> Alert {
        Alert::from_value(json).unwrap()
    }

    #[test]
    fn test_canonical_fallback() {
        assert_eq!(canonical("", "legacy"), "legacy");
        assert_eq!(canonical("primary", ""), "primary");
        assert_eq!(canonical("primary", "legacy"), "primary");
        assert_eq!(canonical("", ""), "");
    }

    #[test]
    fn test_legacy_fields_only() {
        let a = alert(serde_json::json!({
            "syslog_severity": "warning",
            "syslog_timestamp": "2024-01-01T00:00:00Z",
            "syslog_program": "sshd"
        }));
        assert_eq!(a.severity(), "warning");
        assert_eq!(a.timestamp(), "2024-01-01T00:00:00Z");
        assert_eq!(a.program(), "sshd");
    }

    #[test]
    fn test_primary_fields_win() {
        let a = alert(serde_json::json!({
            "severity": "info",
            "time": "now",
            "program": "cron",
            "syslog_severity": "critical",
            "syslog_timestamp": "then",
            "syslog_program": "sshd"
        }));
        assert_eq!(a.severity(), "info");
        assert_eq!(a.timestamp(), "now");
        assert_eq!(a.program(), "cron");
    }

    #[test]
    fn test_empty_primary_falls_back() {
        let a = alert(serde_json::json!({"program": "", "syslog_program": "df"}));
        assert_eq!(a.program(), "df");
    }

    #[test]
    fn test_missing_fields_default() {
        let a = Alert::from_slice(b"{}").unwrap();
        assert_eq!(a, Alert::default());
        assert_eq!(a.severity(), "");
        assert_eq!(a.timestamp(), "");
        assert_eq!(a.program(), "");
        assert!(!a.is_critical());
    }

    #[test]
    fn test_document_fields() {
        let a = Alert::from_slice(
            br#"{"Team":"t1","alerttype":"disk","Host":"h1","Message":"full","num_hits":3,"extra":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(a.team, "t1");
        assert_eq!(a.alert_type, "disk");
        assert_eq!(a.host, "h1");
        assert_eq!(a.message, "full");
        assert_eq!(a.hits, 3);
    }

    #[test]
    fn test_null_and_lowercase_keys() {
        let a = alert(serde_json::json!({
            "team": "ops",
            "host": "db1",
            "message": null,
            "num_hits": null,
            "severity": null,
            "syslog_severity": "critical"
        }));
        assert_eq!(a.team, "ops");
        assert_eq!(a.host, "db1");
        assert_eq!(a.message, "");
        assert_eq!(a.hits, 0);
        assert_eq!(a.severity(), "critical");
    }

    #[test]
    fn test_keys_ignore_case() {
        let a = Alert::from_slice(
            br#"{"TEAM":"a","SEVERITY":"critical","AlertType":"disk","SYSLOG_PROGRAM":"df","Num_Hits":2}"#,
        )
        .unwrap();
        assert_eq!(a.team, "a");
        assert_eq!(a.alert_type, "disk");
        assert_eq!(a.hits, 2);
        assert_eq!(a.program(), "df");
        assert!(a.is_critical());
    }

    #[test]
    fn test_last_duplicate_key_wins() {
        let a = Alert::from_slice(br#"{"Team":"a","team":"b"}"#).unwrap();
        assert_eq!(a.team, "b");

        let a = Alert::from_slice(br#"{"team":"a","TEAM":"b","Team":"c"}"#).unwrap();
        assert_eq!(a.team, "c");
    }

    #[test]
    fn test_only_first_document_read() {
        let a = Alert::from_slice(br#"{"Team":"a"} {"Team":"b"}"#).unwrap();
        assert_eq!(a.team, "a");

        let a = Alert::from_slice(b"{\"Team\":\"a\"}\n[1,2,3]").unwrap();
        assert_eq!(a.team, "a");
    }

    #[test]
    fn test_non_object_documents() {
        assert_eq!(Alert::from_slice(b"null").unwrap(), Alert::default());
        let bodies: [&[u8]; 4] = [b"[1,2,3]", b"\"alert\"", b"42", b"true"];
        for body in bodies {
            assert!(Alert::from_slice(body).is_err());
        }
        assert!(Alert::from_slice(b"").is_err());
        assert!(Alert::from_slice(b"   ").is_err());
    }

    #[test]
    fn test_negative_hits_rejected() {
        assert!(Alert::from_slice(br#"{"num_hits": -1}"#).is_err());
    }

    #[test]
    fn test_is_critical_ignores_case() {
        for severity in ["critical", "Critical", "CRITICAL", "cRiTiCaL"] {
            let a = alert(serde_json::json!({ "severity": severity }));
            assert!(a.is_critical(), "{severity} should be critical");
        }
        for severity in ["warning", "critical ", "crit", ""] {
            let a = alert(serde_json::json!({ "severity": severity }));
            assert!(!a.is_critical(), "{severity:?} should not be critical");
        }
    }
}
