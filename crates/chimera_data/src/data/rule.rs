use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Number of recent invocations whose durations are kept per rule.
pub const DEFAULT_TIMING_WINDOW: usize = 32;

fn default_export_version() -> u32 {
    1
}

/// Execution statistics of a single registered rule.
///
/// Failed invocations count towards `invocation_count` and the timing
/// window; `last_result` only moves on success.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleStats {
    pub invocation_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Durations of the last `timing_window` invocations, oldest first.
    pub recent_durations_ms: VecDeque<f64>,
    pub timing_window: usize,
    pub last_duration_ms: f64,
    pub lifetime_duration_ms: f64,
    pub last_result: Option<f64>,
    pub last_error: Option<String>,
    /// Unix epoch milliseconds at which the current body was registered.
    pub registered_at_ms: i64,
}

impl Default for RuleStats {
    fn default() -> Self {
        Self::new(DEFAULT_TIMING_WINDOW, 0)
    }
}

impl RuleStats {
    #[must_use]
    pub fn new(timing_window: usize, registered_at_ms: i64) -> Self {
        Self {
            invocation_count: 0,
            success_count: 0,
            failure_count: 0,
            recent_durations_ms: VecDeque::with_capacity(timing_window.max(1)),
            timing_window: timing_window.max(1),
            last_duration_ms: 0.0,
            lifetime_duration_ms: 0.0,
            last_result: None,
            last_error: None,
            registered_at_ms,
        }
    }

    pub fn record_success(&mut self, duration_ms: f64, result: f64) {
        self.record_duration(duration_ms);
        self.success_count += 1;
        self.last_result = Some(result);
        self.last_error = None;
    }

    pub fn record_failure(&mut self, duration_ms: f64, error: String) {
        self.record_duration(duration_ms);
        self.failure_count += 1;
        self.last_error = Some(error);
    }

    fn record_duration(&mut self, duration_ms: f64) {
        self.invocation_count += 1;
        self.last_duration_ms = duration_ms;
        self.lifetime_duration_ms += duration_ms;
        if self.recent_durations_ms.len() == self.timing_window {
            self.recent_durations_ms.pop_front();
        }
        self.recent_durations_ms.push_back(duration_ms);
    }

    /// Total duration of the last N invocations, N being the timing window.
    #[must_use]
    pub fn recent_total_ms(&self) -> f64 {
        self.recent_durations_ms.iter().sum()
    }

    /// Mean duration over the rule's whole lifetime.
    #[must_use]
    pub fn average_duration_ms(&self) -> f64 {
        if self.invocation_count == 0 {
            0.0
        } else {
            self.lifetime_duration_ms / self.invocation_count as f64
        }
    }

    /// Zeroes every counter, keeping the window size and registration time.
    pub fn reset(&mut self) {
        *self = Self::new(self.timing_window, self.registered_at_ms);
    }
}

/// Bulk transfer format of a rule registry: rule bodies only, keyed by id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryExport {
    #[serde(default = "default_export_version")]
    pub format_version: u32,
    #[serde(deserialize_with = "deserialize_rule_bodies")]
    pub rules: BTreeMap<String, String>,
}

impl Default for RegistryExport {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl RegistryExport {
    #[must_use]
    pub fn new(rules: BTreeMap<String, String>) -> Self {
        Self {
            format_version: default_export_version(),
            rules,
        }
    }
}

/// A rule body as found in an export: either the bare expression text or an
/// object in the older layout that carried the text under `lisp_code`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExportedBody {
    Text(String),
    Legacy { lisp_code: String },
}

fn deserialize_rule_bodies<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ExportedBody>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(id, body)| {
            let text = match body {
                ExportedBody::Text(text) => text,
                ExportedBody::Legacy { lisp_code } => lisp_code,
            };
            (id, text)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_last_n() {
        let mut stats = RuleStats::new(3, 0);
        for ms in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.record_success(ms, 0.0);
        }
        assert_eq!(stats.invocation_count, 5);
        assert_eq!(stats.recent_durations_ms.len(), 3);
        assert_eq!(stats.recent_total_ms(), 12.0);
        assert_eq!(stats.lifetime_duration_ms, 15.0);
        assert_eq!(stats.average_duration_ms(), 3.0);
    }

    #[test]
    fn test_failure_keeps_last_result() {
        let mut stats = RuleStats::default();
        stats.record_success(1.0, 0.5);
        stats.record_failure(1.0, "boom".to_string());
        assert_eq!(stats.last_result, Some(0.5));
        assert_eq!(stats.last_error.as_deref(), Some("boom"));
        assert_eq!(stats.failure_count, 1);

        stats.record_success(1.0, 0.7);
        assert!(stats.last_error.is_none());
    }

    #[test]
    fn test_reset_preserves_window() {
        let mut stats = RuleStats::new(4, 99);
        stats.record_success(2.0, 1.0);
        stats.reset();
        assert_eq!(stats.invocation_count, 0);
        assert_eq!(stats.timing_window, 4);
        assert_eq!(stats.registered_at_ms, 99);
    }

    #[test]
    fn test_default_export_is_current_version() {
        let export = RegistryExport::default();
        assert_eq!(export.format_version, 1);
        assert!(export.rules.is_empty());
        assert_eq!(
            serde_json::to_string(&export).unwrap(),
            r#"{"formatVersion":1,"rules":{}}"#
        );
    }

    #[test]
    fn test_export_reads_legacy_layout() {
        let json = r#"{
            "rules": {
                "grow": {"id": "grow", "lisp_code": "(+ population 1)", "execution_count": 4},
                "calm": "(set! mutationRate 0)"
            },
            "executionOrder": ["grow", "calm"]
        }"#;
        let export: RegistryExport = serde_json::from_str(json).unwrap();
        assert_eq!(export.format_version, 1);
        assert_eq!(export.rules["grow"], "(+ population 1)");
        assert_eq!(export.rules["calm"], "(set! mutationRate 0)");
    }
}
