use super::evaluator::{Bindings, EvalError, ParamNudgeEvaluator, RuleEvaluator};
use crate::error::{CoreError, Result};
use crate::metrics::Stopwatch;
use chimera_data::{OrganismState, RegistryExport, RuleStats, DEFAULT_TIMING_WINDOW};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone)]
struct RuleEntry {
    body: String,
    stats: RuleStats,
}

/// Named rules, their expression bodies and per-rule execution statistics.
///
/// The registry holds no reference to any organism; [`RuleRegistry::apply`]
/// borrows the state for the duration of one evaluation. Evaluation is
/// transactional: the evaluator writes into staged [`Bindings`] and the live
/// state only changes once it has returned successfully.
pub struct RuleRegistry {
    rules: HashMap<String, RuleEntry>,
    evaluator: Box<dyn RuleEvaluator>,
    timing_window: usize,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rule_ids())
            .field("timing_window", &self.timing_window)
            .finish_non_exhaustive()
    }
}

impl RuleRegistry {
    /// Creates an empty registry using [`ParamNudgeEvaluator`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_evaluator(ParamNudgeEvaluator)
    }

    /// Creates an empty registry that hands rule bodies to `evaluator`.
    #[must_use]
    pub fn with_evaluator<E: RuleEvaluator + 'static>(evaluator: E) -> Self {
        Self {
            rules: HashMap::new(),
            evaluator: Box::new(evaluator),
            timing_window: DEFAULT_TIMING_WINDOW,
        }
    }

    /// Sets how many recent durations each rule keeps. Applies to rules
    /// registered (or reset) afterwards.
    #[must_use]
    pub fn with_timing_window(mut self, window: usize) -> Self {
        self.timing_window = window.max(1);
        self
    }

    /// Swaps the evaluator, keeping rules and statistics.
    pub fn set_evaluator<E: RuleEvaluator + 'static>(&mut self, evaluator: E) {
        self.evaluator = Box::new(evaluator);
    }

    /// Stores `body` under `id`, replacing any previous body and zeroing its
    /// statistics.
    pub fn register_rule(&mut self, id: &str, body: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(CoreError::invalid_rule_id(id));
        }
        let entry = RuleEntry {
            body: body.to_string(),
            stats: RuleStats::new(self.timing_window, now_ms()),
        };
        if self.rules.insert(id.to_string(), entry).is_some() {
            tracing::info!(rule = %id, "Rule overwritten, statistics reset");
        } else {
            tracing::debug!(rule = %id, "Rule registered");
        }
        Ok(())
    }

    /// Removes a rule. Returns whether it existed.
    pub fn remove_rule(&mut self, id: &str) -> bool {
        let removed = self.rules.remove(id).is_some();
        if removed {
            tracing::debug!(rule = %id, "Rule removed");
        }
        removed
    }

    /// Evaluates rule `id` against `state` with `params` as extra arguments.
    ///
    /// On success the evaluator's staged writes are committed and its result
    /// returned. On failure `state` is untouched, the failure is recorded in
    /// the rule's statistics and returned as [`CoreError::RuleExecution`].
    /// An unknown id changes nothing.
    pub fn apply(&mut self, state: &mut OrganismState, id: &str, params: &[f64]) -> Result<f64> {
        let entry = self
            .rules
            .get_mut(id)
            .ok_or_else(|| CoreError::rule_not_found(id))?;

        let mut bindings = Bindings::new(state, params);
        let stopwatch = Stopwatch::start();
        let outcome = self
            .evaluator
            .evaluate(&entry.body, &mut bindings)
            .and_then(|result| {
                if result.is_finite() {
                    Ok(result)
                } else {
                    Err(EvalError::NonFiniteResult)
                }
            });
        let elapsed_ms = stopwatch.elapsed_ms();

        match outcome {
            Ok(result) => {
                let mutations = bindings.into_mutations();
                let touched = mutations.len();
                for (field, value) in mutations {
                    state.set(field, value);
                }
                entry.stats.record_success(elapsed_ms, result);
                tracing::debug!(rule = %id, result, touched, elapsed_ms, "Rule applied");
                Ok(result)
            }
            Err(source) => {
                entry.stats.record_failure(elapsed_ms, source.to_string());
                tracing::warn!(rule = %id, error = %source, elapsed_ms, "Rule evaluation failed");
                Err(CoreError::rule_execution(id, source))
            }
        }
    }

    pub fn rule_stats(&self, id: &str) -> Result<&RuleStats> {
        self.rules
            .get(id)
            .map(|entry| &entry.stats)
            .ok_or_else(|| CoreError::rule_not_found(id))
    }

    /// Statistics of every rule, ordered by id.
    #[must_use]
    pub fn all_stats(&self) -> BTreeMap<String, RuleStats> {
        self.rules
            .iter()
            .map(|(id, entry)| (id.clone(), entry.stats.clone()))
            .collect()
    }

    /// Zeroes the statistics of every rule.
    pub fn clear_stats(&mut self) {
        for entry in self.rules.values_mut() {
            entry.stats.reset();
        }
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn rule_ids(&self) -> BTreeSet<String> {
        self.rules.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    #[must_use]
    pub fn rule_body(&self, id: &str) -> Option<&str> {
        self.rules.get(id).map(|entry| entry.body.as_str())
    }

    /// Every rule body keyed by id. Statistics are not exported.
    #[must_use]
    pub fn export_registry(&self) -> RegistryExport {
        RegistryExport::new(
            self.rules
                .iter()
                .map(|(id, entry)| (id.clone(), entry.body.clone()))
                .collect(),
        )
    }

    /// Merges an export into this registry, overwriting colliding ids. Either
    /// every rule is imported or, if any id is invalid, none is. Returns the
    /// number of rules in the export.
    pub fn import_registry(&mut self, export: RegistryExport) -> Result<usize> {
        if let Some(bad) = export.rules.keys().find(|id| id.trim().is_empty()) {
            return Err(CoreError::invalid_rule_id(bad.as_str()));
        }
        let count = export.rules.len();
        for (id, body) in export.rules {
            self.register_rule(&id, &body)?;
        }
        tracing::info!(count, total = self.rules.len(), "Rules imported");
        Ok(count)
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string(&self.export_registry())
            .map_err(|e| CoreError::encode(format!("registry export failed: {e}")))
    }

    /// Parses an export blob (current or legacy layout) and merges it.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        if json.trim().is_empty() {
            return Err(CoreError::decode("empty registry export"));
        }
        let export: RegistryExport = serde_json::from_str(json)
            .map_err(|e| CoreError::decode(format!("invalid registry export: {e}")))?;
        self.import_registry(export)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::evaluator::evaluator_fn;
    use chimera_data::StateField;

    fn doubling_registry() -> RuleRegistry {
        let mut registry = RuleRegistry::with_evaluator(evaluator_fn(|body, bindings| {
            let field = StateField::from_name(body)
                .ok_or_else(|| EvalError::UnknownBinding(body.to_string()))?;
            let value = bindings.get(field) * 2.0;
            bindings.set(field, value)?;
            Ok(value)
        }));
        registry.register_rule("double_energy", "energy").unwrap();
        registry
    }

    #[test]
    fn test_register_and_apply() {
        let mut registry = doubling_registry();
        let mut state = OrganismState::new();
        let result = registry.apply(&mut state, "double_energy", &[]).unwrap();
        assert_eq!(result, 2000.0);
        assert_eq!(state.energy(), 2000.0);

        let stats = registry.rule_stats("double_energy").unwrap();
        assert_eq!(stats.invocation_count, 1);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.last_result, Some(2000.0));
        assert!(stats.last_error.is_none());
        assert_eq!(stats.recent_durations_ms.len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut registry = RuleRegistry::new();
        assert!(matches!(
            registry.register_rule("", "x"),
            Err(CoreError::InvalidRuleId(_))
        ));
        assert!(matches!(
            registry.register_rule("  ", "x"),
            Err(CoreError::InvalidRuleId(_))
        ));
        assert_eq!(registry.rule_count(), 0);
    }

    #[test]
    fn test_overwrite_resets_stats() {
        let mut registry = doubling_registry();
        let mut state = OrganismState::new();
        registry.apply(&mut state, "double_energy", &[]).unwrap();
        registry.register_rule("double_energy", "population").unwrap();

        let stats = registry.rule_stats("double_energy").unwrap();
        assert_eq!(stats.invocation_count, 0);
        assert_eq!(registry.rule_body("double_energy"), Some("population"));
        assert_eq!(registry.rule_count(), 1);
    }

    #[test]
    fn test_failure_is_atomic() {
        let mut registry = RuleRegistry::with_evaluator(evaluator_fn(|_, bindings| {
            bindings.set(StateField::Population, 1.0)?;
            bindings.set(StateField::Energy, 1.0)?;
            Err(EvalError::failed("division by zero"))
        }));
        registry.register_rule("broken", "(/ 1 0)").unwrap();

        let mut state = OrganismState::new();
        let before = state.clone();
        let err = registry.apply(&mut state, "broken", &[]).unwrap_err();
        assert!(matches!(err, CoreError::RuleExecution { ref id, .. } if id == "broken"));
        assert_eq!(state, before);

        let stats = registry.rule_stats("broken").unwrap();
        assert_eq!(stats.invocation_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert!(stats.last_error.as_deref().unwrap().contains("division by zero"));
    }

    #[test]
    fn test_non_finite_result_is_a_failure() {
        let mut registry = RuleRegistry::with_evaluator(evaluator_fn(|body, bindings| {
            bindings.set(StateField::Energy, 1.0)?;
            Ok(if body == "nan" { f64::NAN } else { f64::INFINITY })
        }));
        registry.register_rule("nan", "nan").unwrap();
        registry.register_rule("inf", "inf").unwrap();

        let mut state = OrganismState::new();
        for id in ["nan", "inf"] {
            let err = registry.apply(&mut state, id, &[]).unwrap_err();
            assert!(matches!(
                err,
                CoreError::RuleExecution {
                    source: EvalError::NonFiniteResult,
                    ..
                }
            ));
            let stats = registry.rule_stats(id).unwrap();
            assert_eq!(stats.failure_count, 1);
            assert_eq!(stats.last_result, None);
        }
        assert_eq!(state.energy(), 1000.0);
    }

    #[test]
    fn test_timeout_is_recorded() {
        let mut registry = RuleRegistry::with_evaluator(evaluator_fn(|_, _| {
            Err(EvalError::Timeout { limit_ms: 10 })
        }));
        registry.register_rule("spin", "(loop)").unwrap();
        let mut state = OrganismState::new();
        let err = registry.apply(&mut state, "spin", &[]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RuleExecution {
                source: EvalError::Timeout { limit_ms: 10 },
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_rule_changes_nothing() {
        let mut registry = doubling_registry();
        let mut state = OrganismState::new();
        let stats_before = registry.all_stats();
        let err = registry.apply(&mut state, "nonexistent", &[]).unwrap_err();
        assert!(matches!(err, CoreError::RuleNotFound(ref id) if id == "nonexistent"));
        assert_eq!(state, OrganismState::new());
        assert_eq!(registry.all_stats(), stats_before);
        assert!(registry.rule_stats("nonexistent").is_err());
    }

    #[test]
    fn test_timing_window_applies() {
        let mut registry = doubling_registry().with_timing_window(2);
        registry.register_rule("double_pop", "population").unwrap();
        let mut state = OrganismState::new();
        for _ in 0..5 {
            registry.apply(&mut state, "double_pop", &[]).unwrap();
        }
        let stats = registry.rule_stats("double_pop").unwrap();
        assert_eq!(stats.invocation_count, 5);
        assert_eq!(stats.recent_durations_ms.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = doubling_registry();
        let mut state = OrganismState::new();
        registry.apply(&mut state, "double_energy", &[]).unwrap();
        registry.clear_stats();
        assert_eq!(
            registry.rule_stats("double_energy").unwrap().invocation_count,
            0
        );
        assert!(registry.remove_rule("double_energy"));
        assert!(!registry.remove_rule("double_energy"));
        assert!(!registry.contains("double_energy"));
    }

    #[test]
    fn test_export_import_merge() {
        let mut source = RuleRegistry::new();
        source.register_rule("a", "(a)").unwrap();
        source.register_rule("b", "(b)").unwrap();

        let mut target = RuleRegistry::new();
        target.register_rule("b", "(old b)").unwrap();
        target.register_rule("c", "(c)").unwrap();
        target.import_json(&source.export_json().unwrap()).unwrap();

        assert_eq!(target.rule_count(), 3);
        assert_eq!(target.rule_body("b"), Some("(b)"));
        assert_eq!(target.rule_body("c"), Some("(c)"));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .import_json(r#"{"rules": {"ok": "(x)", "": "(y)"}}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRuleId(_)));
        assert_eq!(registry.rule_count(), 0);

        let err = registry.import_json(r#"{"rules": 5}"#).unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
    }

    #[test]
    fn test_export_is_sorted() {
        let mut registry = RuleRegistry::new();
        registry.register_rule("zeta", "z").unwrap();
        registry.register_rule("alpha", "a").unwrap();
        assert_eq!(
            registry.export_json().unwrap(),
            r#"{"formatVersion":1,"rules":{"alpha":"a","zeta":"z"}}"#
        );
    }
}
