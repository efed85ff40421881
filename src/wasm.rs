//! JavaScript bindings for browser hosts.
//!
//! Errors cross the boundary as strings. Rule bodies are evaluated by the
//! built-in nudge evaluator unless the registry was created with
//! `Registry.withEvaluator(fn)`, in which case `fn(body, fields, params)`
//! is called and must return either a number or
//! `{ result: number, mutations: { fieldName: number } }`. Throwing an
//! object with a numeric `timeoutMs` property reports a timeout.

use chimera_core::{
    Bindings, EvalError, OrganismLogic, RuleEvaluator, RuleRegistry, StateCodec,
};
use chimera_data::{OrganismState, StateField};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(js_name = Organism)]
pub struct WasmOrganism {
    inner: OrganismState,
}

impl Default for WasmOrganism {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(js_class = Organism)]
impl WasmOrganism {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmOrganism {
        WasmOrganism {
            inner: OrganismState::new(),
        }
    }

    /// Never throws; unusable input yields the defaults.
    #[wasm_bindgen(js_name = initFromConfig)]
    pub fn init_from_config(config_json: &str) -> WasmOrganism {
        WasmOrganism {
            inner: OrganismState::from_config_str(config_json),
        }
    }

    pub fn step(&mut self, delta_time: f64) -> f64 {
        self.inner.step(delta_time)
    }

    #[wasm_bindgen(js_name = advanceGeneration)]
    pub fn advance_generation(&mut self) {
        self.inner.advance_generation();
    }

    #[wasm_bindgen(getter)]
    pub fn population(&self) -> f64 {
        self.inner.population()
    }

    #[wasm_bindgen(setter)]
    pub fn set_population(&mut self, value: f64) {
        self.inner.set_population(value);
    }

    #[wasm_bindgen(getter)]
    pub fn energy(&self) -> f64 {
        self.inner.energy()
    }

    #[wasm_bindgen(setter)]
    pub fn set_energy(&mut self, value: f64) {
        self.inner.set_energy(value);
    }

    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }

    #[wasm_bindgen(getter)]
    pub fn age(&self) -> u64 {
        self.inner.age()
    }

    #[wasm_bindgen(getter, js_name = mutationRate)]
    pub fn mutation_rate(&self) -> f64 {
        self.inner.mutation_rate()
    }

    #[wasm_bindgen(setter, js_name = mutationRate)]
    pub fn set_mutation_rate(&mut self, value: f64) {
        self.inner.set_mutation_rate(value);
    }

    #[wasm_bindgen(getter, js_name = selectionPressure)]
    pub fn selection_pressure(&self) -> f64 {
        self.inner.selection_pressure()
    }

    #[wasm_bindgen(setter, js_name = selectionPressure)]
    pub fn set_selection_pressure(&mut self, value: f64) {
        self.inner.set_selection_pressure(value);
    }

    #[wasm_bindgen(getter, js_name = adaptationScore)]
    pub fn adaptation_score(&self) -> f64 {
        self.inner.adaptation_score()
    }

    #[wasm_bindgen(js_name = getStateVector)]
    pub fn get_state_vector(&self) -> Vec<f64> {
        self.inner.state_vector()
    }

    #[wasm_bindgen(js_name = setStateVector)]
    pub fn set_state_vector(&mut self, vector: Vec<f64>) -> Result<(), JsValue> {
        self.inner.set_state_vector(&vector).map_err(to_js)
    }

    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> Result<String, JsValue> {
        self.inner.snapshot_json().map_err(to_js)
    }

    #[wasm_bindgen(js_name = loadSnapshot)]
    pub fn load_snapshot(&mut self, snapshot_json: &str) -> Result<(), JsValue> {
        self.inner.load_snapshot_json(snapshot_json).map_err(to_js)
    }
}

/// Hands rule bodies to a JavaScript function.
struct JsEvaluator {
    callback: js_sys::Function,
}

impl JsEvaluator {
    fn failure(err: JsValue) -> EvalError {
        let timeout = js_sys::Reflect::get(&err, &JsValue::from_str("timeoutMs"))
            .ok()
            .and_then(|v| v.as_f64());
        if let Some(limit) = timeout {
            return EvalError::Timeout {
                limit_ms: limit.max(0.0) as u64,
            };
        }
        EvalError::failed(err.as_string().unwrap_or_else(|| format!("{err:?}")))
    }
}

impl RuleEvaluator for JsEvaluator {
    fn evaluate(&self, expression: &str, bindings: &mut Bindings<'_>) -> Result<f64, EvalError> {
        let fields = js_sys::Object::new();
        for field in StateField::ALL {
            js_sys::Reflect::set(
                &fields,
                &JsValue::from_str(field.name()),
                &JsValue::from_f64(bindings.get(field)),
            )
            .map_err(Self::failure)?;
        }
        let params: js_sys::Array = bindings
            .params()
            .iter()
            .map(|&p| JsValue::from_f64(p))
            .collect();

        let returned = self
            .callback
            .call3(
                &JsValue::NULL,
                &JsValue::from_str(expression),
                &fields,
                &params,
            )
            .map_err(Self::failure)?;

        if let Some(result) = returned.as_f64() {
            return Ok(result);
        }

        let result = js_sys::Reflect::get(&returned, &JsValue::from_str("result"))
            .map_err(Self::failure)?
            .as_f64()
            .ok_or_else(|| EvalError::failed("evaluator returned no numeric result"))?;

        let mutations = js_sys::Reflect::get(&returned, &JsValue::from_str("mutations"))
            .map_err(Self::failure)?;
        if mutations.is_object() {
            let names = js_sys::Object::keys(mutations.unchecked_ref::<js_sys::Object>());
            for name in names.iter() {
                let key = name
                    .as_string()
                    .ok_or_else(|| EvalError::failed("mutation key is not a string"))?;
                let value = js_sys::Reflect::get(&mutations, &name)
                    .map_err(Self::failure)?
                    .as_f64()
                    .ok_or_else(|| EvalError::failed(format!("mutation {key} is not a number")))?;
                bindings.assign(&key, value)?;
            }
        }
        Ok(result)
    }
}

#[wasm_bindgen(js_name = Registry)]
pub struct WasmRegistry {
    inner: RuleRegistry,
}

impl Default for WasmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(js_class = Registry)]
impl WasmRegistry {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmRegistry {
        WasmRegistry {
            inner: RuleRegistry::new(),
        }
    }

    #[wasm_bindgen(js_name = withEvaluator)]
    pub fn with_evaluator(callback: js_sys::Function) -> WasmRegistry {
        WasmRegistry {
            inner: RuleRegistry::with_evaluator(JsEvaluator { callback }),
        }
    }

    #[wasm_bindgen(js_name = registerRule)]
    pub fn register_rule(&mut self, id: &str, body: &str) -> Result<(), JsValue> {
        self.inner.register_rule(id, body).map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeRule)]
    pub fn remove_rule(&mut self, id: &str) -> bool {
        self.inner.remove_rule(id)
    }

    #[wasm_bindgen(js_name = getRuleCode)]
    pub fn get_rule_code(&self, id: &str) -> Option<String> {
        self.inner.rule_body(id).map(str::to_string)
    }

    #[wasm_bindgen(js_name = getRuleIds)]
    pub fn get_rule_ids(&self) -> Vec<String> {
        self.inner.rule_ids().into_iter().collect()
    }

    #[wasm_bindgen(js_name = getRuleCount)]
    pub fn get_rule_count(&self) -> usize {
        self.inner.rule_count()
    }

    #[wasm_bindgen(js_name = applyRule)]
    pub fn apply_rule(
        &mut self,
        organism: &mut WasmOrganism,
        id: &str,
        params: Vec<f64>,
    ) -> Result<f64, JsValue> {
        self.inner
            .apply(&mut organism.inner, id, &params)
            .map_err(to_js)
    }

    /// Statistics of one rule as JSON.
    #[wasm_bindgen(js_name = getRuleStats)]
    pub fn get_rule_stats(&self, id: &str) -> Result<String, JsValue> {
        let stats = self.inner.rule_stats(id).map_err(to_js)?;
        serde_json::to_string(stats).map_err(to_js)
    }

    /// Statistics of every rule as a JSON object keyed by id.
    #[wasm_bindgen(js_name = getAllStats)]
    pub fn get_all_stats(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.all_stats()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = clearStats)]
    pub fn clear_stats(&mut self) {
        self.inner.clear_stats();
    }

    #[wasm_bindgen(js_name = exportRegistry)]
    pub fn export_registry(&self) -> Result<String, JsValue> {
        self.inner.export_json().map_err(to_js)
    }

    #[wasm_bindgen(js_name = importRegistry)]
    /// Returns the number of rules in the blob.
    pub fn import_registry(&mut self, json: &str) -> Result<usize, JsValue> {
        self.inner.import_json(json).map_err(to_js)
    }
}
