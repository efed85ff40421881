pub mod macros;

use chimera_lib::{evaluator_fn, Bindings, EvalError, OrganismState, RuleEvaluator, StateField};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible `delta_time` sequence, including the occasional invalid value.
#[allow(dead_code)]
pub fn dt_sequence(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| match rng.gen_range(0..20) {
            0 => -rng.gen_range(0.0..1.0),
            1 => f64::NAN,
            _ => rng.gen_range(0.0..0.5),
        })
        .collect()
}

/// Small expression language used by the integration suites.
///
/// Each body is a `;`-separated list of statements:
/// `set <field> <value|pN>`, `add <field> <value|pN>`, `fail <msg>`,
/// `timeout <ms>` and `ret <field|value|pN>`. The last `ret` wins; without
/// one the current adaptation score is returned.
#[allow(dead_code)]
pub fn script_evaluator() -> impl RuleEvaluator {
    evaluator_fn(|body, bindings| {
        let mut result = bindings.get(StateField::AdaptationScore);
        for statement in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let words: Vec<&str> = statement.split_whitespace().collect();
            match words.as_slice() {
                ["set", name, operand] => {
                    let value = operand_value(bindings, operand)?;
                    bindings.assign(name, value)?;
                }
                ["add", name, operand] => {
                    let value = bindings.lookup(name)? + operand_value(bindings, operand)?;
                    bindings.assign(name, value)?;
                }
                ["fail", msg @ ..] => return Err(EvalError::failed(msg.join(" "))),
                ["timeout", ms] => {
                    return Err(EvalError::Timeout {
                        limit_ms: ms.parse().unwrap_or(0),
                    })
                }
                ["ret", operand] => result = operand_value(bindings, operand)?,
                _ => return Err(EvalError::failed(format!("cannot parse `{statement}`"))),
            }
        }
        Ok(result)
    })
}

#[allow(dead_code)]
fn operand_value(bindings: &Bindings<'_>, operand: &str) -> Result<f64, EvalError> {
    match operand.parse::<f64>() {
        Ok(value) => Ok(value),
        Err(_) => bindings.lookup(operand),
    }
}

#[allow(dead_code)]
pub fn stepped_state(steps: usize, dt: f64) -> OrganismState {
    use chimera_lib::OrganismLogic;
    let mut state = OrganismState::new();
    for _ in 0..steps {
        state.step(dt);
    }
    state
}

/// The step formula on `(population, energy)`, written out long-hand.
#[allow(dead_code)]
pub fn reference_step(population: f64, energy: f64, mutation_rate: f64, dt: f64) -> (f64, f64) {
    let (mut grown, mut remaining) = (population, energy);
    if dt.is_finite() && dt > 0.0 {
        let growth = (energy / 1000.0) * (1.0 - mutation_rate);
        grown = population + population * growth * dt;
        remaining = energy - grown * 0.1 * dt + 10.0 * dt;
    }
    (grown.max(1.0).min(f64::MAX), remaining.clamp(0.0, 10_000.0))
}
