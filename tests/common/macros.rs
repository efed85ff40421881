/// Asserts that every field of the state lies inside its domain.
#[macro_export]
macro_rules! assert_state_in_bounds {
    ($state:expr) => {
        let state = &$state;
        assert!(
            state.population().is_finite() && state.population() >= 0.0,
            "population {} out of bounds",
            state.population()
        );
        assert!(
            state.energy().is_finite() && state.energy() >= 0.0,
            "energy {} out of bounds",
            state.energy()
        );
        assert!(
            (0.0..=1.0).contains(&state.mutation_rate()),
            "mutationRate {} out of bounds",
            state.mutation_rate()
        );
        assert!(
            (0.0..=1.0).contains(&state.selection_pressure()),
            "selectionPressure {} out of bounds",
            state.selection_pressure()
        );
        assert!(
            state.adaptation_score().is_finite(),
            "adaptationScore {} is not finite",
            state.adaptation_score()
        );
    };
}

/// Asserts that two states agree field by field, naming the first mismatch.
#[macro_export]
macro_rules! assert_same_state {
    ($left:expr, $right:expr) => {
        for field in chimera_lib::StateField::ALL {
            assert_eq!(
                $left.get(field).to_bits(),
                $right.get(field).to_bits(),
                "{} differs",
                field
            );
        }
    };
}
