use crate::pipeline::{StageOutcome, StageTransform};
use std::fmt::Display;

/// Stage whose transform can fail
///
/// An `Err` becomes `StageOutcome::Failed` with the error's display text, and
/// every later stage short-circuits.
pub struct TryMapStage<F> {
    name: String,
    f: F,
}

impl<F> TryMapStage<F> {
    /// Create a new fallible stage
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, E, F> StageTransform<T> for TryMapStage<F>
where
    E: Display,
    F: Fn(&T) -> Result<T, E> + Send + Sync,
{
    fn apply(&self, input: &T) -> StageOutcome<T> {
        (self.f)(input).into()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_stage() -> TryMapStage<impl Fn(&String) -> Result<String, std::num::ParseIntError>> {
        TryMapStage::new("normalize", |s: &String| {
            s.trim().parse::<i64>().map(|n| n.to_string())
        })
    }

    #[test]
    fn test_try_map_success() {
        let stage = parse_stage();
        assert_eq!(
            stage.apply(&" 42 ".to_string()),
            StageOutcome::Transformed("42".to_string())
        );
    }

    #[test]
    fn test_try_map_failure_carries_message() {
        let stage = parse_stage();
        match stage.apply(&"forty-two".to_string()) {
            StageOutcome::Failed(reason) => assert!(reason.contains("invalid digit")),
            other => panic!("Expected failure, got {:?}", other),
        }
    }
}
