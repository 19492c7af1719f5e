use crate::pipeline::{StageOutcome, StageTransform};

/// Stage whose transform may decline to produce a value
///
/// `None` means "leave the value unchanged".
pub struct OptionalStage<F> {
    name: String,
    f: F,
}

impl<F> OptionalStage<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, F> StageTransform<T> for OptionalStage<F>
where
    F: Fn(&T) -> Option<T> + Send + Sync,
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

    #[test]
    fn test_optional_stage() {
        let clamp = OptionalStage::new("clamp", |n: &i32| (*n > 100).then_some(100));

        assert_eq!(clamp.apply(&250), StageOutcome::Transformed(100));
        assert_eq!(clamp.apply(&7), StageOutcome::Unchanged);
    }
}
