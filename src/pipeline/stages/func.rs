use crate::pipeline::{StageOutcome, StageTransform};

/// Stage built from a closure returning a `StageOutcome`
///
/// The most general adapter; the others are shorthands over it.
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> FnStage<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, F> StageTransform<T> for FnStage<F>
where
    F: Fn(&T) -> StageOutcome<T> + Send + Sync,
{
    fn apply(&self, input: &T) -> StageOutcome<T> {
        (self.f)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
