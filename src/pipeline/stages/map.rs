use crate::pipeline::{StageOutcome, StageTransform};
use std::time::Duration;

/// Stage that always replaces its input with `f(input)`
///
/// # Example
/// ```
/// use chunkflow::pipeline::stages::MapStage;
/// use chunkflow::pipeline::{StageOutcome, StageTransform};
///
/// let double = MapStage::new("double", |n: &i32| n * 2);
/// assert_eq!(double.apply(&3), StageOutcome::Transformed(6));
/// ```
pub struct MapStage<F> {
    name: String,
    f: F,
    estimated_duration: Option<Duration>,
}

impl<F> MapStage<F> {
    /// Create a new map stage
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            estimated_duration: None,
        }
    }

    /// Attach a duration hint for progress reporting
    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimated_duration = Some(estimate);
        self
    }
}

impl<T, F> StageTransform<T> for MapStage<F>
where
    F: Fn(&T) -> T + Send + Sync,
{
    fn apply(&self, input: &T) -> StageOutcome<T> {
        StageOutcome::Transformed((self.f)(input))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn estimated_duration(&self) -> Option<Duration> {
        self.estimated_duration
    }
}
