use std::collections::{BTreeMap, HashMap, VecDeque};

/// A value that can travel through a looper or pipeline
///
/// `is_vacant` is the emptiness check: a pipeline refuses to start from a
/// vacant value, and a stage that produces one keeps its input instead. Most
/// types are never vacant, so implementing the trait for your own type is
/// usually an empty `impl`.
///
/// # Example
/// ```
/// use chunkflow::Payload;
///
/// struct Frame {
///     pixels: Vec<u8>,
/// }
///
/// impl Payload for Frame {
///     fn is_vacant(&self) -> bool {
///         self.pixels.is_empty()
///     }
/// }
/// ```
pub trait Payload: Send + 'static {
    fn is_vacant(&self) -> bool {
        false
    }
}

macro_rules! never_vacant {
    ($($ty:ty),* $(,)?) => {
        $(impl Payload for $ty {})*
    };
}

never_vacant!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Payload for &'static str {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for String {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static> Payload for Vec<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static> Payload for VecDeque<T> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Send + 'static, V: Send + 'static, S: Send + 'static> Payload for HashMap<K, V, S> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Send + 'static, V: Send + 'static> Payload for BTreeMap<K, V> {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Send + 'static> Payload for Option<T> {
    fn is_vacant(&self) -> bool {
        self.is_none()
    }
}

impl<T: Payload> Payload for Box<T> {
    fn is_vacant(&self) -> bool {
        (**self).is_vacant()
    }
}

impl Payload for serde_json::Value {
    fn is_vacant(&self) -> bool {
        self.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_are_never_vacant() {
        assert!(!0i32.is_vacant());
        assert!(!0.0f64.is_vacant());
        assert!(!false.is_vacant());
    }

    #[test]
    fn test_empty_containers_are_vacant() {
        assert!(String::new().is_vacant());
        assert!("".is_vacant());
        assert!(!"x".is_vacant());
        assert!(Vec::<u8>::new().is_vacant());
        assert!(HashMap::<String, u8>::new().is_vacant());
        assert!(!vec![1u8].is_vacant());
        assert!(!"x".to_string().is_vacant());
    }

    #[test]
    fn test_option_and_json_null() {
        assert!(None::<u32>.is_vacant());
        assert!(!Some(0u32).is_vacant());
        assert!(serde_json::Value::Null.is_vacant());
        assert!(!json!({ "rows": [] }).is_vacant());
    }

    #[test]
    fn test_box_delegates() {
        assert!(Box::new(String::new()).is_vacant());
        assert!(!Box::new(7u8).is_vacant());
    }
}
