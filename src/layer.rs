//! Interned layer tags used to classify calls
//!
//! A layer is looked up by name (case-insensitively) in a process-wide
//! registry, so there is exactly one instance per name and equality is
//! identity. The `inherit` sentinel tells the tree builder to use the
//! enclosing node's layer instead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const INHERIT_NAME: &str = "__inherit";
const DEFAULT_NAME: &str = "default";

static REGISTRY: OnceLock<Mutex<HashMap<String, Layer>>> = OnceLock::new();
static INHERIT: OnceLock<Layer> = OnceLock::new();
static DEFAULT: OnceLock<Layer> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Layer>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Classification tag for a measured call (e.g. "business", "integration")
#[derive(Clone)]
pub struct Layer {
    name: Arc<str>,
}

impl Layer {
    /// Get the interned layer for `name`
    ///
    /// Lookup ignores case; the first spelling registered becomes the
    /// display name.
    ///
    /// # Example
    /// ```
    /// use ctprofiler::layer::Layer;
    ///
    /// let a = Layer::for_name("Business");
    /// let b = Layer::for_name("BUSINESS");
    /// assert_eq!(a, b);
    /// assert_eq!(a, Layer::business());
    /// ```
    pub fn for_name(name: &str) -> Layer {
        let key = name.to_lowercase();
        let mut layers = registry().lock().unwrap_or_else(PoisonError::into_inner);
        layers
            .entry(key)
            .or_insert_with(|| Layer {
                name: Arc::from(name),
            })
            .clone()
    }

    /// Sentinel meaning "use the enclosing layer at tree-build time"
    pub fn inherit() -> Layer {
        INHERIT.get_or_init(|| Layer::for_name(INHERIT_NAME)).clone()
    }

    pub fn business() -> Layer {
        Layer::for_name("business")
    }

    pub fn integration() -> Layer {
        Layer::for_name("integration")
    }

    pub fn presentation() -> Layer {
        Layer::for_name("presentation")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_inherit(&self) -> bool {
        self.name.eq_ignore_ascii_case(INHERIT_NAME)
    }
}

/// The fallback for top-level calls recorded without an explicit layer
impl Default for Layer {
    fn default() -> Self {
        DEFAULT.get_or_init(|| Layer::for_name(DEFAULT_NAME)).clone()
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl Eq for Layer {}

impl Hash for Layer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // interned: equal layers share one name allocation
        self.name.hash(state);
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer({})", self.name)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Layer::for_name(&name))
    }
}
