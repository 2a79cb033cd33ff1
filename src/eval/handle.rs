use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

/// A configured connector instance. Cheap to clone; all clones share one
/// identity and one property bag, which is fixed at declaration time.
#[derive(Clone)]
pub struct ConnectorHandle {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    id: Uuid,
    name: String,
    family: String,
    properties: IndexMap<String, String>,
}

impl ConnectorHandle {
    pub fn new(
        name: impl Into<String>,
        family: impl Into<String>,
        properties: IndexMap<String, String>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                id: Uuid::new_v4(),
                name: name.into(),
                family: family.into(),
                properties,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Protocol family, e.g. `jms`.
    pub fn family(&self) -> &str {
        &self.inner.family
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.inner.properties
    }

    pub fn same(&self, other: &ConnectorHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ConnectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorHandle")
            .field("name", &self.inner.name)
            .field("family", &self.inner.family)
            .field("properties", &self.inner.properties)
            .finish()
    }
}
