use tracing::debug;

/// Storage-location prefix carried by every stored content id.
///
/// Callers only ever see bare ids. The prefix goes on before a store lookup
/// and comes off before anything is returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentNamespace {
    prefix: String,
}

impl ContentNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn apply(&self, content_id: &str) -> String {
        format!("{}{}", self.prefix, content_id)
    }

    pub fn strip<'a>(&self, stored_id: &'a str) -> &'a str {
        match stored_id.strip_prefix(self.prefix.as_str()) {
            Some(id) => id,
            None => {
                debug!(stored_id, prefix = %self.prefix, "Content id outside namespace, returning as stored");
                stored_id
            }
        }
    }
}
