use crate::Error;

/// Instances keyed by identifier, in registration order. Owned by whoever constructs the
/// instances; there is no process-wide registry.
#[derive(Debug)]
pub struct Registry<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: &str, value: T) -> Result<(), Error> {
        if self.contains(identifier) {
            return Err(Error::DuplicateIdentifier {
                identifier: identifier.to_string(),
            });
        }
        self.entries.push((identifier.to_string(), value));
        Ok(())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.iter().any(|(id, _)| id == identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(id, _)| id == identifier)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<T> {
        let index = self.entries.iter().position(|(id, _)| id == identifier)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries
            .iter_mut()
            .map(|(id, value)| (id.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
