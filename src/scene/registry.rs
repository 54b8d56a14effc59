use crate::scene::element::Element;

/// Stable handle to an element in an [`ElementRegistry`].
///
/// Handles are issued in insertion order and never reused, so a removed id stays dead.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Insertion slot of this element.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sole owner of scene elements.
///
/// Removal leaves a tombstone so that iteration order of the remaining elements is the order in
/// which they were added.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    slots: Vec<Option<Element>>,
}

impl ElementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `element` and return its handle.
    pub fn add(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.slots.len() as u32);
        self.slots.push(Some(element));
        id
    }

    /// Remove and return the element behind `id`, if it is still live.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    /// `true` when `id` refers to a live element.
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Borrow a live element.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutably borrow a live element.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (ElementId(i as u32), e)))
    }

    /// Mutable live elements in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ElementId, &mut Element)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, e)| e.as_mut().map(|e| (ElementId(i as u32), e)))
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|e| e.is_some()).count()
    }

    /// `true` when no live element remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/registry.rs"]
mod tests;
