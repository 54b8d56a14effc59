use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::camera::Camera;
use crate::scene::element::Element;
use crate::scene::registry::{ElementId, ElementRegistry};

/// Visual state of every element plus the camera at one sample time.
///
/// Built fresh for every frame from the scene's base state, so nothing written while applying
/// directives leaks into another frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    slots: Vec<Option<Element>>,
    /// Viewport at this sample time.
    pub camera: Camera,
}

impl FrameState {
    /// Copy the registry's current element states.
    pub fn from_registry(registry: &ElementRegistry, camera: Camera) -> Self {
        let mut slots = Vec::new();
        for (id, e) in registry.iter() {
            if slots.len() <= id.index() {
                slots.resize(id.index() + 1, None);
            }
            slots[id.index()] = Some(e.clone());
        }
        Self { slots, camera }
    }

    /// Borrow one element.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> TradeanimResult<&mut Element> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| TradeanimError::animation(format!("element {id} is not in the scene")))
    }

    /// Drop an element from this state; later lookups fail as if it was never added.
    pub(crate) fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (ElementId(i as u32), e)))
    }
}

/// Target state captured when a directive starts; read-only once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub(crate) elements: Vec<(ElementId, Element)>,
    pub(crate) camera: Camera,
    /// Camera a camera move ends on, when the move's destination depends on scene data.
    pub(crate) camera_target: Option<Camera>,
}

impl Snapshot {
    /// Borrow the captured state of `id`.
    pub fn element(&self, id: ElementId) -> TradeanimResult<&Element> {
        self.elements
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, e)| e)
            .ok_or_else(|| {
                TradeanimError::animation(format!("element {id} missing from start snapshot"))
            })
    }

    /// Camera at the directive's start.
    pub fn camera(&self) -> Camera {
        self.camera
    }
}
