use super::*;

#[test]
fn ids_follow_insertion_order_and_survive_removal() {
    let mut reg = ElementRegistry::new();
    let a = reg.add(Element::hline(1.0));
    let b = reg.add(Element::hline(2.0));
    let c = reg.add(Element::hline(3.0));
    assert_eq!(reg.len(), 3);

    assert!(reg.remove(b).is_some());
    assert!(reg.remove(b).is_none());
    assert!(!reg.contains(b));

    let order: Vec<ElementId> = reg.iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![a, c]);

    let d = reg.add(Element::hline(4.0));
    assert!(d > c);
    assert_eq!(reg.len(), 3);
}

#[test]
fn unknown_ids_are_absent() {
    let mut reg = ElementRegistry::new();
    assert!(reg.is_empty());
    assert!(reg.get(ElementId(7)).is_none());
    assert!(reg.get_mut(ElementId(7)).is_none());
    assert_eq!(ElementId(7).to_string(), "#7");
}
