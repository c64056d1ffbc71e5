use anyhow::Result;
use dom::{
    DOMSubscriber as _, DOMUpdate, HostDocument as _, LayoutRect, MutationRecord, NodeKey,
    ObservedDocument as _, StaticDocument, Viewport,
};

fn init_logging() {
    let _log_init: Result<(), _> = env_logger::builder().is_test(true).try_init();
}

#[test]
fn update_stream_mirrors_into_hit_tests() -> Result<()> {
    init_logging();
    let mut doc = StaticDocument::new(Viewport::new(200, 100));
    let body = NodeKey(10);
    let link = NodeKey(11);
    let label = NodeKey(12);

    for update in [
        DOMUpdate::InsertElement {
            parent: NodeKey::ROOT,
            node: body,
            tag: "BODY".into(),
            pos: 0,
        },
        DOMUpdate::SetLayout {
            node: body,
            rect: Some(LayoutRect::new(0, 0, 200, 100)),
        },
        DOMUpdate::InsertElement {
            parent: body,
            node: link,
            tag: "a".into(),
            pos: 0,
        },
        DOMUpdate::SetAttr {
            node: link,
            name: "href".into(),
            value: "/docs".into(),
        },
        DOMUpdate::InsertText {
            parent: link,
            node: label,
            text: "Docs".into(),
            pos: 0,
        },
        DOMUpdate::SetLayout {
            node: link,
            rect: Some(LayoutRect::new(20, 20, 40, 10)),
        },
        DOMUpdate::EndOfDocument,
    ] {
        doc.apply_update(update)?;
    }

    assert_eq!(doc.element_from_point(25, 25)?, Some(link));
    assert_eq!(doc.element_from_point(60, 25)?, Some(body));
    assert_eq!(doc.element_from_point(200, 25)?, None);
    assert_eq!(doc.tag_name(body), Some("body"));
    assert_eq!(doc.tag_name(label), None);
    assert_eq!(doc.parent(label), Some(link));

    // Moving the box is visible to the next hit test.
    doc.apply_update(DOMUpdate::SetLayout {
        node: link,
        rect: Some(LayoutRect::new(100, 20, 40, 10)),
    })?;
    assert_eq!(doc.element_from_point(25, 25)?, Some(body));
    assert_eq!(doc.element_from_point(105, 25)?, Some(link));

    // Dropping the box leaves the element attached but unhittable.
    doc.apply_update(DOMUpdate::SetLayout {
        node: link,
        rect: None,
    })?;
    assert_eq!(doc.element_from_point(105, 25)?, Some(body));
    assert!(doc.is_attached(link));
    Ok(())
}

#[test]
fn records_accumulate_until_taken() -> Result<()> {
    init_logging();
    let mut doc = StaticDocument::new(Viewport::new(10, 10));
    let div = doc.append_element(NodeKey::ROOT, "div", &[("class", "a")])?;
    let text = doc.append_text(div, "x")?;
    doc.apply_update(DOMUpdate::SetText {
        node: text,
        text: "y".into(),
    })?;
    doc.apply_update(DOMUpdate::RemoveAttr {
        node: div,
        name: "class".into(),
    })?;

    let records = doc.take_records();
    assert_eq!(records.len(), 5);
    assert!(matches!(records[0], MutationRecord::ChildList { target: NodeKey::ROOT, .. }));
    assert!(matches!(records[3], MutationRecord::CharacterData { target } if target == text));
    assert!(matches!(
        &records[4],
        MutationRecord::Attributes { name, old_value: Some(old), new_value: None, .. }
            if name == "class" && old == "a"
    ));
    assert!(doc.take_records().is_empty());

    // Viewport changes are not mutations.
    doc.set_viewport(Viewport::new(20, 20));
    assert!(doc.take_records().is_empty());
    assert_eq!(doc.viewport(), Viewport::new(20, 20));
    Ok(())
}
