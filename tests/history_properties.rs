// Undo restores exactly the prior state for every mutating operation, and the
// history stays bounded.

use layerpaint::{
    BrushKind, Engine, EngineConfig, Point, PointerEvent, Rgba, ShapeKind, Snapshot, Tool,
};

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig {
        width: 48,
        height: 32,
        ..Default::default()
    });
    engine.add_layer(Some("Ink"));
    engine.add_layer(Some("Notes"));
    engine.set_active_layer(1).unwrap();
    engine
}

fn state(engine: &Engine) -> Snapshot {
    engine.document().snapshot()
}

fn assert_undo_restores(active: usize, name: &str, op: impl FnOnce(&mut Engine)) {
    let mut engine = engine();
    engine.set_active_layer(active).unwrap();
    let before = state(&engine);
    op(&mut engine);
    assert_ne!(state(&engine), before, "{name} changed nothing");
    assert!(engine.undo(), "{name} left no history");
    assert_eq!(state(&engine), before, "{name}");
}

fn stroke(engine: &mut Engine, tool: Tool) {
    engine.set_tool(tool);
    engine.apply(PointerEvent::Down(Point::new(4.0, 4.0)));
    engine.apply(PointerEvent::Move(Point::new(30.0, 20.0)));
    engine.apply(PointerEvent::Move(Point::new(40.0, 8.0)));
    engine.apply(PointerEvent::Up);
}

#[test]
fn every_mutation_is_undone_exactly() {
    for kind in [
        BrushKind::Pencil,
        BrushKind::Pen,
        BrushKind::Marker,
        BrushKind::Highlighter,
    ] {
        assert_undo_restores(1, &format!("{kind:?}"), |e| stroke(e, Tool::Brush(kind)));
    }
    // the background is the only layer with anything to erase or move
    assert_undo_restores(0, "eraser", |e| stroke(e, Tool::Brush(BrushKind::Eraser)));
    for kind in [ShapeKind::Rect, ShapeKind::Ellipse, ShapeKind::Line] {
        assert_undo_restores(1, &format!("{kind:?}"), |e| stroke(e, Tool::Shape(kind)));
    }
    assert_undo_restores(1, "fill", |e| {
        e.set_tool(Tool::Fill);
        e.apply(PointerEvent::Down(Point::new(10.0, 10.0)));
    });
    assert_undo_restores(0, "move", |e| stroke(e, Tool::Move));
    assert_undo_restores(1, "add layer", |e| {
        e.add_layer(None);
    });
    assert_undo_restores(1, "remove layer", |e| e.remove_layer(1).unwrap());
    assert_undo_restores(1, "move layer", |e| e.move_layer(0, 2).unwrap());
    assert_undo_restores(1, "hide layer", |e| e.set_layer_visible(2, false).unwrap());
    assert_undo_restores(1, "layer opacity", |e| e.set_layer_opacity(1, 0.3).unwrap());
    assert_undo_restores(1, "rename layer", |e| e.rename_layer(2, "Renamed").unwrap());
    assert_undo_restores(1, "new canvas", |e| e.new_canvas());
}

#[test]
fn redo_reapplies_the_undone_change() {
    let mut engine = engine();
    engine.set_layer_visible(0, false).unwrap();
    let after = state(&engine);
    engine.undo();
    assert!(engine.redo());
    assert_eq!(state(&engine), after);
    assert!(!engine.redo());
}

#[test]
fn history_is_capped_and_drops_the_oldest_state() {
    let mut engine = Engine::new(EngineConfig {
        width: 8,
        height: 8,
        ..Default::default()
    });
    let initial = state(&engine);
    engine.set_tool(Tool::Fill);
    for i in 0..41u8 {
        engine.tools_mut().set_color(Rgba::rgb(i, 100, 200));
        engine.apply(PointerEvent::Down(Point::new(1.0, 1.0)));
        assert!(engine.history().undo_len() <= 40);
    }
    assert_eq!(engine.history().undo_len(), 40);

    let mut undone = 0;
    while engine.undo() {
        undone += 1;
    }
    assert_eq!(undone, 40);
    // the pre-first-fill state was evicted
    assert_ne!(state(&engine), initial);
    assert_eq!(engine.document().active_layer().buffer.get(0, 0), Rgba::rgb(0, 100, 200));
}

#[test]
fn undo_and_redo_on_empty_stacks_are_no_ops() {
    let mut engine = engine();
    let before = state(&engine);
    while engine.undo() {}
    let bottom = state(&engine);
    assert!(!engine.undo());
    assert_eq!(state(&engine), bottom);
    while engine.redo() {}
    assert!(!engine.redo());
    assert_eq!(state(&engine), before);
}
