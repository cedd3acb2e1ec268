// Interactive viewer for the paint engine.
// • Left mouse paints with the current tool; leaving the window ends the gesture.
// • B P M H E: pencil, pen, marker, highlighter, eraser.
// • G fill, I eyedropper, V move, R rectangle, O ellipse, L line.
// • [ / ] brush size, Shift+[ / ] opacity, 0-9 pick a recent color.
// • N new layer, Delete removes it, Up/Down changes the active layer, Tab toggles visibility.
// • Ctrl+Z undo, Ctrl+Y redo, Ctrl+S save project, Ctrl+E export PNG, Ctrl+N new canvas.
// • ESC quits.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser as ClapParser;
use minifb::Key;

use layerpaint::draw::{
    draw_circle, draw_crosshair, draw_swatch, draw_text_5x7, Drawer, FrameBuffer,
};
use layerpaint::{Engine, EngineConfig, Point, PointerEvent, Tool};

#[derive(ClapParser, Debug)]
#[command(name = "layerpaint", version, about = "Layered raster painting")]
struct Cli {
    /// Canvas width in pixels (ignored with --open).
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Canvas height in pixels (ignored with --open).
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Project file to load at startup.
    #[arg(long, value_name = "FILE")]
    open: Option<PathBuf>,
    /// Where Ctrl+S writes the project; defaults to --open or canvas.json.
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
    /// Stabilizer window in samples (0 disables smoothing).
    #[arg(long, default_value_t = 8)]
    stabilization: usize,
}

fn shortcut_key(tool: Tool) -> Key {
    match tool.shortcut() {
        'b' => Key::B,
        'p' => Key::P,
        'm' => Key::M,
        'h' => Key::H,
        'e' => Key::E,
        'g' => Key::G,
        'i' => Key::I,
        'v' => Key::V,
        'r' => Key::R,
        'o' => Key::O,
        _ => Key::L,
    }
}

const DIGITS: [Key; 10] = [
    Key::Key0, Key::Key1, Key::Key2, Key::Key3, Key::Key4,
    Key::Key5, Key::Key6, Key::Key7, Key::Key8, Key::Key9,
];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig { width: cli.width, height: cli.height, ..Default::default() };
    let mut engine = match &cli.open {
        Some(path) => Engine::open(config, path)
            .with_context(|| format!("opening {}", path.display()))?,
        None => Engine::new(config),
    };
    engine.tools_mut().stabilization = cli.stabilization;

    let save_path = cli
        .save
        .clone()
        .or_else(|| cli.open.clone())
        .unwrap_or_else(|| PathBuf::from("canvas.json"));

    let (w, h) = (engine.document().width() as usize, engine.document().height() as usize);
    let mut drawer = Drawer::new("Layerpaint", w, h)?;

    // Canvas pixels are refreshed only when the engine re-composites; the
    // screen buffer gets the crosshair and HUD on top every frame.
    let mut canvas = FrameBuffer::new(w, h);
    let mut screen = FrameBuffer::new(w, h);

    let mut pointer_down = false;
    let mut wait_for_release = false;
    let mut last_pos: Option<(f32, f32)> = None;
    let mut status = String::new();

    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS: 0.0");

    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Pointer */
        let pos = drawer.mouse_pos();
        let button = drawer.left_mouse_down();
        match (pointer_down, button, pos) {
            (false, true, Some((x, y))) if !wait_for_release => {
                engine.apply(PointerEvent::Down(Point::new(x, y)));
                pointer_down = engine.is_drawing();
                // one-shot tools (fill, eyedropper) must not repeat while held
                wait_for_release = !pointer_down;
                last_pos = Some((x, y));
            }
            (true, true, Some((x, y))) => {
                if last_pos != Some((x, y)) {
                    engine.apply(PointerEvent::Move(Point::new(x, y)));
                    last_pos = Some((x, y));
                }
            }
            (true, true, None) => {
                engine.apply(PointerEvent::Cancel);
                pointer_down = false;
                wait_for_release = true;
            }
            (true, false, _) => {
                engine.apply(PointerEvent::Up);
                pointer_down = false;
            }
            (_, false, _) => wait_for_release = false,
            _ => {}
        }

        /* 2) Keys */
        if drawer.ctrl_down() {
            if drawer.key_pressed_once(Key::Z) {
                engine.undo();
            }
            if drawer.key_pressed_once(Key::Y) {
                engine.redo();
            }
            if drawer.key_pressed_once(Key::N) {
                engine.new_canvas();
            }
            if drawer.key_pressed_once(Key::S) {
                status = match engine.save_project(&save_path) {
                    Ok(()) => format!("SAVED {}", save_path.display()),
                    Err(e) => format!("SAVE FAILED: {e}"),
                };
                println!("{status}");
            }
            if drawer.key_pressed_once(Key::E) {
                let png_path = save_path.with_extension("png");
                let exported = engine
                    .export_png()
                    .and_then(|png| fs::write(&png_path, png).map_err(Into::into));
                status = match exported {
                    Ok(()) => format!("EXPORTED {}", png_path.display()),
                    Err(e) => format!("EXPORT FAILED: {e}"),
                };
                println!("{status}");
            }
        } else {
            for tool in Tool::ALL {
                if drawer.key_pressed_once(shortcut_key(tool)) {
                    engine.set_tool(tool);
                }
            }
            let shift = drawer.shift_down();
            if drawer.key_repeating(Key::LeftBracket) {
                if shift {
                    let o = engine.tools().opacity();
                    engine.tools_mut().set_opacity(o - 0.05);
                } else {
                    engine.tools_mut().nudge_brush_size(-1);
                }
            }
            if drawer.key_repeating(Key::RightBracket) {
                if shift {
                    let o = engine.tools().opacity();
                    engine.tools_mut().set_opacity(o + 0.05);
                } else {
                    engine.tools_mut().nudge_brush_size(1);
                }
            }
            for (i, key) in DIGITS.iter().enumerate() {
                if drawer.key_pressed_once(*key) {
                    let picked = engine.tools().recent_colors().iter().nth(i).copied();
                    if let Some(c) = picked {
                        engine.tools_mut().set_color(c);
                    }
                }
            }
            if drawer.key_pressed_once(Key::N) {
                engine.add_layer(None);
            }
            let active = engine.document().active_index();
            if drawer.key_pressed_once(Key::Delete) {
                if let Err(e) = engine.remove_layer(active) {
                    status = e.to_string();
                }
            }
            if drawer.key_pressed_once(Key::Up) && active + 1 < engine.document().len() {
                engine.set_active_layer(active + 1)?;
            }
            if drawer.key_pressed_once(Key::Down) && active > 0 {
                engine.set_active_layer(active - 1)?;
            }
            if drawer.key_pressed_once(Key::Tab) {
                let visible = engine.document().active_layer().visible;
                engine.set_layer_visible(active, !visible)?;
            }
        }

        /* 3) Canvas (re-composited only when something changed) */
        if engine.needs_redraw() {
            canvas.copy_from(engine.display_frame());
        }
        screen.pixels.copy_from_slice(&canvas.pixels);

        /* 4) Crosshair, brush outline, HUD */
        if let Some((mx, my)) = pos {
            let (cx, cy) = (mx as i32, my as i32);
            draw_crosshair(&mut screen, cx, cy, 8, 0x00_FF_CC_33);
            if let Tool::Brush(kind) = engine.tools().tool {
                let r = (kind.line_width(engine.tools().brush_size(), 0.5) / 2.0).round() as i32;
                draw_circle(&mut screen, cx, cy, r, 0x00_80_80_80);
            }
        }
        draw_swatch(&mut screen, 8, 6, 10, engine.tools().color().to_u32_rgb(), 0x00_FF_FF_FF);
        let doc = engine.document();
        let hud = format!(
            "{} | SIZE {:.0} | {:.0}% | LAYER {}/{} {} | {}",
            engine.tools().tool.label(),
            engine.tools().brush_size(),
            engine.tools().opacity() * 100.0,
            doc.active_index() + 1,
            doc.len(),
            doc.active_layer().name,
            hud_fps_text
        );
        draw_text_5x7(&mut screen, 24, 8, &hud, 0x00_FF_FF_FF);
        if !status.is_empty() {
            draw_text_5x7(&mut screen, 24, 20, &status, 0x00_FF_FF_FF);
        }

        /* 5) Present */
        drawer.present(&screen)?;

        /* 6) FPS counter (terminal + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            println!("FPS: {:.1}", fps);
            hud_fps_text = format!("FPS: {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    engine.end_gesture();
    Ok(())
}
