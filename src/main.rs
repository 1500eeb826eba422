//! Slice Surge entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, PointerEvent as DomPointerEvent};

    use slice_surge::consts::*;
    use slice_surge::persistence::LocalStore;
    use slice_surge::sim::{GameEvent, PointerEvent};
    use slice_surge::{Game, LocalLeaderboard, Tuning};

    type WebGame = Game<LocalStore, LocalLeaderboard>;

    /// Browser shell around the game
    struct App {
        game: WebGame,
        last_time: f64,
    }

    impl App {
        fn new(seed: u64) -> Self {
            let mut game = Game::new(
                seed,
                Tuning::default(),
                LocalStore::new(),
                LocalLeaderboard::default(),
            );
            game.record_play_day(today());
            Self {
                game,
                last_time: 0.0,
            }
        }

        fn update(&mut self, time: f64) {
            let dt = if self.last_time == 0.0 {
                SIM_DT
            } else {
                ((time - self.last_time) / 1000.0) as f32
            };
            self.last_time = time;

            for event in self.game.update(dt) {
                self.apply_event(&event);
            }
        }

        /// Reflect a game event in the DOM HUD
        fn apply_event(&self, event: &GameEvent) {
            match event {
                GameEvent::ScoreUpdated { score } => set_hud("#hud-score .hud-value", score),
                GameEvent::LivesUpdated { lives } => set_hud("#hud-lives .hud-value", lives),
                GameEvent::ComboUpdated { combo } => set_hud("#hud-combo .hud-value", combo),
                GameEvent::DifficultyIncreased { level } => {
                    set_hud("#hud-level .hud-value", level)
                }
                GameEvent::Paused => set_visible("pause-menu", true),
                GameEvent::Resumed => set_visible("pause-menu", false),
                GameEvent::GameOver(summary) => {
                    set_hud("#final-score", &summary.final_score);
                    set_visible("game-over", true);
                }
                _ => {}
            }
        }

        fn restart(&mut self, seed: u64) {
            self.game.restart(seed);
            self.last_time = 0.0;
            set_visible("game-over", false);
            set_visible("pause-menu", false);
        }
    }

    /// Days since the Unix epoch, local to the browser clock
    fn today() -> i64 {
        (js_sys::Date::now() / 86_400_000.0).floor() as i64
    }

    fn set_hud(selector: &str, value: &dyn std::fmt::Display) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Ok(Some(el)) = document.query_selector(selector) {
            el.set_text_content(Some(&value.to_string()));
        }
    }

    fn set_visible(id: &str, visible: bool) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id(id) {
            let classes = el.class_list();
            let _ = if visible {
                classes.remove_1("hidden")
            } else {
                classes.add_1("hidden")
            };
        }
    }

    /// Map a client-space pointer position to playfield coordinates
    fn to_field(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> Vec2 {
        let rect = canvas.get_bounding_client_rect();
        let w = rect.width().max(1.0) as f32;
        let h = rect.height().max(1.0) as f32;
        Vec2::new(
            (client_x as f32 - rect.left() as f32) / w * FIELD_WIDTH,
            (client_y as f32 - rect.top() as f32) / h * FIELD_HEIGHT,
        )
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();

        log::info!("Slice Surge starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into::<HtmlCanvasElement>()?;

        let seed = js_sys::Date::now() as u64;
        log::info!("Game seed: {}", seed);

        let app = Rc::new(RefCell::new(App::new(seed)));

        setup_input_handlers(&canvas, app.clone());
        setup_restart_button(app.clone());
        setup_pause_menu(app.clone());
        setup_auto_pause(app.clone());

        request_animation_frame(app);
        Ok(())
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        // Pointer events cover mouse, pen and touch
        for (name, kind) in [("pointerdown", 0u8), ("pointermove", 1), ("pointerup", 2)] {
            let app = app.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: DomPointerEvent| {
                event.prevent_default();
                let pos = to_field(&canvas_clone, event.client_x(), event.client_y());
                let sample = match kind {
                    0 => {
                        let _ = canvas_clone.set_pointer_capture(event.pointer_id());
                        PointerEvent::Down(pos)
                    }
                    1 => PointerEvent::Move(pos),
                    _ => PointerEvent::Up,
                };
                app.borrow_mut().game.pointer(sample);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Cancelled pointers end the stroke
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().game.pointer(PointerEvent::Up);
            });
            let _ = canvas
                .add_event_listener_with_callback("pointercancel", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let mut a = app.borrow_mut();
            match event.key().as_str() {
                "Escape" | "p" | "P" => a.game.toggle_pause(),
                "i" | "I" => {
                    let idle = !a.game.idle_mode();
                    a.game.set_idle_mode(idle);
                    log::info!("Idle mode: {}", if idle { "ON" } else { "OFF" });
                }
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().update(time);
        request_animation_frame(app);
    }

    fn setup_restart_button(app: Rc<RefCell<App>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let seed = js_sys::Date::now() as u64;
                app.borrow_mut().restart(seed);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_pause_menu(app: Rc<RefCell<App>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("resume-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                if a.game.state.is_paused() {
                    a.game.toggle_pause();
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Pause when tab becomes hidden
        {
            let app = app.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut a = app.borrow_mut();
                    if !a.game.state.is_paused() && !a.game.state.is_game_over() {
                        a.game.toggle_pause();
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Pause when window loses focus
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut a = app.borrow_mut();
            if !a.game.state.is_paused() && !a.game.state.is_game_over() {
                a.game.toggle_pause();
            }
        });
        let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::time::{SystemTime, UNIX_EPOCH};

    use slice_surge::consts::SIM_DT;
    use slice_surge::sim::GameEvent;
    use slice_surge::{Game, LocalLeaderboard, MemoryStore, Tuning};

    /// Upper bound on a demo run (ten minutes of game time)
    const MAX_TICKS: u32 = 120 * 600;

    /// Play one autoplay session and report how it went
    pub fn run() {
        let seed = std::env::args()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0)
            });
        let overrides = std::env::var("SLICE_SURGE_TUNING")
            .ok()
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(json) => Some(json),
                Err(e) => {
                    log::warn!("Could not read tuning from {}: {}", path, e);
                    None
                }
            });
        let tuning = Tuning::load_or_default(overrides.as_deref());

        log::info!("Slice Surge headless demo (seed {})", seed);
        let mut game = Game::new(
            seed,
            tuning,
            MemoryStore::default(),
            LocalLeaderboard::default(),
        );
        game.set_idle_mode(true);

        let mut golden_runs = 0;
        for _ in 0..MAX_TICKS {
            for event in game.update(SIM_DT) {
                match event {
                    GameEvent::GoldenFinished { hits, points } => {
                        golden_runs += 1;
                        log::info!("Golden event: {} hits for {} points", hits, points);
                    }
                    GameEvent::GameOver(summary) => {
                        log::info!(
                            "Final score {} (max combo {})",
                            summary.final_score,
                            summary.max_combo
                        );
                    }
                    _ => {}
                }
            }
            if game.state.is_game_over() {
                break;
            }
        }

        let session = &game.state.session;
        println!(
            "seed {}: score {} after {:.1}s, {} lives left, max combo {}, {} golden events",
            seed,
            session.score,
            game.state.clock_ms / 1000.0,
            session.lives,
            session.max_combo,
            golden_runs
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    headless::run();
}

// Dummy main for wasm32 (actual entry is wasm_main)
#[cfg(target_arch = "wasm32")]
fn main() {}
