//! Browser entry points
//!
//! The overlay page owns the animation frame loop. It forwards Streamer.bot
//! events, calls `tick` once per frame, then draws the labels and plays the
//! sounds the returned frame describes.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::audio::{AudioManager, RecordingAudio};
use crate::persistence::LocalStorageStore;
use crate::platform::{MemoryAssets, init_logging};
use crate::render::{Frame, LabelBuffer};
use crate::sim::{PitConfig, PitState, SandboxWorld};
use crate::theme::{BallpitTheme, DucksTheme, ThemeManager};

#[wasm_bindgen(start)]
pub fn start() {
    init_logging();
    log::info!("The Pit (web) starting...");
}

struct Overlay {
    mgr: ThemeManager<AudioManager<RecordingAudio>>,
    assets: MemoryAssets,
    store: LocalStorageStore,
    labels: LabelBuffer,
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// One pit, shared with the page
#[wasm_bindgen]
pub struct PitHandle {
    inner: Rc<RefCell<Overlay>>,
}

#[wasm_bindgen]
impl PitHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, seed: u32) -> PitHandle {
        let config = PitConfig {
            width,
            height,
            ..PitConfig::with_seed(u64::from(seed))
        };
        let pit = PitState::new(Box::new(SandboxWorld::new()), config);
        let mut mgr = ThemeManager::new(pit, AudioManager::new(RecordingAudio::default()));
        mgr.register_theme(Box::new(BallpitTheme::new()));
        mgr.register_theme(Box::new(DucksTheme::new()));

        let store = LocalStorageStore;
        mgr.restore_settings(&store);

        PitHandle {
            inner: Rc::new(RefCell::new(Overlay {
                mgr,
                assets: MemoryAssets::new(),
                store,
                labels: LabelBuffer::default(),
            })),
        }
    }

    /// Hand over bytes the page fetched, keyed by the path a theme asks for
    #[wasm_bindgen(js_name = addAsset)]
    pub fn add_asset(&self, path: &str, bytes: Vec<u8>) {
        self.inner.borrow_mut().assets.insert(path, bytes);
    }

    #[wasm_bindgen(js_name = themeNames)]
    pub fn theme_names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .mgr
            .theme_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Resolves once the theme is active, rejects with the load error
    #[wasm_bindgen(js_name = switchTheme)]
    pub fn switch_theme(&self, name: String) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            // Memory assets never pend, so the borrow ends within one poll
            let mut overlay = inner.borrow_mut();
            let Overlay { mgr, assets, .. } = &mut *overlay;
            mgr.switch_theme(&name, &*assets).await.map_err(js_err)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Forward one inbound event; `payload` is its JSON body
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&self, name: &str, payload: &str) {
        match serde_json::from_str(payload) {
            Ok(value) => self.inner.borrow_mut().mgr.handle_named_event(name, &value),
            Err(e) => log::warn!("Dropping '{}' with unparseable payload: {}", name, e),
        }
    }

    /// Advance the pit and return this frame as JSON
    pub fn tick(&self, dt_ms: f64) -> Result<String, JsValue> {
        let mut overlay = self.inner.borrow_mut();
        let Overlay { mgr, labels, .. } = &mut *overlay;
        mgr.tick(dt_ms);
        labels.clear();
        mgr.render(labels);

        let played = std::mem::take(&mut mgr.audio_mut().inner_mut().played);
        let audio = mgr.audio();
        let frame = Frame {
            labels: &labels.labels,
            sounds: played.iter().filter_map(|e| audio.cue(e)).collect(),
        };
        serde_json::to_string(&frame).map_err(js_err)
    }

    pub fn flush(&self) -> bool {
        self.inner.borrow_mut().mgr.flush_pit()
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&self, muted: bool) {
        self.inner.borrow_mut().mgr.audio_mut().set_muted(muted);
    }

    #[wasm_bindgen(js_name = setMasterVolume)]
    pub fn set_master_volume(&self, volume: f32) {
        self.inner.borrow_mut().mgr.audio_mut().set_master_volume(volume);
    }

    #[wasm_bindgen(js_name = exportSettings)]
    pub fn export_settings(&self, theme: &str) -> Result<String, JsValue> {
        self.inner.borrow().mgr.export_settings(theme).map_err(js_err)
    }

    /// Apply a settings document and save every theme to LocalStorage
    #[wasm_bindgen(js_name = importSettings)]
    pub fn import_settings(&self, theme: &str, json: &str) -> Result<(), JsValue> {
        let mut overlay = self.inner.borrow_mut();
        let Overlay { mgr, store, .. } = &mut *overlay;
        mgr.import_settings(theme, json).map_err(js_err)?;
        mgr.persist_settings(store).map_err(js_err)
    }
}
