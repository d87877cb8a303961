use ::rand as external_rand;
use external_rand::Rng;
use macroquad::prelude::*;
use tracing::info;

use crate::driver::FrameLoop;
use crate::field::ParticleField;
use crate::visualization::MacroquadSurface;

/// Window-side toggles that live outside the field.
pub struct UiState {
    pub stats_visible: bool,
    /// Applied to `play_once` on the next restart.
    pub looping: bool,
    pub take_screenshot: bool,
    pub quit: bool,
}

impl UiState {
    pub fn new(looping: bool) -> Self {
        Self {
            stats_visible: false,
            looping,
            take_screenshot: false,
            quit: false,
        }
    }
}

pub fn handle_controls<R: Rng>(
    ui: &mut UiState,
    field: &mut ParticleField,
    frame_loop: &mut FrameLoop,
    surface: &mut MacroquadSurface,
    rng: &mut R,
) {
    if is_key_pressed(KeyCode::R) {
        field.config.play_once = !ui.looping;
        surface.begin();
        frame_loop.start(field, rng, surface);
        info!(looping = ui.looping, "restart requested");
    }

    if is_key_pressed(KeyCode::L) {
        ui.looping = !ui.looping;
    }

    if is_key_pressed(KeyCode::Tab) {
        ui.stats_visible = !ui.stats_visible;
    }

    if is_key_pressed(KeyCode::P) {
        ui.take_screenshot = true;
    }

    if is_key_pressed(KeyCode::Escape) {
        ui.quit = true;
    }
}
