//! Label rendering collaborator
//!
//! Themes lay out per-body text each frame; drawing (fonts, strokes,
//! canvas state) is left to the [`LabelSink`].

use glam::Vec2;
use serde::Serialize;

use crate::audio::SoundCue;

/// A piece of text to draw this frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub position: Vec2,
    pub text: String,
    /// Font size in pixels
    pub size: f32,
    /// Rotation in radians (0 for upright text)
    pub angle: f32,
    /// 0..1, for fading bodies
    pub opacity: f32,
}

/// Anything that can draw labels
pub trait LabelSink {
    fn draw_label(&mut self, label: Label);
}

/// Collects labels instead of drawing them
#[derive(Debug, Default, Clone)]
pub struct LabelBuffer {
    pub labels: Vec<Label>,
}

impl LabelBuffer {
    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn texts(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.text.as_str()).collect()
    }
}

impl LabelSink for LabelBuffer {
    fn draw_label(&mut self, label: Label) {
        self.labels.push(label);
    }
}

/// Everything a host draws and plays for one frame
#[derive(Debug, Serialize)]
pub struct Frame<'a> {
    pub labels: &'a [Label],
    pub sounds: Vec<SoundCue<'a>>,
}
