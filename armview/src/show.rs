use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use eframe::egui::{self, Color32, RichText};
use log::info;

use crate::animation::{AnimationState, FrameClock};
use crate::config::ClientConfig;
use crate::draw::{Draw, PainterCanvas};
use crate::poll::Poller;
use crate::snapshot_manager::{PollStatus, SlotState, SnapshotManager};
use crate::summary::{status_line, SummaryCard};
use crate::viewport::Viewport;

/// Per-frame display state: the animated pose and the card for the latest frame.
pub struct Animator {
    slot: SnapshotManager,
    animation: AnimationState,
    clock: FrameClock,
    /// The card and the sequence number of the frame it describes.
    card: Option<(u64, SummaryCard)>,
}

impl Animator {
    pub fn new(slot: SnapshotManager, smoothing_rate: f64) -> Self {
        Self {
            slot,
            animation: AnimationState::new(smoothing_rate),
            clock: FrameClock::default(),
            card: None,
        }
    }

    /// Advance the animation to now and return the slot state it was advanced against.
    pub fn advance(&mut self, now: Instant) -> Arc<SlotState> {
        let delta_t = self.clock.tick(now);
        let state = self.slot.load();
        self.animation.update_state(delta_t, state.target());

        if let Some(latest) = &state.latest {
            if self.card.as_ref().map(|(seq, _)| *seq) != Some(latest.seq) {
                self.card = Some((latest.seq, SummaryCard::new(&latest.frame, &state.dimensions)));
            }
        }
        state
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn card(&self) -> Option<&SummaryCard> {
        self.card.as_ref().map(|(_, card)| card)
    }
}

/// Top-level structure that owns all of the show data.
pub struct Show {
    cfg: ClientConfig,
    animator: Animator,
    _poller: Poller,
}

impl Show {
    /// Start polling the configured source.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let slot = SnapshotManager::new(cfg.default_image);
        let source = cfg.source.open(cfg.request_timeout);
        let poller = Poller::start(source, slot.clone(), cfg.poll_interval)?;
        Ok(Self {
            animator: Animator::new(slot, cfg.smoothing_rate),
            cfg,
            _poller: poller,
        })
    }

    /// Open the window and run until it is closed.
    pub fn run(self) -> Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size(self.cfg.window_size),
            ..Default::default()
        };
        let title = format!("armview: {}", self.cfg.source);
        eframe::run_native(&title, options, Box::new(|_cc| Ok(Box::new(self))))
            .map_err(|e| anyhow!("window closed with an error: {}", e))?;
        info!("Window closed.");
        Ok(())
    }
}

impl eframe::App for Show {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = self.animator.advance(Instant::now());

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            let line = status_line(&state.status);
            match state.status {
                PollStatus::Failed(_) => ui.colored_label(Color32::RED, line),
                _ => ui.label(line),
            };
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let viewport = Viewport::fit(
                ui.available_width() as f64,
                self.cfg.max_canvas_width,
                state.dimensions,
            );
            let size = egui::vec2(viewport.width() as f32, viewport.height() as f32);
            let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
            let mut canvas = PainterCanvas::new(&painter, response.rect);
            self.animator.animation().draw(&mut canvas, &viewport);

            ui.separator();
            match self.animator.card() {
                Some(card) => {
                    for line in card.lines() {
                        ui.label(RichText::new(line).monospace());
                    }
                }
                None => {
                    ui.label("no data yet");
                }
            }
        });

        ctx.request_repaint();
    }
}
