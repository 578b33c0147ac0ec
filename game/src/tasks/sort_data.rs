use std::time::Duration;

use engine::input::PointerEvent;
use engine::rng::Rng;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, TaskTimer};

pub const MIN_ITEMS: usize = 4;
pub const MAX_ITEMS: usize = 6;
pub const MAX_VALUE: u32 = 99;
pub const FINISH_DELAY: Duration = Duration::from_millis(500);

const TILE_SPACING: f32 = 90.0;

/// 4–6 values in `0..=99` that are not already in ascending order.
pub fn generate(rng: &mut Rng) -> Vec<u32> {
    let len = MIN_ITEMS + rng.below(MAX_ITEMS - MIN_ITEMS + 1);
    loop {
        let values: Vec<u32> = (0..len)
            .map(|_| rng.below(MAX_VALUE as usize + 1) as u32)
            .collect();
        if !is_ascending(&values) {
            return values;
        }
    }
}

pub fn is_ascending(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

/// Moves the item at `from` next to the item at `to`: after it when dragged
/// rightwards, before it when dragged leftwards. Both land at index `to`.
pub fn reorder(values: &mut Vec<u32>, from: usize, to: usize) {
    if from == to || from >= values.len() || to >= values.len() {
        return;
    }
    let moved = values.remove(from);
    values.insert(to, moved);
}

/// Drag tiles into ascending order.
#[derive(Debug, Default)]
pub struct SortData {
    values: Vec<u32>,
    tiles: Vec<NodeId>,
    dragging: Option<usize>,
    sorted: bool,
}

impl SortData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.tiles.iter().position(|t| *t == id)
    }
}

impl Task for SortData {
    fn kind(&self) -> TaskKind {
        TaskKind::SortData
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Sort the data in ascending order");
        self.values = generate(ctx.rng());
        self.sorted = false;
        self.dragging = None;

        let surface = ctx.surface();
        let center = surface.size().center();
        let left = center.x - (self.values.len() as f32 - 1.0) * TILE_SPACING / 2.0;
        self.tiles = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                surface.append(
                    NodeSpec::new(NodeKind::Tile, v.to_string())
                        .at(Point::new(left + i as f32 * TILE_SPACING, center.y))
                        .group(i as u32),
                )
            })
            .collect();
        tracing::debug!(values = ?self.values, "sort task mounted");
    }

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>) {
        if self.sorted {
            return;
        }
        match event {
            PointerEvent::DragStart { target } => {
                self.dragging = self.slot_of(*target);
            }
            PointerEvent::DragEnd => {
                self.dragging = None;
            }
            PointerEvent::Drop { target } => {
                let (Some(from), Some(to)) = (self.dragging.take(), self.slot_of(*target)) else {
                    return;
                };
                reorder(&mut self.values, from, to);
                let surface = ctx.surface();
                for (tile, value) in self.tiles.iter().zip(&self.values) {
                    surface.set_text(*tile, value.to_string());
                }

                if is_ascending(&self.values) {
                    self.sorted = true;
                    for tile in &self.tiles {
                        surface.set_tone(*tile, Tone::Success);
                        surface.set_enabled(*tile, false);
                    }
                    ctx.cue(crate::sfx::Cue::Click);
                    ctx.set_timeout(FINISH_DELAY, TaskTimer::Finish);
                }
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, timer: TaskTimer, ctx: &mut TaskContext<'_>) {
        if timer == TaskTimer::Finish && self.sorted {
            ctx.answer(true);
        }
    }
}
