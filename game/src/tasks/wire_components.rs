use std::collections::HashMap;
use std::time::Duration;

use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, TaskTimer};
use crate::content::{EdgeSpec, WiringScenario};
use crate::sfx::Cue;

pub const FINISH_DELAY: Duration = Duration::from_millis(500);
/// Perpendicular shift applied to a line whose reverse already exists.
pub const REVERSE_OFFSET: f32 = 5.0;

/// Every required connection is drawn. Extra connections are fine.
pub fn is_satisfied(required: &[EdgeSpec], drawn: &[EdgeSpec]) -> bool {
    required.iter().all(|edge| drawn.contains(edge))
}

/// Shifts a segment sideways by `by` pixels.
pub fn offset_segment(from: Point, to: Point, by: f32) -> (Point, Point) {
    let len = from.distance(to);
    if len == 0.0 {
        return (from, to);
    }
    let nx = -(to.y - from.y) / len * by;
    let ny = (to.x - from.x) / len * by;
    (
        Point::new(from.x + nx, from.y + ny),
        Point::new(to.x + nx, to.y + ny),
    )
}

#[derive(Debug, Clone)]
struct Wire {
    edge: EdgeSpec,
    line: NodeId,
}

/// Draw the directed connections a small architecture needs.
#[derive(Debug)]
pub struct WireComponents {
    pool: Vec<WiringScenario>,
    required: Vec<EdgeSpec>,
    components: HashMap<NodeId, (String, Point)>,
    wires: Vec<Wire>,
    dragging: Option<NodeId>,
    preview: Option<NodeId>,
    selected: Option<NodeId>,
    locked: bool,
}

impl WireComponents {
    pub fn new(pool: Vec<WiringScenario>) -> Self {
        Self {
            pool,
            required: Vec::new(),
            components: HashMap::new(),
            wires: Vec::new(),
            dragging: None,
            preview: None,
            selected: None,
            locked: false,
        }
    }

    pub fn drawn(&self) -> Vec<EdgeSpec> {
        self.wires.iter().map(|w| w.edge.clone()).collect()
    }

    pub fn component_node(&self, id: &str) -> Option<NodeId> {
        self.components
            .iter()
            .find(|(_, (name, _))| name == id)
            .map(|(node, _)| *node)
    }

    fn drop_preview(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(line) = self.preview.take() {
            ctx.surface().remove(line);
        }
    }

    fn select(&mut self, node: Option<NodeId>, ctx: &mut TaskContext<'_>) {
        if let Some(old) = self.selected {
            ctx.surface().set_tone(old, Tone::Neutral);
        }
        self.selected = node;
        if let Some(new) = node {
            ctx.surface().set_tone(new, Tone::Accent);
        }
    }

    fn connect(&mut self, from: NodeId, to: NodeId, ctx: &mut TaskContext<'_>) {
        let (Some((a, a_at)), Some((b, b_at))) = (
            self.components.get(&from).cloned(),
            self.components.get(&to).cloned(),
        ) else {
            return;
        };
        let edge = EdgeSpec::new(a, b);
        if self.wires.iter().any(|w| w.edge == edge) {
            ctx.cue(Cue::Error);
            return;
        }

        let reverse = EdgeSpec::new(edge.to.clone(), edge.from.clone());
        let (start, end) = if self.wires.iter().any(|w| w.edge == reverse) {
            offset_segment(a_at, b_at, REVERSE_OFFSET)
        } else {
            (a_at, b_at)
        };
        let line = ctx.surface().append(
            NodeSpec::line(start, end).hint(format!("{} -> {}", edge.from, edge.to)),
        );
        tracing::trace!(from = %edge.from, to = %edge.to, "wire drawn");
        self.wires.push(Wire { edge, line });
        ctx.cue(Cue::Click);

        if is_satisfied(&self.required, &self.drawn()) {
            self.locked = true;
            for wire in &self.wires {
                ctx.surface().set_tone(wire.line, Tone::Success);
                ctx.surface().set_enabled(wire.line, false);
            }
            ctx.set_timeout(FINISH_DELAY, TaskTimer::Finish);
        }
    }

    fn pointer_up(&mut self, target: Option<NodeId>, ctx: &mut TaskContext<'_>) {
        self.drop_preview(ctx);
        let from = self.dragging.take();
        let to = target.filter(|t| self.components.contains_key(t));
        match (from, to) {
            (Some(a), Some(b)) if a != b => {
                self.select(None, ctx);
                self.connect(a, b, ctx);
            }
            (Some(a), Some(_)) => match self.selected {
                Some(s) if s == a => self.select(None, ctx),
                Some(s) => {
                    self.select(None, ctx);
                    self.connect(s, a, ctx);
                }
                None => self.select(Some(a), ctx),
            },
            _ => self.select(None, ctx),
        }
    }
}

impl Task for WireComponents {
    fn kind(&self) -> TaskKind {
        TaskKind::WireComponents
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        let Some(scenario) = ctx.rng().choose(&self.pool).cloned() else {
            tracing::error!("no wiring scenarios to choose from");
            ctx.set_title("Connect the components");
            return;
        };
        ctx.set_title(scenario.title.clone());
        self.required = scenario.required.clone();
        self.components.clear();
        self.wires.clear();
        self.locked = false;

        let surface = ctx.surface();
        surface.append(
            NodeSpec::text("Drag from one component to another, or tap both in turn. Click a line to remove it.")
                .at(Point::new(20.0, 20.0))
                .tone(Tone::Muted),
        );
        for component in &scenario.components {
            let at = Point::new(component.x, component.y);
            let mut spec = NodeSpec::button(component.label.clone()).at(at);
            if let Some(info) = &component.info {
                spec = spec.hint(info.clone());
            }
            let node = surface.append(spec);
            self.components.insert(node, (component.id.clone(), at));
        }
    }

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>) {
        if self.locked || ctx.is_completed() {
            return;
        }
        match event {
            PointerEvent::Down { target, .. } => {
                self.dragging = target.filter(|t| self.components.contains_key(t));
            }
            PointerEvent::Move { at } => {
                let Some(from) = self.dragging else {
                    return;
                };
                let Some((_, start)) = self.components.get(&from).cloned() else {
                    return;
                };
                match self.preview {
                    Some(line) => {
                        if let Some(node) = ctx.surface().node_mut(line) {
                            node.end = Some(*at);
                        }
                    }
                    None => {
                        let line = ctx
                            .surface()
                            .append(NodeSpec::line(start, *at).tone(Tone::Muted).disabled());
                        self.preview = Some(line);
                    }
                }
            }
            PointerEvent::Up { target, .. } => self.pointer_up(*target, ctx),
            PointerEvent::Leave => {
                self.dragging = None;
                self.drop_preview(ctx);
            }
            PointerEvent::Click { target } => {
                if let Some(index) = self.wires.iter().position(|w| w.line == *target) {
                    let wire = self.wires.remove(index);
                    ctx.surface().remove(wire.line);
                }
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, timer: TaskTimer, ctx: &mut TaskContext<'_>) {
        if timer == TaskTimer::Finish && self.locked {
            ctx.answer(true);
        }
    }
}
