use std::time::Duration;

use engine::input::PointerEvent;
use engine::surface::{NodeId, NodeKind, NodeSpec, Point, Tone};

use super::{Task, TaskContext, TaskKind, TaskTimer};
use crate::sfx::Cue;

pub const SPAWN_EVERY: Duration = Duration::from_millis(800);
pub const MOVE_EVERY: Duration = Duration::from_millis(30);
pub const BAD_SHARE: f32 = 0.7;
pub const GOAL: u32 = 10;
pub const GOOD_CLICK_PENALTY: u32 = 20;
pub const BREACH_PENALTY: u32 = 30;
/// Packets are 40 px squares; positions are their top-left corner.
pub const PACKET_SIZE: f32 = 40.0;
pub const HIT_RADIUS: f32 = 30.0;
pub const BONUS_DIVISOR: u32 = 15;
const FLASH_FOR: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    pub node: NodeId,
    pub pos: Point,
    pub speed: f32,
    pub bad: bool,
}

impl Packet {
    fn middle(&self) -> Point {
        Point::new(self.pos.x + PACKET_SIZE / 2.0, self.pos.y + PACKET_SIZE / 2.0)
    }
}

/// Click malicious packets before they reach the server; spare the good ones.
#[derive(Debug, Default)]
pub struct PacketDefense {
    packets: Vec<Packet>,
    server: Option<NodeId>,
    counter: Option<NodeId>,
    destroyed: u32,
}

impl PacketDefense {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn destroyed(&self) -> u32 {
        self.destroyed
    }

    fn counter_text(&self) -> String {
        format!("Bad packets stopped: {}/{GOAL}", self.destroyed)
    }

    fn spawn(&mut self, ctx: &mut TaskContext<'_>) {
        let size = ctx.surface().size();
        let (w, h) = (size.width as f32, size.height as f32);
        let rng = ctx.rng();
        let pos = match rng.below(4) {
            0 => Point::new(rng.range_f32(0.0, w), 0.0),
            1 => Point::new(w - PACKET_SIZE, rng.range_f32(0.0, h)),
            2 => Point::new(rng.range_f32(0.0, w), h - PACKET_SIZE),
            _ => Point::new(0.0, rng.range_f32(0.0, h)),
        };
        let bad = rng.chance(BAD_SHARE);
        let speed = rng.range_f32(1.0, 2.0);
        let (label, tone) = if bad {
            ("bad-packet", Tone::Error)
        } else {
            ("good-packet", Tone::Success)
        };
        let node = ctx
            .surface()
            .append(NodeSpec::new(NodeKind::Sprite, label).at(pos).tone(tone));
        self.packets.push(Packet {
            node,
            pos,
            speed,
            bad,
        });
    }

    fn step(&mut self, ctx: &mut TaskContext<'_>) {
        let target = ctx.surface().size().center();
        let mut breaches = 0;
        let mut kept = Vec::with_capacity(self.packets.len());
        for mut packet in self.packets.drain(..) {
            let here = packet.middle();
            let dist = here.distance(target);
            if dist < HIT_RADIUS {
                ctx.surface().remove(packet.node);
                if packet.bad {
                    breaches += 1;
                }
                continue;
            }
            packet.pos.x += (target.x - here.x) / dist * packet.speed;
            packet.pos.y += (target.y - here.y) / dist * packet.speed;
            ctx.surface().set_pos(packet.node, packet.pos);
            kept.push(packet);
        }
        self.packets = kept;

        for _ in 0..breaches {
            ctx.penalize(BREACH_PENALTY);
        }
        if breaches > 0 {
            ctx.cue(Cue::Error);
            if let Some(server) = self.server {
                ctx.surface().set_tone(server, Tone::Error);
            }
            ctx.set_timeout(FLASH_FOR, TaskTimer::ClearFlash);
        }
    }

    fn hit(&mut self, index: usize, ctx: &mut TaskContext<'_>) {
        let packet = self.packets.remove(index);
        ctx.surface().remove(packet.node);
        if !packet.bad {
            ctx.penalize(GOOD_CLICK_PENALTY);
            ctx.cue(Cue::Error);
            return;
        }

        self.destroyed += 1;
        ctx.cue(Cue::Success);
        if let Some(counter) = self.counter {
            let text = self.counter_text();
            ctx.surface().set_text(counter, text);
        }
        if self.destroyed >= GOAL {
            ctx.cancel_timers();
            for packet in self.packets.drain(..) {
                ctx.surface().remove(packet.node);
            }
            if let Some(server) = self.server {
                ctx.surface().set_tone(server, Tone::Success);
            }
            let bonus = ctx.round().time_bonus(BONUS_DIVISOR);
            ctx.complete(true, bonus);
        }
    }
}

impl Task for PacketDefense {
    fn kind(&self) -> TaskKind {
        TaskKind::PacketDefense
    }

    fn mount(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.set_title("Fend off the DDoS attack");
        self.packets.clear();
        self.destroyed = 0;

        let surface = ctx.surface();
        let center = surface.size().center();
        self.server = Some(surface.append(NodeSpec::new(NodeKind::Sprite, "server").at(center)));
        self.counter = Some(surface.append(
            NodeSpec::text(self.counter_text()).at(Point::new(20.0, 20.0)),
        ));
        surface.append(
            NodeSpec::text("Click the red packets. Leave the green ones alone.")
                .at(Point::new(20.0, 44.0))
                .tone(Tone::Muted),
        );

        ctx.set_interval(SPAWN_EVERY, TaskTimer::Spawn);
        ctx.set_interval(MOVE_EVERY, TaskTimer::Move);
    }

    fn on_input(&mut self, event: &PointerEvent, ctx: &mut TaskContext<'_>) {
        let PointerEvent::Click { target } = event else {
            return;
        };
        if ctx.is_completed() {
            return;
        }
        if let Some(index) = self.packets.iter().position(|p| p.node == *target) {
            self.hit(index, ctx);
        }
    }

    fn on_timer(&mut self, timer: TaskTimer, ctx: &mut TaskContext<'_>) {
        if ctx.is_completed() {
            return;
        }
        match timer {
            TaskTimer::Spawn => self.spawn(ctx),
            TaskTimer::Move => self.step(ctx),
            TaskTimer::ClearFlash => {
                if let Some(server) = self.server {
                    ctx.surface().set_tone(server, Tone::Neutral);
                }
            }
            TaskTimer::Finish => {}
        }
    }
}
