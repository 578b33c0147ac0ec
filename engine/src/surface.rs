use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(self) -> Point {
        Point::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(800, 500)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Text,
    Button,
    Token,
    Tile,
    Sprite,
    Line,
    Indicator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tone {
    #[default]
    Neutral,
    Accent,
    Success,
    Error,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub text: String,
    pub pos: Option<Point>,
    /// Second endpoint, only meaningful for [`NodeKind::Line`].
    pub end: Option<Point>,
    pub tone: Tone,
    pub opacity: f32,
    pub struck: bool,
    pub enabled: bool,
    pub group: u32,
    pub hint: Option<String>,
}

/// Description of a node to append; see [`Surface::append`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    kind: NodeKind,
    text: String,
    pos: Option<Point>,
    end: Option<Point>,
    tone: Tone,
    enabled: bool,
    group: u32,
    hint: Option<String>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            pos: None,
            end: None,
            tone: Tone::Neutral,
            enabled: true,
            group: 0,
            hint: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, text)
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Button, label)
    }

    pub fn line(from: Point, to: Point) -> Self {
        Self {
            pos: Some(from),
            end: Some(to),
            ..Self::new(NodeKind::Line, "")
        }
    }

    pub fn at(mut self, pos: Point) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// The render surface a mounted scene draws into.
///
/// This is a retained list of nodes, in paint order, that a front end turns
/// into whatever it likes (DOM elements, sprites, terminal cells). Node ids
/// are never reused for the lifetime of the surface, so a stale id held by a
/// torn-down scene can't alias a new node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    size: SurfaceSize,
    nodes: Vec<Node>,
    next_id: u32,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(SurfaceSize::default())
    }
}

impl Surface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            nodes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node {
            id,
            kind: spec.kind,
            text: spec.text,
            pos: spec.pos,
            end: spec.end,
            tone: spec.tone,
            opacity: 1.0,
            struck: false,
            enabled: spec.enabled,
            group: spec.group,
            hint: spec.hint,
        });
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.into();
        }
    }

    pub fn set_tone(&mut self, id: NodeId, tone: Tone) {
        if let Some(node) = self.node_mut(id) {
            node.tone = tone;
        }
    }

    pub fn set_pos(&mut self, id: NodeId, pos: Point) {
        if let Some(node) = self.node_mut(id) {
            node.pos = Some(pos);
        }
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) {
        if let Some(node) = self.node_mut(id) {
            node.enabled = enabled;
        }
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        before != self.nodes.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn texts_of(&self, kind: NodeKind) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.text.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut s = Surface::default();
        let a = s.append(NodeSpec::text("a"));
        s.clear();
        let b = s.append(NodeSpec::text("b"));
        assert_ne!(a, b);
        assert!(!s.contains(a));
        assert!(s.contains(b));
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let mut s = Surface::default();
        let id = s.append(NodeSpec::button("ok"));
        assert!(s.remove(id));
        assert!(!s.remove(id));
        assert!(s.is_empty());
    }

    #[test]
    fn line_spec_sets_both_endpoints() {
        let mut s = Surface::default();
        let id = s.append(NodeSpec::line(Point::new(1.0, 2.0), Point::new(3.0, 4.0)));
        let node = s.node(id).unwrap();
        assert_eq!(node.kind, NodeKind::Line);
        assert_eq!(node.pos, Some(Point::new(1.0, 2.0)));
        assert_eq!(node.end, Some(Point::new(3.0, 4.0)));
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0);
    }
}
