use crate::db::indices::*;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum LayerDirection {
    Vertical,
    Horizontal,
}

#[derive(Clone, Debug)]
pub struct LayerData {
    pub name: String,
    pub index: u8,
    pub direction: LayerDirection,
}

/// A straight wire on one layer, or a via when `p1 == p2` (connecting `layer` and `layer + 1`).
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSegment {
    pub layer: u8,
    pub p1: Point<f64>,
    pub p2: Point<f64>,
}

impl RouteSegment {
    pub fn is_via(&self) -> bool {
        (self.p1.x - self.p2.x).abs() < 1e-9 && (self.p1.y - self.p2.y).abs() < 1e-9
    }
}

/// One point-to-point connection request in host units.
#[derive(Clone, Debug)]
pub struct RawSegment {
    pub id: SegmentId,
    pub net: NetId,
    pub start: Point<f64>,
    pub end: Point<f64>,
    pub start_layer: u8,
    pub end_layer: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NetStatus {
    #[default]
    Pending,
    Routed,
    Unroutable,
    NotReached,
}

impl NetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            NetStatus::Pending => "PENDING",
            NetStatus::Routed => "ROUTED",
            NetStatus::Unroutable => "UNROUTABLE",
            NetStatus::NotReached => "NOT_REACHED",
        }
    }
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
    pub segments: Vec<SegmentId>,
    pub route_segments: Vec<RouteSegment>,
    pub status: NetStatus,
}

#[derive(Clone, Debug)]
pub struct Blockage {
    pub layer: u8,
    pub rect: Rect,
}

pub struct DesignDB {
    pub layers: Vec<LayerData>,
    pub nets: Vec<NetData>,
    pub segments: Vec<RawSegment>,
    pub blockages: Vec<Blockage>,
    pub die_area: Rect,

    pub net_name_map: HashMap<String, NetId>,
    pub layer_name_map: HashMap<String, u8>,
}

impl DesignDB {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            nets: Vec::with_capacity(1000),
            segments: Vec::with_capacity(5000),
            blockages: Vec::new(),
            die_area: Rect::default(),
            net_name_map: HashMap::new(),
            layer_name_map: HashMap::new(),
        }
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Appends a layer whose direction alternates with its index (M1 horizontal, M2 vertical, ...).
    pub fn add_layer(&mut self, name: String) -> u8 {
        let idx = self.layers.len() as u8;
        let direction = if idx % 2 == 0 {
            LayerDirection::Horizontal
        } else {
            LayerDirection::Vertical
        };
        self.layer_name_map.insert(name.clone(), idx);
        self.layers.push(LayerData {
            name,
            index: idx,
            direction,
        });
        idx
    }

    pub fn add_net(&mut self, name: String) -> NetId {
        if let Some(&id) = self.net_name_map.get(&name) {
            return id;
        }
        let id = NetId::new(self.nets.len());
        self.nets.push(NetData {
            name: name.clone(),
            segments: Vec::new(),
            route_segments: Vec::new(),
            status: NetStatus::Pending,
        });
        self.net_name_map.insert(name, id);
        id
    }

    pub fn add_segment(
        &mut self,
        net: NetId,
        start: Point<f64>,
        start_layer: u8,
        end: Point<f64>,
        end_layer: u8,
    ) -> SegmentId {
        let id = SegmentId::new(self.segments.len());
        self.segments.push(RawSegment {
            id,
            net,
            start,
            end,
            start_layer,
            end_layer,
        });
        self.nets[net.index()].segments.push(id);
        id
    }

    pub fn add_blockage(&mut self, layer: u8, rect: Rect) {
        self.blockages.push(Blockage { layer, rect });
    }

    pub fn layer_name(&self, layer: u8) -> String {
        self.layers
            .get(layer as usize)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("M{}", layer + 1))
    }
}

impl Default for DesignDB {
    fn default() -> Self {
        Self::new()
    }
}
