//! Routable network graph.
//!
//! The graph is assembled once through [`GraphBuilder`] and is read-only
//! afterwards, so a single `&RoutableGraph` can be shared by every worker
//! thread of an analysis run.

use std::collections::HashMap;
use std::fmt;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::DistanceMetric;

/// Identifier of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Travel mode; each mode is a separate edge-cost dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walk,
    Drive,
    Transit,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [TravelMode::Walk, TravelMode::Drive, TravelMode::Transit];
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TravelMode::Walk => "walk",
            TravelMode::Drive => "drive",
            TravelMode::Transit => "transit",
        };
        f.write_str(name)
    }
}

/// One value per travel mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerMode<T> {
    pub walk: T,
    pub drive: T,
    pub transit: T,
}

impl<T> PerMode<T> {
    pub fn get(&self, mode: TravelMode) -> &T {
        match mode {
            TravelMode::Walk => &self.walk,
            TravelMode::Drive => &self.drive,
            TravelMode::Transit => &self.transit,
        }
    }

    pub fn get_mut(&mut self, mode: TravelMode) -> &mut T {
        match mode {
            TravelMode::Walk => &mut self.walk,
            TravelMode::Drive => &mut self.drive,
            TravelMode::Transit => &mut self.transit,
        }
    }
}

/// Per-mode traversal cost of an edge. `None` means the mode cannot use it.
pub type ModeCosts = PerMode<Option<f64>>;

impl ModeCosts {
    pub fn walk(cost: f64) -> Self {
        Self::default().with(TravelMode::Walk, cost)
    }

    pub fn drive(cost: f64) -> Self {
        Self::default().with(TravelMode::Drive, cost)
    }

    pub fn with(mut self, mode: TravelMode, cost: f64) -> Self {
        *self.get_mut(mode) = Some(cost);
        self
    }

    pub fn cost(&self, mode: TravelMode) -> Option<f64> {
        *self.get(mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionKind {
    Regular,
    /// Node on a primary or secondary road.
    MajorRoad,
    DeadEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub elevation: Option<f64>,
    pub intersection: Option<IntersectionKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Planar coordinate (projected metres unless a geographic metric is used).
    pub coord: Coord<f64>,
    pub attributes: NodeAttributes,
}

impl Node {
    pub fn is_major_road(&self) -> bool {
        self.attributes.intersection == Some(IntersectionKind::MajorRoad)
    }
}

/// Whether an edge has a physical footprint on the ground.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Street or path; drawn as a corridor in isochrone geometry.
    #[default]
    Road,
    /// Traversable connection without ground coverage (transit hop, ferry).
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub costs: ModeCosts,
    pub bidirectional: bool,
    pub kind: EdgeKind,
}

/// A traversal step out of a node: the edge used and the node it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub edge: usize,
    pub target: usize,
}

/// Immutable routable network.
#[derive(Debug, Clone)]
pub struct RoutableGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<NodeId, usize>,
    outgoing: Vec<Vec<Step>>,
    modes: PerMode<bool>,
}

impl RoutableGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.index
            .get(&id)
            .map(|&i| &self.nodes[i])
            .ok_or(Error::UnknownNode(id))
    }

    pub fn coord(&self, id: NodeId) -> Result<Coord<f64>> {
        self.node(id).map(|node| node.coord)
    }

    /// True when every edge carries a cost for `mode`.
    pub fn supports(&self, mode: TravelMode) -> bool {
        *self.modes.get(mode)
    }

    /// Nodes reachable from `id` over one edge, with the edge cost for `mode`.
    pub fn neighbors(&self, id: NodeId, mode: TravelMode) -> Result<Vec<(NodeId, f64)>> {
        let i = self.index_of(id)?;
        Ok(self.outgoing[i]
            .iter()
            .filter_map(|step| {
                let cost = self.edges[step.edge].costs.cost(mode)?;
                Some((self.nodes[step.target].id, cost))
            })
            .collect())
    }

    /// Cheapest direct edge cost from `from` to `to` for `mode`.
    pub fn edge_cost(&self, from: NodeId, to: NodeId, mode: TravelMode) -> Result<Option<f64>> {
        let i = self.index_of(from)?;
        let j = self.index_of(to)?;
        Ok(self.outgoing[i]
            .iter()
            .filter(|step| step.target == j)
            .filter_map(|step| self.edges[step.edge].costs.cost(mode))
            .min_by(|a, b| a.total_cmp(b)))
    }

    /// Closest node to `coord` under `metric`; ties resolve to the lower id.
    pub fn nearest_node<M: DistanceMetric + ?Sized>(&self, coord: Coord<f64>, metric: &M) -> Option<NodeId> {
        self.nodes
            .iter()
            .map(|node| (metric.distance(coord, node.coord), node.id))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Result<usize> {
        self.index.get(&id).copied().ok_or(Error::UnknownNode(id))
    }

    pub(crate) fn node_at(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn edge_at(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    pub(crate) fn steps(&self, index: usize) -> &[Step] {
        &self.outgoing[index]
    }
}

/// Collects nodes and edges and validates them into a [`RoutableGraph`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn node(mut self, id: u32, x: f64, y: f64) -> Self {
        self.add_node(Node {
            id: NodeId(id),
            coord: Coord { x, y },
            attributes: NodeAttributes::default(),
        });
        self
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Adds a bidirectional road edge.
    pub fn road(mut self, from: u32, to: u32, costs: ModeCosts) -> Self {
        self.add_edge(Edge {
            from: NodeId(from),
            to: NodeId(to),
            costs,
            bidirectional: true,
            kind: EdgeKind::Road,
        });
        self
    }

    /// Adds a one-way road edge.
    pub fn one_way(mut self, from: u32, to: u32, costs: ModeCosts) -> Self {
        self.add_edge(Edge {
            from: NodeId(from),
            to: NodeId(to),
            costs,
            bidirectional: false,
            kind: EdgeKind::Road,
        });
        self
    }

    /// Adds a bidirectional link edge (no ground footprint).
    pub fn link(mut self, from: u32, to: u32, costs: ModeCosts) -> Self {
        self.add_edge(Edge {
            from: NodeId(from),
            to: NodeId(to),
            costs,
            bidirectional: true,
            kind: EdgeKind::Link,
        });
        self
    }

    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    pub fn build(self) -> Result<RoutableGraph> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(Error::DuplicateNode(node.id));
            }
        }

        let mut outgoing = vec![Vec::new(); self.nodes.len()];
        let mut modes = PerMode {
            walk: true,
            drive: true,
            transit: true,
        };

        for (e, edge) in self.edges.iter().enumerate() {
            let from = *index.get(&edge.from).ok_or(Error::UnknownNode(edge.from))?;
            let to = *index.get(&edge.to).ok_or(Error::UnknownNode(edge.to))?;

            for mode in TravelMode::ALL {
                match edge.costs.cost(mode) {
                    Some(cost) if !cost.is_finite() || cost < 0.0 => {
                        return Err(Error::InvalidEdgeCost {
                            from: edge.from,
                            to: edge.to,
                            mode,
                            cost,
                        });
                    }
                    Some(_) => {}
                    None => *modes.get_mut(mode) = false,
                }
            }

            outgoing[from].push(Step { edge: e, target: to });
            if edge.bidirectional && from != to {
                outgoing[to].push(Step { edge: e, target: from });
            }
        }

        Ok(RoutableGraph {
            nodes: self.nodes,
            edges: self.edges,
            index,
            outgoing,
            modes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Planar;

    fn triangle() -> RoutableGraph {
        RoutableGraph::builder()
            .node(1, 0.0, 0.0)
            .node(2, 10.0, 0.0)
            .node(3, 0.0, 10.0)
            .road(1, 2, ModeCosts::walk(4.0).with(TravelMode::Drive, 1.0))
            .one_way(2, 3, ModeCosts::walk(6.0).with(TravelMode::Drive, 2.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_neighbors_respect_direction() {
        let graph = triangle();
        let from_two = graph.neighbors(NodeId(2), TravelMode::Walk).unwrap();
        assert_eq!(from_two, vec![(NodeId(1), 4.0), (NodeId(3), 6.0)]);

        let from_three = graph.neighbors(NodeId(3), TravelMode::Walk).unwrap();
        assert!(from_three.is_empty(), "one-way edge must not be traversed backwards");
    }

    #[test]
    fn test_supported_modes() {
        let graph = triangle();
        assert!(graph.supports(TravelMode::Walk));
        assert!(graph.supports(TravelMode::Drive));
        assert!(!graph.supports(TravelMode::Transit));
    }

    #[test]
    fn test_edge_cost_lookup() {
        let graph = triangle();
        assert_eq!(graph.edge_cost(NodeId(1), NodeId(2), TravelMode::Drive).unwrap(), Some(1.0));
        assert_eq!(graph.edge_cost(NodeId(3), NodeId(2), TravelMode::Drive).unwrap(), None);
        assert_eq!(
            graph.edge_cost(NodeId(9), NodeId(2), TravelMode::Drive),
            Err(Error::UnknownNode(NodeId(9)))
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let result = RoutableGraph::builder().node(1, 0.0, 0.0).node(1, 1.0, 1.0).build();
        assert_eq!(result.unwrap_err(), Error::DuplicateNode(NodeId(1)));
    }

    #[test]
    fn test_edge_to_missing_node_rejected() {
        let result = RoutableGraph::builder()
            .node(1, 0.0, 0.0)
            .road(1, 7, ModeCosts::walk(1.0))
            .build();
        assert_eq!(result.unwrap_err(), Error::UnknownNode(NodeId(7)));
    }

    #[test]
    fn test_negative_cost_rejected() {
        let result = RoutableGraph::builder()
            .node(1, 0.0, 0.0)
            .node(2, 1.0, 0.0)
            .road(1, 2, ModeCosts::walk(-1.0))
            .build();
        assert!(matches!(result, Err(Error::InvalidEdgeCost { cost, .. }) if cost == -1.0));
    }

    #[test]
    fn test_nearest_node() {
        let graph = triangle();
        assert_eq!(graph.nearest_node(Coord { x: 9.0, y: 1.0 }, &Planar), Some(NodeId(2)));
        assert_eq!(graph.nearest_node(Coord { x: 5.0, y: 0.0 }, &Planar), Some(NodeId(1)));
    }
}
