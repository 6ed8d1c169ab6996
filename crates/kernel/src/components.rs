//! Connected components of the place graph (exits treated as undirected).

use placeweave_common::PlaceId;
use std::collections::VecDeque;

use crate::graph::PlaceGraph;

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

/// Component labelling of a place graph.
///
/// Components are numbered in order of their lowest place id, and members
/// are listed in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    label: Vec<usize>,
    members: Vec<Vec<PlaceId>>,
}

impl Components {
    pub fn of(graph: &PlaceGraph) -> Self {
        let n = graph.len();
        let mut uf = UnionFind::new(n);
        for place in graph.places() {
            for exit in place.exits.values() {
                // Dangling exits are ignored rather than trusted.
                if exit.to.index() < n {
                    uf.union(place.id.index(), exit.to.index());
                }
            }
        }

        let mut root_label = vec![usize::MAX; n];
        let mut label = vec![0; n];
        let mut members: Vec<Vec<PlaceId>> = Vec::new();
        for i in 0..n {
            let root = uf.find(i);
            if root_label[root] == usize::MAX {
                root_label[root] = members.len();
                members.push(Vec::new());
            }
            label[i] = root_label[root];
            members[root_label[root]].push(PlaceId(i as u32));
        }
        Self { label, members }
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_connected(&self) -> bool {
        self.members.len() <= 1
    }

    pub fn component_of(&self, id: PlaceId) -> Option<usize> {
        self.label.get(id.index()).copied()
    }

    pub fn members(&self, component: usize) -> &[PlaceId] {
        self.members.get(component).map_or(&[], Vec::as_slice)
    }

    pub fn all(&self) -> &[Vec<PlaceId>] {
        &self.members
    }

    /// Index of the largest component; ties go to the lowest index.
    pub fn largest(&self) -> Option<usize> {
        self.members
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(i, _)| i)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }
}

/// Places reachable from `start` within `max_hops`, with their hop count,
/// in breadth-first order. `start` itself is included at hop 0.
pub fn bfs_within(graph: &PlaceGraph, start: PlaceId, max_hops: u32) -> Vec<(PlaceId, u32)> {
    let mut seen = vec![false; graph.len()];
    let mut out = Vec::new();
    let Some(slot) = seen.get_mut(start.index()) else {
        return out;
    };
    *slot = true;
    let mut queue = VecDeque::from([(start, 0u32)]);
    while let Some((id, hops)) = queue.pop_front() {
        out.push((id, hops));
        if hops == max_hops {
            continue;
        }
        for next in graph.neighbors(id) {
            if let Some(flag) = seen.get_mut(next.index()) {
                if !*flag {
                    *flag = true;
                    queue.push_back((next, hops + 1));
                }
            }
        }
    }
    out
}

/// Whether `a` reaches `b` while ignoring the direct edge between them.
///
/// Used to decide if removing an exit pair would split a component.
pub fn reachable_without_edge(graph: &PlaceGraph, a: PlaceId, b: PlaceId) -> bool {
    let mut seen = vec![false; graph.len()];
    let Some(slot) = seen.get_mut(a.index()) else {
        return false;
    };
    *slot = true;
    let mut queue = VecDeque::from([a]);
    while let Some(id) = queue.pop_front() {
        for next in graph.neighbors(id) {
            if (id == a && next == b) || (id == b && next == a) {
                continue;
            }
            if next == b {
                return true;
            }
            if let Some(flag) = seen.get_mut(next.index()) {
                if !*flag {
                    *flag = true;
                    queue.push_back(next);
                }
            }
        }
    }
    false
}
