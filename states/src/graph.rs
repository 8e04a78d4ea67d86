use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Debug, Formatter},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError<T>
where
    T: Debug,
{
    #[error("Cycle detected in dependency graph, from {:?}", .0)]
    CycleDetected(DepRoute<T>),
    #[error("Duplicate edge detected in dependency graph, from {:?} to {:?}", .0.route[0], .0.route[1])]
    DuplicateEdge(DepRoute<T>),
}

pub struct DepRoute<T> {
    // first means the start node, last means the end node
    route: Vec<T>,
}

impl<T> DepRoute<T> {
    pub fn nodes(&self) -> &[T] {
        &self.route
    }
}

impl<T> Debug for DepRoute<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let len = self.route.len();
        if len == 0 {
            return write!(f, "[]");
        }
        for item in &self.route[..len - 1] {
            write!(f, "{item:?} -> ")?;
        }
        write!(f, "{:?}", self.route[len - 1])
    }
}

/// Directed graph where an edge `from -> to` means `to` reads `from`.
#[derive(Debug)]
pub struct Graph<Node>
where
    Node: Debug + PartialEq + Copy + Ord,
{
    nodes: BTreeSet<Node>,
    routes: Vec<(Node, Node)>,
}

impl<Node> Default for Graph<Node>
where
    Node: Debug + PartialEq + Copy + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Node> Graph<Node>
where
    Node: Debug + PartialEq + Copy + Ord,
{
    pub fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            routes: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node);
    }

    pub fn route_to(&mut self, from: Node, to: Node) {
        self.nodes.insert(from);
        self.nodes.insert(to);
        self.routes.push((from, to));
    }

    /// Nodes that read `node` directly.
    pub fn dependents(&self, node: Node) -> BTreeSet<Node> {
        self.routes
            .iter()
            .filter(|(from, _)| *from == node)
            .map(|(_, to)| *to)
            .collect()
    }

    /// Kahn's algorithm; every node appears after all the nodes it reads.
    pub fn topology_sort(&self) -> Result<Vec<Node>, TopologyError<Node>> {
        let mut in_degree: BTreeMap<Node, usize> =
            self.nodes.iter().map(|node| (*node, 0)).collect();
        for (from, to) in &self.routes {
            self.check_duplicate(*from, *to)?;
            if let Some(degree) = in_degree.get_mut(to) {
                *degree += 1;
            }
        }

        let mut order = Vec::with_capacity(in_degree.len());
        while !in_degree.is_empty() {
            let Some(node) = in_degree
                .iter()
                .find(|(_, degree)| **degree == 0)
                .map(|(node, _)| *node)
            else {
                let remaining: Vec<Node> = in_degree.keys().copied().collect();
                let route = self.find_cycle(&remaining).unwrap_or_default();
                return Err(TopologyError::CycleDetected(DepRoute { route }));
            };

            in_degree.remove(&node);
            for connected in self.dependents(node) {
                if let Some(degree) = in_degree.get_mut(&connected) {
                    *degree -= 1;
                }
            }
            order.push(node);
        }

        Ok(order)
    }

    fn check_duplicate(&self, from: Node, to: Node) -> Result<(), TopologyError<Node>> {
        let count = self
            .routes
            .iter()
            .filter(|(f, t)| *f == from && *t == to)
            .count();
        if count > 1 {
            return Err(TopologyError::DuplicateEdge(DepRoute {
                route: vec![from, to],
            }));
        }
        Ok(())
    }

    fn find_cycle(&self, nodes: &[Node]) -> Option<Vec<Node>> {
        // Iterative DFS restricted to the nodes Kahn could not remove
        let mut visited = BTreeSet::new();
        let mut path_set = BTreeSet::new();
        let mut path = Vec::new();
        let mut stack: Vec<(Node, std::vec::IntoIter<Node>)> = Vec::new();

        let neighbours = |node: Node| {
            self.dependents(node)
                .into_iter()
                .filter(|n| nodes.contains(n))
                .collect::<Vec<_>>()
                .into_iter()
        };

        for &start_node in nodes {
            if visited.contains(&start_node) {
                continue;
            }

            stack.push((start_node, neighbours(start_node)));
            visited.insert(start_node);
            path_set.insert(start_node);
            path.push(start_node);

            while let Some((current_node, next)) = stack.last_mut() {
                if let Some(neighbour) = next.next() {
                    if path_set.contains(&neighbour) {
                        if let Some(pos) = path.iter().position(|&x| x == neighbour) {
                            let mut cycle = path[pos..].to_vec();
                            cycle.push(neighbour);
                            return Some(cycle);
                        }
                    } else if !visited.contains(&neighbour) {
                        visited.insert(neighbour);
                        path_set.insert(neighbour);
                        path.push(neighbour);
                        stack.push((neighbour, neighbours(neighbour)));
                    }
                } else {
                    let node_to_remove = *current_node;
                    stack.pop();
                    path_set.remove(&node_to_remove);
                    path.pop();
                }
            }
        }
        None
    }
}
