//! Execution order of the components.
//!
//! The coupling graph is split into strongly connected groups which are then sorted
//! topologically.
//! Groups with no ordering constraint between them keep the order in which their
//! components were declared.

use crate::graph::CouplingGraph;
use log::debug;
use petgraph::algo::tarjan_scc;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    /// A single component which does not depend on itself
    Sequential,
    /// Components whose outputs mutually depend on each other
    Cyclic,
}

/// A strongly connected set of components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Declared indices of the components, in declaration order
    pub members: Vec<usize>,
    pub kind: GroupKind,
}

impl Group {
    pub fn is_cyclic(&self) -> bool {
        self.kind == GroupKind::Cyclic
    }
}

/// Topologically sorted groups
///
/// Every coupling between two groups goes from an earlier group to a later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    groups: Vec<Group>,
    /// Position in `groups` of the group holding each component
    positions: Vec<usize>,
}

impl ExecutionOrder {
    pub fn from_graph(graph: &CouplingGraph) -> Self {
        let n_components = graph.n_components();

        let mut components: Vec<Group> = tarjan_scc(graph.graph())
            .into_iter()
            .map(|scc| {
                let mut members: Vec<usize> =
                    scc.iter().map(|node| graph.graph()[*node]).collect();
                members.sort_unstable();
                let kind = if members.len() > 1 || graph.has_self_loop(members[0]) {
                    GroupKind::Cyclic
                } else {
                    GroupKind::Sequential
                };
                Group { members, kind }
            })
            .collect();
        // Number groups by their first declared member so ties are broken by declaration
        components.sort_by_key(|group| group.members[0]);

        let mut group_of = vec![0; n_components];
        for (index, group) in components.iter().enumerate() {
            for member in &group.members {
                group_of[*member] = index;
            }
        }

        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        let mut in_degree = vec![0usize; components.len()];
        for edge in graph.edges() {
            let (from, to) = (group_of[edge.producer], group_of[edge.consumer]);
            if from != to && successors[from].insert(to) {
                in_degree[to] += 1;
            }
        }

        // Kahn's algorithm, always releasing the earliest declared group first
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();
        let mut sorted = Vec::with_capacity(components.len());
        while let Some(Reverse(index)) = ready.pop() {
            sorted.push(index);
            for next in &successors[index] {
                in_degree[*next] -= 1;
                if in_degree[*next] == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }

        let mut positions = vec![0; n_components];
        let mut groups = Vec::with_capacity(sorted.len());
        for (position, index) in sorted.into_iter().enumerate() {
            let group = components[index].clone();
            for member in &group.members {
                positions[*member] = position;
            }
            groups.push(group);
        }

        debug!("Execution order: {:?}", groups);
        Self { groups, positions }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Position of the group holding a component
    pub fn position_of(&self, component: usize) -> Option<usize> {
        self.positions.get(component).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }
}
