//! Discovery of the data dependencies between components.
//!
//! Components are coupled by name: every output feeds all the inputs with the same name.
//! Inputs which are not produced by any component are external to the system.

use crate::adapter::ComponentAdapter;
use crate::errors::{CosimError, CosimResult};
use crate::state::Shape;
use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::Graph;
use serde::{Deserialize, Serialize};

/// A variable flowing from a producer to a consumer
///
/// Components are referred to by their declared index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingEdge {
    pub producer: usize,
    pub consumer: usize,
    pub variable: String,
}

pub type CGraph = Graph<usize, CouplingEdge>;

/// Directed graph of the couplings between components
///
/// Node `i` is the `i`-th declared component.
/// Edges are inserted in declaration order so every ordering derived from the graph is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingGraph {
    graph: CGraph,
    names: Vec<String>,
    /// Producer and shape of every output
    producers: IndexMap<String, (usize, Shape)>,
    /// Inputs that no component produces
    external: IndexMap<String, Shape>,
}

impl CouplingGraph {
    /// Build the coupling graph of a set of components
    ///
    /// Fails if an output is produced by more than one component or if coupled values
    /// disagree on their shape.
    pub fn build(components: &[ComponentAdapter]) -> CosimResult<Self> {
        let mut graph = CGraph::new();
        let mut producers: IndexMap<String, (usize, Shape)> = IndexMap::new();
        let mut external: IndexMap<String, Shape> = IndexMap::new();

        for (index, component) in components.iter().enumerate() {
            graph.add_node(index);
            for output in component.outputs() {
                if let Some((first, _)) = producers.get(&output.name) {
                    return Err(CosimError::DuplicateOutput {
                        variable: output.name.clone(),
                        first: components[*first].name().to_string(),
                        second: component.name().to_string(),
                    });
                }
                producers.insert(output.name.clone(), (index, output.shape));
            }
        }

        for (consumer, component) in components.iter().enumerate() {
            for input in component.inputs() {
                match producers.get(&input.name) {
                    Some((producer, shape)) => {
                        if *shape != input.shape {
                            return Err(CosimError::ShapeMismatch {
                                component: component.name().to_string(),
                                variable: input.name.clone(),
                                expected: *shape,
                                got: input.shape,
                            });
                        }
                        graph.add_edge(
                            NodeIndex::new(*producer),
                            NodeIndex::new(consumer),
                            CouplingEdge {
                                producer: *producer,
                                consumer,
                                variable: input.name.clone(),
                            },
                        );
                    }
                    None => match external.get(&input.name) {
                        Some(shape) if *shape != input.shape => {
                            return Err(CosimError::ShapeMismatch {
                                component: component.name().to_string(),
                                variable: input.name.clone(),
                                expected: *shape,
                                got: input.shape,
                            });
                        }
                        Some(_) => {}
                        None => {
                            external.insert(input.name.clone(), input.shape);
                        }
                    },
                }
            }
        }

        Ok(Self {
            graph,
            names: components.iter().map(|c| c.name().to_string()).collect(),
            producers,
            external,
        })
    }

    pub fn graph(&self) -> &CGraph {
        &self.graph
    }

    pub fn n_components(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether a variable is produced by one of the components
    pub fn is_coupled(&self, variable: &str) -> bool {
        self.producers.contains_key(variable)
    }

    pub fn producer_of(&self, variable: &str) -> Option<usize> {
        self.producers.get(variable).map(|(index, _)| *index)
    }

    /// Every output of the system with its shape, in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = (&String, Shape)> {
        self.producers.iter().map(|(name, (_, shape))| (name, *shape))
    }

    /// Inputs which must be provided from outside the system
    pub fn external_inputs(&self) -> &IndexMap<String, Shape> {
        &self.external
    }

    pub fn has_self_loop(&self, component: usize) -> bool {
        let node = NodeIndex::new(component);
        self.graph.contains_edge(node, node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &CouplingEdge> {
        self.graph.edge_weights()
    }

    /// Variables exchanged between members of `components`
    pub fn internal_variables(&self, components: &[usize]) -> Vec<String> {
        let mut variables: Vec<String> = vec![];
        for edge in self.graph.edge_references() {
            let edge = edge.weight();
            if components.contains(&edge.producer)
                && components.contains(&edge.consumer)
                && !variables.contains(&edge.variable)
            {
                variables.push(edge.variable.clone());
            }
        }
        variables
    }

    /// A Graphviz description of the couplings
    ///
    /// Useful for debugging.
    pub fn as_dot(&self) -> String {
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, er| format!("label = {:?}", er.weight().variable),
                &|_, (_, index)| {
                    let name = self.names.get(*index).map(String::as_str).unwrap_or("?");
                    format!("label = {:?}", name)
                },
            )
        )
    }
}
