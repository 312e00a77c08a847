//! Routing assignment model: one binary variable per allowed arc, one
//! outgoing and one incoming arc per node, minimum total cost.

use std::collections::HashMap;

use super::cycles;
use super::models::{
    Constraint, LinearExpression, OptimizationProblem, Solution, Variable, VariableId,
};
use super::value_objects::{ConstraintType, OptimizationType};

/// Assignment variables at or above this value count as selected.
pub const SELECTION_THRESHOLD: f64 = 0.5;

/// Directed connection between two nodes with a travel cost
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedArc {
    pub tail: String,
    pub head: String,
    pub cost: f64,
}

impl DirectedArc {
    pub fn new(tail: impl Into<String>, head: impl Into<String>, cost: f64) -> Self {
        Self {
            tail: tail.into(),
            head: head.into(),
            cost,
        }
    }
}

/// Input graph rejected before any solve
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("node set is empty")]
    EmptyNodeSet,

    #[error("node '{0}' is listed more than once")]
    DuplicateNode(String),

    #[error("arc {tail}->{head} references unknown node '{missing}'")]
    UnknownNode {
        tail: String,
        head: String,
        missing: String,
    },

    #[error("'{0}' is not a node of this model")]
    NotANode(String),

    #[error("arc {0}->{0} is a self-loop")]
    SelfLoop(String),

    #[error("arc {tail}->{head} has invalid cost {cost}")]
    InvalidCost { tail: String, head: String, cost: f64 },

    #[error("arc {tail}->{head} is listed more than once")]
    DuplicateArc { tail: String, head: String },

    #[error("node '{0}' has no outgoing arc")]
    NoOutgoingArc(String),

    #[error("node '{0}' has no incoming arc")]
    NoIncomingArc(String),

    #[error("no arc leaves node set {0:?}")]
    NoLeavingArc(Vec<String>),
}

/// Assignment that is not a permutation of the node set
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("node '{node}' has {outgoing} outgoing and {incoming} incoming selected arcs")]
pub struct PermutationViolation {
    pub node: String,
    pub outgoing: usize,
    pub incoming: usize,
}

#[derive(Debug, Clone)]
struct ArcEntry {
    tail: usize,
    head: usize,
    cost: f64,
    variable: VariableId,
}

/// Routing-style binary assignment model
///
/// Forbidden moves are simply absent: only the arcs handed to
/// [`RoutingModel::create`] get a variable. Cuts are appended after the
/// base constraints and never removed.
#[derive(Debug, Clone)]
pub struct RoutingModel {
    nodes: Vec<String>,
    node_index: HashMap<String, usize>,
    arcs: Vec<ArcEntry>,
    arc_index: HashMap<(usize, usize), usize>,
    problem: OptimizationProblem,
    base_constraints: usize,
}

impl RoutingModel {
    /// Build the assignment model for `nodes` over the allowed `arcs`.
    ///
    /// Arcs with an infinite cost are treated as forbidden and skipped.
    pub fn create<S: AsRef<str>>(
        nodes: &[S],
        arcs: &[DirectedArc],
    ) -> Result<Self, TopologyError> {
        if nodes.is_empty() {
            return Err(TopologyError::EmptyNodeSet);
        }

        let mut node_index = HashMap::with_capacity(nodes.len());
        let names: Vec<String> = nodes.iter().map(|n| n.as_ref().to_string()).collect();
        for (i, name) in names.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(TopologyError::DuplicateNode(name.clone()));
            }
        }

        let mut entries: Vec<(usize, usize, f64)> = Vec::with_capacity(arcs.len());
        let mut arc_index = HashMap::with_capacity(arcs.len());
        for arc in arcs {
            let lookup = |name: &str| {
                node_index
                    .get(name)
                    .copied()
                    .ok_or_else(|| TopologyError::UnknownNode {
                        tail: arc.tail.clone(),
                        head: arc.head.clone(),
                        missing: name.to_string(),
                    })
            };
            let tail = lookup(&arc.tail)?;
            let head = lookup(&arc.head)?;

            if tail == head {
                return Err(TopologyError::SelfLoop(arc.tail.clone()));
            }
            if arc.cost.is_nan() || arc.cost < 0.0 {
                return Err(TopologyError::InvalidCost {
                    tail: arc.tail.clone(),
                    head: arc.head.clone(),
                    cost: arc.cost,
                });
            }
            if arc.cost == f64::INFINITY {
                log::debug!("arc {}->{} has infinite cost, excluded", arc.tail, arc.head);
                continue;
            }
            if arc_index.insert((tail, head), entries.len()).is_some() {
                return Err(TopologyError::DuplicateArc {
                    tail: arc.tail.clone(),
                    head: arc.head.clone(),
                });
            }
            entries.push((tail, head, arc.cost));
        }

        let mut outgoing = vec![0usize; names.len()];
        let mut incoming = vec![0usize; names.len()];
        for &(tail, head, _) in &entries {
            outgoing[tail] += 1;
            incoming[head] += 1;
        }
        for (i, name) in names.iter().enumerate() {
            if outgoing[i] == 0 {
                return Err(TopologyError::NoOutgoingArc(name.clone()));
            }
            if incoming[i] == 0 {
                return Err(TopologyError::NoIncomingArc(name.clone()));
            }
        }

        let mut problem = OptimizationProblem::new()
            .with_name("routing")
            .with_description(format!("{} nodes, {} arcs", names.len(), entries.len()));
        let arcs: Vec<ArcEntry> = entries
            .into_iter()
            .map(|(tail, head, cost)| ArcEntry {
                tail,
                head,
                cost,
                variable: problem.add_variable(Variable::binary(format!(
                    "y[{},{}]",
                    names[tail], names[head]
                ))),
            })
            .collect();

        for (i, name) in names.iter().enumerate() {
            let leaving = LinearExpression::sum(
                arcs.iter().filter(|a| a.tail == i).map(|a| a.variable),
            );
            problem.push_constraint(
                Constraint::new(ConstraintType::Equal, leaving, 1.0)
                    .with_name(format!("out[{}]", name)),
            );
        }
        for (i, name) in names.iter().enumerate() {
            let entering = LinearExpression::sum(
                arcs.iter().filter(|a| a.head == i).map(|a| a.variable),
            );
            problem.push_constraint(
                Constraint::new(ConstraintType::Equal, entering, 1.0)
                    .with_name(format!("in[{}]", name)),
            );
        }

        problem.set_objective(
            arcs.iter().map(|a| (a.variable, a.cost)).collect(),
            OptimizationType::Minimize,
        );
        let base_constraints = problem.num_constraints();

        Ok(Self {
            nodes: names,
            node_index,
            arcs,
            arc_index,
            problem,
            base_constraints,
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_index.get(name).copied()
    }

    /// Assignment variable of arc `tail -> head`, if that arc is allowed.
    pub fn arc_variable(&self, tail: &str, head: &str) -> Option<VariableId> {
        let key = (self.node_index(tail)?, self.node_index(head)?);
        self.arc_index.get(&key).map(|&i| self.arcs[i].variable)
    }

    pub fn problem(&self) -> &OptimizationProblem {
        &self.problem
    }

    pub fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }

    pub fn num_cuts(&self) -> usize {
        self.problem.num_constraints() - self.base_constraints
    }

    /// Forbid the subtour over the named nodes: at least one selected arc
    /// must leave the set. Returns the position of the new constraint.
    pub fn add_subtour_cut<S: AsRef<str>>(&mut self, nodes: &[S]) -> Result<usize, TopologyError> {
        let indices = nodes
            .iter()
            .map(|n| {
                self.node_index(n.as_ref())
                    .ok_or_else(|| TopologyError::NotANode(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.add_cut_for(&indices)
    }

    pub(crate) fn add_cut_for(&mut self, cycle: &[usize]) -> Result<usize, TopologyError> {
        let mut inside = vec![false; self.nodes.len()];
        for &i in cycle {
            inside[i] = true;
        }

        let leaving = LinearExpression::sum(
            self.arcs
                .iter()
                .filter(|a| inside[a.tail] && !inside[a.head])
                .map(|a| a.variable),
        );
        if leaving.is_empty() {
            return Err(TopologyError::NoLeavingArc(self.names_of(cycle)));
        }

        let name = format!("cut[{}]", self.names_of(cycle).join(","));
        log::debug!("adding {} over {} leaving arcs", name, leaving.len());
        Ok(self.problem.push_constraint(
            Constraint::new(ConstraintType::GreaterThanOrEqual, leaving, 1.0).with_name(name),
        ))
    }

    /// Decode an assignment into a successor vector indexed like `nodes()`.
    pub fn successors(&self, solution: &Solution) -> Result<Vec<usize>, PermutationViolation> {
        let n = self.nodes.len();
        let mut successors = vec![usize::MAX; n];
        let mut outgoing = vec![0usize; n];
        let mut incoming = vec![0usize; n];

        for arc in &self.arcs {
            if solution.value(arc.variable) >= SELECTION_THRESHOLD {
                successors[arc.tail] = arc.head;
                outgoing[arc.tail] += 1;
                incoming[arc.head] += 1;
            }
        }

        for i in 0..n {
            if outgoing[i] != 1 || incoming[i] != 1 {
                return Err(PermutationViolation {
                    node: self.nodes[i].clone(),
                    outgoing: outgoing[i],
                    incoming: incoming[i],
                });
            }
        }

        Ok(successors)
    }

    /// Cycles of a decoded assignment, as node indices.
    pub fn cycles(&self, successors: &[usize]) -> Vec<Vec<usize>> {
        cycles::decompose(successors)
    }

    pub fn names_of(&self, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| self.nodes[i].clone()).collect()
    }

    /// Cost of the closed walk through `tour` (back to its first node),
    /// `None` if it uses a missing arc.
    pub fn tour_cost(&self, tour: &[usize]) -> Option<f64> {
        if tour.is_empty() {
            return Some(0.0);
        }
        (0..tour.len())
            .map(|i| {
                let key = (tour[i], tour[(i + 1) % tour.len()]);
                self.arc_index.get(&key).map(|&a| self.arcs[a].cost)
            })
            .sum()
    }
}
