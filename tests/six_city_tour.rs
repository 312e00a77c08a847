mod common;

use std::sync::Arc;

use common::{init_logging, six_cities, strings};
use letsroute::{
    solve_tour, DirectedArc, DriverConfig, DriverState, MicroLpSolver, RoutingModel,
    SolverService, SubtourEliminationDriver,
};

fn microlp() -> Arc<dyn SolverService> {
    Arc::new(MicroLpSolver::new())
}

fn decomposition(model: &RoutingModel) -> Vec<Vec<String>> {
    let solution = model.problem().solve(&MicroLpSolver::new()).unwrap();
    let successors = model.successors(&solution).unwrap();
    model
        .cycles(&successors)
        .iter()
        .map(|c| model.names_of(c))
        .collect()
}

#[test]
fn hand_added_cuts_follow_the_corpus() {
    init_logging();
    let (nodes, arcs) = six_cities();
    let mut model = RoutingModel::create(&nodes, &arcs).unwrap();

    model.add_subtour_cut(&["A", "D", "F"]).unwrap();
    model.add_subtour_cut(&["B", "C", "E"]).unwrap();
    // the cheapest permutation left is unique: three 2-cycles at cost 22
    assert_eq!(
        decomposition(&model),
        strings(&[&["A", "F"], &["B", "D"], &["C", "E"]])
    );

    model.add_subtour_cut(&["A", "F"]).unwrap();
    model.add_subtour_cut(&["B", "D"]).unwrap();
    model.add_subtour_cut(&["C", "E"]).unwrap();
    let cycles = decomposition(&model);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 6);
}

#[test]
fn driver_finds_the_optimal_tour() {
    let (nodes, arcs) = six_cities();
    let report = solve_tour(&nodes, &arcs, microlp(), DriverConfig::default()).unwrap();

    assert!((report.total_cost - 33.0).abs() < 1e-6);
    assert_eq!(report.tour[0], "A");
    let mut visited = report.tour.clone();
    visited.sort();
    assert_eq!(visited, nodes);
    assert!(report.iterations >= 2);
    assert!(report.history.last().unwrap().is_tour());
}

#[test]
fn every_assignment_is_a_permutation() {
    let (nodes, arcs) = six_cities();
    let model = RoutingModel::create(&nodes, &arcs).unwrap();
    let mut driver = SubtourEliminationDriver::new(model, microlp());
    let report = driver.run().unwrap();

    for iteration in &report.history {
        let mut covered: Vec<&String> = iteration.cycles.iter().flatten().collect();
        covered.sort();
        covered.dedup();
        assert_eq!(covered.len(), nodes.len());
        assert!(iteration.cycles.iter().all(|c| c.len() >= 2));
    }
}

#[test]
fn resolving_a_converged_model_is_stable() {
    let (nodes, arcs) = six_cities();
    let model = RoutingModel::create(&nodes, &arcs).unwrap();
    let mut driver = SubtourEliminationDriver::new(model, microlp());
    let report = driver.run().unwrap();
    assert_eq!(driver.state(), DriverState::Converged);

    let model = driver.into_model();
    let first = model.problem().solve(&MicroLpSolver::new()).unwrap();
    let second = model.problem().solve(&MicroLpSolver::new()).unwrap();
    assert_eq!(
        model.successors(&first).unwrap(),
        model.successors(&second).unwrap()
    );
    assert!((first.optimal_value.unwrap() - report.total_cost).abs() < 1e-6);
    assert!((second.optimal_value.unwrap() - report.total_cost).abs() < 1e-6);
}

#[test]
fn runs_are_deterministic() {
    let (nodes, arcs) = six_cities();
    let first = solve_tour(&nodes, &arcs, microlp(), DriverConfig::default()).unwrap();
    let second = solve_tour(&nodes, &arcs, microlp(), DriverConfig::default()).unwrap();

    let cycles = |r: &letsroute::TourReport| -> Vec<Vec<Vec<String>>> {
        r.history.iter().map(|i| i.cycles.clone()).collect()
    };
    assert_eq!(cycles(&first), cycles(&second));
    assert_eq!(first.tour, second.tour);
}

#[test]
fn two_nodes_converge_without_cuts() {
    let arcs = vec![DirectedArc::new("x", "y", 2.0), DirectedArc::new("y", "x", 3.0)];
    let model = RoutingModel::create(&["x", "y"], &arcs).unwrap();
    let mut driver = SubtourEliminationDriver::new(model, microlp());

    let report = driver.run().unwrap();
    assert_eq!(report.tour, ["x", "y"]);
    assert!((report.total_cost - 5.0).abs() < 1e-9);
    assert_eq!(report.iterations, 1);
    assert_eq!(driver.model().num_cuts(), 0);
}

#[test]
fn disconnected_graph_is_exhausted() {
    // two separate pairs: neither can be left, so the first cut already
    // proves there is no tour
    let arcs = vec![
        DirectedArc::new("a", "b", 1.0),
        DirectedArc::new("b", "a", 1.0),
        DirectedArc::new("c", "d", 1.0),
        DirectedArc::new("d", "c", 1.0),
    ];
    let result = solve_tour(&["a", "b", "c", "d"], &arcs, microlp(), DriverConfig::default());
    match result {
        Err(letsroute::TourError::Driver(e)) => {
            assert_eq!(e.iteration(), 1);
            assert!(e.last_decomposition().is_some());
        }
        other => panic!("unexpected: {:?}", other),
    }
}
