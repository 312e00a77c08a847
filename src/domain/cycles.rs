// Cycle decomposition of a successor permutation

/// Split a successor vector into its disjoint cycles.
///
/// Walks start from the lowest unvisited index, so both the order of the
/// cycles and the first element of each cycle are deterministic. A walk
/// stops when it reaches a visited index, which for a permutation is
/// always the start of the walk.
pub fn decompose(successors: &[usize]) -> Vec<Vec<usize>> {
    let mut visited = vec![false; successors.len()];
    let mut cycles = Vec::new();

    for start in 0..successors.len() {
        if visited[start] {
            continue;
        }

        let mut cycle = Vec::new();
        let mut current = start;
        while current < successors.len() && !visited[current] {
            visited[current] = true;
            cycle.push(current);
            current = successors[current];
        }
        cycles.push(cycle);
    }

    cycles
}

/// Whether `successors` forms a single cycle through every index.
pub fn is_hamiltonian(successors: &[usize]) -> bool {
    let cycles = decompose(successors);
    cycles.len() == 1 && cycles[0].len() == successors.len()
}
