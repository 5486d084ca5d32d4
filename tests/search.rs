use mapf_whca::algorithm::{BiAStar, BiDijkstra, Dijkstra, PathFinder};
use mapf_whca::env::Environment;
use mapf_whca::graph::Graph;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE: f64 = 1e-5;

// Random planar graph whose edge costs are at least the Euclidean distance of
// their endpoints, so the coordinate heuristic is admissible and consistent.
fn random_graph(rng: &mut StdRng, size: usize, edges: usize, directed: bool) -> Graph {
    let coordinates: Vec<Vec<f64>> = (0..size)
        .map(|_| vec![rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)])
        .collect();
    let mut graph = Graph::new(size, directed);
    for _ in 0..edges {
        let from = rng.gen_range(0..size);
        let to = rng.gen_range(0..size);
        if from == to {
            continue;
        }
        let euclidean = coordinates[from]
            .iter()
            .zip(&coordinates[to])
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        let cost = euclidean * rng.gen_range(1.0..2.0);
        graph.add_edge(from, to, cost).unwrap();
    }
    graph.set_coordinates(coordinates).unwrap();
    graph
}

fn path_cost(graph: &Graph, path: &[usize]) -> f64 {
    graph.calculate_cost(path).expect("path uses a missing edge")
}

#[test]
fn test_bidirectional_searches_match_dijkstra() {
    let mut rng = StdRng::seed_from_u64(42);
    for directed in [false, true] {
        for _ in 0..5 {
            let graph = random_graph(&mut rng, 30, 80, directed);
            let mut reference = Dijkstra::new(&graph);
            let mut bi_a_star = BiAStar::new(&graph);
            let mut bi_dijkstra = BiDijkstra::new(&graph);

            for start in 0..graph.size() {
                for end in 0..graph.size() {
                    let expected = reference.find_path(start, end);
                    let a_star_path = bi_a_star.find_path(start, end);
                    let dijkstra_path = bi_dijkstra.find_path(start, end);

                    if expected.is_empty() {
                        assert!(a_star_path.is_empty(), "{start} -> {end}");
                        assert!(dijkstra_path.is_empty(), "{start} -> {end}");
                        continue;
                    }

                    let expected_cost = path_cost(&graph, &expected);
                    for path in [&a_star_path, &dijkstra_path] {
                        assert_eq!(path.first(), Some(&start));
                        assert_eq!(path.last(), Some(&end));
                        assert!((path_cost(&graph, path) - expected_cost).abs() < TOLERANCE);
                    }
                }
            }
        }
    }
}

#[test]
fn test_zero_heuristic_bi_a_star_matches_dijkstra() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut graph = Graph::new(25, false);
    for _ in 0..60 {
        let from = rng.gen_range(0..25);
        let to = rng.gen_range(0..25);
        graph.add_edge(from, to, rng.gen_range(0.0..5.0)).unwrap();
    }

    let mut reference = Dijkstra::new(&graph);
    let mut bi_a_star = BiAStar::new(&graph);
    for start in 0..25 {
        for end in 0..25 {
            let expected = reference.find_path(start, end);
            let path = bi_a_star.find_path(start, end);
            assert_eq!(expected.is_empty(), path.is_empty());
            if !path.is_empty() {
                assert!((path_cost(&graph, &path) - path_cost(&graph, &expected)).abs() < TOLERANCE);
            }
        }
    }
}

#[test]
fn test_unit_cost_path_length_matches_distance() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut graph = Graph::new(40, false);
    for node in 1..40 {
        // Spanning tree keeps everything connected, extra edges add shortcuts.
        graph.add_edge(node, rng.gen_range(0..node), 1.0).unwrap();
    }
    for _ in 0..30 {
        graph
            .add_edge(rng.gen_range(0..40), rng.gen_range(0..40), 1.0)
            .unwrap();
    }

    let mut bi_dijkstra = BiDijkstra::new(&graph);
    let mut bi_a_star = BiAStar::new(&graph);
    for start in 0..40 {
        for end in 0..40 {
            for path in [bi_dijkstra.find_path(start, end), bi_a_star.find_path(start, end)] {
                assert!(path.windows(2).all(|step| graph.adjacent(step[0], step[1])));
                assert_eq!((path.len() - 1) as f64, path_cost(&graph, &path));
            }
            assert_eq!(bi_dijkstra.stats().costs, bi_a_star.stats().costs);
        }
    }
}

#[test]
fn test_undirected_symmetry() {
    let mut rng = StdRng::seed_from_u64(11);
    let graph = random_graph(&mut rng, 30, 70, false);
    let mut bi_a_star = BiAStar::new(&graph);
    let mut bi_dijkstra = BiDijkstra::new(&graph);

    for start in 0..graph.size() {
        for end in start + 1..graph.size() {
            let forward = bi_a_star.find_path(start, end);
            let backward = bi_a_star.find_path(end, start);
            assert_eq!(forward.is_empty(), backward.is_empty());
            if forward.is_empty() {
                continue;
            }
            let forward_cost = path_cost(&graph, &forward);
            assert!((forward_cost - path_cost(&graph, &backward)).abs() < TOLERANCE);

            let backward = bi_dijkstra.find_path(end, start);
            assert!((forward_cost - path_cost(&graph, &backward)).abs() < TOLERANCE);
        }
    }
}
