//! Property tests for tree reconciliation over randomly generated threads.
//!
//! Each property is checked against many seeded random trees, so failures
//! are reproducible from the printed seed.

use anonium::comments::tree::{collect_ids, count_descendants, count_nodes, flatten};
use anonium::comments::{build_tree, merge_comment_trees, Comment, CommentId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CASES: u64 = 200;

/// Random flat thread: every node's parent is an earlier node or none.
fn random_flat(rng: &mut StdRng, max_nodes: u64) -> Vec<Comment> {
    let n = rng.gen_range(1..=max_nodes);
    (1..=n)
        .map(|id| {
            let parent = if id > 1 && rng.gen_bool(0.7) {
                Some(rng.gen_range(1..id))
            } else {
                None
            };
            let mut node = Comment::new(id, parent).with_body(format!("body {}", id));
            node.children_count = rng.gen_range(0..6);
            node.score = rng.gen_range(-5..20);
            node.is_deleted = rng.gen_bool(0.1);
            node
        })
        .collect()
}

/// Checks that children point back at the node they are nested under.
fn assert_consistent(level: &[Comment], parent: Option<CommentId>, seed: u64) {
    for node in level {
        if parent.is_some() {
            assert_eq!(node.parent, parent, "seed {}: node {} misplaced", seed, node.id);
        }
        let descendants = count_descendants(node);
        assert_eq!(
            node.has_more_children,
            node.children_count > 0 && node.children_count as usize > descendants,
            "seed {}: has_more wrong for {}",
            seed,
            node.id
        );
        assert_consistent(&node.children, Some(node.id), seed);
    }
}

/// Property: merge(T, S) == T for any verbatim subset S of T, in any order
#[test]
fn property_merge_idempotent() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = build_tree(&random_flat(&mut rng, 40));

        let mut subset: Vec<Comment> = flatten(&tree)
            .into_iter()
            .filter(|_| rng.gen_bool(0.5))
            .collect();
        subset.shuffle(&mut rng);

        assert_eq!(merge_comment_trees(&tree, &subset), tree, "seed {}", seed);
    }
}

/// Property: any split of a thread merges back to every node exactly once
#[test]
fn property_split_merge_complete() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut flat = random_flat(&mut rng, 40);
        let expected = flat.len();
        flat.shuffle(&mut rng);

        let cut = rng.gen_range(0..=flat.len());
        let (first, second) = flat.split_at(cut);
        let merged = merge_comment_trees(&build_tree(first), second);

        assert_eq!(count_nodes(&merged), expected, "seed {}", seed);
        assert_eq!(collect_ids(&merged).len(), expected, "seed {}", seed);
        assert_consistent(&merged, None, seed);
    }
}

/// Property: merging a batch twice is the same as merging it once
#[test]
fn property_repeated_batch_is_noop() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let flat = random_flat(&mut rng, 30);
        let cut = rng.gen_range(0..=flat.len());
        let (base, batch) = flat.split_at(cut);

        let once = merge_comment_trees(&build_tree(base), batch);
        let twice = merge_comment_trees(&once, batch);
        assert_eq!(once, twice, "seed {}", seed);
    }
}

/// Property: random parent pointers (cycles included) never lose nodes
#[test]
fn property_arbitrary_parents_never_lose_nodes() {
    for seed in 0..CASES {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = rng.gen_range(1..30u64);
        let flat: Vec<Comment> = (1..=n)
            .map(|id| Comment::new(id, Some(rng.gen_range(1..=n + 3))))
            .collect();

        let tree = build_tree(&flat);
        assert_eq!(count_nodes(&tree), n as usize, "seed {}", seed);
        assert_eq!(collect_ids(&tree).len(), n as usize, "seed {}", seed);
    }
}
