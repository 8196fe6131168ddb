//! Depth-bounded search for settlement cycles

use super::relation::{can_follow, closes};
use super::EngineError;
use crate::intent::{IntentId, IntentSnapshot};

use tracing::debug;

/// Default bound on the number of intents in a chain
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// One level of the search: an intent on the chain and the next candidate to try
struct Frame {
    position: usize,
    cursor: usize,
}

/// Finds a closed chain of intents starting from a given intent
#[derive(Debug, Clone, Copy)]
pub struct ChainFinder {
    max_depth: usize,
}

impl ChainFinder {
    pub fn new(max_depth: usize) -> Result<Self, EngineError> {
        if max_depth == 0 {
            return Err(EngineError::InvalidDepth(max_depth));
        }
        Ok(Self { max_depth })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Search `snapshot` for a cycle through `start`.
    ///
    /// Candidates are tried in snapshot order and the first chain that closes
    /// is returned, so the same snapshot always yields the same chain. A start
    /// intent that is missing or closed has no chain.
    pub fn find_chain(
        &self,
        start: IntentId,
        snapshot: &IntentSnapshot,
    ) -> Result<Option<Vec<IntentId>>, EngineError> {
        if snapshot.is_empty() {
            return Err(EngineError::EmptySnapshot);
        }

        let origin_pos = match snapshot.position(start) {
            Some(pos) => pos,
            None => {
                debug!("Intent {} not in snapshot", start);
                return Ok(None);
            }
        };

        let intents = snapshot.as_slice();
        let origin = &intents[origin_pos];
        if !origin.is_open {
            debug!("Intent {} is closed, no chain", start);
            return Ok(None);
        }

        let mut stack = vec![Frame {
            position: origin_pos,
            cursor: 0,
        }];

        while !stack.is_empty() {
            // Depth is the number of intents on the chain
            let depth = stack.len();
            if depth >= self.max_depth {
                stack.pop();
                continue;
            }

            let top = depth - 1;
            let tail = &intents[stack[top].position];
            let mut next = None;
            while stack[top].cursor < intents.len() {
                let candidate = stack[top].cursor;
                stack[top].cursor += 1;
                if can_follow(tail, &intents[candidate]) && !on_chain(&stack, candidate) {
                    next = Some(candidate);
                    break;
                }
            }

            let Some(next) = next else {
                stack.pop();
                continue;
            };

            stack.push(Frame {
                position: next,
                cursor: 0,
            });

            if closes(&intents[next], origin) {
                let chain: Vec<IntentId> = stack.iter().map(|f| intents[f.position].id).collect();
                debug!("Found chain of {} intents from {}: {:?}", chain.len(), start, chain);
                return Ok(Some(chain));
            }
        }

        debug!(
            "No chain from intent {} within depth {}",
            start, self.max_depth
        );
        Ok(None)
    }
}

impl Default for ChainFinder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn on_chain(stack: &[Frame], position: usize) -> bool {
    stack.iter().any(|f| f.position == position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    fn snapshot(intents: &[(IntentId, &str, &str)]) -> IntentSnapshot {
        intents
            .iter()
            .map(|(id, offer, want)| Intent::open(*id, "actor", offer, want))
            .collect()
    }

    #[test]
    fn test_direct_swap() {
        let snap = snapshot(&[(1, "apples", "bananas"), (2, "bananas", "apples")]);
        let chain = ChainFinder::default().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 2]));
    }

    #[test]
    fn test_nobody_offers_what_is_wanted() {
        let snap = snapshot(&[(1, "apples", "bananas"), (2, "cherries", "apples")]);
        let chain = ChainFinder::default().find_chain(1, &snap).unwrap();
        assert_eq!(chain, None);
    }

    #[test]
    fn test_three_way_cycle_follows_offers() {
        // A's apples go to C, C's cherries go to B, B's bananas go back to A
        let snap = snapshot(&[
            (1, "apples", "bananas"),
            (2, "bananas", "cherries"),
            (3, "cherries", "apples"),
        ]);
        let chain = ChainFinder::new(6).unwrap().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 3, 2]));
    }

    #[test]
    fn test_three_way_cycle_in_listed_order() {
        // Each intent takes the previous one's goods
        let snap = snapshot(&[
            (1, "bananas", "apples"),
            (2, "cherries", "bananas"),
            (3, "apples", "cherries"),
        ]);
        let chain = ChainFinder::new(6).unwrap().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_depth_bound_prunes_long_cycles() {
        let snap = snapshot(&[
            (1, "bananas", "apples"),
            (2, "cherries", "bananas"),
            (3, "apples", "cherries"),
        ]);
        assert_eq!(ChainFinder::new(1).unwrap().find_chain(1, &snap).unwrap(), None);
        assert_eq!(ChainFinder::new(2).unwrap().find_chain(1, &snap).unwrap(), None);
        assert_eq!(
            ChainFinder::new(3).unwrap().find_chain(1, &snap).unwrap(),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_first_found_wins_over_shorter() {
        // Intent 2 is listed first and leads to a three-hop cycle; the direct
        // swap with intent 4 is only reached afterwards.
        let snap = snapshot(&[
            (1, "apples", "bananas"),
            (2, "figs", "apples"),
            (3, "bananas", "figs"),
            (4, "bananas", "apples"),
        ]);
        let chain = ChainFinder::default().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_dead_end_backtracks() {
        let snap = snapshot(&[
            (1, "apples", "bananas"),
            (2, "grapes", "apples"),
            (3, "figs", "grapes"),
            (4, "bananas", "apples"),
        ]);
        let chain = ChainFinder::default().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 4]));
    }

    #[test]
    fn test_closed_intents_are_skipped() {
        let snap: IntentSnapshot = vec![
            Intent::open(1, "a", "apples", "bananas"),
            Intent::open(2, "b", "bananas", "apples").closed(),
            Intent::open(3, "c", "bananas", "apples"),
        ]
        .into_iter()
        .collect();
        let chain = ChainFinder::default().find_chain(1, &snap).unwrap();
        assert_eq!(chain, Some(vec![1, 3]));

        let closed_start = ChainFinder::default().find_chain(2, &snap).unwrap();
        assert_eq!(closed_start, None);
    }

    #[test]
    fn test_self_match_is_not_a_chain() {
        let snap = snapshot(&[(1, "apples", "apples")]);
        assert_eq!(ChainFinder::default().find_chain(1, &snap).unwrap(), None);
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let snap = snapshot(&[(1, "apples", "bananas"), (2, "bananas", "apples")]);
        assert_eq!(ChainFinder::default().find_chain(99, &snap).unwrap(), None);
    }

    #[test]
    fn test_contract_violations() {
        assert_eq!(
            ChainFinder::new(0).unwrap_err(),
            EngineError::InvalidDepth(0)
        );
        assert_eq!(
            ChainFinder::default()
                .find_chain(1, &IntentSnapshot::new())
                .unwrap_err(),
            EngineError::EmptySnapshot
        );
    }

    #[test]
    fn test_repeated_search_is_deterministic() {
        let snap = snapshot(&[
            (1, "apples", "bananas"),
            (2, "figs", "apples"),
            (3, "bananas", "figs"),
            (4, "bananas", "apples"),
            (5, "kiwis", "apples"),
            (6, "bananas", "kiwis"),
        ]);
        let finder = ChainFinder::default();
        let first = finder.find_chain(1, &snap).unwrap();
        for _ in 0..10 {
            assert_eq!(finder.find_chain(1, &snap).unwrap(), first);
        }
    }
}
