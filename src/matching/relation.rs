//! Offer/want predicates shared by discovery and validation

use crate::intent::Intent;

/// `giver` provides what `receiver` asks for
#[inline]
pub fn satisfies(giver: &Intent, receiver: &Intent) -> bool {
    giver.offer == receiver.want
}

/// `candidate` may be appended after `tail` in a chain
#[inline]
pub fn can_follow(tail: &Intent, candidate: &Intent) -> bool {
    candidate.is_open && satisfies(tail, candidate)
}

/// A chain ending in `tail` closes the loop back to `origin`
#[inline]
pub fn closes(tail: &Intent, origin: &Intent) -> bool {
    satisfies(tail, origin)
}
