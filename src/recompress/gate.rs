/// Whether a re-encoded form replaces the original
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Commit,
    Decline,
}

/// Strict "smaller wins" comparison on encoded byte lengths.
///
/// Applied per image (original stream plus soft mask against the new JPEG)
/// and per document (input file against the staged output).
pub struct Gate;

impl Gate {
    pub fn decide(original: u64, candidate: u64) -> GateDecision {
        if candidate < original {
            GateDecision::Commit
        } else {
            GateDecision::Decline
        }
    }
}
