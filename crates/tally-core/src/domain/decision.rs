/// Outcome of evaluating one request against a policy.
///
/// `total` is the window sum seen when the decision was made: the full
/// pre-increment sum for an admit, the partial sum at the bucket that crossed
/// the limit for a reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted { total: u64, allowed: u64 },
    Rejected { total: u64, allowed: u64 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    pub fn total(&self) -> u64 {
        match self {
            Decision::Admitted { total, .. } | Decision::Rejected { total, .. } => *total,
        }
    }

    pub fn allowed(&self) -> u64 {
        match self {
            Decision::Admitted { allowed, .. } | Decision::Rejected { allowed, .. } => *allowed,
        }
    }

    /// Further requests the window will still admit after this one.
    ///
    /// Admission compares the pre-increment total with strict `>`, so after
    /// an admit at total `t` the next `allowed - t` requests still get in.
    pub fn remaining(&self) -> u64 {
        match self {
            Decision::Admitted { total, allowed } => allowed.saturating_sub(*total),
            Decision::Rejected { .. } => 0,
        }
    }
}
