use crate::options::Strategy;
use contextpack_analyzers::TruncateMode;
use contextpack_walker::FileDescriptor;

/// Fraction of the budget above which hybrid pre-structures a file
pub const HYBRID_THRESHOLD: f64 = 0.10;

/// A file that survived walk-time filtering, with everything the
/// allocator needs: priority, per-file truncation parameters, and both
/// cost estimates. Content is not held here; the emitter re-reads it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub descriptor: FileDescriptor,
    pub priority: i64,
    pub always_include: bool,
    /// Resolved truncation mode for this file (group override or plan)
    pub mode: TruncateMode,
    pub limit: usize,
    /// Estimated tokens of the content as it would be emitted
    pub full_cost: usize,
    /// Estimated tokens of the structure-mode rendition
    pub structure_cost: usize,
}

/// What the allocator did with one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Emitted with its resolved mode
    Emitted,
    /// Forced to structure mode to fit
    Structured,
    /// Not emitted
    Dropped,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Emitted => "emitted",
            Disposition::Structured => "structured",
            Disposition::Dropped => "dropped",
        }
    }
}

/// Per-file line of the budget report
#[derive(Debug, Clone)]
pub struct Allocation {
    pub rel_path: String,
    pub priority: i64,
    pub tokens: usize,
    pub disposition: Disposition,
}

/// Deterministic budget report, written to the diagnostic channel
#[derive(Debug, Clone)]
pub struct BudgetReport {
    pub budget: usize,
    pub used: usize,
    pub strategy: Strategy,
    pub allocations: Vec<Allocation>,
}

impl BudgetReport {
    pub fn used_percentage(&self) -> f64 {
        if self.budget > 0 {
            (self.used as f64 / self.budget as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.used)
    }

    pub fn count(&self, disposition: Disposition) -> usize {
        self.allocations
            .iter()
            .filter(|a| a.disposition == disposition)
            .count()
    }

    /// Emit the report on the diagnostic channel
    pub fn log_report(&self) {
        log::info!(
            "budget report: strategy={} budget={} used={} ({:.1}%) remaining={}",
            self.strategy.as_str(),
            format_number(self.budget),
            format_number(self.used),
            self.used_percentage(),
            format_number(self.remaining()),
        );
        log::info!(
            "files: {} emitted, {} structured, {} dropped",
            self.count(Disposition::Emitted),
            self.count(Disposition::Structured),
            self.count(Disposition::Dropped),
        );
        for allocation in &self.allocations {
            log::info!(
                "  [P:{:3}] {} {} ({} tokens)",
                allocation.priority,
                allocation.disposition.as_str(),
                allocation.rel_path,
                format_number(allocation.tokens),
            );
        }
    }
}

/// Format a number with thousand separators
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.chars().rev().collect()
}

/// Allocator verdict for one candidate, indexed like the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub selected: bool,
    pub force_structure: bool,
}

/// Allocate a token budget across candidates.
///
/// Candidates must arrive in the caller's emission (sort-key) order; that
/// order is the tie-break when priorities are equal. Decisions come back
/// in the same order. Without a budget everything is selected and no
/// report is produced.
pub fn allocate(
    candidates: &[Candidate],
    budget: Option<usize>,
    strategy: Strategy,
) -> (Vec<Decision>, Option<BudgetReport>) {
    let Some(budget) = budget else {
        let decisions = candidates
            .iter()
            .map(|_| Decision {
                selected: true,
                force_structure: false,
            })
            .collect();
        return (decisions, None);
    };

    let mut decisions = vec![
        Decision {
            selected: false,
            force_structure: false,
        };
        candidates.len()
    ];

    // Hybrid pre-pass: any file whose full cost exceeds 10% of the budget
    // is switched to structure before allocation begins.
    if strategy == Strategy::Hybrid {
        let threshold = (budget as f64 * HYBRID_THRESHOLD) as usize;
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.full_cost > threshold && candidate.structure_cost < candidate.full_cost {
                decisions[i].force_structure = true;
            }
        }
    }

    // Priority descending; the stable sort preserves the caller's
    // sort-key order for ties.
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(candidates[i].priority));

    let mut used = 0usize;
    let mut allocations = Vec::with_capacity(candidates.len());

    for idx in order {
        let candidate = &candidates[idx];
        let forced = decisions[idx].force_structure;
        let cost = if forced {
            candidate.structure_cost
        } else {
            candidate.full_cost
        };

        if candidate.always_include {
            decisions[idx].selected = true;
            used += cost;
            allocations.push(Allocation {
                rel_path: candidate.descriptor.rel_path.clone(),
                priority: candidate.priority,
                tokens: cost,
                disposition: if forced {
                    Disposition::Structured
                } else {
                    Disposition::Emitted
                },
            });
            continue;
        }

        if used + cost <= budget {
            decisions[idx].selected = true;
            used += cost;
            allocations.push(Allocation {
                rel_path: candidate.descriptor.rel_path.clone(),
                priority: candidate.priority,
                tokens: cost,
                disposition: if forced {
                    Disposition::Structured
                } else {
                    Disposition::Emitted
                },
            });
            continue;
        }

        // Overflow: drop, or force structure mode first.
        if strategy != Strategy::Drop && used + candidate.structure_cost <= budget {
            decisions[idx].selected = true;
            decisions[idx].force_structure = true;
            used += candidate.structure_cost;
            allocations.push(Allocation {
                rel_path: candidate.descriptor.rel_path.clone(),
                priority: candidate.priority,
                tokens: candidate.structure_cost,
                disposition: Disposition::Structured,
            });
            continue;
        }

        allocations.push(Allocation {
            rel_path: candidate.descriptor.rel_path.clone(),
            priority: candidate.priority,
            tokens: candidate.full_cost,
            disposition: Disposition::Dropped,
        });
    }

    let report = BudgetReport {
        budget,
        used,
        strategy,
        allocations,
    };

    (decisions, Some(report))
}
