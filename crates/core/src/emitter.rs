use crate::budget::{
    allocate, Allocation, BudgetReport, Candidate, Decision, Disposition, HYBRID_THRESHOLD,
};
use crate::error::Result;
use crate::framing::{content_digest, render_record, EmissionRecord};
use crate::lens::{build_plan, EffectivePlan, LensManager};
use crate::options::{PackOptions, SortKey, SortOrder, Strategy};
use crate::priority::PriorityResolver;
use contextpack_analyzers::{estimate_tokens, Language, TruncateMode, Truncator};
use contextpack_walker::{
    decode_text, is_binary_prefix, normalize_separators, FileDescriptor, GlobFilter, Scanner,
};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the synthetic first record carrying the lens manifest
pub const META_FILE_NAME: &str = ".contextpack_meta";

/// Candidates held back in streaming mode before commitment
const STREAM_WINDOW: usize = 64;

/// What a pack run did, for callers that want numbers
#[derive(Debug, Clone)]
pub struct PackSummary {
    /// Framed records written, the meta record included
    pub emitted: usize,
    /// Files passed over (unreadable, below the priority floor)
    pub skipped: usize,
    /// Budget report, present when a budget was set
    pub report: Option<BudgetReport>,
}

/// Serialize a repository into the sink.
///
/// Walks `root`, applies the effective include/exclude sets, resolves
/// priorities, allocates the token budget and writes framed records.
/// Batch mode (the default) emits in sort-key order; streaming mode
/// emits in traversal order with a bounded lookahead window.
pub fn pack<W: Write>(root: &Path, options: &PackOptions, sink: &mut W) -> Result<PackSummary> {
    let mut manager = LensManager::new();
    manager.load_custom(options.config.lenses.clone());
    let plan = build_plan(options, &manager)?;

    let filter = GlobFilter::compile(&plan.include, &plan.exclude)?;
    let resolver = PriorityResolver::new(&plan.groups, options.store.as_ref())?;
    let scanner = Scanner::new(root, filter, options.max_file_size)?;

    if options.streaming {
        pack_streaming(&scanner, &plan, &resolver, options, sink)
    } else {
        pack_batch(&scanner, &plan, &resolver, options, sink)
    }
}

/// Pure, filesystem-free variant of [`pack`]: serialize in-memory files.
///
/// The same selection, budgeting and framing pipeline runs over
/// `(path, bytes)` pairs; binary and oversize checks apply to the given
/// bytes, and timestamps are zero (sorting by mtime/ctime degrades to
/// path order).
pub fn process(files: &[(String, Vec<u8>)], options: &PackOptions) -> Result<Vec<u8>> {
    let mut manager = LensManager::new();
    manager.load_custom(options.config.lenses.clone());
    let plan = build_plan(options, &manager)?;

    let filter = GlobFilter::compile(&plan.include, &plan.exclude)?;
    let resolver = PriorityResolver::new(&plan.groups, options.store.as_ref())?;

    let mut loaded: Vec<(Candidate, String)> = Vec::new();
    for (path, bytes) in files {
        let rel_path = normalize_separators(path);
        if !filter.admits(&rel_path) {
            continue;
        }
        if bytes.len() as u64 > options.max_file_size {
            log::info!("[SKIP] {rel_path} (file too large)");
            continue;
        }
        if is_binary_prefix(bytes) {
            log::info!("[SKIP] {rel_path} (likely binary)");
            continue;
        }
        let content = decode_text(bytes);
        let descriptor = FileDescriptor {
            rel_path: rel_path.clone(),
            abs_path: PathBuf::from(path),
            size: bytes.len() as u64,
            mtime: 0,
            ctime: 0,
        };
        if let Some(candidate) =
            candidate_from_content(&descriptor, &content, &plan, &resolver, options)
        {
            loaded.push((candidate, content));
        }
    }

    loaded.sort_by(|(a, _), (b, _)| compare_candidates(a, b, plan.sort_by, plan.sort_order));
    let candidates: Vec<Candidate> = loaded.iter().map(|(c, _)| c.clone()).collect();
    let (decisions, report) = allocate(&candidates, options.budget, options.strategy);

    let mut out = Vec::new();
    if options.emit_meta && decisions.iter().any(|d| d.selected) {
        let newest = selected_newest_mtime(&candidates, &decisions);
        write_meta(&mut out, &plan, newest)?;
    }
    for ((candidate, content), decision) in loaded.iter().zip(&decisions) {
        if decision.selected {
            emit_content(&mut out, candidate, content, decision.force_structure)?;
        }
    }
    if let Some(report) = &report {
        report.log_report();
    }
    Ok(out)
}

fn pack_batch<W: Write>(
    scanner: &Scanner,
    plan: &EffectivePlan,
    resolver: &PriorityResolver,
    options: &PackOptions,
    sink: &mut W,
) -> Result<PackSummary> {
    let mut candidates = Vec::new();
    let mut skipped = 0usize;

    for descriptor in scanner.scan() {
        match build_candidate(&descriptor, plan, resolver, options) {
            Some(candidate) => candidates.push(candidate),
            None => skipped += 1,
        }
    }

    candidates.sort_by(|a, b| compare_candidates(a, b, plan.sort_by, plan.sort_order));
    let (decisions, report) = allocate(&candidates, options.budget, options.strategy);

    let mut emitted = 0usize;
    if options.emit_meta && decisions.iter().any(|d| d.selected) {
        let newest = selected_newest_mtime(&candidates, &decisions);
        write_meta(sink, plan, newest)?;
        emitted += 1;
    }

    for (candidate, decision) in candidates.iter().zip(&decisions) {
        if !decision.selected {
            continue;
        }
        if emit_candidate(sink, candidate, decision.force_structure)? {
            emitted += 1;
        } else {
            skipped += 1;
        }
    }

    if let Some(report) = &report {
        report.log_report();
    }

    Ok(PackSummary {
        emitted,
        skipped,
        report,
    })
}

fn pack_streaming<W: Write>(
    scanner: &Scanner,
    plan: &EffectivePlan,
    resolver: &PriorityResolver,
    options: &PackOptions,
    sink: &mut W,
) -> Result<PackSummary> {
    log::info!("streaming mode: sort ordering suppressed, emitting in traversal order");

    let mut state = StreamState {
        budget: options.budget,
        strategy: options.strategy,
        used: 0,
        emitted: 0,
        skipped: 0,
        allocations: Vec::new(),
        // The meta record cannot know the newest included mtime up
        // front in a single pass, so it omits the timestamp line.
        pending_meta: options.emit_meta.then(|| render_meta(plan, None)),
    };
    let mut window: VecDeque<Pending> = VecDeque::new();

    for descriptor in scanner.scan() {
        let Some(candidate) = build_candidate(&descriptor, plan, resolver, options) else {
            state.skipped += 1;
            continue;
        };
        let forced = state.hybrid_forced(&candidate);
        window.push_back(Pending { candidate, forced });
        if window.len() > STREAM_WINDOW {
            let pending = window.pop_front().expect("window is non-empty");
            state.commit(pending, &window, sink)?;
        }
    }
    while let Some(pending) = window.pop_front() {
        state.commit(pending, &window, sink)?;
    }

    let report = state.budget.map(|budget| BudgetReport {
        budget,
        used: state.used,
        strategy: state.strategy,
        allocations: state.allocations,
    });
    if let Some(report) = &report {
        report.log_report();
    }

    Ok(PackSummary {
        emitted: state.emitted,
        skipped: state.skipped,
        report,
    })
}

struct Pending {
    candidate: Candidate,
    forced: bool,
}

impl Pending {
    fn cost(&self) -> usize {
        if self.forced {
            self.candidate.structure_cost
        } else {
            self.candidate.full_cost
        }
    }

    /// Cheapest cost this candidate could be emitted at under the strategy
    fn floor_cost(&self, strategy: Strategy) -> usize {
        match strategy {
            Strategy::Drop => self.cost(),
            _ => self.cost().min(self.candidate.structure_cost),
        }
    }
}

struct StreamState {
    budget: Option<usize>,
    strategy: Strategy,
    used: usize,
    emitted: usize,
    skipped: usize,
    allocations: Vec<Allocation>,
    pending_meta: Option<String>,
}

impl StreamState {
    fn hybrid_forced(&self, candidate: &Candidate) -> bool {
        let Some(budget) = self.budget else {
            return false;
        };
        self.strategy == Strategy::Hybrid
            && candidate.full_cost > (budget as f64 * HYBRID_THRESHOLD) as usize
            && candidate.structure_cost < candidate.full_cost
    }

    /// Decide the oldest candidate and emit or drop it.
    ///
    /// Budget still unclaimed by higher-priority candidates waiting in
    /// the window is the amount this file may spend; priority thereby
    /// affects retention while traversal order alone decides emission
    /// order.
    fn commit<W: Write>(
        &mut self,
        pending: Pending,
        window: &VecDeque<Pending>,
        sink: &mut W,
    ) -> Result<()> {
        let candidate = &pending.candidate;

        let verdict = match self.budget {
            None => Some((pending.forced, pending.cost())),
            Some(budget) => {
                let reserved: usize = window
                    .iter()
                    .filter(|peer| peer.candidate.priority > candidate.priority)
                    .map(|peer| peer.floor_cost(self.strategy))
                    .sum();
                let available = budget.saturating_sub(self.used).saturating_sub(reserved);

                if candidate.always_include {
                    Some((pending.forced, pending.cost()))
                } else if pending.cost() <= available {
                    Some((pending.forced, pending.cost()))
                } else if self.strategy != Strategy::Drop
                    && candidate.structure_cost <= available
                {
                    Some((true, candidate.structure_cost))
                } else {
                    None
                }
            }
        };

        match verdict {
            Some((force_structure, cost)) => {
                if let Some(meta) = self.pending_meta.take() {
                    write_meta_content(sink, &meta)?;
                    self.emitted += 1;
                }
                if emit_candidate(sink, candidate, force_structure)? {
                    self.used += cost;
                    self.emitted += 1;
                    self.allocations.push(Allocation {
                        rel_path: candidate.descriptor.rel_path.clone(),
                        priority: candidate.priority,
                        tokens: cost,
                        disposition: if force_structure {
                            Disposition::Structured
                        } else {
                            Disposition::Emitted
                        },
                    });
                } else {
                    self.skipped += 1;
                }
            }
            None => {
                self.allocations.push(Allocation {
                    rel_path: candidate.descriptor.rel_path.clone(),
                    priority: candidate.priority,
                    tokens: candidate.full_cost,
                    disposition: Disposition::Dropped,
                });
            }
        }
        Ok(())
    }
}

/// Read a file and build its candidate; `None` means skipped (reported
/// on the diagnostic channel) or below the priority floor.
fn build_candidate(
    descriptor: &FileDescriptor,
    plan: &EffectivePlan,
    resolver: &PriorityResolver,
    options: &PackOptions,
) -> Option<Candidate> {
    let bytes = match std::fs::read(&descriptor.abs_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("[SKIP] {} (read failed: {e})", descriptor.rel_path);
            return None;
        }
    };
    let content = decode_text(&bytes);
    candidate_from_content(descriptor, &content, plan, resolver, options)
}

fn candidate_from_content(
    descriptor: &FileDescriptor,
    content: &str,
    plan: &EffectivePlan,
    resolver: &PriorityResolver,
    options: &PackOptions,
) -> Option<Candidate> {
    let resolved = resolver.resolve(&descriptor.rel_path);

    if let Some(floor) = options.priority_floor {
        if resolved.priority < floor && !resolved.always_include {
            log::debug!(
                "[SKIP] {} (priority {} below floor {floor})",
                descriptor.rel_path,
                resolved.priority
            );
            return None;
        }
    }

    let language = Language::from_path(&descriptor.rel_path);
    let mode = resolved.truncate_mode.unwrap_or(plan.mode);
    let limit = resolved.truncate_lines.unwrap_or(plan.limit);

    let full_cost = estimate_tokens(&Truncator::new(mode, limit).apply(content, language).content);
    let structure_cost = if mode == TruncateMode::Structure {
        full_cost
    } else {
        estimate_tokens(
            &Truncator::new(TruncateMode::Structure, 0)
                .apply(content, language)
                .content,
        )
    };

    Some(Candidate {
        descriptor: descriptor.clone(),
        priority: resolved.priority,
        always_include: resolved.always_include,
        mode,
        limit,
        full_cost,
        structure_cost,
    })
}

fn compare_candidates(
    a: &Candidate,
    b: &Candidate,
    key: SortKey,
    order: SortOrder,
) -> std::cmp::Ordering {
    let primary = match key {
        SortKey::Name => a.descriptor.rel_path.cmp(&b.descriptor.rel_path),
        SortKey::Mtime => a.descriptor.mtime.cmp(&b.descriptor.mtime),
        SortKey::Ctime => a.descriptor.ctime.cmp(&b.descriptor.ctime),
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.descriptor.rel_path.cmp(&b.descriptor.rel_path))
}

/// Re-read and emit one selected candidate. Returns `Ok(false)` when the
/// file vanished or became unreadable between selection and emission; no
/// partial record is written in that case.
fn emit_candidate<W: Write>(
    sink: &mut W,
    candidate: &Candidate,
    force_structure: bool,
) -> Result<bool> {
    let bytes = match std::fs::read(&candidate.descriptor.abs_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!(
                "[SKIP] {} (read failed at emission: {e})",
                candidate.descriptor.rel_path
            );
            return Ok(false);
        }
    };
    let content = decode_text(&bytes);
    emit_content(sink, candidate, &content, force_structure)?;
    Ok(true)
}

fn emit_content<W: Write>(
    sink: &mut W,
    candidate: &Candidate,
    content: &str,
    force_structure: bool,
) -> Result<()> {
    let language = Language::from_path(&candidate.descriptor.rel_path);
    let (mode, limit) = if force_structure {
        (TruncateMode::Structure, 0)
    } else {
        (candidate.mode, candidate.limit)
    };
    let truncation = Truncator::new(mode, limit).apply(content, language);
    let digest = content_digest(content);

    let record = EmissionRecord {
        rel_path: &candidate.descriptor.rel_path,
        content: &truncation.content,
        digest: &digest,
        original_lines: truncation.original_lines,
        final_lines: truncation.final_lines,
        truncated: truncation.truncated,
    };
    // One file is rendered at a time so an abandoned consumer never sees
    // a record missing its end marker.
    sink.write_all(render_record(&record).as_bytes())?;
    Ok(())
}

fn selected_newest_mtime(candidates: &[Candidate], decisions: &[Decision]) -> Option<u64> {
    candidates
        .iter()
        .zip(decisions)
        .filter(|(_, d)| d.selected)
        .map(|(c, _)| c.descriptor.mtime)
        .max()
}

/// Meta record content: lens name, description, and a timestamp derived
/// from the newest included mtime so identical inputs give identical
/// bytes regardless of the wall clock.
fn render_meta(plan: &EffectivePlan, newest_mtime: Option<u64>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "lens: {}\n",
        plan.lens_name.as_deref().unwrap_or("(none)")
    ));
    if !plan.lens_description.is_empty() {
        out.push_str(&format!("description: {}\n", plan.lens_description));
    }
    if let Some(mtime) = newest_mtime.filter(|m| *m > 0) {
        out.push_str(&format!("generated: {mtime}\n"));
    }
    out
}

fn write_meta<W: Write>(
    sink: &mut W,
    plan: &EffectivePlan,
    newest_mtime: Option<u64>,
) -> Result<()> {
    write_meta_content(sink, &render_meta(plan, newest_mtime))
}

fn write_meta_content<W: Write>(sink: &mut W, content: &str) -> Result<()> {
    let digest = content_digest(content);
    let lines = content.split_inclusive('\n').count();
    let record = EmissionRecord {
        rel_path: META_FILE_NAME,
        content,
        digest: &digest,
        original_lines: lines,
        final_lines: lines,
        truncated: false,
    };
    sink.write_all(render_record(&record).as_bytes())?;
    Ok(())
}
