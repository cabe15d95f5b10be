//! System and manipulation actions (spec §4.8): tree duplication, save,
//! label/length transforms, taxon/trait pruning, and site razing.
//!
//! The source split these into `SystemAction` (acting on the data system as a
//! whole) and `ManipAction` (acting within the active tree); both collapse to
//! `ActionKind::System` here, since the distinction doesn't change how a
//! caller addresses or composes them.

use super::{leaf_delete, leaf_depth, leaf_describe, Action, ActionKind};
use anyhow::Context as _;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::persist::{SaveFormat, SaveRequest};
use crate::preferences::{CladeLabels, PreserveNodes};
use crate::rules::predicate::TraitPredicate;
use crate::tree::{NodeId, Tree};

/// append a copy of the active tree (spec §4.8)
#[derive(Debug, Default)]
pub struct DuplicateTree;

impl Action for DuplicateTree {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        engine.trees.duplicate_active()?;
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "duplicate active tree".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// snapshot the current state to a `SaveSink` as Nexus or CAIC; `rep`
/// increments into the filename on every commit (spec §4.8)
#[derive(Debug)]
pub struct Save {
    base_name: String,
    format: SaveFormat,
    rep: usize,
}

impl Save {
    pub fn new(base_name: impl Into<String>, format: SaveFormat) -> Self {
        Self { base_name: base_name.into(), format, rep: 0 }
    }
}

impl Action for Save {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        self.rep += 1;
        let newick = engine.trees.active()?.write_newick(None);
        let request = SaveRequest {
            format: self.format,
            base_name: &self.base_name,
            rep: self.rep,
            newick,
            translator: None,
            continuous: &engine.continuous,
            discrete: &engine.discrete,
            preferences: &engine.preferences,
        };
        let rep = self.rep;
        let base_name = self.base_name.clone();
        engine
            .save_sink()
            .save(&request)
            .with_context(|| format!("saving rep {rep} of '{base_name}'"))
            .map_err(|err| EngineError::file(format!("{err:#}")))
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("save data as {:?} '{}#'", self.format, self.base_name))
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// set the clade-label convention used when trees are serialised (spec §4.8)
#[derive(Debug)]
pub struct SetLabels(pub CladeLabels);

impl Action for SetLabels {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        engine.preferences.clade_labels = self.0;
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("set clade label format to {:?}", self.0))
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// set which nodes are immune to extinction commits (spec §4.5, §4.8)
#[derive(Debug)]
pub struct PreserveTaxa(pub PreserveNodes);

impl Action for PreserveTaxa {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        engine.preferences.preserve_nodes = self.0;
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("set taxa preservation to {:?}", self.0))
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// how `SetTreeLength` turns `factor` into a new edge weight (spec §4.8)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthChange {
    Set,
    Add,
    Multiply,
    /// adds `Normal(0, factor)`
    RandomFixed,
    /// adds `Normal(0, factor * old_len)`
    RandomFraction,
}

/// edit every edge weight in the active tree per `mode`; all results floored
/// at 0 (spec §4.8)
#[derive(Debug)]
pub struct SetTreeLength {
    pub factor: f64,
    pub mode: LengthChange,
}

impl SetTreeLength {
    pub fn new(factor: f64, mode: LengthChange) -> Self {
        Self { factor, mode }
    }
}

impl Action for SetTreeLength {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let ids: Vec<NodeId> = engine.trees.active()?.node_ids().collect();
        for n in ids {
            let old = engine.trees.active()?.edge_weight(n);
            let new = match self.mode {
                LengthChange::Set => self.factor,
                LengthChange::Add => self.factor + old,
                LengthChange::Multiply => self.factor * old,
                LengthChange::RandomFixed => old + engine.rng.gaussian(0.0, self.factor),
                LengthChange::RandomFraction => old + engine.rng.gaussian(0.0, self.factor * old),
            };
            engine.trees.active_mut()?.set_edge_weight(n, new)?;
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || {
            let verb = match self.mode {
                LengthChange::Set => "set all branchlengths to",
                LengthChange::Add => "increase all branchlengths by",
                LengthChange::Multiply => "multiply all branchlengths by",
                LengthChange::RandomFixed => "randomize all branchlengths by",
                LengthChange::RandomFraction => "randomize all branchlengths by fraction",
            };
            format!("{verb} {}", self.factor)
        })
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// which trait store `ShuffleTraits` permutes (spec §4.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitType {
    Discrete,
    Continuous,
    All,
}

/// permute a single column, or every column of a type, across all taxa (spec §4.8)
#[derive(Debug)]
pub struct ShuffleTraits {
    pub trait_type: TraitType,
    pub col: Option<String>,
}

impl ShuffleTraits {
    pub fn column(trait_type: TraitType, col: impl Into<String>) -> Self {
        Self { trait_type, col: Some(col.into()) }
    }

    pub fn all(trait_type: TraitType) -> Self {
        Self { trait_type, col: None }
    }
}

impl Action for ShuffleTraits {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        match (&self.col, self.trait_type) {
            (Some(col), TraitType::Discrete) => engine.discrete.shuffle_trait(col, &mut engine.rng)?,
            (Some(col), TraitType::Continuous) => engine.continuous.shuffle_trait(col, &mut engine.rng)?,
            (Some(_), TraitType::All) => {
                engine.discrete.shuffle_all_traits(&mut engine.rng);
                engine.continuous.shuffle_all_traits(&mut engine.rng);
            }
            (None, TraitType::Discrete) => engine.discrete.shuffle_all_traits(&mut engine.rng),
            (None, TraitType::Continuous) => engine.continuous.shuffle_all_traits(&mut engine.rng),
            (None, TraitType::All) => {
                engine.discrete.shuffle_all_traits(&mut engine.rng);
                engine.continuous.shuffle_all_traits(&mut engine.rng);
            }
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || match (&self.col, self.trait_type) {
            (_, TraitType::All) => "shuffle all traits across all taxa".to_string(),
            (Some(col), TraitType::Discrete) => format!("shuffle discrete trait {col} across all taxa"),
            (Some(col), TraitType::Continuous) => format!("shuffle continuous trait {col} across all taxa"),
            (None, TraitType::Discrete) => "shuffle all discrete traits across all taxa".to_string(),
            (None, TraitType::Continuous) => "shuffle all continuous traits across all taxa".to_string(),
        })
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// when there is no trait data and every tree has the same leaf count, copy
/// leaf names from the active tree onto all the others, in node-id order
/// (spec §4.8)
#[derive(Debug, Default)]
pub struct ConsolidateTaxa;

impl Action for ConsolidateTaxa {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let active_index = engine.trees.active_index();
        let names: Vec<String> = engine
            .trees
            .active()?
            .leaves()
            .into_iter()
            .map(|n| engine.trees.active().unwrap().name(n).unwrap().to_string())
            .collect();
        for index in 0..engine.trees.len() {
            if index == active_index {
                continue;
            }
            let tree = engine.trees.get_mut(index)?;
            let leaves = tree.leaves();
            if leaves.len() != names.len() {
                continue;
            }
            for (leaf, name) in leaves.into_iter().zip(&names) {
                tree.set_name(leaf, name.clone())?;
            }
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "consolidate taxa names".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// iteratively prune dead leaves until none remain (spec §4.8)
#[derive(Debug, Default)]
pub struct DeleteDeadTaxa;

/// reduce the active tree to its living core: prune every dead leaf,
/// repeating as newly-exposed leaves may themselves be dead (spec §4.8)
pub fn delete_dead_taxa(tree: &mut Tree) -> EngineResult<()> {
    while tree.count_leaves() != tree.count_living_leaves() {
        let dead_leaf = tree.leaves().into_iter().find(|&n| tree.is_dead(n));
        match dead_leaf {
            Some(n) => tree.prune_branch(n)?,
            None => break,
        }
    }
    Ok(())
}

impl Action for DeleteDeadTaxa {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        delete_dead_taxa(engine.trees.active_mut()?)
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "delete dead leaves".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// remove trait rows whose taxon is dead in the active tree (spec §4.8)
#[derive(Debug, Default)]
pub struct DeleteDeadTraits;

impl Action for DeleteDeadTraits {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let dead_names: Vec<String> = {
            let tree = engine.trees.active()?;
            tree.leaves()
                .into_iter()
                .filter(|&n| tree.is_dead(n))
                .map(|n| tree.name(n).unwrap().to_string())
                .collect()
        };
        for name in &dead_names {
            if engine.discrete.row_names().contains(name) {
                engine.discrete.delete_row(name)?;
            }
            if engine.continuous.row_names().contains(name) {
                engine.continuous.delete_row(name)?;
            }
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "delete trait values for dead taxa".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// collapse until no singleton internal nodes remain (spec §4.8)
#[derive(Debug, Default)]
pub struct CollapseSingletons;

pub fn collapse_singletons(tree: &mut Tree) -> EngineResult<()> {
    loop {
        let next = tree.node_ids().find(|&n| tree.is_singleton(n));
        match next {
            Some(n) => tree.collapse_node(n)?,
            None => break,
        }
    }
    Ok(())
}

impl Action for CollapseSingletons {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        collapse_singletons(engine.trees.active_mut()?)
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "collapse singleton nodes".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// delete dead taxa, then collapse singletons: reduces the tree to its
/// neontological core (spec §4.8)
#[derive(Debug, Default)]
pub struct MakeNeontological;

impl Action for MakeNeontological {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let tree = engine.trees.active_mut()?;
        delete_dead_taxa(tree)?;
        collapse_singletons(tree)
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || "reduce tree to neontological core".to_string())
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// set every abundance at the given continuous site column(s) to zero,
/// across every taxon (spec §4.8)
#[derive(Debug)]
pub struct RazeSite {
    pub sites: Vec<String>,
}

impl RazeSite {
    pub fn new(sites: Vec<String>) -> Self {
        Self { sites }
    }
}

impl Action for RazeSite {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let rows = engine.continuous.row_names().to_vec();
        for site in &self.sites {
            for row in &rows {
                engine.continuous.set(row, site, 0.0)?;
            }
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("raze site(s) {:?}", self.sites))
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}

/// how a prune action picks the living leaves it will remove (spec §4.8)
#[derive(Debug)]
pub enum PruneSelector {
    /// leaves whose total site abundance is zero (or all sites are unset)
    ByAbundance,
    FixedNum(usize),
    FixedFrac(f64),
    ByProb(f64),
    /// selected with probability `tri_param(a, b, c, trait_value)`
    ByTrait { col: String, a: f64, b: f64, c: f64 },
    ByPredicate(TraitPredicate),
    ByName(Vec<String>),
}

/// prune the active tree down to the targets `selector` picks (spec §4.8).
/// `leave_root_path` decides whether a single-child root chain left behind
/// by the pruning is then collapsed away, re-rooting the tree.
#[derive(Debug)]
pub struct Prune {
    pub selector: PruneSelector,
    pub leave_root_path: bool,
}

impl Prune {
    pub fn new(selector: PruneSelector, leave_root_path: bool) -> Self {
        Self { selector, leave_root_path }
    }

    /// the deterministic selectors: no rng draw needed, so this can run
    /// against a shared `&Engine` borrow (spec §4.8)
    fn select_targets(&self, engine: &Engine) -> EngineResult<Vec<NodeId>> {
        let tree = engine.trees.active()?;
        let living = tree.living_leaves();
        Ok(match &self.selector {
            PruneSelector::ByAbundance => living
                .into_iter()
                .filter(|&n| {
                    let name = tree.name(n).unwrap_or("");
                    engine.continuous.total_abundance(name) <= 0.0
                })
                .collect(),
            PruneSelector::ByPredicate(pred) => living
                .into_iter()
                .filter(|&n| {
                    let name = tree.name(n).unwrap_or("");
                    pred.test(name, &engine.continuous, &engine.discrete)
                })
                .collect(),
            PruneSelector::ByName(names) => names
                .iter()
                .filter_map(|name| tree.find_by_name(name))
                .filter(|&n| tree.is_leaf(n))
                .collect(),
            PruneSelector::FixedNum(_) | PruneSelector::FixedFrac(_) | PruneSelector::ByProb(_) | PruneSelector::ByTrait { .. } => {
                unreachable!("rng-driven selectors are resolved in `execute`")
            }
        })
    }
}

impl Action for Prune {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let mut targets = match &self.selector {
            PruneSelector::FixedNum(k) => {
                let mut targets = engine.trees.active()?.living_leaves();
                engine.rng.shuffle(&mut targets);
                targets.truncate(*k);
                targets
            }
            PruneSelector::FixedFrac(frac) => {
                let mut targets = engine.trees.active()?.living_leaves();
                let take = (targets.len() as f64 * frac) as usize;
                engine.rng.shuffle(&mut targets);
                targets.truncate(take);
                targets
            }
            PruneSelector::ByProb(prob) => {
                let living = engine.trees.active()?.living_leaves();
                living.into_iter().filter(|_| engine.rng.bernoulli(*prob)).collect()
            }
            PruneSelector::ByTrait { col, a, b, c } => {
                let living = engine.trees.active()?.living_leaves();
                let tree = engine.trees.active()?;
                let mut picked = Vec::new();
                for n in living {
                    let name = tree.name(n)?.to_string();
                    let value = engine.continuous.get(&name, col)?;
                    let prob = crate::rates::tri_param(*a, *b, *c, value);
                    if engine.rng.bernoulli(prob) {
                        picked.push(n);
                    }
                }
                picked
            }
            _ => self.select_targets(engine)?,
        };
        targets.sort();
        targets.dedup();

        let tree = engine.trees.active_mut()?;
        for n in &targets {
            tree.prune_branch(*n)?;
        }
        if !self.leave_root_path {
            collapse_singletons(tree)?;
        }
        Ok(())
    }
    fn deep_size(&self) -> usize {
        1
    }
    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || match &self.selector {
            PruneSelector::ByAbundance => "prune (taxa with 0 abundance)".to_string(),
            PruneSelector::FixedNum(k) => format!("prune (kill {k} taxa)"),
            PruneSelector::FixedFrac(frac) => format!("prune ({:.4}% of taxa)", frac * 100.0),
            PruneSelector::ByProb(prob) => format!("prune ({:.4}% chance of pruning any taxon)", prob * 100.0),
            PruneSelector::ByTrait { col, a, b, c } => {
                format!("prune (biased by trait {col}, params {a}, {b}, {c})")
            }
            PruneSelector::ByPredicate(_) => "prune (taxa matching predicate)".to_string(),
            PruneSelector::ByName(_) => "prune (a list of taxa names)".to_string(),
        })
    }
    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }
    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }
    fn kind(&self) -> ActionKind {
        ActionKind::System
    }
}
