use indexmap::IndexMap;
use std::collections::HashMap;

use crate::bootstrap::context::BootstrapContext;
use crate::bootstrap::BundleBootstrap;
use crate::bundle::{BundleEntry, Candidate, DuplicateDetector};
use crate::errors::BootstrapError;
use crate::registry::{ItemId, ItemInfo, ItemKind, ItemRegistry, Scope};
use crate::stats::Stat;
use crate::types::TypeKey;

/// Expands registered bundles into their transitive closure.
///
/// Bundles are processed in rounds: each round initializes the current
/// frontier, and bundles registered meanwhile form the next one. Equal
/// instances are merged into the first accepted record and never processed
/// twice. Init order is assigned once, in first-seen order.
#[derive(Debug, Default)]
pub struct BundleResolver {
    entries: IndexMap<ItemId, BundleEntry>,
    frontier: Vec<ItemId>,
    ancestry: HashMap<ItemId, Vec<TypeKey>>,
    next_order: usize,
    rounds: usize,
    initialized: Vec<ItemId>,
}

impl BundleResolver {
    /// Create a new bundle resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a bundle into the frontier unless it equals an accepted one
    pub fn register(
        &mut self,
        registry: &mut ItemRegistry,
        detector: &dyn DuplicateDetector,
        entry: BundleEntry,
        scope: Scope,
        from_lookup: bool,
    ) -> Result<ItemId, BootstrapError> {
        let incoming = candidate_of(&entry);
        let entries = &self.entries;
        let registration = registry.register_instance(ItemKind::Bundle, entry.key(), scope, |existing| {
            entries
                .get(&existing)
                .map(|known| detector.is_duplicate(&candidate_of(known), &incoming))
                .unwrap_or(false)
        });

        let id = registration.id;
        if registration.is_duplicate() {
            if from_lookup {
                if let Some(details) = registry.info_mut(id).and_then(ItemInfo::bundle_mut) {
                    details.from_lookup = true;
                }
            }
            return Ok(id);
        }

        let mut chain = scope
            .item()
            .and_then(|parent| self.ancestry.get(&parent))
            .cloned()
            .unwrap_or_default();
        let looped = chain.contains(&entry.key());
        chain.push(entry.key());
        if looped {
            let path: Vec<&str> = chain.iter().map(TypeKey::simple_name).collect();
            return Err(BootstrapError::registration(
                scope,
                id,
                format!("Bundle registration loop: {}", path.join(" -> ")),
            ));
        }
        self.ancestry.insert(id, chain);

        self.next_order += 1;
        if let Some(details) = registry.info_mut(id).and_then(ItemInfo::bundle_mut) {
            details.init_order = Some(self.next_order);
            details.from_lookup = from_lookup;
            details.transitive = matches!(scope, Scope::Bundle(_));
        }
        registry.mark_collected(id);

        self.entries.insert(id, entry);
        self.frontier.push(id);
        Ok(id)
    }

    /// Initialize bundles round by round until no new bundle appears.
    ///
    /// Bundles disabled before their turn are skipped. A failing bundle
    /// aborts resolution.
    pub(crate) fn resolve(ctx: &mut BootstrapContext) -> Result<(), BootstrapError> {
        loop {
            let frontier = std::mem::take(&mut ctx.bundles.frontier);
            if frontier.is_empty() {
                break;
            }
            ctx.bundles.rounds += 1;
            tracing::debug!(
                target: "weave::bundle",
                "Bundle resolution round {}: {} bundles",
                ctx.bundles.rounds,
                frontier.len()
            );

            for id in frontier {
                if !ctx.registry.is_enabled(id) {
                    tracing::debug!(target: "weave::bundle", "Bundle {} is disabled, skipping", id);
                    continue;
                }
                let Some(entry) = ctx.bundles.entries.get(&id).cloned() else {
                    continue;
                };
                let scope = Scope::Bundle(id);

                ctx.stats.start_detail(Stat::BundleInitTime, entry.key());
                let result = {
                    let mut bootstrap = BundleBootstrap::new(ctx, scope);
                    entry.bundle().initialize(&mut bootstrap)
                };
                ctx.stats.stop_detail(Stat::BundleInitTime, entry.key());

                result.map_err(|error| {
                    BootstrapError::callback_failed("bundle initialization", id, scope, error)
                })?;
                tracing::debug!(target: "weave::bundle", "Initialized bundle {}", entry.bundle().name());
                ctx.bundles.initialized.push(id);
            }
        }
        Ok(())
    }

    /// Accepted bundle instance
    pub fn entry(&self, id: ItemId) -> Option<&BundleEntry> {
        self.entries.get(&id)
    }

    /// Bundles initialized so far, in initialization order
    pub fn initialized(&self) -> &[ItemId] {
        &self.initialized
    }

    /// Completed resolution rounds
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Accepted bundles waiting for the next round
    pub fn pending(&self) -> &[ItemId] {
        &self.frontier
    }
}

fn candidate_of(entry: &BundleEntry) -> Candidate<'_> {
    Candidate {
        kind: ItemKind::Bundle,
        key: entry.key(),
        dedup_key: entry.bundle().dedup_key(),
        instance: entry.instance(),
    }
}
