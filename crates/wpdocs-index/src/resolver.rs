//! Cross-reference resolution.
//!
//! Runs over a closed registry in four ordered passes:
//!
//! 1. **inheritance** — `extends` / `implements` names become symbol IDs
//! 2. **hook binding** — functions using a hook tag land in the hook's `used_by`
//! 3. **`@see`** — docblock references become symbol IDs
//! 4. **overrides** — methods are linked to the ancestor method they override
//!
//! Pass 4 reads the IDs written by pass 1, so the order is fixed. Every pass
//! only adds or rewrites reference fields; nothing is removed.

use crate::registry::Registry;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use wpdocs_core::{OverrideScope, ResolverConfig, Symbol, SymbolKind, HOOK_ID_PREFIX};

/// Counters accumulated across all passes. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// References rewritten to a symbol ID or linked as an edge.
    pub resolved: usize,
    /// Inheritance and `@see` references left as free text.
    pub unresolved: usize,
    /// `extends` / `implements` entries resolved.
    pub inheritance: usize,
    /// Function/method → hook edges.
    pub hook_bindings: usize,
    /// Methods linked to the method they override.
    pub overrides: usize,
}

/// Name → symbol lookup shared by the inheritance and `@see` passes.
#[derive(Debug, Default)]
pub struct SymbolLookup {
    ids: HashSet<String>,
    /// Short name -> IDs of every symbol with that name.
    by_name: HashMap<String, Vec<String>>,
}

impl SymbolLookup {
    pub fn build<'s>(symbols: impl IntoIterator<Item = &'s Symbol>) -> Self {
        let mut lookup = Self::default();
        for sym in symbols {
            lookup.ids.insert(sym.id.clone());
            lookup
                .by_name
                .entry(sym.name.clone())
                .or_default()
                .push(sym.id.clone());
        }
        lookup
    }

    /// Resolve a free-text name to a symbol ID.
    ///
    /// Resolution strategy:
    /// 1. Exact ID match
    /// 2. Exact match after normalizing `/` to the PHP namespace separator `\`
    /// 3. Short-name match (text after the last `\`, `/` or `:`), only if
    ///    exactly one symbol carries that name
    ///
    /// Ambiguous short names stay unresolved.
    pub fn find(&self, name: &str) -> Option<&str> {
        if let Some(id) = self.ids.get(name) {
            return Some(id.as_str());
        }

        let normalized = name.replace('/', "\\");
        if let Some(id) = self.ids.get(&normalized) {
            return Some(id.as_str());
        }

        let short = name
            .rsplit(|c: char| matches!(c, '\\' | '/' | ':'))
            .next()
            .unwrap_or(name);
        match self.by_name.get(short).map(Vec::as_slice) {
            Some([only]) => Some(only.as_str()),
            _ => None,
        }
    }
}

/// Strip the decoration a `@see` reference may carry: surrounding
/// whitespace and a trailing call suffix (`foo()` means `foo`).
pub fn clean_see_reference(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix("()").unwrap_or(trimmed).trim_end()
}

/// Connects symbols via inheritance, hook bindings, `@see` links and
/// method overrides.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    override_scope: OverrideScope,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            override_scope: config.override_scope,
        }
    }

    pub fn with_override_scope(mut self, scope: OverrideScope) -> Self {
        self.override_scope = scope;
        self
    }

    /// Run all four passes. Taking `&mut Registry` makes the resolver the
    /// only reader and writer for the duration.
    pub fn resolve_all(&self, registry: &mut Registry) -> ResolveStats {
        let symbols = registry.symbols_mut();
        let lookup = SymbolLookup::build(symbols.values());

        let mut order: Vec<String> = symbols.keys().cloned().collect();
        order.sort();

        let mut stats = ResolveStats::default();
        resolve_inheritance(symbols, &order, &lookup, &mut stats);
        resolve_hook_bindings(symbols, &order, &mut stats);
        resolve_see_references(symbols, &order, &lookup, &mut stats);
        resolve_method_overrides(symbols, &order, self.override_scope, &mut stats);

        tracing::info!(
            "Resolved {} cross-references ({} unresolved): {} inheritance, {} hook bindings, {} overrides",
            stats.resolved,
            stats.unresolved,
            stats.inheritance,
            stats.hook_bindings,
            stats.overrides,
        );
        stats
    }
}

fn resolve_inheritance(
    symbols: &mut HashMap<String, Symbol>,
    order: &[String],
    lookup: &SymbolLookup,
    stats: &mut ResolveStats,
) {
    for id in order {
        let Some(sym) = symbols.get_mut(id) else {
            continue;
        };
        if !sym.kind.is_inheritable() {
            continue;
        }

        for entry in sym.extends.iter_mut().chain(sym.implements.iter_mut()) {
            match lookup.find(entry) {
                Some(target) => {
                    if target != entry.as_str() {
                        *entry = target.to_string();
                    }
                    stats.inheritance += 1;
                    stats.resolved += 1;
                }
                None => {
                    tracing::debug!("{id}: unresolved parent type {entry}");
                    stats.unresolved += 1;
                }
            }
        }
    }
}

fn resolve_hook_bindings(
    symbols: &mut HashMap<String, Symbol>,
    order: &[String],
    stats: &mut ResolveStats,
) {
    let hooks_by_tag: HashMap<String, String> = symbols
        .values()
        .filter(|s| s.kind == SymbolKind::Hook)
        .filter_map(|s| Some((s.hook_tag.clone()?, s.id.clone())))
        .collect();
    if hooks_by_tag.is_empty() {
        return;
    }

    let mut bindings: Vec<(String, String)> = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for id in order {
        let Some(sym) = symbols.get(id) else {
            continue;
        };
        if !sym.kind.is_callable() {
            continue;
        }
        for used in &sym.uses {
            let tag = used.strip_prefix(HOOK_ID_PREFIX).unwrap_or(used);
            if let Some(hook_id) = hooks_by_tag.get(tag) {
                if seen.insert((hook_id.as_str(), id.as_str())) {
                    bindings.push((hook_id.clone(), id.clone()));
                }
            }
        }
    }

    for (hook_id, user_id) in bindings {
        if let Some(hook) = symbols.get_mut(&hook_id) {
            hook.add_used_by(&user_id);
            stats.hook_bindings += 1;
            stats.resolved += 1;
        }
    }
}

fn resolve_see_references(
    symbols: &mut HashMap<String, Symbol>,
    order: &[String],
    lookup: &SymbolLookup,
    stats: &mut ResolveStats,
) {
    for id in order {
        let Some(sym) = symbols.get_mut(id) else {
            continue;
        };
        for entry in sym.doc.see_also.iter_mut() {
            let reference = clean_see_reference(entry);
            if reference.is_empty() {
                continue;
            }
            match lookup.find(reference) {
                Some(target) => {
                    *entry = target.to_string();
                    stats.resolved += 1;
                }
                None => {
                    *entry = reference.to_string();
                    stats.unresolved += 1;
                }
            }
        }
    }
}

fn resolve_method_overrides(
    symbols: &mut HashMap<String, Symbol>,
    order: &[String],
    scope: OverrideScope,
    stats: &mut ResolveStats,
) {
    // Lookups only read `extends`, which this pass never writes, so links
    // can be found first and applied afterwards.
    let links: Vec<(String, String)> = order
        .iter()
        .filter_map(|id| {
            let method = symbols.get(id)?;
            if method.kind != SymbolKind::Method {
                return None;
            }
            let overridden = find_overridden(symbols, method, scope)?;
            Some((id.clone(), overridden))
        })
        .collect();

    for (method_id, overridden_id) in links {
        if let Some(method) = symbols.get_mut(&method_id) {
            method.overrides = Some(overridden_id.clone());
        }
        if let Some(overridden) = symbols.get_mut(&overridden_id) {
            overridden.add_used_by(&method_id);
        }
        stats.overrides += 1;
        stats.resolved += 1;
    }
}

/// Walk the owner's superclasses, nearest first, for a same-named method.
fn find_overridden(
    symbols: &HashMap<String, Symbol>,
    method: &Symbol,
    scope: OverrideScope,
) -> Option<String> {
    let owner_id = method.parent_id.as_deref()?;
    let Some(owner) = symbols.get(owner_id) else {
        tracing::debug!("{}: owner {owner_id} was never ingested", method.id);
        return None;
    };

    let mut visited: HashSet<&str> = HashSet::from([owner_id]);
    let mut queue: VecDeque<&str> = owner.extends.iter().map(String::as_str).collect();

    while let Some(ancestor_id) = queue.pop_front() {
        if !visited.insert(ancestor_id) {
            continue;
        }
        // Unresolved names are not IDs and have no methods to find.
        let Some(ancestor) = symbols.get(ancestor_id) else {
            continue;
        };

        let candidate = format!("{ancestor_id}::{}", method.name);
        if symbols
            .get(&candidate)
            .is_some_and(|m| m.kind == SymbolKind::Method && m.id != method.id)
        {
            return Some(candidate);
        }

        if scope == OverrideScope::Ancestors {
            queue.extend(ancestor.extends.iter().map(String::as_str));
        }
    }

    None
}
