//! Concurrent symbol store.
//!
//! One coarse `RwLock` guards the primary map and both secondary indices so
//! that an insert is observed either fully or not at all. Ingestion shares
//! the registry by `&Registry`; resolution takes `&mut Registry` and works on
//! the symbols without locking.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use wpdocs_core::{hook_id, DocBlock, HookCall, HookType, SourceLocation, Symbol, SymbolKind};

#[derive(Debug, Default)]
struct RegistryInner {
    symbols: HashMap<String, Symbol>,
    /// Kind -> IDs, in first-insertion order.
    by_kind: HashMap<SymbolKind, Vec<String>>,
    /// File -> IDs, in first-insertion order.
    by_file: HashMap<String, Vec<String>>,
}

impl RegistryInner {
    fn index(&mut self, sym: &Symbol) {
        self.by_kind
            .entry(sym.kind)
            .or_default()
            .push(sym.id.clone());
        self.by_file
            .entry(sym.location.file.clone())
            .or_default()
            .push(sym.id.clone());
    }

    fn unindex(&mut self, sym: &Symbol) {
        if let Some(ids) = self.by_kind.get_mut(&sym.kind) {
            ids.retain(|id| id != &sym.id);
        }
        if let Some(ids) = self.by_file.get_mut(&sym.location.file) {
            ids.retain(|id| id != &sym.id);
        }
    }

    fn move_file(&mut self, id: &str, from: &str, to: &str) {
        if let Some(ids) = self.by_file.get_mut(from) {
            ids.retain(|i| i != id);
        }
        self.by_file
            .entry(to.to_string())
            .or_default()
            .push(id.to_string());
    }

    fn collect(&self, ids: Option<&Vec<String>>) -> Vec<Symbol> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.symbols.get(id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }
}

/// What [`Registry::upsert_hook`] did with a hook call event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookUpsert {
    /// First event for the tag; a hook symbol was created.
    Created,
    /// The call site was added to the existing hook symbol.
    Merged,
    /// The call site was already recorded; nothing changed.
    Duplicate,
    /// The tag was blank; nothing was recorded.
    Ignored,
}

/// Ordering that picks which call a hook takes its docs, params, type and
/// location from: documented calls first, then the earliest location.
/// The remaining fields only break ties between calls on the same line.
type RepresentativeKey<'a> = (bool, &'a str, usize, Option<HookType>, &'a str, &'a str);

fn representative_key<'a>(
    doc: &'a DocBlock,
    location: &'a SourceLocation,
    hook_type: Option<HookType>,
) -> RepresentativeKey<'a> {
    (
        doc.is_empty(),
        location.file.as_str(),
        location.start_line,
        hook_type,
        doc.summary.as_str(),
        doc.description.as_str(),
    )
}

/// Store of every symbol produced during one generation run.
///
/// Entries are never removed. Reads return owned snapshots, so callers can
/// iterate while other threads keep inserting.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer can only poison the lock between whole-entry
    // updates, so the data behind a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner_mut(&mut self) -> &mut RegistryInner {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the symbol stored under `symbol.id`.
    ///
    /// Concurrent inserts to the same ID are last-write-wins. Replacing an
    /// entry with a different kind or file moves it between index buckets.
    pub fn insert(&self, symbol: Symbol) {
        let mut inner = self.write();
        match inner.symbols.remove(&symbol.id) {
            Some(previous)
                if previous.kind == symbol.kind
                    && previous.location.file == symbol.location.file => {}
            Some(previous) => {
                inner.unindex(&previous);
                inner.index(&symbol);
            }
            None => inner.index(&symbol),
        }
        inner.symbols.insert(symbol.id.clone(), symbol);
    }

    /// Fold one hook-firing event into the `hook:<tag>` symbol.
    ///
    /// The first event for a tag creates the symbol; later events add their
    /// call site, skipping exact duplicates, and `call_sites` stays sorted.
    /// Docs, params, hook type and location come from the representative
    /// call: documented calls first, then the smallest (file, line). The
    /// merged symbol is the same whatever order the events arrive in.
    /// Blank tags are ignored.
    pub fn upsert_hook(&self, call: HookCall) -> HookUpsert {
        if call.tag.trim().is_empty() {
            tracing::debug!(
                "{}:{}: ignoring hook call with a blank tag",
                call.location.file,
                call.location.start_line
            );
            return HookUpsert::Ignored;
        }

        let id = hook_id(&call.tag);
        let mut inner = self.write();

        let Some(existing) = inner.symbols.get_mut(&id) else {
            let sym = call.into_symbol();
            inner.index(&sym);
            inner.symbols.insert(id, sym);
            return HookUpsert::Created;
        };

        let site = call.call_site();
        let Err(pos) = existing.call_sites.binary_search(&site) else {
            return HookUpsert::Duplicate;
        };
        existing.call_sites.insert(pos, site);

        let takes_over = representative_key(&call.doc, &call.location, Some(call.hook_type))
            < representative_key(&existing.doc, &existing.location, existing.hook_type);
        if !takes_over {
            return HookUpsert::Merged;
        }

        let previous = std::mem::replace(&mut existing.location, call.location);
        existing.doc = call.doc;
        existing.params = call.params;
        existing.hook_type = Some(call.hook_type);
        existing.language = call.language;
        let file = existing.location.file.clone();
        if previous.file != file {
            inner.move_file(&id, &previous.file, &file);
        }
        HookUpsert::Merged
    }

    /// Look up a symbol by ID. A miss is a normal outcome.
    pub fn get(&self, id: &str) -> Option<Symbol> {
        self.read().symbols.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().symbols.contains_key(id)
    }

    /// Snapshot of every symbol, sorted by ID.
    pub fn all(&self) -> Vec<Symbol> {
        let mut all: Vec<Symbol> = self.read().symbols.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Symbols of one kind. Callers must not rely on the order.
    pub fn by_kind(&self, kind: SymbolKind) -> Vec<Symbol> {
        let inner = self.read();
        inner.collect(inner.by_kind.get(&kind))
    }

    /// Symbols defined in one file. Callers must not rely on the order.
    pub fn by_file(&self, path: &str) -> Vec<Symbol> {
        let inner = self.read();
        inner.collect(inner.by_file.get(path))
    }

    pub fn count(&self) -> usize {
        self.read().symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn count_by_kind(&self, kind: SymbolKind) -> usize {
        self.read().by_kind.get(&kind).map_or(0, Vec::len)
    }

    pub fn count_by_language(&self, language: &str) -> usize {
        self.read()
            .symbols
            .values()
            .filter(|s| s.language == language)
            .count()
    }

    /// Exclusive access to the primary map for the resolution phase.
    pub(crate) fn symbols_mut(&mut self) -> &mut HashMap<String, Symbol> {
        &mut self.inner_mut().symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wpdocs_core::HookType;

    fn func(id: &str, file: &str) -> Symbol {
        Symbol::new(id, id, SymbolKind::Function, "php").at(file, 1, 3)
    }

    #[test]
    fn insert_and_get() {
        let reg = Registry::new();
        reg.insert(func("wp_die", "wp-includes/functions.php"));

        assert_eq!(reg.count(), 1);
        assert_eq!(reg.get("wp_die").unwrap().name, "wp_die");
        assert!(reg.get("missing").is_none());
        assert!(reg.contains("wp_die"));
    }

    #[test]
    fn indices_by_kind_and_file() {
        let reg = Registry::new();
        reg.insert(func("a", "one.php"));
        reg.insert(func("b", "one.php"));
        reg.insert(Symbol::new("C", "C", SymbolKind::Class, "php").at("two.php", 1, 9));

        assert_eq!(reg.by_kind(SymbolKind::Function).len(), 2);
        assert_eq!(reg.by_kind(SymbolKind::Class).len(), 1);
        assert!(reg.by_kind(SymbolKind::Trait).is_empty());
        assert_eq!(reg.by_file("one.php").len(), 2);
        assert_eq!(reg.by_file("two.php")[0].id, "C");
        assert!(reg.by_file("three.php").is_empty());
    }

    #[test]
    fn replacing_an_entry_does_not_duplicate_index_slots() {
        let reg = Registry::new();
        reg.insert(func("a", "one.php"));
        let mut updated = func("a", "one.php");
        updated.doc.summary = "Second version.".to_string();
        reg.insert(updated);

        assert_eq!(reg.count(), 1);
        assert_eq!(reg.by_kind(SymbolKind::Function).len(), 1);
        assert_eq!(reg.get("a").unwrap().doc.summary, "Second version.");
    }

    #[test]
    fn replacing_with_new_kind_moves_index_bucket() {
        let reg = Registry::new();
        reg.insert(func("Thing", "one.php"));
        reg.insert(Symbol::new("Thing", "Thing", SymbolKind::Class, "php").at("two.php", 1, 2));

        assert!(reg.by_kind(SymbolKind::Function).is_empty());
        assert_eq!(reg.count_by_kind(SymbolKind::Class), 1);
        assert!(reg.by_file("one.php").is_empty());
        assert_eq!(reg.by_file("two.php").len(), 1);
    }

    #[test]
    fn all_is_sorted_snapshot() {
        let reg = Registry::new();
        reg.insert(func("zeta", "z.php"));
        reg.insert(func("alpha", "a.php"));
        let ids: Vec<String> = reg.all().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn count_by_language() {
        let reg = Registry::new();
        reg.insert(func("a", "a.php"));
        reg.insert(Symbol::new("Button", "Button", SymbolKind::Component, "js").at("b.js", 1, 1));
        assert_eq!(reg.count_by_language("php"), 1);
        assert_eq!(reg.count_by_language("js"), 1);
        assert_eq!(reg.count_by_language("go"), 0);
    }

    #[test]
    fn hook_upsert_creates_then_merges() {
        let reg = Registry::new();
        let first = HookCall::new("init", HookType::Action, "wp-settings.php", 700);
        let second = HookCall::new("init", HookType::Action, "wp-admin/admin.php", 12);

        assert_eq!(reg.upsert_hook(first.clone()), HookUpsert::Created);
        assert_eq!(reg.upsert_hook(second), HookUpsert::Merged);
        assert_eq!(reg.upsert_hook(first), HookUpsert::Duplicate);

        let hook = reg.get("hook:init").unwrap();
        assert_eq!(hook.call_sites.len(), 2);
        assert_eq!(reg.count_by_kind(SymbolKind::Hook), 1);
    }

    #[test]
    fn hook_upsert_prefers_earliest_documented_call() {
        let reg = Registry::new();
        reg.upsert_hook(HookCall::new("shutdown", HookType::Action, "a.php", 1));

        let mut later = HookCall::new("shutdown", HookType::Action, "c.php", 3);
        later.doc.summary = "Something else.".to_string();
        reg.upsert_hook(later);

        let mut documented = HookCall::new("shutdown", HookType::Action, "b.php", 2);
        documented.doc.summary = "Fires just before PHP shuts down.".to_string();
        reg.upsert_hook(documented);

        let hook = reg.get("hook:shutdown").unwrap();
        assert_eq!(hook.doc.summary, "Fires just before PHP shuts down.");
        assert_eq!(hook.location.file, "b.php");
        assert_eq!(hook.call_sites.len(), 3);
        assert_eq!(reg.by_file("b.php").len(), 1);
        assert!(reg.by_file("a.php").is_empty());
        assert!(reg.by_file("c.php").is_empty());
    }

    #[test]
    fn hook_merge_does_not_depend_on_arrival_order() {
        let mut first = HookCall::new("the_content", HookType::Filter, "b.php", 20);
        first.doc.summary = "Filters the post content.".to_string();
        first.caller = Some("the_content".to_string());
        let mut second = HookCall::new("the_content", HookType::Action, "a.php", 10);
        second.doc.summary = "Fires with the post content.".to_string();
        let undocumented = HookCall::new("the_content", HookType::Filter, "0.php", 1);

        let forward = Registry::new();
        for call in [first.clone(), second.clone(), undocumented.clone()] {
            forward.upsert_hook(call);
        }
        let backward = Registry::new();
        for call in [undocumented, second, first] {
            backward.upsert_hook(call);
        }

        let hook = forward.get("hook:the_content").unwrap();
        assert_eq!(hook, backward.get("hook:the_content").unwrap());
        assert_eq!(hook.doc.summary, "Fires with the post content.");
        assert_eq!(hook.hook_type, Some(HookType::Action));
        assert_eq!(hook.location.file, "a.php");
        let files: Vec<&str> = hook.call_sites.iter().map(|c| c.file.as_str()).collect();
        assert_eq!(files, vec!["0.php", "a.php", "b.php"]);
        assert_eq!(forward.by_file("a.php").len(), 1);
        assert_eq!(backward.by_file("a.php").len(), 1);
    }

    #[test]
    fn blank_hook_tags_are_ignored() {
        let reg = Registry::new();
        assert_eq!(
            reg.upsert_hook(HookCall::new("", HookType::Action, "a.php", 1)),
            HookUpsert::Ignored
        );
        assert_eq!(
            reg.upsert_hook(HookCall::new("  ", HookType::Filter, "a.php", 2)),
            HookUpsert::Ignored
        );
        assert!(reg.is_empty());
        assert!(!reg.contains("hook:"));
    }

    #[test]
    fn concurrent_inserts_are_not_lost() {
        let reg = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        reg.insert(func(&format!("f_{t}_{i}"), &format!("file_{t}.php")));
                        reg.upsert_hook(HookCall::new("init", HookType::Action, format!("file_{t}.php"), i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(reg.count(), 801);
        assert_eq!(reg.by_kind(SymbolKind::Function).len(), 800);
        assert_eq!(reg.get("hook:init").unwrap().call_sites.len(), 800);
    }
}
