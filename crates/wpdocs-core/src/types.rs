use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::WpdocsError;

/// ID prefix shared by every hook symbol (`hook:<tag>`).
pub const HOOK_ID_PREFIX: &str = "hook:";

/// Build the registry ID for a hook tag.
pub fn hook_id(tag: &str) -> String {
    format!("{HOOK_ID_PREFIX}{tag}")
}

// ── Symbol Kinds ────────────────────────────────────────────────────────────

/// The kind of a documented program entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Property,
    Constant,
    Interface,
    Trait,
    Enum,
    /// A named extension point fired with `do_action` / `apply_filters`.
    Hook,
    /// A JS UI component (block editor).
    Component,
}

impl SymbolKind {
    /// Every kind, in listing order.
    pub const ALL: [SymbolKind; 10] = [
        Self::Function,
        Self::Class,
        Self::Method,
        Self::Property,
        Self::Constant,
        Self::Interface,
        Self::Trait,
        Self::Enum,
        Self::Hook,
        Self::Component,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Constant => "constant",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Hook => "hook",
            Self::Component => "component",
        }
    }

    /// Kinds whose `extends` / `implements` lists are resolved.
    pub fn is_inheritable(&self) -> bool {
        matches!(self, Self::Class | Self::Interface)
    }

    /// Kinds that can fire or consume hooks.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SymbolKind {
    type Err = WpdocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| WpdocsError::InvalidSymbolKind(s.to_string()))
    }
}

// ── Hook Types ──────────────────────────────────────────────────────────────

/// Distinguishes fire-and-forget actions from transform-and-return filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Action,
    Filter,
}

impl HookType {
    /// Classify a call by the name of the hook-firing function.
    ///
    /// Returns `None` for anything that does not fire a hook.
    pub fn from_hook_function(function: &str) -> Option<Self> {
        match function {
            "do_action" | "do_action_ref_array" => Some(Self::Action),
            "apply_filters" | "apply_filters_ref_array" => Some(Self::Filter),
            _ => None,
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => write!(f, "action"),
            Self::Filter => write!(f, "filter"),
        }
    }
}

impl std::str::FromStr for HookType {
    type Err = WpdocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "action" => Ok(Self::Action),
            "filter" => Ok(Self::Filter),
            _ => Err(WpdocsError::InvalidHookType(s.to_string())),
        }
    }
}

// ── Signatures & Docs ───────────────────────────────────────────────────────

/// A function/method parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_variadic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_nullable: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_pass_by_ref: bool,
}

/// A function/method return value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnValue {
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
}

/// Structured documentation attached to a symbol.
///
/// `see_also` and `links` hold raw references at extraction time; the
/// resolver rewrites resolvable `see_also` entries to symbol IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocBlock {
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub see_also: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// public, private or protected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
}

impl DocBlock {
    /// True when the block carries no prose and no tags.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.description.is_empty() && self.tags.is_empty()
    }
}

// ── Locations ───────────────────────────────────────────────────────────────

/// Where a symbol is defined. `file` is relative to the source root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLocation {
    pub file: String,
    /// 1-based.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
}

/// One place a hook is fired from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub line: usize,
    /// ID of the enclosing function or method, when the call is not top-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
}

// ── Symbols ─────────────────────────────────────────────────────────────────

/// A documented program entity.
///
/// Reference fields (`extends`, `implements`, `uses`, `used_by`,
/// `overrides`, `doc.see_also`) hold either a resolved symbol ID or the
/// original free text; consumers check the registry to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Fully qualified: `wp_insert_post`, `WP_Query::query`, `hook:init`.
    pub id: String,
    /// Short display name.
    pub name: String,
    pub kind: SymbolKind,
    /// "php" or "js".
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub doc: DocBlock,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Owning class/interface/trait ID for methods and properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_type: Option<HookType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_sites: Vec<CallSite>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<String>,

    #[serde(default)]
    pub location: SourceLocation,
}

impl Symbol {
    /// Create a bare symbol with every optional field empty.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: SymbolKind,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            language: language.into(),
            namespace: None,
            doc: DocBlock::default(),
            params: Vec::new(),
            returns: None,
            extends: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            parent_id: None,
            hook_type: None,
            hook_tag: None,
            call_sites: Vec::new(),
            used_by: Vec::new(),
            uses: Vec::new(),
            overrides: None,
            location: SourceLocation::default(),
        }
    }

    /// Set the definition location.
    pub fn at(mut self, file: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        self.location = SourceLocation {
            file: file.into(),
            start_line,
            end_line,
        };
        self
    }

    /// Add `id` to `used_by` unless already present.
    pub fn add_used_by(&mut self, id: &str) -> bool {
        push_unique(&mut self.used_by, id)
    }
}

/// Append `value` unless it is already in `list`. Returns whether it was added.
pub fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

// ── Hook Calls ──────────────────────────────────────────────────────────────

/// One extraction event for a hook-firing call (`do_action('init')`).
///
/// Extractors emit these instead of hook symbols; the registry folds all
/// events for one tag into a single `hook:<tag>` symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCall {
    pub tag: String,
    pub hook_type: HookType,
    #[serde(default = "default_language")]
    pub language: String,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// Docblock directly above the call.
    #[serde(default)]
    pub doc: DocBlock,
    /// Parameters declared by the docblock's `@param` tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

fn default_language() -> String {
    "php".to_string()
}

impl HookCall {
    pub fn new(tag: impl Into<String>, hook_type: HookType, file: impl Into<String>, line: usize) -> Self {
        Self {
            tag: tag.into(),
            hook_type,
            language: default_language(),
            location: SourceLocation {
                file: file.into(),
                start_line: line,
                end_line: line,
            },
            caller: None,
            doc: DocBlock::default(),
            params: Vec::new(),
        }
    }

    /// The call-site entry this event contributes.
    pub fn call_site(&self) -> CallSite {
        CallSite {
            file: self.location.file.clone(),
            line: self.location.start_line,
            caller: self.caller.clone(),
        }
    }

    /// Build the hook symbol created by the first event for a tag.
    pub fn into_symbol(self) -> Symbol {
        let call_site = self.call_site();
        let mut sym = Symbol::new(hook_id(&self.tag), self.tag.clone(), SymbolKind::Hook, self.language);
        sym.hook_type = Some(self.hook_type);
        sym.hook_tag = Some(self.tag);
        sym.doc = self.doc;
        sym.params = self.params;
        sym.call_sites = vec![call_site];
        sym.location = self.location;
        sym
    }
}
