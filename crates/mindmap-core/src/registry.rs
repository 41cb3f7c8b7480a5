// crates/mindmap-core/src/registry.rs
//
// The build-once registry behind both conversion directions: variant
// declarations indexed by tag and kind, compiled discriminators, and a
// resolved hook table for every declared variant. Handler resolution is
// the extensibility mechanism: a variant with no declared handler inherits
// the closest ancestor's hooks, so new variants participate in conversion
// without touching the engine. All of this is computed once in `new` and
// immutable afterwards, so one registry can serve any number of concurrent
// conversions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::convert::Warnings;
use crate::element::{AttrMap, Element, ElementKind};
use crate::handlers;
use crate::node::GenericNode;
use crate::schema::{self, VariantDecl};

/// What a typed-tree hook wants done with its element afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Keep,
    /// Remove the element (and its subtree) from the tree.
    Detach,
}

/// Structural-pass decode hook: runs while the element's children are still
/// generic nodes and may claim or discard them. `Detach` drops the whole
/// subtree from the decoded tree.
pub type PreDecodeFn = fn(&mut Element, &mut Vec<GenericNode>, &mut Warnings) -> HookOutcome;

/// Finishing-pass hook over the typed tree, invoked with the element and
/// its parent. Hooks operate on that pair only; tree traversal belongs to
/// the engine.
pub type TypedHookFn = fn(&mut Element, Option<&mut Element>, &mut Warnings) -> HookOutcome;

/// Finishing-pass hook over the generic tree produced by encode.
pub type RawHookFn = fn(&mut GenericNode, &mut Warnings);

/// Encode-side override for the effective child list.
pub type GetChildrenFn = fn(&Element) -> Vec<Element>;

/// Encode-side override for the effective attribute set.
pub type GetAttributesFn = fn(&Element) -> AttrMap;

/// One named hook declaration. Each variant may claim each slot at most
/// once; violations surface when the registry is built, never during a
/// conversion.
#[derive(Clone, Copy)]
pub enum Hook {
    PreDecode(PreDecodeFn),
    PostDecode(TypedHookFn),
    PreEncode(TypedHookFn),
    PostEncode(RawHookFn),
    GetChildren(GetChildrenFn),
    GetAttributes(GetAttributesFn),
}

impl Hook {
    pub fn slot(&self) -> &'static str {
        match self {
            Hook::PreDecode(_) => "pre_decode",
            Hook::PostDecode(_) => "post_decode",
            Hook::PreEncode(_) => "pre_encode",
            Hook::PostEncode(_) => "post_encode",
            Hook::GetChildren(_) => "get_children",
            Hook::GetAttributes(_) => "get_attributes",
        }
    }
}

/// Resolved per-variant callback slots.
#[derive(Clone, Copy, Default, Debug)]
pub struct HookTable {
    pub pre_decode: Option<PreDecodeFn>,
    pub post_decode: Option<TypedHookFn>,
    pub pre_encode: Option<TypedHookFn>,
    pub post_encode: Option<RawHookFn>,
    pub get_children: Option<GetChildrenFn>,
    pub get_attributes: Option<GetAttributesFn>,
}

const EMPTY_HOOKS: HookTable = HookTable {
    pre_decode: None,
    post_decode: None,
    pre_encode: None,
    post_encode: None,
    get_children: None,
    get_attributes: None,
};

/// A handler declaration: hooks claimed by one variant. Declaring a second
/// handler for the same variant is not an error; the later declaration
/// replaces the earlier one during resolution.
pub struct HandlerDecl {
    pub kind: ElementKind,
    pub hooks: Vec<Hook>,
}

impl HandlerDecl {
    pub fn new(kind: ElementKind) -> Self {
        HandlerDecl {
            kind,
            hooks: Vec::new(),
        }
    }

    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("variant {0:?} is declared more than once")]
    DuplicateVariant(ElementKind),

    #[error("variant {kind:?} claims hook slot \"{slot}\" more than once")]
    DuplicateHook {
        kind: ElementKind,
        slot: &'static str,
    },

    #[error("handler declared for undeclared variant {0:?}")]
    UndeclaredHandler(ElementKind),

    #[error("variant {kind:?} names undeclared parent {parent:?}")]
    UndeclaredParent {
        kind: ElementKind,
        parent: ElementKind,
    },

    #[error("variant hierarchy contains a cycle through {0:?}")]
    CyclicHierarchy(ElementKind),

    #[error("invalid discriminator pattern for {kind:?}: {source}")]
    InvalidDiscriminator {
        kind: ElementKind,
        #[source]
        source: regex::Error,
    },
}

/// Outcome of tag/discriminator resolution for one generic node.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact(ElementKind),
    /// Several discriminators matched; the most-recently-declared variant
    /// was chosen. Deterministic, but worth a diagnostic.
    Ambiguous {
        chosen: ElementKind,
        contenders: Vec<ElementKind>,
    },
    /// No declared variant owns this node; it falls back to the catch-all.
    Unresolved,
}

impl Resolution {
    pub fn kind(&self) -> ElementKind {
        match self {
            Resolution::Exact(kind) => *kind,
            Resolution::Ambiguous { chosen, .. } => *chosen,
            Resolution::Unresolved => ElementKind::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    variants: Vec<VariantDecl>,
    by_kind: HashMap<ElementKind, usize>,
    by_tag: HashMap<&'static str, Vec<usize>>,
    /// Compiled discriminators, parallel to `variants`.
    discriminators: Vec<Vec<(Regex, Regex)>>,
    handlers: HashMap<ElementKind, HookTable>,
}

impl Registry {
    /// Build a registry from variant and handler declarations. All
    /// definition-time validation happens here: duplicate variants,
    /// dangling parents, hierarchy cycles, bad discriminator patterns and
    /// over-claimed hook slots are build errors, not conversion errors.
    pub fn new(
        variants: Vec<VariantDecl>,
        handler_decls: Vec<HandlerDecl>,
    ) -> Result<Self, RegistryError> {
        let mut by_kind = HashMap::new();
        let mut by_tag: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (i, decl) in variants.iter().enumerate() {
            if by_kind.insert(decl.kind, i).is_some() {
                return Err(RegistryError::DuplicateVariant(decl.kind));
            }
            if !decl.tag.is_empty() {
                by_tag.entry(decl.tag).or_default().push(i);
            }
        }

        for decl in &variants {
            if let Some(parent) = decl.parent {
                if !by_kind.contains_key(&parent) {
                    return Err(RegistryError::UndeclaredParent {
                        kind: decl.kind,
                        parent,
                    });
                }
            }
        }
        // With parents validated, only a cycle can keep a chain walk from
        // terminating within the variant count.
        for decl in &variants {
            let mut current = decl.kind;
            for _ in 0..=variants.len() {
                match variants[by_kind[&current]].parent {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            if variants[by_kind[&current]].parent.is_some() {
                return Err(RegistryError::CyclicHierarchy(decl.kind));
            }
        }

        let mut discriminators = Vec::with_capacity(variants.len());
        for decl in &variants {
            let mut compiled = Vec::with_capacity(decl.discriminator.len());
            for (key_pat, val_pat) in &decl.discriminator {
                let key_re = full_match(key_pat)
                    .map_err(|source| RegistryError::InvalidDiscriminator { kind: decl.kind, source })?;
                let val_re = full_match(val_pat)
                    .map_err(|source| RegistryError::InvalidDiscriminator { kind: decl.kind, source })?;
                compiled.push((key_re, val_re));
            }
            discriminators.push(compiled);
        }

        // Collapse each handler declaration into a hook table, checking
        // that no slot is claimed twice by one declaration.
        let mut declared: Vec<(ElementKind, HookTable)> = Vec::with_capacity(handler_decls.len());
        for decl in &handler_decls {
            if !by_kind.contains_key(&decl.kind) {
                return Err(RegistryError::UndeclaredHandler(decl.kind));
            }
            let mut table = HookTable::default();
            for hook in &decl.hooks {
                let slot = hook.slot();
                let duplicate = match hook {
                    Hook::PreDecode(f) => table.pre_decode.replace(*f).is_some(),
                    Hook::PostDecode(f) => table.post_decode.replace(*f).is_some(),
                    Hook::PreEncode(f) => table.pre_encode.replace(*f).is_some(),
                    Hook::PostEncode(f) => table.post_encode.replace(*f).is_some(),
                    Hook::GetChildren(f) => table.get_children.replace(*f).is_some(),
                    Hook::GetAttributes(f) => table.get_attributes.replace(*f).is_some(),
                };
                if duplicate {
                    return Err(RegistryError::DuplicateHook {
                        kind: decl.kind,
                        slot,
                    });
                }
            }
            declared.push((decl.kind, table));
        }

        let mut registry = Registry {
            variants,
            by_kind,
            by_tag,
            discriminators,
            handlers: HashMap::new(),
        };

        // Resolve a handler for every variant, declared or not: walk the
        // declared handlers in declaration order and keep the best match
        // seen so far. A candidate must be a supertype of the variant and
        // a specialization of the previous best, so a later sibling can
        // never displace a closer ancestor, while a later declaration for
        // the exact same variant replaces the earlier one.
        for i in 0..registry.variants.len() {
            let kind = registry.variants[i].kind;
            let mut best: Option<(ElementKind, HookTable)> = None;
            for (hkind, table) in &declared {
                if !registry.is_supertype(*hkind, kind) {
                    continue;
                }
                let improves = match best {
                    None => true,
                    Some((best_kind, _)) => registry.is_supertype(best_kind, *hkind),
                };
                if improves {
                    best = Some((*hkind, *table));
                }
            }
            let table = best.map(|(_, table)| table).unwrap_or(EMPTY_HOOKS);
            registry.handlers.insert(kind, table);
        }

        Ok(registry)
    }

    /// The process-wide standard Freeplane registry. Built once, read-only,
    /// shareable across threads.
    pub fn standard() -> &'static Registry {
        static STANDARD: LazyLock<Registry> = LazyLock::new(|| {
            Registry::new(
                schema::standard_variants().to_vec(),
                handlers::standard_handlers(),
            )
            .expect("standard variant set is valid")
        });
        &STANDARD
    }

    pub fn variant(&self, kind: ElementKind) -> Option<&VariantDecl> {
        self.by_kind.get(&kind).map(|&i| &self.variants[i])
    }

    /// Fresh element of a declared kind with its defaults applied; `None`
    /// for kinds this registry does not declare. This is the constructor
    /// for kinds declared against a custom registry.
    pub fn new_element(&self, kind: ElementKind) -> Option<Element> {
        self.variant(kind).map(Element::from_variant)
    }

    /// The resolved hook table for a variant. Undeclared kinds get the
    /// empty table.
    pub fn hooks(&self, kind: ElementKind) -> &HookTable {
        self.handlers.get(&kind).unwrap_or(&EMPTY_HOOKS)
    }

    /// Whether `ancestor` is a supertype of (or equal to) `kind` in the
    /// declared variant hierarchy.
    pub fn is_supertype(&self, ancestor: ElementKind, kind: ElementKind) -> bool {
        let mut current = kind;
        loop {
            if current == ancestor {
                return true;
            }
            match self.variant(current).and_then(|decl| decl.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Resolve which variant a generic node decodes to. Pure function of
    /// the registry contents and the node's tag and attributes.
    ///
    /// Candidates are the declared variants owning the tag. Variants with
    /// a matching discriminator are preferred; among several the
    /// most-recently-declared wins (reported as ambiguous). With no
    /// discriminator match the discriminator-free variant owning the tag
    /// is used; with no candidates at all resolution falls through to the
    /// catch-all.
    pub fn resolve_kind(
        &self,
        tag: &str,
        attributes: &indexmap::IndexMap<String, String>,
    ) -> Resolution {
        let Some(indices) = self.by_tag.get(tag) else {
            return Resolution::Unresolved;
        };
        let mut bare = None;
        let mut matched = Vec::new();
        for &i in indices {
            let decl = &self.variants[i];
            if decl.discriminator.is_empty() {
                bare = Some(decl.kind);
            } else if self.discriminator_matches(i, attributes) {
                matched.push(decl.kind);
            }
        }
        match matched.last().copied() {
            Some(chosen) if matched.len() > 1 => Resolution::Ambiguous {
                chosen,
                contenders: matched,
            },
            Some(chosen) => Resolution::Exact(chosen),
            None => match bare {
                Some(kind) => Resolution::Exact(kind),
                None => Resolution::Unresolved,
            },
        }
    }

    fn discriminator_matches(
        &self,
        index: usize,
        attributes: &indexmap::IndexMap<String, String>,
    ) -> bool {
        self.discriminators[index].iter().all(|(key_re, val_re)| {
            attributes
                .iter()
                .any(|(key, value)| key_re.is_match(key) && val_re.is_match(value))
        })
    }
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}
