//! Identifier sanitizing and collision-free name allocation.
//!
//! Names are allocated in three independent scopes:
//!
//! - **namespace**: held by a [`NamespaceRegistry`], which lives as long as
//!   the caller wants. Sharing one registry across files (even across
//!   threads, it is internally locked) keeps namespace names unique for the
//!   whole run; a fresh registry per file isolates them.
//! - **class**: reset whenever a new namespace opens.
//! - **field**: reset whenever a new event body begins.
//!
//! Namespace and class collisions are suffixed `_1`, `_2`, ...; field
//! collisions are suffixed `1`, `2`, ... with no separator.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Default upper bound on sanitized field name length, in characters
pub const DEFAULT_MAX_FIELD_NAME_LEN: usize = 30;

/// Turns an already letter/digit-filtered name into a valid identifier for
/// some target language.
///
/// Rendering backends supply this since reserved words differ per
/// language.
pub trait IdentifierNormalizer: Send + Sync {
    /// Normalize `ident`, which may be empty
    fn normalize(&self, ident: &str) -> String;
}

/// Leaves identifiers untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl IdentifierNormalizer for Verbatim {
    fn normalize(&self, ident: &str) -> String {
        ident.to_string()
    }
}

/// Reduces free text to letters and digits, prefixing `_` when the result
/// does not start with a letter, then applies `normalizer`.
pub fn sanitize(text: &str, normalizer: &dyn IdentifierNormalizer) -> String {
    let mut name: String = text.chars().filter(|c| c.is_alphanumeric()).collect();
    if name.chars().next().is_some_and(|c| !c.is_alphabetic()) {
        name.insert(0, '_');
    }
    normalizer.normalize(&name)
}

/// Returns `base` if unused, otherwise the first free `base{sep}{n}` for
/// n = 1, 2, ..., and records the result in `used`.
fn allocate_unique(used: &mut HashSet<String>, base: &str, separator: &str) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{}{}{}", base, separator, counter);
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Namespace-scope name set, safe to share between parse runs and threads
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    used: Mutex<HashSet<String>>,
}

impl NamespaceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry ready for sharing
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Allocates a namespace name unique within this registry
    pub fn allocate(&self, base: &str) -> String {
        // The set is always left consistent, so a poisoned lock is still usable.
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        allocate_unique(&mut used, base, "_")
    }

    /// Returns true if `name` has already been handed out
    pub fn contains(&self, name: &str) -> bool {
        self.used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Number of names handed out so far
    pub fn len(&self) -> usize {
        self.used.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no name has been handed out
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Allocates sanitized, scope-unique names for namespaces, classes and
/// fields
#[derive(Clone)]
pub struct NameAllocator {
    namespaces: Arc<NamespaceRegistry>,
    classes: HashSet<String>,
    fields: HashSet<String>,
    normalizer: Arc<dyn IdentifierNormalizer>,
    max_field_name_len: usize,
}

impl std::fmt::Debug for NameAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameAllocator")
            .field("namespaces", &self.namespaces)
            .field("classes", &self.classes)
            .field("fields", &self.fields)
            .field("max_field_name_len", &self.max_field_name_len)
            .finish_non_exhaustive()
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameAllocator {
    /// Creates an allocator with its own namespace registry
    pub fn new() -> Self {
        Self {
            namespaces: NamespaceRegistry::shared(),
            classes: HashSet::new(),
            fields: HashSet::new(),
            normalizer: Arc::new(Verbatim),
            max_field_name_len: DEFAULT_MAX_FIELD_NAME_LEN,
        }
    }

    /// Uses `registry` for the namespace scope
    pub fn with_registry(mut self, registry: Arc<NamespaceRegistry>) -> Self {
        self.namespaces = registry;
        self
    }

    /// Uses `normalizer` to finish sanitized identifiers
    pub fn with_normalizer(mut self, normalizer: Arc<dyn IdentifierNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Sets the maximum sanitized field name length
    pub fn max_field_name_len(mut self, len: usize) -> Self {
        self.max_field_name_len = len;
        self
    }

    /// Returns the namespace registry in use
    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.namespaces
    }

    /// Sanitizes `text` with this allocator's normalizer
    pub fn sanitize(&self, text: &str) -> String {
        sanitize(text, self.normalizer.as_ref())
    }

    /// Allocates a namespace name and starts a fresh class scope
    pub fn allocate_namespace(&mut self, base: &str) -> String {
        self.classes.clear();
        self.namespaces.allocate(base)
    }

    /// Allocates a class name unique within the current namespace
    pub fn allocate_class(&mut self, base: &str) -> String {
        allocate_unique(&mut self.classes, base, "_")
    }

    /// Starts a fresh field scope for a new event body
    pub fn begin_fields(&mut self) {
        self.fields.clear();
    }

    /// Allocates a field name from raw field text.
    ///
    /// Text that sanitizes to nothing becomes `field{index}`; otherwise the
    /// name is cut to the configured length before disambiguation.
    pub fn allocate_field(&mut self, raw_name: &str, index: usize) -> String {
        let name = self.sanitize(raw_name);
        let base = if name.is_empty() {
            format!("field{}", index)
        } else {
            name.chars().take(self.max_field_name_len).collect()
        };
        allocate_unique(&mut self.fields, &base, "")
    }

    /// Clears class and field scopes; the namespace registry is untouched
    pub fn reset_local_scopes(&mut self) {
        self.classes.clear();
        self.fields.clear();
    }
}
