//! Event schema model and construction.
//!
//! ## Architecture
//!
//! A parse run is handled by [`TmfParser`], which:
//!
//! 1. Opens an [`EventScanner`] over the input and reads the preamble
//! 2. Feeds every scanned [`EventRecord`] into a [`SchemaBuilder`]
//! 3. Returns the finished [`Schema`], or the first error
//!
//! The resulting tree is
//! component/source file → [`NamespaceNode`] (one per run of events from
//! the same function) → [`ClassNode`] (one per event) → [`FieldRecord`].
//!
//! ## Extensibility
//!
//! The [`SchemaWriter`] trait visits a finished schema, which is how
//! renderers and statistics collectors consume it.

mod wire;
mod writer;

use crate::error::{Error, Result};
use crate::naming::{IdentifierNormalizer, NameAllocator, NamespaceRegistry};
use crate::scanner::EventScanner;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub use wire::{TypeMapper, TypeMapping, WireType, DEFAULT_WIRE_TYPE};
pub use writer::{NullWriter, SchemaWriter, StatsWriter};

/// Provider identity parsed once from a file's preamble
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderHeader {
    /// Provider GUID text
    pub provider_id: String,
    /// Component name
    pub component_name: String,
    /// Source file name with `-` and `.` replaced by `_`
    pub source_file_token: String,
}

impl ProviderHeader {
    /// Creates a header, deriving the source file token from `source_file`
    pub fn new(provider_id: &str, component_name: &str, source_file: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            component_name: component_name.to_string(),
            source_file_token: source_file.replace(['-', '.'], "_"),
        }
    }
}

/// A field of an event body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    /// 0-based position within the event
    pub index: usize,
    /// Sanitized identifier, unique within the event
    pub name: String,
    /// Field text as written in the TMF
    pub raw_name: String,
    /// Legacy type token as written in the TMF
    pub raw_type: String,
    /// Canonical wire type
    pub wire_type: WireType,
}

/// One `#typev` event as scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Source file plus line token
    pub locator: String,
    /// Locator with the source file token removed
    pub line_number: String,
    /// Opcode digits
    pub opcode: String,
    /// Sanitized function name used for namespace grouping
    pub function_name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldRecord>,
}

/// An event class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    /// Line number, disambiguated within the namespace
    pub name: String,
    /// Call site locator the event came from
    pub locator: String,
    /// Provider GUID text
    pub provider_id: String,
    /// Opcode digits
    pub opcode: String,
    /// Fields in declaration order
    pub fields: Vec<FieldRecord>,
}

/// A run of consecutive events from the same function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    /// Function name, disambiguated within the namespace registry
    pub name: String,
    /// Function name before disambiguation
    pub function_name: String,
    /// Event classes in encounter order
    pub classes: Vec<ClassNode>,
}

/// The schema of one TMF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Provider identity from the preamble
    pub provider: ProviderHeader,
    /// Namespaces in encounter order
    pub namespaces: Vec<NamespaceNode>,
}

impl Schema {
    /// Returns the `(component, source file token)` pair grouping this schema
    pub fn root_key(&self) -> (&str, &str) {
        (
            &self.provider.component_name,
            &self.provider.source_file_token,
        )
    }

    /// Iterates over every class in encounter order
    pub fn classes(&self) -> impl Iterator<Item = &ClassNode> {
        self.namespaces.iter().flat_map(|ns| ns.classes.iter())
    }

    /// Total number of event classes
    pub fn class_count(&self) -> usize {
        self.classes().count()
    }

    /// Returns true if no event was found
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Returns the conventional output filename, `<component>.<source>.cs`
    pub fn output_filename(&self) -> String {
        format!(
            "{}.{}.cs",
            self.provider.component_name, self.provider.source_file_token
        )
    }

    /// Visits the schema depth-first in encounter order
    pub fn walk<W: SchemaWriter + ?Sized>(&self, writer: &mut W) -> std::fmt::Result {
        writer.write_schema(self)?;
        for namespace in &self.namespaces {
            writer.write_namespace(namespace)?;
            for class in &namespace.classes {
                writer.write_class(class)?;
                for field in &class.fields {
                    writer.write_field(field)?;
                }
            }
        }
        Ok(())
    }
}

/// Accumulates scanned events into a [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    provider: ProviderHeader,
    namespaces: Vec<NamespaceNode>,
}

impl SchemaBuilder {
    /// Creates a builder for the file described by `provider`
    pub fn new(provider: ProviderHeader) -> Self {
        Self {
            provider,
            namespaces: Vec::new(),
        }
    }

    /// Adds an event, opening a new namespace when its function differs
    /// from the previous event's
    pub fn push_event(&mut self, event: EventRecord, names: &mut NameAllocator) {
        let same_function = self
            .namespaces
            .last()
            .is_some_and(|ns| ns.function_name == event.function_name);

        if !same_function {
            let name = names.allocate_namespace(&event.function_name);
            debug!("Opening namespace {} for {}", name, event.function_name);
            self.namespaces.push(NamespaceNode {
                name,
                function_name: event.function_name.clone(),
                classes: Vec::new(),
            });
        }

        let class = ClassNode {
            name: names.allocate_class(&event.line_number),
            locator: event.locator,
            provider_id: self.provider.provider_id.clone(),
            opcode: event.opcode,
            fields: event.fields,
        };

        if let Some(namespace) = self.namespaces.last_mut() {
            namespace.classes.push(class);
        }
    }

    /// Returns the finished schema
    pub fn finish(self) -> Schema {
        Schema {
            provider: self.provider,
            namespaces: self.namespaces,
        }
    }
}

/// Parses TMF input into schemas.
///
/// Parse runs on the same parser share its namespace registry; class and
/// field scopes start empty for every run.
#[derive(Debug, Clone, Default)]
pub struct TmfParser {
    names: NameAllocator,
}

impl TmfParser {
    /// Creates a parser with its own namespace registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser around a configured allocator
    pub fn with_allocator(names: NameAllocator) -> Self {
        Self { names }
    }

    /// Shares `registry` for namespace names
    pub fn with_registry(mut self, registry: Arc<NamespaceRegistry>) -> Self {
        self.names = self.names.with_registry(registry);
        self
    }

    /// Uses `normalizer` for every sanitized identifier
    pub fn with_normalizer(mut self, normalizer: Arc<dyn IdentifierNormalizer>) -> Self {
        self.names = self.names.with_normalizer(normalizer);
        self
    }

    /// Parses TMF text from `reader`
    pub fn parse<R: BufRead>(&mut self, reader: R) -> Result<Schema> {
        self.names.reset_local_scopes();

        let mut scanner = EventScanner::new(reader)?;
        let mut builder = SchemaBuilder::new(scanner.header().clone());
        while let Some(event) = scanner.next_event(&mut self.names)? {
            builder.push_event(event, &mut self.names);
        }

        let schema = builder.finish();
        debug!(
            "Parsed {} namespaces, {} classes from {} lines",
            schema.namespaces.len(),
            schema.class_count(),
            scanner.line_number()
        );
        Ok(schema)
    }

    /// Parses TMF text held in memory
    pub fn parse_str(&mut self, text: &str) -> Result<Schema> {
        self.parse(Cursor::new(text))
    }

    /// Parses a TMF file
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<Schema> {
        let path = path.as_ref();
        debug!("Parsing {}", path.display());
        let file = std::fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
        self.parse(BufReader::new(file))
    }
}

/// Parses a TMF file with a fresh parser
pub fn parse_file(path: impl AsRef<Path>) -> Result<Schema> {
    TmfParser::new().parse_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(function: &str, line: &str) -> EventRecord {
        EventRecord {
            locator: format!("src_c{}", line),
            line_number: line.to_string(),
            opcode: "10".to_string(),
            function_name: function.to_string(),
            fields: Vec::new(),
        }
    }

    #[test]
    fn test_source_file_token() {
        let header = ProviderHeader::new("guid", "Comp", "match-making.locator.cs");
        assert_eq!(header.source_file_token, "match_making_locator_cs");
    }

    #[test]
    fn test_builder_groups_consecutive_functions() {
        let mut names = NameAllocator::new();
        let mut builder = SchemaBuilder::new(ProviderHeader::new("guid", "Comp", "src.c"));
        builder.push_event(event("Open", "10"), &mut names);
        builder.push_event(event("Open", "12"), &mut names);
        builder.push_event(event("Close", "20"), &mut names);

        let schema = builder.finish();
        assert_eq!(schema.namespaces.len(), 2);
        assert_eq!(schema.namespaces[0].name, "Open");
        assert_eq!(schema.namespaces[0].classes.len(), 2);
        assert_eq!(schema.namespaces[1].name, "Close");
        assert_eq!(schema.class_count(), 3);
        assert!(schema.classes().all(|c| c.provider_id == "guid"));
    }

    #[test]
    fn test_builder_reopens_recurring_function() {
        let mut names = NameAllocator::new();
        let mut builder = SchemaBuilder::new(ProviderHeader::new("guid", "Comp", "src.c"));
        builder.push_event(event("Open", "10"), &mut names);
        builder.push_event(event("Close", "20"), &mut names);
        builder.push_event(event("Open", "30"), &mut names);

        let schema = builder.finish();
        let names: Vec<_> = schema.namespaces.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Open", "Close", "Open_1"]);
    }

    #[test]
    fn test_builder_disambiguates_class_names() {
        let mut names = NameAllocator::new();
        let mut builder = SchemaBuilder::new(ProviderHeader::new("guid", "Comp", "src.c"));
        builder.push_event(event("Open", "10"), &mut names);
        builder.push_event(event("Open", "10"), &mut names);

        let schema = builder.finish();
        let classes: Vec<_> = schema.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(classes, ["10", "10_1"]);
    }

    #[test]
    fn test_output_filename() {
        let schema = SchemaBuilder::new(ProviderHeader::new("guid", "Comp", "a.cpp")).finish();
        assert_eq!(schema.output_filename(), "Comp.a_cpp.cs");
        assert_eq!(schema.root_key(), ("Comp", "a_cpp"));
        assert!(schema.is_empty());
    }
}
