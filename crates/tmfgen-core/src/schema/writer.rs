//! Schema visiting traits.
//!
//! This module provides the [`SchemaWriter`] trait, driven by
//! [`Schema::walk`](super::Schema::walk), for consuming a finished schema.

use super::{ClassNode, FieldRecord, NamespaceNode, Schema, TypeMapper};
use std::fmt::Result;

/// Trait for consuming schema elements in encounter order.
///
/// Every hook defaults to doing nothing, so implementors only override
/// what they care about.
///
/// # Example
///
/// ```
/// use tmfgen_core::schema::{FieldRecord, SchemaWriter};
///
/// struct FieldNames(Vec<String>);
///
/// impl SchemaWriter for FieldNames {
///     fn write_field(&mut self, field: &FieldRecord) -> std::fmt::Result {
///         self.0.push(field.name.clone());
///         Ok(())
///     }
/// }
/// ```
pub trait SchemaWriter {
    /// Called once before anything else
    fn write_schema(&mut self, schema: &Schema) -> Result {
        let _ = schema;
        Ok(())
    }

    /// Called for every namespace
    fn write_namespace(&mut self, namespace: &NamespaceNode) -> Result {
        let _ = namespace;
        Ok(())
    }

    /// Called for every event class
    fn write_class(&mut self, class: &ClassNode) -> Result {
        let _ = class;
        Ok(())
    }

    /// Called for every field of the preceding class
    fn write_field(&mut self, field: &FieldRecord) -> Result {
        let _ = field;
        Ok(())
    }
}

/// A no-op writer that discards all output
pub struct NullWriter;

impl SchemaWriter for NullWriter {}

/// A writer that collects statistics about a schema
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsWriter {
    /// Number of namespaces
    pub namespace_count: usize,
    /// Number of event classes
    pub class_count: usize,
    /// Number of fields
    pub field_count: usize,
    /// Fields whose type token had no direct wire type
    pub fallback_field_count: usize,
}

impl SchemaWriter for StatsWriter {
    fn write_namespace(&mut self, _namespace: &NamespaceNode) -> Result {
        self.namespace_count += 1;
        Ok(())
    }

    fn write_class(&mut self, _class: &ClassNode) -> Result {
        self.class_count += 1;
        Ok(())
    }

    fn write_field(&mut self, field: &FieldRecord) -> Result {
        self.field_count += 1;
        if !TypeMapper::is_mapped(&field.raw_type) {
            self.fallback_field_count += 1;
        }
        Ok(())
    }
}
