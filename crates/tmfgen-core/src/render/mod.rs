//! C# rendering of event schemas.
//!
//! [`CSharpRenderer`] turns a [`Schema`] into C# source that manifest-based
//! decoders consume: one `[ManifestEvent]` class per event, one
//! `[EventField]` property per field.
//!
//! Identifiers reach the renderer already sanitized. Parse with
//! [`CSharpIdentifiers`] as the normalizer so that reserved words are
//! escaped the way the C# code provider does it.

use crate::naming::IdentifierNormalizer;
use crate::schema::{ClassNode, FieldRecord, NamespaceNode, Schema, WireType};
use std::fmt::Write as FmtWrite;

/// Configuration for C# rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: 4 spaces)
    pub indent_str: String,
    /// Namespace prefix above the component (default: `Microsoft.Etw`)
    pub root_namespace: String,
    /// Emit the original field text as a doc comment
    pub include_raw_names: bool,
    /// Tool name written into the generated-code banner
    pub generator: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
            root_namespace: "Microsoft.Etw".to_string(),
            include_raw_names: true,
            generator: "tmfgen".to_string(),
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the namespace prefix
    pub fn root_namespace(mut self, s: impl Into<String>) -> Self {
        self.root_namespace = s.into();
        self
    }

    /// Sets whether to emit raw field names as doc comments
    pub fn include_raw_names(mut self, include: bool) -> Self {
        self.include_raw_names = include;
        self
    }

    /// Sets the tool name in the banner
    pub fn generator(mut self, s: impl Into<String>) -> Self {
        self.generator = s.into();
        self
    }
}

/// C# reserved keywords
const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Prefixes `_` to C# keywords
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpIdentifiers;

impl IdentifierNormalizer for CSharpIdentifiers {
    fn normalize(&self, ident: &str) -> String {
        if CSHARP_KEYWORDS.contains(&ident) {
            format!("_{}", ident)
        } else {
            ident.to_string()
        }
    }
}

/// Returns the C# property type for a wire type
pub fn csharp_type(wire_type: WireType) -> &'static str {
    match wire_type {
        WireType::Int8 => "sbyte",
        WireType::UInt8 => "byte",
        WireType::Int16 => "short",
        WireType::UInt16 => "ushort",
        WireType::Int32 => "int",
        WireType::UInt32 => "uint",
        WireType::Int64 => "long",
        WireType::UInt64 => "ulong",
        WireType::Double => "double",
        WireType::Guid => "Guid",
        WireType::Sid => "System.Security.Principal.SecurityIdentifier",
        string => {
            debug_assert!(string.is_string());
            "string"
        }
    }
}

/// Renders schemas as C# source
#[derive(Debug, Clone, Default)]
pub struct CSharpRenderer {
    config: RenderConfig,
}

impl CSharpRenderer {
    /// Creates a renderer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom configuration
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render `schema` as a string
    pub fn render(&self, schema: &Schema) -> String {
        let mut output = String::new();
        // Writing into a String never fails.
        let _ = self.write_to(schema, &mut output);
        output
    }

    /// Write `schema` to a writer
    pub fn write_to(&self, schema: &Schema, w: &mut impl FmtWrite) -> std::fmt::Result {
        SourceWriter::new(w, &self.config).write_schema(schema)
    }
}

struct SourceWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
    indent_level: usize,
}

impl<'a, W: FmtWrite> SourceWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a RenderConfig) -> Self {
        Self {
            writer,
            config,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn open_block(&mut self, header: &str) -> std::fmt::Result {
        self.writeln(header)?;
        self.writeln("{")?;
        self.indent();
        Ok(())
    }

    fn close_block(&mut self) -> std::fmt::Result {
        self.dedent();
        self.writeln("}")
    }

    fn write_schema(&mut self, schema: &Schema) -> std::fmt::Result {
        writeln!(self.writer, "//")?;
        writeln!(self.writer, "//    This code was generated by {}", self.config.generator)?;
        writeln!(self.writer, "//")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "using System;")?;
        writeln!(self.writer)?;

        let component = CSharpIdentifiers.normalize(&schema.provider.component_name);
        let mut path = Vec::with_capacity(3);
        if !self.config.root_namespace.is_empty() {
            path.push(self.config.root_namespace.as_str());
        }
        path.push(component.as_str());
        path.push(schema.provider.source_file_token.as_str());
        self.open_block(&format!("namespace {}", path.join(".")))?;

        for (i, namespace) in schema.namespaces.iter().enumerate() {
            if i > 0 {
                writeln!(self.writer)?;
            }
            self.write_namespace(namespace)?;
        }

        self.close_block()
    }

    fn write_namespace(&mut self, namespace: &NamespaceNode) -> std::fmt::Result {
        self.open_block(&format!("namespace {}", namespace.name))?;
        for (i, class) in namespace.classes.iter().enumerate() {
            if i > 0 {
                writeln!(self.writer)?;
            }
            self.write_class(class)?;
        }
        self.close_block()
    }

    fn write_class(&mut self, class: &ClassNode) -> std::fmt::Result {
        let opcode = if class.opcode.is_empty() {
            "0"
        } else {
            class.opcode.as_str()
        };
        self.writeln(&format!(
            "[ManifestEvent(\"{}\", {})]",
            escape_string(&class.provider_id),
            opcode
        ))?;
        self.open_block(&format!("class Line{}", class.name))?;
        for (i, field) in class.fields.iter().enumerate() {
            if i > 0 {
                writeln!(self.writer)?;
            }
            self.write_field(field)?;
        }
        self.close_block()
    }

    fn write_field(&mut self, field: &FieldRecord) -> std::fmt::Result {
        if self.config.include_raw_names {
            self.writeln(&format!(
                "/// <summary>{}</summary>",
                escape_xml(&field.raw_name)
            ))?;
        }
        self.writeln(&format!(
            "[EventField(0, {}, \"{}\")]",
            field.index,
            field.wire_type.as_str()
        ))?;
        self.writeln(&format!(
            "public {} {} {{ get; set; }}",
            csharp_type(field.wire_type),
            field.name
        ))
    }
}

/// Escape a string for a C# string literal
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape text for an XML doc comment
fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ProviderHeader, TypeMapper};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        let field = |index: usize, name: &str, raw_name: &str, raw_type: &str| FieldRecord {
            index,
            name: name.to_string(),
            raw_name: raw_name.to_string(),
            raw_type: raw_type.to_string(),
            wire_type: TypeMapper::map(raw_type),
        };

        Schema {
            provider: ProviderHeader::new("f73bbb29", "RgsClientsLib", "locator.cs"),
            namespaces: vec![
                NamespaceNode {
                    name: "Locate".to_string(),
                    function_name: "Locate".to_string(),
                    classes: vec![ClassNode {
                        name: "120".to_string(),
                        locator: "locator_cs120".to_string(),
                        provider_id: "f73bbb29".to_string(),
                        opcode: "11".to_string(),
                        fields: vec![
                            field(0, "uri", "uri", "ItemWString"),
                            field(1, "count", "count <n>", "ItemLong"),
                        ],
                    }],
                },
                NamespaceNode {
                    name: "Stop".to_string(),
                    function_name: "Stop".to_string(),
                    classes: vec![ClassNode {
                        name: "7".to_string(),
                        locator: "locator_cs7".to_string(),
                        provider_id: "f73bbb29".to_string(),
                        opcode: "12".to_string(),
                        fields: Vec::new(),
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_render() {
        let expected = r#"//
//    This code was generated by tmfgen
//

using System;

namespace Microsoft.Etw.RgsClientsLib.locator_cs
{
    namespace Locate
    {
        [ManifestEvent("f73bbb29", 11)]
        class Line120
        {
            /// <summary>uri</summary>
            [EventField(0, 0, "win:UnicodeString")]
            public string uri { get; set; }

            /// <summary>count &lt;n&gt;</summary>
            [EventField(0, 1, "win:Int32")]
            public int count { get; set; }
        }
    }

    namespace Stop
    {
        [ManifestEvent("f73bbb29", 12)]
        class Line7
        {
        }
    }
}
"#;
        assert_eq!(CSharpRenderer::new().render(&schema()), expected);
    }

    #[test]
    fn test_render_without_raw_names() {
        let config = RenderConfig::new()
            .include_raw_names(false)
            .root_namespace("")
            .indent_str("\t");
        let output = CSharpRenderer::with_config(config).render(&schema());
        assert!(!output.contains("<summary>"));
        assert!(output.contains("namespace RgsClientsLib.locator_cs\n"));
        assert!(output.contains("\t\tclass Line120\n"));
    }

    #[test]
    fn test_csharp_identifiers() {
        assert_eq!(CSharpIdentifiers.normalize("class"), "_class");
        assert_eq!(CSharpIdentifiers.normalize("Class"), "Class");
        assert_eq!(CSharpIdentifiers.normalize(""), "");
    }

    #[test]
    fn test_csharp_type() {
        assert_eq!(csharp_type(WireType::UInt64), "ulong");
        for wire_type in [
            WireType::AnsiString,
            WireType::UnicodeString,
            WireType::AnsiStringPref,
            WireType::UnicodeStringPref,
        ] {
            assert_eq!(csharp_type(wire_type), "string");
        }
        assert_ne!(csharp_type(WireType::Sid), "string");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b"), "a\\\"b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
    }
}
