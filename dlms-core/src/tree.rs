//! Labeled field tree produced by the decoders
//!
//! Every decoder appends [`Field`]s in wire order. A field names a byte
//! span of the buffer it was decoded from, optionally carries the
//! interpreted value and a human readable text, and owns its children.
//! Trees are built bottom-up: children are decoded first and the parent
//! span is known once they are done.
//!
//! Protocol anomalies that do not stop decoding are collected separately
//! as [`Annotation`]s.

use serde::Serialize;
use std::fmt::{self, Write as _};
use std::ops::Range;

/// Interpreted value of a primitive field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Boolean(bool),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl FieldValue {
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! field_value_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for FieldValue {
                fn from(v: $source) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )*
    };
}

field_value_from!(Unsigned as u64: u8, u16, u32, u64, usize);
field_value_from!(Signed as i64: i8, i16, i32, i64);
field_value_from!(Float as f64: f32, f64);

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Bytes(v.to_vec())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bytes(b) => write_hex(f, b),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Write bytes as space separated upper-case hex
pub fn write_hex(out: &mut impl fmt::Write, bytes: &[u8]) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write!(out, "{:02X}", b)?;
    }
    Ok(())
}

/// One labeled node of the decoded tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub span: Range<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            span,
            value: None,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Field>) -> Self {
        self.children = children;
        self
    }

    pub fn push(&mut self, child: Field) {
        self.children.push(child);
    }

    /// Number of bytes covered by this field
    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    /// Depth-first search for the first field named `name`, including `self`
    pub fn find(&self, name: &str) -> Option<&Field> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// All fields named `name` in depth-first order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Field> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Field>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect(name, found);
        }
    }

    /// Text shown for this node: the explicit text, else the value
    pub fn display_text(&self) -> Option<String> {
        self.text
            .clone()
            .or_else(|| self.value.as_ref().map(ToString::to_string))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_text() {
            Some(text) => write!(f, "{}: {}", self.name, text),
            None => f.write_str(&self.name),
        }
    }
}

/// Render fields as an indented text tree, one node per line
pub fn render_tree(fields: &[Field]) -> String {
    let mut out = String::new();
    for field in fields {
        render_into(&mut out, field, 0);
    }
    out
}

fn render_into(out: &mut String, field: &Field, depth: usize) {
    let _ = writeln!(
        out,
        "{:indent$}{} [{}..{}]",
        "",
        field,
        field.span.start,
        field.span.end,
        indent = depth * 4
    );
    for child in &field.children {
        render_into(out, child, depth + 1);
    }
}

/// Severity of an [`Annotation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => f.write_str("note"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// What an [`Annotation`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Non-success result code or exception content
    NoSuccess,
    /// Unknown COSEM class id
    NotImplemented,
    /// Valid protocol choice that is not decoded
    UnsupportedChoice,
    UnknownApdu,
    /// Bad HCS or FCS
    CheckSequence,
    Malformed,
}

/// A notable condition found while decoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub severity: Severity,
    pub kind: AnnotationKind,
    pub message: String,
    pub span: Range<usize>,
}

impl Annotation {
    pub fn new(
        severity: Severity,
        kind: AnnotationKind,
        message: impl Into<String>,
        span: Range<usize>,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn no_success(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Note, AnnotationKind::NoSuccess, message, span)
    }

    pub fn not_implemented(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Warning, AnnotationKind::NotImplemented, message, span)
    }

    pub fn unsupported_choice(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Note, AnnotationKind::UnsupportedChoice, message, span)
    }

    pub fn unknown_apdu(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Warning, AnnotationKind::UnknownApdu, message, span)
    }

    pub fn check_sequence(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Warning, AnnotationKind::CheckSequence, message, span)
    }

    pub fn malformed(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(Severity::Warning, AnnotationKind::Malformed, message, span)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}..{})",
            self.severity, self.message, self.span.start, self.span.end
        )
    }
}
