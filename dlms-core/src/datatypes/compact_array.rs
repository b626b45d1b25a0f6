//! Compact array type for DLMS/COSEM protocol
//!
//! A compact array states the shape of its elements once, as a
//! [`TypeDescription`], followed by the untagged element contents.

use crate::datatypes::data_value::{DataType, DataValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type description of a COSEM Compact Array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescription {
    /// `array` tag, u16 element count, one element description
    Array {
        count: u16,
        element: Box<TypeDescription>,
    },
    /// `structure` tag, BER length, that many member descriptions
    Structure(Vec<TypeDescription>),
    /// Any other tag: one untagged value of that type
    Planar(DataType),
}

impl TypeDescription {
    /// Width of one element when every leaf is fixed-width
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            TypeDescription::Planar(t) => t.fixed_width(),
            TypeDescription::Array { count, element } => {
                element.fixed_width().map(|w| w * usize::from(*count))
            }
            TypeDescription::Structure(members) => members
                .iter()
                .map(TypeDescription::fixed_width)
                .sum::<Option<usize>>(),
        }
    }
}

impl fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescription::Planar(t) => f.write_str(t.name()),
            TypeDescription::Array { count, element } => write!(f, "array[{}] of {}", count, element),
            TypeDescription::Structure(members) => {
                f.write_str("structure{")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A COSEM compact array type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactArray {
    description: TypeDescription,
    elements: Vec<DataValue>,
}

impl CompactArray {
    pub fn new(description: TypeDescription, elements: Vec<DataValue>) -> Self {
        Self {
            description,
            elements,
        }
    }

    /// Get the type description
    pub fn description(&self) -> &TypeDescription {
        &self.description
    }

    pub fn elements(&self) -> &[DataValue] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_of_nested_description() {
        let desc = TypeDescription::Structure(vec![
            TypeDescription::Planar(DataType::LongUnsigned),
            TypeDescription::Array {
                count: 3,
                element: Box::new(TypeDescription::Planar(DataType::Unsigned)),
            },
        ]);
        assert_eq!(desc.fixed_width(), Some(5));
        assert_eq!(
            desc.to_string(),
            "structure{long-unsigned, array[3] of unsigned}"
        );

        let variable = TypeDescription::Structure(vec![TypeDescription::Planar(DataType::OctetString)]);
        assert_eq!(variable.fixed_width(), None);
    }
}
