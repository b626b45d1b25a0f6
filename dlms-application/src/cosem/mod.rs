//! COSEM object model: class registry and object descriptors

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    CosemDescriptor, DescriptorKind, decode_attribute_descriptor, decode_method_descriptor,
    decode_selective_access_descriptor,
};
pub use registry::{CosemClass, CosemLookup, CosemRegistry};
