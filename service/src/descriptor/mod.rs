//! Descriptor model
//!
//! Immutable, shareable validation metadata built once per type: constraint
//! descriptors, property and executable descriptors and their cascading
//! metadata.

pub mod cascading;
pub mod constraint;
pub mod element;

pub use cascading::{CascadingMetaData, ContainerElementDescriptor, ContainerKind};
pub use constraint::{ConstraintDescriptor, ConstraintDescriptorBuilder, ConstraintId, Parameters};
pub use element::{
    BeanDescriptor, ConstraintSet, ExecutableDescriptor, ParameterDescriptor, PropertyDescriptor,
    ReturnValueDescriptor,
};
