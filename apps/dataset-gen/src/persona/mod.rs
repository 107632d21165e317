//! Persona pipeline: statistical sampling of base fields, constrained LLM
//! completion of the rest, and the offline base-field validation pass.

pub mod completion;
pub mod prompts;
pub mod sampler;
pub mod validation;
