//! Type lattice, variable/instruction model, structured CFG, and static IR
//! for SSA construction.
//!
//! This crate is the data layer: the entity types, the type lattice, the
//! instruction and structured-component model, and the immutable static
//! form handed to a code generator. The resolution algorithm itself
//! (`ssagen-frontend`) is built on top of these types but lives in its own
//! crate, the way `cranelift-codegen`'s `ir` module is consumed by
//! `cranelift-frontend`.

pub mod component;
pub mod constant;
pub mod error;
pub mod flatten;
pub mod inspect;
pub mod instruction;
pub mod opcode;
pub mod static_ir;
pub mod types;
pub mod variable;

pub use component::{Component, ComponentData, Function, Role};
pub use constant::Constant;
pub use error::{CompileError, CompileResult};
pub use instruction::{Instruction, Operand, Use};
pub use opcode::{Arity, Opcode, OpcodeInfo};
pub use types::{Type, TypeTable};
pub use variable::{DefId, Variable};
