//! The error taxonomy (§7). `StructuralInvariant` is deliberately not a
//! variant carried through `Result`: violating it is an internal logic
//! error and the program aborts via [`bug!`] rather than returning.

use crate::types::Type;
use crate::variable::Variable;

/// A typed, recoverable failure raised at the function-compile boundary.
/// Every variant here corresponds to a fatal-but-reportable condition in
/// §7; `StructuralInvariant` has no variant because it never returns.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unresolved use of variable {variable:?} in block {block:?}")]
    UnresolvedUse { variable: Variable, block: crate::component::Component },

    #[error("type meet failure at {site}: {lhs} ∧ {rhs} = void")]
    TypeMeetFailure { site: String, lhs: String, rhs: String },

    #[error("definition-id counter exhausted for variable {0:?}")]
    CapacityExhaustion(Variable),
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn type_meet_failure(types: &crate::types::TypeTable, site: impl Into<String>, lhs: Type, rhs: Type) -> Self {
        CompileError::TypeMeetFailure {
            site: site.into(),
            lhs: types.name(lhs).to_string(),
            rhs: types.name(rhs).to_string(),
        }
    }
}

/// Signal an impossible configuration reached despite well-formed input:
/// a violated structural invariant, never a reportable user-facing error.
#[macro_export]
macro_rules! bug {
    ($($arg:tt)*) => {
        panic!("structural invariant violated: {}", format!($($arg)*))
    };
}

#[allow(unused)]
fn _assert_send_sync() {
    fn assert<T: Send + Sync>() {}
    assert::<CompileError>();
}
