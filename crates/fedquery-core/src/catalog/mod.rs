//! Declarations of the root collection and the relations joined onto it.

mod relation;
mod schema;

pub use relation::{Cardinality, JoinType, RelationDecl};
pub use schema::{FederationSchema, RootDecl};
