//! Discussion threads as identifier trees

pub mod branch;
pub mod forest;
pub mod node;
pub mod traversal;

pub use branch::{Branch, DfsBranches};
pub use forest::SubmissionForest;
pub use node::{SerializedNode, SubmissionTreeNode, CREATED_UTC};
pub use traversal::{depth_first, Context, Resolver, Traversal, TreeNode};
