//! Filesystem helpers: recursive deletion, cross-filesystem relocation and
//! directory normalization.

pub mod clean;
pub mod normalize;
pub mod relocate;

pub use clean::delete_recursively;
pub use normalize::normalize;
pub use relocate::relocate_file;
pub use relocate::relocate_tree;
