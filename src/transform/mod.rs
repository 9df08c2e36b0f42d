//! Tree transforms for baseprint conversion
//!
//! - Retarget: rewrite HTML-shaped elements into their JATS equivalents
//! - Synthesize: fill required-but-absent front matter with placeholders
//!
//! Both passes mutate the owned XML tree in place before assembly. All
//! passes follow the same principle as the rest of the pipeline: O(n)
//! traversal, in-place mutation, stable node ids.

pub mod retarget;
pub mod synthesize;

pub use retarget::retarget;
pub use synthesize::synthesize_metadata;
