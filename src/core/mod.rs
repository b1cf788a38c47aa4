pub mod classfile;
pub mod constant_pool;
pub mod decoder;
pub mod emitter;
pub mod encoder;
pub mod merge;
pub mod mutf8;
pub mod processor;
pub mod reader;

pub use crate::domain::model::{Descriptor, MergeStrategy, TestDirectives, TestUnit};
pub use crate::domain::ports::{Reporter, Storage};
pub use crate::utils::error::Result;
