pub mod codec;
pub mod etl;
pub mod pipeline;
pub mod rules;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
