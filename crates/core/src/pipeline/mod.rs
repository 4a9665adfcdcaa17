pub mod frame_normalizer;
pub mod frame_processor;
pub mod mode;
pub mod overlay;
pub mod pipeline_logger;
