pub mod image_writer;
pub mod video_sink;
