#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_sink;
pub mod image_file_writer;
#[cfg(feature = "opencv")]
pub mod opencv_sink;
pub mod output_paths;
