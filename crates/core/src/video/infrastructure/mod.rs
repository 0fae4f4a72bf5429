pub mod ffmpeg_pipe_source;
pub mod ffprobe_probe;
pub mod hwaccel;
pub mod raw_frame_reader;
