pub mod pipeline_stats;
pub mod preview_sink;
pub mod progress_tracker;
pub mod run_state;
pub mod status_reporter;
pub mod tag_video_use_case;
pub mod tagger_config;
