pub mod identity_set;
pub mod match_result;
pub mod recognition_engine;
