pub mod errors;
pub mod invocation;
pub mod job;
pub mod keypoints;
pub mod model;
pub mod outputs;
pub mod progress;
