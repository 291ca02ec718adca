pub mod fs;
pub mod http;
pub mod openpose;
pub mod system;
