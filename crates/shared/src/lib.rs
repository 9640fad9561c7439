pub mod domain;
pub mod error;
pub mod protocol;
pub mod scene;
pub mod timing;
