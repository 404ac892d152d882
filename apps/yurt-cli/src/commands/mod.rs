pub mod configs;
pub mod draft;
pub mod preview;
pub mod publish;
pub mod show;
