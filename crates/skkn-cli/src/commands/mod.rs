pub mod allocate;
pub mod context;
pub mod prompt;
pub mod run;
pub mod session;
