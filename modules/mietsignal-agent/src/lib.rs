pub mod engine;
pub mod llm;
pub mod places;
pub mod prompts;
pub mod resolver;
pub mod stages;
pub mod state;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
