pub mod schema;
pub mod thread_responses;
