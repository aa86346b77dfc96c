//! Resilient HTTP execution: policies, retry budgeting, and the API client.

pub mod client;
pub mod policy;
pub mod retry;
