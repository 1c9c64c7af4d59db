//! Integration tests against an in-process mock device agent

mod mock_agent;
mod test_log_stream;
mod test_retry_policy;
