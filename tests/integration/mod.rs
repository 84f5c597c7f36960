pub mod api_endpoints_test;
pub mod auth_integration_test;
pub mod admin_flow_test;
pub mod challenge_flow_test;
