//! Service-specific tests
//!
//! HTTP services are exercised against a local `wiremock` server.
