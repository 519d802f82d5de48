//! End-to-end tests run against a deployed book service.
//!
//! Service url and credentials are taken from the environment:
//! `BOOKSERVICE_URL`, `BOOKSERVICE_ACCESS_TOKEN` or, when the token is not given,
//! `KEYCLOAK_URL`, `KEYCLOAK_CLIENT_SECRET`, `KEYCLOAK_USERNAME` and `KEYCLOAK_PASSWORD`.

#[cfg(any(feature = "system_tests", feature = "load_tests"))]
mod environment;
