/// Shared HTTP client for outbound provider calls.
///
/// Per-attempt deadlines are applied by callers, so the client itself has
/// no timeout configured.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}
