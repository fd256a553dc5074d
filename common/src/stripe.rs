use std::sync::OnceLock;

use stripe::Client;

static CLIENT: OnceLock<Client> = OnceLock::new();

/// Returns the process-wide Stripe client, creating it on first use.
///
/// Later calls ignore `secret_key` and hand out the client built first.
pub fn client(secret_key: &str) -> &'static Client {
    CLIENT.get_or_init(|| Client::new(secret_key.to_string()))
}
