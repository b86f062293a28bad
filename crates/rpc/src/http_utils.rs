pub fn redacted_endpoint_label(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return "unknown".to_string();
    }
    match reqwest::Url::parse(endpoint) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("unknown");
            match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            }
        }
        Err(_) => "invalid_endpoint".to_string(),
    }
}

pub(crate) fn classify_request_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else if error.is_request() {
        "request"
    } else if error.is_body() {
        "body"
    } else if error.is_decode() {
        "decode"
    } else {
        "other"
    }
}

pub(crate) fn is_not_found_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("not found") || lowered.contains("transaction_hash_not_found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_label_drops_path_and_query() {
        assert_eq!(
            redacted_endpoint_label(
                "https://starknet-mainnet.g.alchemy.com/starknet/version/rpc/v0_7/secret-key"
            ),
            "https://starknet-mainnet.g.alchemy.com"
        );
        assert_eq!(
            redacted_endpoint_label("http://127.0.0.1:9545/rpc?token=abc"),
            "http://127.0.0.1:9545"
        );
        assert_eq!(redacted_endpoint_label("  "), "unknown");
        assert_eq!(redacted_endpoint_label("not a url"), "invalid_endpoint");
    }

    #[test]
    fn not_found_markers_are_case_insensitive() {
        assert!(is_not_found_message("Transaction hash not found"));
        assert!(is_not_found_message("TRANSACTION_HASH_NOT_FOUND"));
        assert!(!is_not_found_message("Invalid params"));
    }
}
