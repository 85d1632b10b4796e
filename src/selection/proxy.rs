//! Download-URL proxying (spec §4.3 "Download-URL proxying").
//!
//! If a proxy base URL is configured, every outgoing `downloadURL` has
//! its scheme and host replaced with the proxy's, preserving path and
//! query. Any parse error falls back to the original URL untouched.

use url::Url;

pub fn rewrite_download_url(url_str: &str, proxy_base: Option<&Url>) -> String {
    let Some(base) = proxy_base else {
        return url_str.to_string();
    };

    let Ok(mut parsed) = Url::parse(url_str) else {
        tracing::warn!(url = url_str, "proxy rewrite: could not parse download URL");
        return url_str.to_string();
    };

    if parsed.set_scheme(base.scheme()).is_err() {
        tracing::warn!(url = url_str, "proxy rewrite: could not apply proxy scheme");
        return url_str.to_string();
    }
    if parsed.set_host(base.host_str()).is_err() {
        tracing::warn!(url = url_str, "proxy rewrite: could not apply proxy host");
        return url_str.to_string();
    }
    if parsed.set_port(base.port()).is_err() {
        tracing::warn!(url = url_str, "proxy rewrite: could not apply proxy port");
        return url_str.to_string();
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_proxy_returns_original() {
        assert_eq!(
            rewrite_download_url("https://blob.example.com/a/b?x=1", None),
            "https://blob.example.com/a/b?x=1"
        );
    }

    #[test]
    fn proxy_replaces_scheme_and_host_preserving_path_and_query() {
        let proxy = Url::parse("https://proxy.example.com:8443").unwrap();
        let rewritten =
            rewrite_download_url("http://blob.example.com/a/b?x=1", Some(&proxy));
        assert_eq!(rewritten, "https://proxy.example.com:8443/a/b?x=1");
    }

    #[test]
    fn malformed_url_falls_back_to_original() {
        let proxy = Url::parse("https://proxy.example.com").unwrap();
        assert_eq!(
            rewrite_download_url("not a url", Some(&proxy)),
            "not a url"
        );
    }
}
