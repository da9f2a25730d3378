//! Host normalization for template lookup and cookie keys

/// Lower-cased host of `url`, e.g. `www.shop.com` for
/// `http://www.shop.com/p/1`. Accepts scheme-less input such as `shop.com/x`.
pub fn site_of(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return host.to_lowercase();
        }
    }

    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host.split_once(':').map_or(host, |(host, _)| host);
    host.to_lowercase()
}

/// Registrable domain of a site: its last two labels (`shop.com` for
/// `www.shop.com`). Sites with fewer than three labels are returned as is.
pub fn domain_of(site: &str) -> String {
    let labels: Vec<&str> = site.split('.').collect();
    if labels.len() < 3 {
        return site.to_string();
    }
    labels[labels.len() - 2..].join(".")
}
