//! Gateway URL formatting

use chat_common::GatewayConfig;
use url::Url;

/// Query parameter value enabling transport compression
pub const ZLIB_STREAM: &str = "zlib-stream";

/// Build the socket URL: `?v=<version>&encoding=<json|etf>[&compress=zlib-stream]`.
///
/// Any query already present on `base` is replaced.
pub fn gateway_url(base: &str, config: &GatewayConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("v", &config.version.to_string())
            .append_pair("encoding", config.encoding.as_str());
        if config.compress {
            query.append_pair("compress", ZLIB_STREAM);
        }
    }
    Ok(url)
}
