use crate::domain::Listing;
use crate::storage::PUBLIC_OBJECT_PREFIX;
use reqwest::Url;

/// Image URLs the client is willing to render: public objects on known store hosts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageHosts {
    hosts: Vec<String>,
}

impl ImageHosts {
    pub fn new<I, H>(hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Allow-list holding the host of the store at `store_url`.
    pub fn for_store(store_url: &str) -> Self {
        let host = Url::parse(store_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        Self::new(host)
    }

    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
            && parsed.path().starts_with(PUBLIC_OBJECT_PREFIX)
    }

    /// The listing's image, if it may be rendered; `None` means show a placeholder.
    pub fn display_image<'a>(&self, listing: &'a Listing) -> Option<&'a str> {
        listing
            .image_url
            .as_deref()
            .filter(|url| self.allows(url))
    }
}
