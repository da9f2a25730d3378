//! Network access for chained requests
//!
//! [`Fetcher`] is the seam the resolver calls through. [`HttpClient`] is the
//! blocking `ureq` implementation with a rotating proxy list and a static
//! per-domain cookie set.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::config::Options;
use crate::error::{ClientError, FetchError};
use crate::site;

/// Raw response of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking GET with a referer. Shared across extraction threads.
///
/// Implementations report a non-200 answer either as `Err(FetchError::Status)`
/// or as a response with that status; callers treat both as failure.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str, referer: &str) -> Result<FetchResponse, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    /// Parse `name=value`, ignoring anything after the first `;`.
    pub fn parse(s: &str) -> Option<Self> {
        let pair = s.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Cookies keyed by registrable domain.
#[derive(Debug, Default)]
pub struct CookieStore {
    cookies: RwLock<HashMap<String, Vec<Cookie>>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<dir>/<domain>/<file>` where each file holds `name=value` lines.
    pub fn load_dir(dir: &Path) -> Result<Self, ClientError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ClientError::Io { path, source }
        };

        let mut cookies: HashMap<String, Vec<Cookie>> = HashMap::new();
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let domain_dir = entry.map_err(io_err(dir))?.path();
            if !domain_dir.is_dir() {
                continue;
            }
            let Some(name) = domain_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let domain = site::domain_of(&name.to_lowercase());

            for file in fs::read_dir(&domain_dir).map_err(io_err(&domain_dir))? {
                let file = file.map_err(io_err(&domain_dir))?.path();
                if !file.is_file() {
                    continue;
                }
                let content = fs::read_to_string(&file).map_err(io_err(&file))?;
                for (i, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let cookie = Cookie::parse(line)
                        .filter(|c| !c.value.is_empty())
                        .ok_or_else(|| ClientError::CookieFormat {
                            path: file.clone(),
                            line: i + 1,
                        })?;
                    cookies.entry(domain.clone()).or_default().push(cookie);
                }
            }
        }

        Ok(Self {
            cookies: RwLock::new(cookies),
        })
    }

    pub fn cookies_for(&self, url: &str) -> Vec<Cookie> {
        let domain = site::domain_of(&site::site_of(url));
        match self.cookies.read() {
            Ok(map) => map.get(&domain).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(&domain).cloned().unwrap_or_default(),
        }
    }

    /// `Cookie` header value for `url`, if any cookies are stored.
    pub fn header_for(&self, url: &str) -> Option<String> {
        let cookies = self.cookies_for(url);
        if cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Store cookies received from `url`, replacing same-name entries.
    pub fn set_cookies(&self, url: &str, received: Vec<Cookie>) {
        if received.is_empty() {
            return;
        }
        let domain = site::domain_of(&site::site_of(url));
        let mut map = match self.cookies.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stored = map.entry(domain).or_default();
        for cookie in received {
            match stored.iter_mut().find(|c| c.name == cookie.name) {
                Some(existing) => existing.value = cookie.value,
                None => stored.push(cookie),
            }
        }
    }
}

/// Round-robin over one agent per proxy.
pub struct ProxyList {
    agents: Vec<ureq::Agent>,
    cursor: Mutex<usize>,
}

impl ProxyList {
    pub fn new(
        proxies: &[String],
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let agents = proxies
            .iter()
            .map(|p| {
                let proxy = ureq::Proxy::new(p).map_err(|source| ClientError::InvalidProxy {
                    proxy: p.clone(),
                    source,
                })?;
                Ok(build_agent(user_agent, timeout, Some(proxy)))
            })
            .collect::<Result<_, ClientError>>()?;
        Ok(Self {
            agents,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn next_index(&self) -> Option<usize> {
        if self.agents.is_empty() {
            return None;
        }
        let mut cursor = match self.cursor.lock() {
            Ok(cursor) => cursor,
            Err(poisoned) => poisoned.into_inner(),
        };
        let index = *cursor;
        *cursor = (index + 1) % self.agents.len();
        Some(index)
    }

    pub fn next_agent(&self) -> Option<&ureq::Agent> {
        self.next_index().map(|i| &self.agents[i])
    }
}

/// One proxy URL per line; blank lines are skipped. A missing file means no
/// proxies.
pub fn read_proxy_file(path: &Path) -> Result<Vec<String>, ClientError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no proxy file, connecting directly");
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn build_agent(user_agent: &str, timeout: Duration, proxy: Option<ureq::Proxy>) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(user_agent)
            .http_status_as_error(false)
            .proxy(proxy)
            .build(),
    )
}

/// Blocking HTTP client used for chained requests.
pub struct HttpClient {
    direct: ureq::Agent,
    proxies: ProxyList,
    cookies: CookieStore,
}

impl HttpClient {
    pub fn from_options(options: &Options) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(options.timeout_secs);
        let proxies = match &options.proxy_file {
            Some(path) => read_proxy_file(path)?,
            None => Vec::new(),
        };
        let cookies = match &options.cookie_dir {
            Some(dir) => CookieStore::load_dir(dir)?,
            None => CookieStore::new(),
        };
        let proxies = ProxyList::new(&proxies, &options.user_agent, timeout)?;
        tracing::debug!(proxies = proxies.len(), "http client ready");

        Ok(Self {
            direct: build_agent(&options.user_agent, timeout, None),
            proxies,
            cookies,
        })
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }
}

impl Fetcher for HttpClient {
    fn get(&self, url: &str, referer: &str) -> Result<FetchResponse, FetchError> {
        let agent = self.proxies.next_agent().unwrap_or(&self.direct);

        let mut request = agent.get(url);
        if !referer.is_empty() {
            request = request.header("Referer", referer);
        }
        if let Some(cookie) = self.cookies.header_for(url) {
            request = request.header("Cookie", cookie.as_str());
        }

        let response = request.call()?;
        let status = response.status().as_u16();
        let received: Vec<Cookie> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(Cookie::parse)
            .collect();
        self.cookies.set_cookies(url, received);
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let body = response.into_body().read_to_vec()?;
        tracing::trace!(url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse { status, body })
    }
}
