//! Cookie jar storage
//!
//! Each store name maps to one cookie. The jar is a text file with one
//! cookie per line:
//!
//! ```text
//! ItemStore=W3siaWQiOjF9XQ; expires=1767225600
//! ```
//!
//! Values are base64url encoded so serialized JSON never clashes with the
//! `; ` separators of the cookie header. Cookies expire `cookie_lifetime`
//! after they were last saved.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use tracing::{debug, warn};

use super::adapter::KeyValueAdapter;
use super::error::{StorageError, StorageResult};
use super::file::{atomic_write, read_optional, remove_if_exists};
use super::profile::Profile;

/// Largest `name=value` pair a cookie may hold
pub const MAX_COOKIE_SIZE: usize = 4096;

const MEDIUM: &str = "cookie";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cookie {
    name: String,
    value: String,
    /// Unix seconds
    expires: i64,
}

impl Cookie {
    fn parse(line: &str) -> Option<Self> {
        let (pair, attrs) = line.split_once("; ")?;
        let (name, value) = pair.split_once('=')?;
        let expires = attrs.strip_prefix("expires=")?.trim().parse().ok()?;
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
            expires,
        })
    }

    fn to_line(&self) -> String {
        format!("{}={}; expires={}", self.name, self.value, self.expires)
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires <= now
    }
}

/// Storage adapter backed by the profile's cookie jar
#[derive(Debug, Clone)]
pub struct CookieAdapter {
    profile: Profile,
}

impl CookieAdapter {
    /// Create an adapter; fails if the profile has cookies disabled
    pub fn new(profile: Profile) -> StorageResult<Self> {
        if !profile.options().cookies_enabled {
            return Err(StorageError::Unavailable {
                medium: MEDIUM,
                reason: "cookies are disabled".to_string(),
            });
        }
        Ok(Self { profile })
    }

    /// The raw cookie header: live cookies joined by `"; "`
    pub fn header(&self) -> StorageResult<String> {
        let now = Utc::now().timestamp();
        let jar = self.load_jar()?;
        Ok(jar
            .iter()
            .filter(|c| !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn load_jar(&self) -> StorageResult<Vec<Cookie>> {
        let path = self.profile.cookie_jar_path();
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        let mut jar = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match Cookie::parse(line) {
                Some(cookie) => jar.push(cookie),
                None => warn!("Skipping malformed cookie line in {:?}", path),
            }
        }
        Ok(jar)
    }

    fn write_jar(&self, jar: &[Cookie]) -> StorageResult<()> {
        let path = self.profile.cookie_jar_path();
        if jar.is_empty() {
            return remove_if_exists(&path);
        }

        let mut content = jar
            .iter()
            .map(Cookie::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');
        atomic_write(&path, content.as_bytes())
    }
}

impl KeyValueAdapter for CookieAdapter {
    fn medium(&self) -> &'static str {
        MEDIUM
    }

    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let name = cookie_name(key);
        let encoded = URL_SAFE_NO_PAD.encode(value.as_bytes());

        let size = name.len() + 1 + encoded.len();
        if size > MAX_COOKIE_SIZE {
            warn!("Cookie '{}' is {} bytes, over the {} byte limit", name, size, MAX_COOKIE_SIZE);
            return Err(StorageError::QuotaExceeded {
                medium: MEDIUM,
                needed: size,
                limit: MAX_COOKIE_SIZE,
            });
        }

        let lifetime = self.profile.options().cookie_lifetime;
        let now = Utc::now().timestamp();
        let cookie = Cookie {
            name,
            value: encoded,
            expires: now + lifetime.as_secs() as i64,
        };

        let _guard = self.profile.cookie_lock();
        let mut jar = self.load_jar()?;
        jar.retain(|c| c.name != cookie.name && !c.is_expired(now));
        debug!("Setting cookie '{}' ({} bytes)", cookie.name, size);
        jar.push(cookie);
        self.write_jar(&jar)
    }

    fn retrieve(&self, key: &str) -> StorageResult<Option<String>> {
        let name = cookie_name(key);
        let header = {
            let _guard = self.profile.cookie_lock();
            self.header()?
        };

        let prefix = format!("{}=", name);
        let Some(raw) = header
            .split("; ")
            .find(|row| row.starts_with(&prefix))
            .map(|row| &row[prefix.len()..])
        else {
            return Ok(None);
        };

        if raw.is_empty() {
            return Ok(None);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|e| StorageError::InvalidFormat {
                path: self.profile.cookie_jar_path(),
                details: format!("cookie '{}': {}", name, e),
            })?;
        let value = String::from_utf8(bytes).map_err(|e| StorageError::InvalidFormat {
            path: self.profile.cookie_jar_path(),
            details: format!("cookie '{}': {}", name, e),
        })?;

        Ok(Some(value))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let name = cookie_name(key);
        let _guard = self.profile.cookie_lock();
        let mut jar = self.load_jar()?;
        let before = jar.len();
        jar.retain(|c| c.name != name);
        if jar.len() != before {
            self.write_jar(&jar)?;
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.profile.cookie_lock();
        self.write_jar(&[])
    }
}

/// Percent-encode the bytes a cookie name cannot carry, and `%` itself
fn cookie_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '%' | '=' | ';' | ',') || c.is_whitespace() || c.is_control() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                name.push_str(&format!("%{:02X}", byte));
            }
        } else {
            name.push(c);
        }
    }
    name
}
