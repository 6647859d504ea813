//! Proxy transforms and the ordered chains built from them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::ports::HttpMethod;

/// A named, pure rewrite of a target URL into a proxied URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyTransform {
    Codetabs,
    Allorigins,
    Corsproxy,
    Thingproxy,
}

impl ProxyTransform {
    pub const ALL: [ProxyTransform; 4] = [
        ProxyTransform::Codetabs,
        ProxyTransform::Allorigins,
        ProxyTransform::Corsproxy,
        ProxyTransform::Thingproxy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProxyTransform::Codetabs => "codetabs",
            ProxyTransform::Allorigins => "allorigins",
            ProxyTransform::Corsproxy => "corsproxy",
            ProxyTransform::Thingproxy => "thingproxy",
        }
    }

    pub fn parse(name: &str) -> DomainResult<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| {
                DomainError::Config(format!(
                    "Unknown proxy '{}'. Valid proxies: codetabs, allorigins, corsproxy, thingproxy",
                    name
                ))
            })
    }

    /// Rewrite `target` into the proxied URL
    pub fn rewrite(&self, target: &str) -> String {
        match self {
            ProxyTransform::Codetabs => format!(
                "https://api.codetabs.com/v1/proxy?quest={}",
                urlencoding::encode(target)
            ),
            ProxyTransform::Allorigins => format!(
                "https://api.allorigins.win/raw?url={}",
                urlencoding::encode(target)
            ),
            ProxyTransform::Corsproxy => {
                format!("https://corsproxy.io/?{}", urlencoding::encode(target))
            }
            ProxyTransform::Thingproxy => format!("https://thingproxy.freeboard.io/fetch/{}", target),
        }
    }

    /// Whether the proxy forwards request bodies
    pub fn supports_body(&self) -> bool {
        !matches!(self, ProxyTransform::Allorigins)
    }
}

impl fmt::Display for ProxyTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered proxy sets, one per method family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyChain {
    read_only: Vec<ProxyTransform>,
    body_bearing: Vec<ProxyTransform>,
}

impl ProxyChain {
    /// Build a chain, rejecting body-bearing entries that drop request bodies
    pub fn new(
        read_only: Vec<ProxyTransform>,
        body_bearing: Vec<ProxyTransform>,
    ) -> DomainResult<Self> {
        if let Some(bad) = body_bearing.iter().find(|t| !t.supports_body()) {
            return Err(DomainError::Config(format!(
                "Proxy '{}' cannot forward request bodies and may only be used for GET",
                bad
            )));
        }
        Ok(Self {
            read_only,
            body_bearing,
        })
    }

    /// Build from configured names
    pub fn from_names(read_only: &[String], body_bearing: &[String]) -> DomainResult<Self> {
        let parse_all = |names: &[String]| -> DomainResult<Vec<ProxyTransform>> {
            names.iter().map(|n| ProxyTransform::parse(n)).collect()
        };
        Self::new(parse_all(read_only)?, parse_all(body_bearing)?)
    }

    /// Chain without any proxy; only the direct attempt is made
    pub fn direct_only() -> Self {
        Self {
            read_only: Vec::new(),
            body_bearing: Vec::new(),
        }
    }

    /// Same body-bearing set, different read-only order
    pub fn with_read_only(&self, read_only: Vec<ProxyTransform>) -> Self {
        Self {
            read_only,
            body_bearing: self.body_bearing.clone(),
        }
    }

    /// Proxies eligible for `method`, in attempt order
    pub fn for_method(&self, method: HttpMethod) -> &[ProxyTransform] {
        if method.carries_body() {
            &self.body_bearing
        } else {
            &self.read_only
        }
    }

    pub fn read_only(&self) -> &[ProxyTransform] {
        &self.read_only
    }

    pub fn body_bearing(&self) -> &[ProxyTransform] {
        &self.body_bearing
    }
}

impl Default for ProxyChain {
    fn default() -> Self {
        Self {
            read_only: vec![
                ProxyTransform::Codetabs,
                ProxyTransform::Allorigins,
                ProxyTransform::Corsproxy,
                ProxyTransform::Thingproxy,
            ],
            body_bearing: vec![
                ProxyTransform::Corsproxy,
                ProxyTransform::Thingproxy,
                ProxyTransform::Codetabs,
            ],
        }
    }
}
