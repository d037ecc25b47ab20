use super::env_flag;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl FromStr for RateLimitRule {
    type Err = String;

    /// Parses `per:burst`, e.g. `5:10`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (per, burst) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw.trim()))?;

        let per_second: u64 = per
            .trim()
            .parse()
            .map_err(|_| format!("invalid per_second '{}'", per.trim()))?;
        let burst_size: u32 = burst
            .trim()
            .parse()
            .map_err(|_| format!("invalid burst_size '{}'", burst.trim()))?;

        if per_second == 0 || burst_size == 0 {
            return Err("per_second and burst_size must be > 0".to_string());
        }

        Ok(Self {
            per_second,
            burst_size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    Auth,
    Public,
    Protected,
}

impl FromStr for RouteGroup {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(RouteGroup::Auth),
            "public" | "public_read" | "public-read" => Ok(RouteGroup::Public),
            "protected" => Ok(RouteGroup::Protected),
            other => Err(format!("unknown route group '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth: RateLimitRule,
    pub public: RateLimitRule,
    pub protected: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule {
                per_second: 5,
                burst_size: 10,
            },
            public: RateLimitRule {
                per_second: 30,
                burst_size: 60,
            },
            protected: RateLimitRule {
                per_second: 10,
                burst_size: 20,
            },
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = env_flag("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            if let Err(err) = cfg.apply(&raw) {
                tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
            }
        }

        cfg
    }

    pub fn rule(&self, group: RouteGroup) -> RateLimitRule {
        match group {
            RouteGroup::Auth => self.auth,
            RouteGroup::Public => self.public,
            RouteGroup::Protected => self.protected,
        }
    }

    fn set(&mut self, group: RouteGroup, rule: RateLimitRule) {
        match group {
            RouteGroup::Auth => self.auth = rule,
            RouteGroup::Public => self.public = rule,
            RouteGroup::Protected => self.protected = rule,
        }
    }

    /// Accepts either a global rule (`10:20`) or a grouped list
    /// (`auth=5:10,public=30:60`). Nothing is applied unless the whole value parses.
    fn apply(&mut self, raw: &str) -> Result<(), String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty value".to_string());
        }

        let mut updated = *self;
        if !trimmed.contains('=') {
            let rule: RateLimitRule = trimmed.parse()?;
            for group in [RouteGroup::Auth, RouteGroup::Public, RouteGroup::Protected] {
                updated.set(group, rule);
            }
        } else {
            for item in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (name, rule) = item
                    .split_once('=')
                    .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
                updated.set(name.parse()?, rule.parse()?);
            }
        }

        *self = updated;
        Ok(())
    }
}
