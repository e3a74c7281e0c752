use std::fmt;

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_API_VERSION: &str = "v9.0";

/// Parent links are a short-lived convenience; 30 days is plenty.
pub const MAX_PARENT_LINK_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Clone)]
pub struct Config {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// CRM base URL without trailing slash, e.g. `https://org.crm4.dynamics.com`.
    pub crm_url: String,
    pub port: u16,
    /// Token authority, overridable so tests can point at a mock server.
    pub authority_host: String,
    pub crm_api_version: String,
    pub crm_timeout_secs: u64,
    pub parent_link_ttl_secs: u64,
    /// Delete the freshly created student when a later lookup link fails.
    pub rollback_on_link_failure: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

// Hand-written so the client secret never reaches the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("crm_url", &self.crm_url)
            .field("port", &self.port)
            .field("authority_host", &self.authority_host)
            .field("crm_api_version", &self.crm_api_version)
            .field("crm_timeout_secs", &self.crm_timeout_secs)
            .field("parent_link_ttl_secs", &self.parent_link_ttl_secs)
            .field("rollback_on_link_failure", &self.rollback_on_link_failure)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            tenant_id: required("TENANT_ID")?,
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            crm_url: required("CRM_URL").and_then(|url| validate_base_url("CRM_URL", url))?,
            port: parsed_or("PORT", 8080, "PORT must be a valid number between 1-65535")?,
            authority_host: std::env::var("AUTHORITY_HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| validate_base_url("AUTHORITY_HOST", url))
                .transpose()?
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            crm_api_version: std::env::var("CRM_API_VERSION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            crm_timeout_secs: parsed_or(
                "CRM_TIMEOUT_SECS",
                30,
                "CRM_TIMEOUT_SECS must be a positive number of seconds",
            )?,
            parent_link_ttl_secs: parsed_or(
                "PARENT_LINK_TTL_SECS",
                3600,
                "PARENT_LINK_TTL_SECS must be a positive number of seconds",
            )?,
            rollback_on_link_failure: parsed_or(
                "STUDENT_ROLLBACK_ON_LINK_FAILURE",
                true,
                "STUDENT_ROLLBACK_ON_LINK_FAILURE must be true or false",
            )?,
            rate_limit_per_second: parsed_or(
                "RATE_LIMIT_PER_SECOND",
                10,
                "RATE_LIMIT_PER_SECOND must be a positive number",
            )?,
            rate_limit_burst: parsed_or(
                "RATE_LIMIT_BURST",
                20,
                "RATE_LIMIT_BURST must be a positive number",
            )?,
        };

        config.validate_limits()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("CRM URL: {}", config.crm_url);
        tracing::debug!("Authority host: {}", config.authority_host);
        tracing::debug!("Tenant: {}", config.tenant_id);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Rejects numeric settings that would break the HTTP client, the
    /// parent-link cache or the rate limiter at startup.
    pub fn validate_limits(&self) -> anyhow::Result<()> {
        if self.crm_timeout_secs == 0 {
            anyhow::bail!("CRM_TIMEOUT_SECS must be greater than zero");
        }
        if self.parent_link_ttl_secs == 0 || self.parent_link_ttl_secs > MAX_PARENT_LINK_TTL_SECS
        {
            anyhow::bail!(
                "PARENT_LINK_TTL_SECS must be between 1 and {}",
                MAX_PARENT_LINK_TTL_SECS
            );
        }
        if self.rate_limit_per_second == 0 || self.rate_limit_burst == 0 {
            anyhow::bail!("Rate limit settings must be greater than zero");
        }
        Ok(())
    }

    /// Base of the CRM Web API, e.g. `https://org.crm.dynamics.com/api/data/v9.0`.
    pub fn crm_api_base(&self) -> String {
        format!("{}/api/data/{}", self.crm_url, self.crm_api_version)
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }

    /// Client-credential scope covering every permission granted on the CRM.
    pub fn token_scope(&self) -> String {
        format!("{}/.default", self.crm_url)
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T, message: &str) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{}", message)),
        _ => Ok(default),
    }
}

fn validate_base_url(name: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}
